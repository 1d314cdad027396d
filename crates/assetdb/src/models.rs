//! Database models mapping to the asset schema.

use crate::error::{AssetDbError, AssetDbResult};
use bytes::Bytes;
use depot_core::{Asset, AssetFlags, AssetMetadata, AssetType, ContentHash};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Reference row: logical asset identity and metadata.
///
/// `hash` plus `asset_type` is the foreign pointer into `asset_content`.
#[derive(Debug, Clone, FromRow)]
pub struct AssetRefRow {
    pub id: Uuid,
    pub name: String,
    pub asset_type: i32,
    pub temporary: bool,
    pub create_time: OffsetDateTime,
    pub access_time: OffsetDateTime,
    pub flags: i64,
    pub creator_id: Uuid,
    pub hash: Vec<u8>,
}

/// Content row: physical payload keyed by `(hash, asset_type)`.
#[derive(Debug, Clone, FromRow)]
pub struct ContentRow {
    pub hash: Vec<u8>,
    pub asset_type: i32,
    pub data: Vec<u8>,
}

/// Joined reference + content row, as returned by the full read path.
#[derive(Debug, Clone, FromRow)]
pub struct AssetJoinRow {
    pub id: Uuid,
    pub name: String,
    pub asset_type: i32,
    pub temporary: bool,
    pub create_time: OffsetDateTime,
    pub access_time: OffsetDateTime,
    pub flags: i64,
    pub creator_id: Uuid,
    pub data: Vec<u8>,
}

fn asset_type_of(id: Uuid, code: i32) -> AssetDbResult<AssetType> {
    AssetType::try_from(code)
        .map_err(|_| AssetDbError::Corrupt(format!("asset {id} has unknown type code {code}")))
}

impl AssetRefRow {
    /// The content pointer, validated to digest width.
    pub fn content_hash(&self) -> AssetDbResult<ContentHash> {
        ContentHash::from_slice(&self.hash).map_err(|e| {
            AssetDbError::Corrupt(format!("asset {} has invalid content hash: {e}", self.id))
        })
    }

    pub fn into_metadata(self) -> AssetDbResult<AssetMetadata> {
        let asset_type = asset_type_of(self.id, self.asset_type)?;
        Ok(AssetMetadata {
            id: self.id,
            name: self.name,
            asset_type,
            temporary: self.temporary,
            create_time: self.create_time,
            access_time: self.access_time,
            flags: AssetFlags::from_bits(self.flags as u32),
            creator: self.creator_id,
        })
    }
}

impl AssetJoinRow {
    pub fn into_asset(self) -> AssetDbResult<Asset> {
        let asset_type = asset_type_of(self.id, self.asset_type)?;
        Ok(Asset {
            metadata: AssetMetadata {
                id: self.id,
                name: self.name,
                asset_type,
                temporary: self.temporary,
                create_time: self.create_time,
                access_time: self.access_time,
                flags: AssetFlags::from_bits(self.flags as u32),
                creator: self.creator_id,
            },
            data: Bytes::from(self.data),
        })
    }
}
