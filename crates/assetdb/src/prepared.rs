//! Backend-independent pre-processing for the store path.
//!
//! Digest computation, name truncation, and timestamp assignment live here
//! so the SQLite and PostgreSQL write paths persist identical rows.

use bytes::Bytes;
use depot_core::{ContentHash, NewAsset, MAX_ASSET_NAME};
use time::OffsetDateTime;
use uuid::Uuid;

/// A store request reduced to the exact column values both backends bind.
pub(crate) struct PreparedAsset {
    pub id: Uuid,
    pub name: String,
    pub asset_type: i32,
    pub temporary: bool,
    pub create_time: OffsetDateTime,
    pub access_time: OffsetDateTime,
    pub flags: i64,
    pub creator_id: Uuid,
    pub hash: Vec<u8>,
    pub data: Bytes,
}

pub(crate) fn prepare(asset: NewAsset, now: OffsetDateTime) -> PreparedAsset {
    let hash = ContentHash::compute(&asset.data);
    let name = truncate_name(&asset.name, asset.id);

    PreparedAsset {
        id: asset.id,
        name,
        asset_type: asset.asset_type.as_i32(),
        temporary: asset.temporary,
        create_time: now,
        access_time: now,
        flags: i64::from(asset.flags.bits()),
        creator_id: asset.creator,
        hash: hash.as_bytes().to_vec(),
        data: asset.data,
    }
}

/// Truncate to [`MAX_ASSET_NAME`] characters on a char boundary.
fn truncate_name(name: &str, id: Uuid) -> String {
    match name.char_indices().nth(MAX_ASSET_NAME) {
        Some((boundary, _)) => {
            tracing::warn!(
                asset_id = %id,
                original_len = name.chars().count(),
                truncated_len = MAX_ASSET_NAME,
                "asset name truncated on store"
            );
            name[..boundary].to_string()
        }
        None => name.to_string(),
    }
}
