//! Test fixtures.

use bytes::Bytes;
use depot_core::{AssetFlags, AssetType, NewAsset};
use time::OffsetDateTime;
use uuid::Uuid;

/// Fixed instant all test clocks start at.
pub fn test_epoch() -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(1_700_000_000).expect("valid timestamp")
}

/// A protected (zero-flag) texture asset.
#[allow(dead_code)]
pub fn protected_asset(id: Uuid, name: &str, data: &[u8]) -> NewAsset {
    NewAsset {
        id,
        name: name.to_string(),
        asset_type: AssetType::Texture,
        temporary: false,
        flags: AssetFlags::NORMAL,
        creator: Uuid::new_v4(),
        data: Bytes::copy_from_slice(data),
    }
}

/// A deletable asset (collectable flag set).
#[allow(dead_code)]
pub fn deletable_asset(id: Uuid, name: &str, data: &[u8]) -> NewAsset {
    NewAsset {
        flags: AssetFlags::COLLECTABLE,
        ..protected_asset(id, name, data)
    }
}

/// Same as [`protected_asset`] with an explicit type.
#[allow(dead_code)]
pub fn typed_asset(id: Uuid, asset_type: AssetType, data: &[u8]) -> NewAsset {
    NewAsset {
        asset_type,
        ..protected_asset(id, "typed", data)
    }
}
