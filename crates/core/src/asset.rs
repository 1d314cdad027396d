//! Asset records, types, and flags.

use bytes::Bytes;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use time::OffsetDateTime;
use uuid::Uuid;

/// Maximum stored length of an asset name, in characters.
///
/// Longer names are truncated by the store with a diagnostic, never rejected.
pub const MAX_ASSET_NAME: usize = 64;

/// Enumerated asset types.
///
/// The numeric codes are part of the persisted schema: the asset type joins
/// the content hash in the physical storage key, so two payloads with equal
/// bytes but different types are stored separately.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum AssetType {
    Unknown = -1,
    Texture = 0,
    Sound = 1,
    CallingCard = 2,
    Landmark = 3,
    Clothing = 5,
    Object = 6,
    Notecard = 7,
    LslText = 10,
    LslBytecode = 11,
    TextureTga = 12,
    BodyPart = 13,
    SoundWav = 17,
    ImageTga = 18,
    ImageJpeg = 19,
    Animation = 20,
    Gesture = 21,
    Simstate = 22,
    Link = 24,
    LinkFolder = 25,
    Mesh = 49,
}

impl AssetType {
    /// The persisted type code.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Lowercase type name, as used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            AssetType::Unknown => "unknown",
            AssetType::Texture => "texture",
            AssetType::Sound => "sound",
            AssetType::CallingCard => "callingcard",
            AssetType::Landmark => "landmark",
            AssetType::Clothing => "clothing",
            AssetType::Object => "object",
            AssetType::Notecard => "notecard",
            AssetType::LslText => "lsltext",
            AssetType::LslBytecode => "lslbytecode",
            AssetType::TextureTga => "texturetga",
            AssetType::BodyPart => "bodypart",
            AssetType::SoundWav => "soundwav",
            AssetType::ImageTga => "imagetga",
            AssetType::ImageJpeg => "imagejpeg",
            AssetType::Animation => "animation",
            AssetType::Gesture => "gesture",
            AssetType::Simstate => "simstate",
            AssetType::Link => "link",
            AssetType::LinkFolder => "linkfolder",
            AssetType::Mesh => "mesh",
        }
    }
}

impl TryFrom<i32> for AssetType {
    type Error = crate::Error;

    fn try_from(code: i32) -> crate::Result<Self> {
        Ok(match code {
            -1 => AssetType::Unknown,
            0 => AssetType::Texture,
            1 => AssetType::Sound,
            2 => AssetType::CallingCard,
            3 => AssetType::Landmark,
            5 => AssetType::Clothing,
            6 => AssetType::Object,
            7 => AssetType::Notecard,
            10 => AssetType::LslText,
            11 => AssetType::LslBytecode,
            12 => AssetType::TextureTga,
            13 => AssetType::BodyPart,
            17 => AssetType::SoundWav,
            18 => AssetType::ImageTga,
            19 => AssetType::ImageJpeg,
            20 => AssetType::Animation,
            21 => AssetType::Gesture,
            22 => AssetType::Simstate,
            24 => AssetType::Link,
            25 => AssetType::LinkFolder,
            49 => AssetType::Mesh,
            other => return Err(crate::Error::InvalidAssetType(other)),
        })
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Asset flag bitset.
///
/// A zero value marks the asset permanent: the store refuses to delete a
/// reference row whose flags are `NORMAL`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct AssetFlags(u32);

impl AssetFlags {
    /// No flags set; the asset is protected from deletion.
    pub const NORMAL: AssetFlags = AssetFlags(0);
    /// World map tile imagery, regenerated periodically.
    pub const MAPTILE: AssetFlags = AssetFlags(1);
    /// Content may be replaced by a later store under the same identifier.
    pub const REWRITABLE: AssetFlags = AssetFlags(2);
    /// Eligible for collection by external retention policies.
    pub const COLLECTABLE: AssetFlags = AssetFlags(4);

    /// Build from raw persisted bits.
    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// The raw bits.
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Whether every bit of `other` is set.
    pub fn contains(self, other: AssetFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Zero flags mark the asset undeletable.
    pub fn is_protected(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for AssetFlags {
    type Output = AssetFlags;

    fn bitor(self, rhs: AssetFlags) -> AssetFlags {
        AssetFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for AssetFlags {
    fn bitor_assign(&mut self, rhs: AssetFlags) {
        self.0 |= rhs.0;
    }
}

/// Per-identifier asset metadata, as stored on the reference row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetMetadata {
    pub id: Uuid,
    pub name: String,
    pub asset_type: AssetType,
    pub temporary: bool,
    pub create_time: OffsetDateTime,
    pub access_time: OffsetDateTime,
    pub flags: AssetFlags,
    /// Principal that created the asset.
    pub creator: Uuid,
}

/// A full asset: reference metadata plus the shared payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Asset {
    pub metadata: AssetMetadata,
    pub data: Bytes,
}

/// A caller-supplied asset to store.
///
/// Timestamps are assigned by the engine from its injected clock; the name
/// is truncated to [`MAX_ASSET_NAME`] characters if necessary.
#[derive(Clone, Debug)]
pub struct NewAsset {
    pub id: Uuid,
    pub name: String,
    pub asset_type: AssetType,
    pub temporary: bool,
    pub flags: AssetFlags,
    pub creator: Uuid,
    pub data: Bytes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_type_code_roundtrip() {
        for ty in [
            AssetType::Unknown,
            AssetType::Texture,
            AssetType::Notecard,
            AssetType::LslText,
            AssetType::Mesh,
        ] {
            assert_eq!(AssetType::try_from(ty.as_i32()).unwrap(), ty);
        }
    }

    #[test]
    fn test_asset_type_rejects_unknown_code() {
        assert!(AssetType::try_from(4).is_err());
        assert!(AssetType::try_from(1000).is_err());
    }

    #[test]
    fn test_flags_protection() {
        assert!(AssetFlags::NORMAL.is_protected());
        assert!(!AssetFlags::MAPTILE.is_protected());

        let combined = AssetFlags::MAPTILE | AssetFlags::COLLECTABLE;
        assert!(combined.contains(AssetFlags::MAPTILE));
        assert!(combined.contains(AssetFlags::COLLECTABLE));
        assert!(!combined.contains(AssetFlags::REWRITABLE));
        assert_eq!(combined.bits(), 5);
    }
}
