//! Packed asset handles.
//!
//! An [`AssetId`] is what components store to refer to a mesh, texture or
//! other asset owned by the asset manager. The ECS treats it as plain data.
//!
//! Layout: `[kind: u4 | registered: u1 | index: u27]`. A zero kind marks
//! [`AssetId::INVALID`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error returned when an [`AssetId`] cannot represent the requested fields.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssetIdError {
    #[error("asset index {index} does not fit in {bits} bits", bits = AssetId::INDEX_BITS)]
    IndexOutOfRange { index: u32 },
}

/// The category of asset a handle refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AssetKind {
    Mesh = 1,
    Texture = 2,
    Model = 3,
    Shader = 4,
    Material = 5,
}

impl AssetKind {
    fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            1 => Some(Self::Mesh),
            2 => Some(Self::Texture),
            3 => Some(Self::Model),
            4 => Some(Self::Shader),
            5 => Some(Self::Material),
            _ => None,
        }
    }
}

/// A bit-packed handle to an asset.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(u32);

impl AssetId {
    pub const INDEX_BITS: u32 = 27;
    const INDEX_MASK: u32 = (1 << Self::INDEX_BITS) - 1;
    const REGISTERED_BIT: u32 = 1 << Self::INDEX_BITS;
    const KIND_SHIFT: u32 = 28;
    /// Largest representable index.
    pub const MAX_INDEX: u32 = Self::INDEX_MASK;
    /// Handle that refers to nothing.
    pub const INVALID: AssetId = AssetId(0);

    /// Build an unregistered handle. Out-of-range indices are rejected.
    pub fn try_new(kind: AssetKind, index: u32) -> Result<Self, AssetIdError> {
        if index > Self::MAX_INDEX {
            return Err(AssetIdError::IndexOutOfRange { index });
        }
        Ok(Self((kind as u32) << Self::KIND_SHIFT | index))
    }

    /// The asset category, or `None` for [`INVALID`](Self::INVALID) and
    /// unknown kind bits.
    pub fn kind(self) -> Option<AssetKind> {
        AssetKind::from_bits(self.0 >> Self::KIND_SHIFT)
    }

    pub fn index(self) -> u32 {
        self.0 & Self::INDEX_MASK
    }

    /// Whether the asset manager has finished registering this asset.
    pub fn is_registered(self) -> bool {
        self.0 & Self::REGISTERED_BIT != 0
    }

    /// Copy of this handle with the registered flag set or cleared.
    pub fn with_registered(self, registered: bool) -> Self {
        if registered {
            Self(self.0 | Self::REGISTERED_BIT)
        } else {
            Self(self.0 & !Self::REGISTERED_BIT)
        }
    }

    pub fn is_valid(self) -> bool {
        self.kind().is_some()
    }

    pub fn to_raw(self) -> u32 {
        self.0
    }

    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }
}

impl Default for AssetId {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Debug for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            Some(kind) => write!(
                f,
                "AssetId({kind:?}#{}{})",
                self.index(),
                if self.is_registered() { "" } else { ", unregistered" }
            ),
            None => write!(f, "AssetId(INVALID)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_kind_flag_and_index() {
        let id = AssetId::try_new(AssetKind::Texture, 1234).unwrap();
        assert_eq!(id.kind(), Some(AssetKind::Texture));
        assert_eq!(id.index(), 1234);
        assert!(!id.is_registered());

        let reg = id.with_registered(true);
        assert!(reg.is_registered());
        assert_eq!(reg.kind(), Some(AssetKind::Texture));
        assert_eq!(reg.index(), 1234);
        assert_eq!(reg.with_registered(false), id);
    }

    #[test]
    fn max_index_fits_and_overflow_is_rejected() {
        let id = AssetId::try_new(AssetKind::Material, AssetId::MAX_INDEX).unwrap();
        assert_eq!(id.index(), AssetId::MAX_INDEX);
        assert_eq!(id.kind(), Some(AssetKind::Material));
        assert!(!id.is_registered());
        assert_eq!(
            AssetId::try_new(AssetKind::Mesh, AssetId::MAX_INDEX + 1),
            Err(AssetIdError::IndexOutOfRange { index: 1 << 27 })
        );
    }

    #[test]
    fn invalid_sentinel() {
        assert!(!AssetId::INVALID.is_valid());
        assert_eq!(AssetId::default(), AssetId::INVALID);
        assert_eq!(format!("{:?}", AssetId::INVALID), "AssetId(INVALID)");
        assert!(AssetId::try_new(AssetKind::Mesh, 0).unwrap().is_valid());
    }

    #[test]
    fn debug_format() {
        let id = AssetId::try_new(AssetKind::Mesh, 3).unwrap();
        assert_eq!(format!("{id:?}"), "AssetId(Mesh#3, unregistered)");
        assert_eq!(format!("{:?}", id.with_registered(true)), "AssetId(Mesh#3)");
    }
}
