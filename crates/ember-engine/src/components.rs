//! Built-in component types the frame loop and renderer understand.

use ember_ecs::arena::MetaStr;
use ember_ecs::asset::AssetId;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Transform
// ---------------------------------------------------------------------------

/// Translation, rotation (unit quaternion `[x, y, z, w]`) and scale.
///
/// `Pod` so the renderer can upload it as-is.
#[repr(C)]
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Serialize,
    Deserialize,
    bytemuck_derive::Pod,
    bytemuck_derive::Zeroable,
)]
pub struct Transform {
    pub translation: [f32; 3],
    pub rotation: [f32; 4],
    pub scale: [f32; 3],
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        translation: [0.0; 3],
        rotation: [0.0, 0.0, 0.0, 1.0],
        scale: [1.0; 3],
    };

    /// Identity rotation and scale at `translation`.
    pub fn from_translation(translation: [f32; 3]) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    /// Column-major model matrix (scale, then rotate, then translate).
    pub fn model_matrix(&self) -> [f32; 16] {
        let [x, y, z, w] = self.rotation;
        let [sx, sy, sz] = self.scale;
        let [tx, ty, tz] = self.translation;
        let (xx, yy, zz) = (x * x, y * y, z * z);
        let (xy, xz, yz) = (x * y, x * z, y * z);
        let (wx, wy, wz) = (w * x, w * y, w * z);
        [
            (1.0 - 2.0 * (yy + zz)) * sx,
            2.0 * (xy + wz) * sx,
            2.0 * (xz - wy) * sx,
            0.0,
            2.0 * (xy - wz) * sy,
            (1.0 - 2.0 * (xx + zz)) * sy,
            2.0 * (yz + wx) * sy,
            0.0,
            2.0 * (xz + wy) * sz,
            2.0 * (yz - wx) * sz,
            (1.0 - 2.0 * (xx + yy)) * sz,
            0.0,
            tx,
            ty,
            tz,
            1.0,
        ]
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

// ---------------------------------------------------------------------------
// Rendering and movement
// ---------------------------------------------------------------------------

/// Which mesh to draw with which material. Both are asset-manager handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshRenderer {
    pub mesh: AssetId,
    pub material: AssetId,
}

/// Input-driven movement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Locomotion {
    /// Desired direction, written from input each frame.
    pub input_dir: [f32; 3],
    /// Units per second.
    pub speed: f32,
}

/// Display name, stored in the frame loop's metadata arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Name(pub MetaStr);
