//! Graphics backend interface.
//!
//! The renderer does NOT own the frame loop -- the frame loop drives it.
//! Each frame:
//!
//! 1. [`extract_draw_commands`] reads [`Transform`] and [`MeshRenderer`]
//!    components out of the ECS.
//! 2. The backend is cleared, handed one [`DrawCommand`] per entity, and
//!    presented.
//!
//! The real backend (buffers, shaders, swap chain) lives outside this crate
//! behind the [`Renderer`] trait. [`HeadlessRenderer`] is a recording
//! renderer for tests. Headless frame loops take no renderer at all.

use ember_ecs::asset::AssetId;
use ember_ecs::ecs::Ecs;
use ember_ecs::entity::Entity;

use crate::components::{MeshRenderer, Transform};
use crate::EngineError;

// ---------------------------------------------------------------------------
// DrawCommand
// ---------------------------------------------------------------------------

/// One mesh to draw this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCommand {
    pub entity: Entity,
    pub mesh: AssetId,
    pub material: AssetId,
    pub transform: Transform,
}

/// Collect a draw command for every entity with both a [`MeshRenderer`] and
/// a [`Transform`] whose mesh is a valid, registered asset.
///
/// Commands are sorted by entity index so draw order does not depend on sparse-set
/// storage order.
pub fn extract_draw_commands(ecs: &Ecs) -> Vec<DrawCommand> {
    let mut commands: Vec<DrawCommand> = ecs
        .view::<MeshRenderer>()
        .filter(|(_, mr)| mr.mesh.is_valid() && mr.mesh.is_registered())
        .filter_map(|(entity, mr)| {
            let transform = *ecs.get_component::<Transform>(entity)?;
            Some(DrawCommand {
                entity,
                mesh: mr.mesh,
                material: mr.material,
                transform,
            })
        })
        .collect();
    commands.sort_by_key(|c| c.entity.index());
    commands
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// What the frame loop needs from a graphics backend.
pub trait Renderer {
    /// Clear the backbuffer to `color` (RGBA).
    fn clear(&mut self, color: [f32; 4]);

    /// Queue one mesh draw.
    fn draw_mesh(&mut self, command: &DrawCommand);

    /// Present the frame.
    fn present(&mut self) -> Result<(), EngineError>;

    /// The window's client area changed size.
    fn resize(&mut self, width: u32, height: u32);
}

// ---------------------------------------------------------------------------
// HeadlessRenderer
// ---------------------------------------------------------------------------

/// A call received by a [`HeadlessRenderer`].
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCall {
    Clear([f32; 4]),
    Draw(DrawCommand),
    Present,
    Resize(u32, u32),
}

/// Renderer that records calls instead of talking to a GPU.
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    calls: Vec<RenderCall>,
    frames_presented: u64,
    size: (u32, u32),
    /// When set, `present` fails with this message.
    fail_present: Option<String>,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `present` fail, e.g. to simulate a lost device.
    pub fn fail_present_with(&mut self, message: &str) {
        self.fail_present = Some(message.to_owned());
    }

    /// Calls recorded so far.
    pub fn calls(&self) -> &[RenderCall] {
        &self.calls
    }

    /// Take and clear the recorded calls.
    pub fn take_calls(&mut self) -> Vec<RenderCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    /// Last size passed to `resize`, `(0, 0)` if never resized.
    pub fn size(&self) -> (u32, u32) {
        self.size
    }
}

impl Renderer for HeadlessRenderer {
    fn clear(&mut self, color: [f32; 4]) {
        self.calls.push(RenderCall::Clear(color));
    }

    fn draw_mesh(&mut self, command: &DrawCommand) {
        self.calls.push(RenderCall::Draw(*command));
    }

    fn present(&mut self) -> Result<(), EngineError> {
        if let Some(message) = &self.fail_present {
            return Err(EngineError::Render(message.clone()));
        }
        self.calls.push(RenderCall::Present);
        self.frames_presented += 1;
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
        self.calls.push(RenderCall::Resize(width, height));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
