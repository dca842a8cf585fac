//! Ember Engine -- frame loop and collaborator interfaces around the ECS.
//!
//! This crate builds on [`ember_ecs`] to drive a frame: platform input events
//! are folded into an [`InputState`](input::InputState), named systems run in
//! registration order against the [`Ecs`](ember_ecs::ecs::Ecs), and the
//! resulting mesh/transform data is handed to a [`Renderer`](render::Renderer).
//! The graphics backend and the windowing layer are external; this crate only
//! defines the narrow interfaces it consumes from them.
//!
//! # Quick Start
//!
//! ```
//! use ember_engine::prelude::*;
//!
//! let config = EngineConfig { headless: true, ..Default::default() };
//! let mut frames = FrameLoop::new(config).unwrap();
//! frames.add_system("locomotion_input", locomotion_input).unwrap();
//! frames
//!     .add_system_after("locomotion_integrate", &["locomotion_input"], locomotion_integrate)
//!     .unwrap();
//!
//! let player = frames.spawn_named("player").unwrap();
//! frames.ecs_mut().emplace_component(player, Transform::IDENTITY);
//! frames.ecs_mut().emplace_component(player, Locomotion { input_dir: [0.0; 3], speed: 2.0 });
//!
//! frames.frame(&[InputEvent::KeyPressed(Key::W)], None).unwrap();
//! assert_eq!(frames.frame_count(), 1);
//! assert_eq!(frames.name_of(player), Some("player"));
//! ```

#![deny(unsafe_code)]

pub mod components;
pub mod config;
pub mod frame;
pub mod input;
pub mod logging;
pub mod render;
pub mod systems;

/// Re-export the ECS crate for convenience.
pub use ember_ecs;

use ember_ecs::EcsError;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by the engine layer.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A configuration value is out of range.
    #[error("invalid engine config: {0}")]
    InvalidConfig(String),

    /// The configuration text is not valid JSON for [`config::EngineConfig`].
    #[error("failed to parse engine config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// A system with this name is already registered.
    #[error("system {name:?} is already registered")]
    DuplicateSystem { name: String },

    /// A system declared a dependency that has not been registered.
    #[error("system {name:?} depends on {dependency:?}, which is not registered")]
    UnknownDependency { name: String, dependency: String },

    /// The graphics backend reported a failure.
    #[error("renderer failure: {0}")]
    Render(String),

    #[error(transparent)]
    Ecs(#[from] EcsError),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    pub use ember_ecs::prelude::*;

    pub use crate::components::{Locomotion, MeshRenderer, Name, Transform};
    pub use crate::config::{EngineConfig, WindowConfig};
    pub use crate::frame::{FrameContext, FrameDiagnostics, FrameLoop, SystemFn};
    pub use crate::input::{InputEvent, InputState, Key};
    pub use crate::logging::init_tracing;
    pub use crate::render::{
        extract_draw_commands, DrawCommand, HeadlessRenderer, RenderCall, Renderer,
    };
    pub use crate::systems::{locomotion_input, locomotion_integrate};
    pub use crate::EngineError;
}
