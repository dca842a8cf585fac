//! Fixed-timestep frame loop.
//!
//! The [`FrameLoop`] owns the [`Ecs`] and drives it forward. Each frame:
//!
//! 1. Platform [`InputEvent`]s are folded into the [`InputState`]; a resize is
//!    forwarded to the renderer.
//! 2. Registered systems run in registration order, each receiving the ECS
//!    and a [`FrameContext`].
//! 3. The frame counter advances.
//! 4. Unless headless, draw commands are extracted from the ECS and handed to
//!    the [`Renderer`]: clear, one draw per mesh, present.
//!
//! # Example
//!
//! ```
//! use ember_engine::prelude::*;
//!
//! let config = EngineConfig { headless: true, ..Default::default() };
//! let mut frames = FrameLoop::new(config).unwrap();
//! frames.add_system("noop", |_ecs, _ctx| {}).unwrap();
//! frames.run_frames(10).unwrap();
//! assert_eq!(frames.frame_count(), 10);
//! ```

use std::collections::HashMap;
use std::time::{Duration, Instant};

use ember_ecs::arena::{ArenaError, MetaArena, MetaStr};
use ember_ecs::ecs::Ecs;
use ember_ecs::entity::Entity;
use ember_ecs::EcsError;

use crate::components::Name;
use crate::config::EngineConfig;
use crate::input::{InputEvent, InputState};
use crate::render::{extract_draw_commands, Renderer};
use crate::EngineError;

// ---------------------------------------------------------------------------
// FrameContext
// ---------------------------------------------------------------------------

/// Per-frame data handed to every system.
#[derive(Debug, Clone, Copy)]
pub struct FrameContext<'a> {
    /// Index of the frame being run, starting at 0.
    pub frame: u64,
    /// Fixed time step in seconds.
    pub dt: f32,
    /// Input as of this frame.
    pub input: &'a InputState,
}

/// A system function run once per frame.
pub type SystemFn = fn(&mut Ecs, &FrameContext<'_>);

/// A named system in the registry.
#[derive(Debug)]
struct RegisteredSystem {
    name: String,
    func: SystemFn,
    /// Systems that must run before this one. All were registered earlier,
    /// so registration order already satisfies them.
    after: Vec<String>,
}

// ---------------------------------------------------------------------------
// FrameDiagnostics
// ---------------------------------------------------------------------------

/// Timing diagnostics for the last frame.
#[derive(Debug, Clone, Default)]
pub struct FrameDiagnostics {
    /// Wall-clock time per system, in execution order.
    pub system_times: Vec<(String, Duration)>,
    /// Time spent extracting and submitting draw commands.
    pub render_time: Duration,
    /// Total time for the frame.
    pub total_time: Duration,
    /// Meshes submitted to the renderer.
    pub draw_count: usize,
}

// ---------------------------------------------------------------------------
// FrameLoop
// ---------------------------------------------------------------------------

/// The fixed-timestep frame loop.
pub struct FrameLoop {
    ecs: Ecs,
    input: InputState,
    /// Backing store for entity names.
    meta: MetaArena,
    /// Names already in `meta`, so repeated names share one copy.
    interned: HashMap<String, MetaStr>,
    systems: Vec<RegisteredSystem>,
    frame_counter: u64,
    config: EngineConfig,
    last_diagnostics: FrameDiagnostics,
}

impl std::fmt::Debug for FrameLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameLoop")
            .field("frame_counter", &self.frame_counter)
            .field("systems", &self.system_names())
            .field("ecs", &self.ecs)
            .finish_non_exhaustive()
    }
}

impl FrameLoop {
    /// Create a frame loop with an empty ECS.
    ///
    /// Fails with [`EngineError::InvalidConfig`] if `config` does not
    /// validate.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        tracing::info!(
            fixed_dt = config.fixed_dt,
            headless = config.headless,
            "frame loop created"
        );
        Ok(Self {
            ecs: Ecs::with_capacity(config.initial_entity_capacity),
            input: InputState::new(config.window.width, config.window.height),
            meta: MetaArena::with_capacity(config.meta_arena_bytes),
            interned: HashMap::new(),
            systems: Vec::new(),
            frame_counter: 0,
            config,
            last_diagnostics: FrameDiagnostics::default(),
        })
    }

    /// Register a system to run each frame, after every system registered
    /// before it.
    pub fn add_system(&mut self, name: &str, func: SystemFn) -> Result<(), EngineError> {
        self.add_system_after(name, &[], func)
    }

    /// Register a system that must run after each system named in `after`.
    ///
    /// Every dependency must already be registered, so the execution order
    /// is always registration order and no cycle can form.
    pub fn add_system_after(
        &mut self,
        name: &str,
        after: &[&str],
        func: SystemFn,
    ) -> Result<(), EngineError> {
        if self.systems.iter().any(|s| s.name == name) {
            return Err(EngineError::DuplicateSystem {
                name: name.to_owned(),
            });
        }
        if let Some(missing) = after
            .iter()
            .find(|dep| !self.systems.iter().any(|s| s.name == **dep))
        {
            return Err(EngineError::UnknownDependency {
                name: name.to_owned(),
                dependency: (*missing).to_owned(),
            });
        }

        tracing::debug!(system = name, ?after, "registered system");
        self.systems.push(RegisteredSystem {
            name: name.to_owned(),
            func,
            after: after.iter().map(|s| (*s).to_owned()).collect(),
        });
        Ok(())
    }

    /// Run one frame. See the module docs for the phases.
    ///
    /// `renderer` is ignored in headless mode. A render failure is returned
    /// after the simulation step has been committed.
    pub fn frame(
        &mut self,
        events: &[InputEvent],
        renderer: Option<&mut dyn Renderer>,
    ) -> Result<(), EngineError> {
        let mut renderer = if self.config.headless { None } else { renderer };
        let span = tracing::debug_span!("frame", frame = self.frame_counter);
        let _guard = span.enter();
        let frame_start = Instant::now();

        // Phase 1: input.
        self.input.begin_frame();
        for event in events {
            self.input.apply(event);
        }
        if let (Some((width, height)), Some(r)) = (self.input.resized(), renderer.as_deref_mut()) {
            r.resize(width, height);
        }

        // Phase 2: systems.
        let mut system_times = Vec::with_capacity(self.systems.len());
        let ctx = FrameContext {
            frame: self.frame_counter,
            dt: self.config.fixed_dt as f32,
            input: &self.input,
        };
        for system in &self.systems {
            let sys_start = Instant::now();
            (system.func)(&mut self.ecs, &ctx);
            system_times.push((system.name.clone(), sys_start.elapsed()));
        }

        // Phase 3: advance.
        self.frame_counter += 1;

        // Phase 4: render.
        let render_start = Instant::now();
        let mut draw_count = 0;
        let rendered = match renderer {
            Some(r) => {
                let commands = extract_draw_commands(&self.ecs);
                draw_count = commands.len();
                r.clear(self.config.clear_color);
                for command in &commands {
                    r.draw_mesh(command);
                }
                r.present()
            }
            None => Ok(()),
        };

        self.last_diagnostics = FrameDiagnostics {
            system_times,
            render_time: render_start.elapsed(),
            total_time: frame_start.elapsed(),
            draw_count,
        };

        if let Err(err) = &rendered {
            tracing::error!(error = %err, "present failed");
        }
        rendered
    }

    /// Run `count` frames with no input and no renderer.
    pub fn run_frames(&mut self, count: u64) -> Result<(), EngineError> {
        for _ in 0..count {
            self.frame(&[], None)?;
        }
        Ok(())
    }

    /// Create an entity carrying a [`Name`] stored in the metadata arena.
    ///
    /// Equal names share storage. When the arena is full it is rebuilt from
    /// the names of live entities before giving up, so names of destroyed
    /// entities do not use up space for good.
    pub fn spawn_named(&mut self, name: &str) -> Result<Entity, EngineError> {
        let handle = match self.intern(name) {
            Ok(handle) => handle,
            Err(ArenaError::OutOfMemory { .. }) => {
                self.compact_names();
                self.intern(name).map_err(EcsError::from)?
            }
            Err(err) => return Err(EcsError::from(err).into()),
        };
        let entity = self.ecs.try_create_entity()?;
        self.ecs.try_emplace_component(entity, Name(handle))?;
        Ok(entity)
    }

    fn intern(&mut self, name: &str) -> Result<MetaStr, ArenaError> {
        if let Some(&handle) = self.interned.get(name) {
            return Ok(handle);
        }
        let handle = self.meta.push_str(name)?;
        self.interned.insert(name.to_owned(), handle);
        Ok(handle)
    }

    /// Reset the name arena and re-store only names still held by a live
    /// entity, rewriting their [`Name`] handles.
    fn compact_names(&mut self) {
        let live: Vec<(Entity, String)> = self
            .ecs
            .view::<Name>()
            .filter_map(|(e, &Name(h))| Some((e, self.meta.get(h)?.to_owned())))
            .collect();
        let before = self.meta.used();
        self.meta.reset();
        self.interned.clear();
        for (entity, name) in live {
            // Live names fit before the reset, so they fit again.
            let Ok(handle) = self.intern(&name) else {
                continue;
            };
            if let Some(slot) = self.ecs.get_component_mut::<Name>(entity) {
                *slot = Name(handle);
            }
        }
        tracing::debug!(before, after = self.meta.used(), "compacted name arena");
    }

    /// The name of `entity`, if it is live and was spawned with one.
    pub fn name_of(&self, entity: Entity) -> Option<&str> {
        let Name(handle) = *self.ecs.get_component::<Name>(entity)?;
        self.meta.get(handle)
    }

    // -- accessors ----------------------------------------------------------

    pub fn ecs(&self) -> &Ecs {
        &self.ecs
    }

    /// Mutable access to the ECS, for setup between frames.
    pub fn ecs_mut(&mut self) -> &mut Ecs {
        &mut self.ecs
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    /// The number of frames run so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_counter
    }

    /// Simulation time in seconds, computed as `frame_count * fixed_dt` to
    /// avoid drift from repeated addition.
    pub fn sim_time(&self) -> f64 {
        self.frame_counter as f64 * self.config.fixed_dt
    }

    pub fn fixed_dt(&self) -> f64 {
        self.config.fixed_dt
    }

    /// The names of all registered systems, in execution order.
    pub fn system_names(&self) -> Vec<&str> {
        self.systems.iter().map(|s| s.name.as_str()).collect()
    }

    /// Declared dependencies of the system called `name`.
    pub fn system_dependencies(&self, name: &str) -> Option<Vec<&str>> {
        let system = self.systems.iter().find(|s| s.name == name)?;
        Some(system.after.iter().map(String::as_str).collect())
    }

    /// Diagnostics from the last frame.
    pub fn last_diagnostics(&self) -> &FrameDiagnostics {
        &self.last_diagnostics
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_headless(&self) -> bool {
        self.config.headless
    }

    /// Whether the window asked to close.
    pub fn should_close(&self) -> bool {
        self.input.close_requested()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
