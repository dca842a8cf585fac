//! Built-in systems.
//!
//! Each function here has the [`SystemFn`](crate::frame::SystemFn) signature
//! and is registered by name on a [`FrameLoop`](crate::frame::FrameLoop).

use ember_ecs::ecs::Ecs;
use ember_ecs::entity::Entity;

use crate::components::{Locomotion, Transform};
use crate::frame::FrameContext;

/// Copy this frame's WASD/arrow movement axis into every [`Locomotion`].
pub fn locomotion_input(ecs: &mut Ecs, ctx: &FrameContext<'_>) {
    let axis = ctx.input.movement_axis();
    for (_, locomotion) in ecs.view_mut::<Locomotion>() {
        locomotion.input_dir = axis;
    }
}

/// Move every entity with a [`Locomotion`] and a [`Transform`] by
/// `input_dir * speed * dt`.
pub fn locomotion_integrate(ecs: &mut Ecs, ctx: &FrameContext<'_>) {
    let velocities: Vec<(Entity, [f32; 3])> = ecs
        .view::<Locomotion>()
        .filter(|(_, l)| l.input_dir != [0.0; 3] && l.speed != 0.0)
        .map(|(e, l)| (e, l.input_dir.map(|d| d * l.speed * ctx.dt)))
        .collect();

    for (entity, delta) in velocities {
        if let Some(transform) = ecs.get_component_mut::<Transform>(entity) {
            for (t, d) in transform.translation.iter_mut().zip(delta) {
                *t += d;
            }
        }
    }
}
