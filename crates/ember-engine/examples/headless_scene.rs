//! Headless demo -- a player walks forward for two seconds while the frame
//! loop records draw calls.
//!
//! Run with:
//!   cargo run --example headless_scene -p ember-engine [config.json]
//!
//! Set `RUST_LOG=ember_engine=debug` to see per-frame spans.

use ember_engine::prelude::*;

fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    init_tracing(&config.log_filter);

    let mut frames = FrameLoop::new(config)?;
    frames.add_system("locomotion_input", locomotion_input)?;
    frames.add_system_after("locomotion_integrate", &["locomotion_input"], locomotion_integrate)?;

    let cube = AssetId::try_new(AssetKind::Mesh, 1)?.with_registered(true);
    let stone = AssetId::try_new(AssetKind::Material, 1)?.with_registered(true);

    let player = frames.spawn_named("player")?;
    frames.ecs_mut().try_emplace_component(player, Transform::IDENTITY)?;
    frames
        .ecs_mut()
        .try_emplace_component(player, Locomotion { input_dir: [0.0; 3], speed: 3.0 })?;
    frames
        .ecs_mut()
        .try_emplace_component(player, MeshRenderer { mesh: cube, material: stone })?;

    for i in 0..8 {
        let prop = frames.spawn_named(&format!("crate_{i}"))?;
        let x = i as f32 * 2.0 - 7.0;
        frames
            .ecs_mut()
            .try_emplace_component(prop, Transform::from_translation([x, 0.0, 5.0]))?;
        frames
            .ecs_mut()
            .try_emplace_component(prop, MeshRenderer { mesh: cube, material: stone })?;
    }

    let mut renderer = HeadlessRenderer::new();
    let frame_budget = (2.0 / frames.fixed_dt()).round() as u64;
    for n in 0..frame_budget {
        let events: &[InputEvent] = if n == 0 {
            &[InputEvent::KeyPressed(Key::W)]
        } else {
            &[]
        };
        frames.frame(events, Some(&mut renderer))?;
        renderer.take_calls();
        if frames.should_close() {
            break;
        }
    }

    let diag = frames.last_diagnostics();
    println!(
        "{} frames, {:.2}s simulated, {} presented",
        frames.frame_count(),
        frames.sim_time(),
        renderer.frames_presented()
    );
    println!(
        "last frame: {} draws, {:?} total",
        diag.draw_count, diag.total_time
    );
    if let Some(t) = frames.ecs().get_component::<Transform>(player) {
        println!(
            "{} ended at {:?}",
            frames.name_of(player).unwrap_or("?"),
            t.translation
        );
    }
    Ok(())
}
