//! A headless walk through the world.
//!
//! This harness stands in for the game host: it creates a world, finds a spawn point, and
//! walks an observer through the landscape while the layers stream around it, reporting what
//! got loaded along the way.
//!
//! ```text
//! hills_n_huts [seed] [settings.ron]
//! ```
//!
//! With no seed, one is drawn from the operating system.

use anyhow::Context;
use glam::Vec2;
use hnh_world::World;
use hnh_worldgen::WorldConfig;

/// The number of simulated steps the walk takes.
const WALK_STEPS: u32 = 4000;

/// The distance covered per simulated step.
const STEP_LENGTH: f32 = 1.5;

/// How often the walk reports world statistics, in steps.
const REPORT_INTERVAL: u32 = 500;

fn main() -> anyhow::Result<()> {
    hnh_log::set_max_verbosity(hnh_log::Verbosity::Info);

    let mut args = std::env::args().skip(1);
    let seed = match args.next() {
        Some(raw) => raw.parse().context("the seed must be an integer")?,
        None => hnh_rng::entropy(),
    };
    let mut config = match args.next() {
        Some(path) => {
            let source = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read world settings from `{path}`"))?;
            WorldConfig::from_ron(&source)?
        }
        None => WorldConfig::default(),
    };
    config.seed = seed;

    let mut world = World::new(config)?;

    let spawn = world.find_valid_spawn_point(60.0, 400.0);
    hnh_log::info!(
        "spawning at ({:.1}, {:.1}, {:.1}) in the {}",
        spawn.x,
        spawn.y,
        spawn.z,
        world.biome(spawn.x, spawn.z).name(),
    );

    let clock = quanta::Clock::new();
    let mut worst = std::time::Duration::ZERO;
    let mut total = std::time::Duration::ZERO;

    // Wander outward on a slowly turning heading, hugging the ground.
    let mut position = spawn;
    let mut heading = 0.35f32;
    for step in 0..WALK_STEPS {
        heading += 0.0004;
        let dir = Vec2::from_angle(heading) * STEP_LENGTH;
        position.x += dir.x;
        position.z += dir.y;
        position.y = world.height(position.x, position.z) + 1.7;

        // Trees push the walker out rather than letting it clip through.
        if let Some(push) = world.point_push_out(position, 0.4) {
            position.x += push.x;
            position.z += push.y;
        }

        let before = clock.now();
        world.update(position);
        let elapsed = clock.now().duration_since(before);
        worst = worst.max(elapsed);
        total += elapsed;

        if (step + 1) % REPORT_INTERVAL == 0 {
            let mut info = String::new();
            world.debug_info(&mut info);
            hnh_log::info!(
                "step {}: at ({:.0}, {:.0}) in the {}\n{info}",
                step + 1,
                position.x,
                position.z,
                world.biome(position.x, position.z).name(),
            );

            if let Some(station) =
                world.nearby_interaction_point(position.x, position.z, 200.0)
            {
                hnh_log::info!(
                    "a {} is nearby at ({:.0}, {:.0})",
                    station.kind.name(),
                    station.position.x,
                    station.position.z,
                );
            }
        }
    }

    hnh_log::info!(
        "walked {:.1} km; update cost: avg {:?}, worst {:?}",
        (WALK_STEPS as f32 * STEP_LENGTH) / 1000.0,
        total / WALK_STEPS,
        worst,
    );

    Ok(())
}
