//! terrasdf headless driver
//!
//! Warms up the world around the spawn point, then runs a fixed number of
//! simulation ticks with scripted input, streaming chunks as the observer
//! walks.
//!
//! Usage: cargo run --release -- [OPTIONS]
//!
//! Options:
//!   --config <PATH>   Scene config JSON (default: built-in defaults)
//!   --ticks <N>       Ticks to simulate (default: 600)
//!   --seed <SEED>     Override the world seed
//!   --save <PATH>     Write the effective config to PATH and exit

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use terrasdf::core::{logging, Action, InputState, Result};
use terrasdf::mesh::{MarchingCubes, MeshCache};
use terrasdf::physics::CharacterController;
use terrasdf::scene::SceneConfig;
use terrasdf::streaming::ChunkStreamer;
use terrasdf::terrain::DensityField;

/// Ticks between progress log lines
const REPORT_INTERVAL: u32 = 60;

/// Ticks between scripted jumps
const JUMP_INTERVAL: u32 = 90;

fn main() -> Result<()> {
    logging::init();

    let args: Vec<String> = std::env::args().collect();
    let mut config = match parse_arg::<PathBuf>(&args, "--config") {
        Some(path) => SceneConfig::load(&path)?,
        None => SceneConfig::default(),
    };
    if let Some(seed) = parse_arg::<u32>(&args, "--seed") {
        config.density.seed = seed;
    }
    config.validate()?;

    if let Some(path) = parse_arg::<PathBuf>(&args, "--save") {
        config.save(&path)?;
        log::info!("Wrote config to {}", path.display());
        return Ok(());
    }

    let ticks = parse_arg::<u32>(&args, "--ticks").unwrap_or(600);
    run(&config, ticks);
    Ok(())
}

fn run(config: &SceneConfig, ticks: u32) {
    let field = Arc::new(DensityField::new(config.density.clone()));
    let mut streamer = ChunkStreamer::new(field, config.radii, MarchingCubes::new(config.iso_level));
    let mut meshes = MeshCache::new();
    let mut controller = CharacterController::new(config.spawn_position, config.controller.clone());
    let dt = config.tick_dt();

    log::info!(
        "Seed {}, spawn {:?}, radii {:?}",
        config.density.seed,
        config.spawn_position,
        config.radii
    );

    let start = Instant::now();
    streamer.warm_up(controller.state().position, &mut meshes);
    log::info!(
        "Warm-up took {:.2?}: {} meshes, {} triangles",
        start.elapsed(),
        meshes.len(),
        meshes.triangle_count()
    );

    let mut input = InputState::new();
    input.set_pressed(Action::MoveForward, true);

    let start = Instant::now();
    for tick in 0..ticks {
        input.set_pressed(Action::Jump, tick % JUMP_INTERVAL == 0);
        // Slow sweep so the walk curves through new chunks
        input.process_mouse_motion((2.0, 0.0));

        controller.tick(&input, streamer.store(), dt);
        input.end_tick();
        let stats = streamer.tick(controller.state().position, &mut meshes);

        if tick % REPORT_INTERVAL == 0 {
            let s = controller.state();
            log::info!(
                "tick {:4}: pos=({:.1}, {:.1}, {:.1}) grounded={} slope={:.1} chunks={} in_flight={}",
                tick,
                s.position.x,
                s.position.y,
                s.position.z,
                s.grounded,
                s.slope_angle(),
                stats.total,
                stats.in_flight
            );
        }
    }

    streamer.flush(&mut meshes);
    log::info!(
        "Simulated {} ticks in {:.2?}: {} chunks, {} meshes, {} triangles, {} uploads, {} releases",
        ticks,
        start.elapsed(),
        streamer.store().len(),
        meshes.len(),
        meshes.triangle_count(),
        meshes.upload_count(),
        meshes.release_count()
    );
}

fn parse_arg<T: FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}
