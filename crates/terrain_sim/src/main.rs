//! Headless terrain driver.
//!
//! Flies a trigger along a circle over heightfield terrain, digs a crater
//! under it every few ticks and logs what each update did.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use glam::{DVec3, IVec3};
use log::info;
use voxel_terrain::{SceneSnapshot, TerrainConfig, TerrainManager, VoxelEdit, DENSITY_VOID};

/// Headless driver for the streaming voxel terrain.
#[derive(Parser, Debug)]
#[command(name = "terrain_sim")]
#[command(about = "Streams voxel terrain around a moving trigger")]
struct Args {
	/// Path to a terrain configuration TOML file.
	#[arg(short, long)]
	config: Option<PathBuf>,

	/// Number of updates to run.
	#[arg(short, long, default_value_t = 200)]
	ticks: u32,

	/// Trigger speed in world units per tick.
	#[arg(short, long, default_value_t = 2.0)]
	speed: f64,

	/// Radius of the trigger's circular path.
	#[arg(long, default_value_t = 256.0)]
	radius: f64,

	/// Worker threads (0 = all cores). Overrides the config file.
	#[arg(long)]
	threads: Option<usize>,

	/// Heightfield seed. Overrides the config file.
	#[arg(long)]
	seed: Option<u32>,

	/// Dig a crater under the trigger every N ticks (0 = never).
	#[arg(long, default_value_t = 25)]
	dig_every: u32,

	/// Sleep between ticks, in milliseconds.
	#[arg(long, default_value_t = 16)]
	tick_ms: u64,
}

fn main() -> Result<()> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
	let args = Args::parse();

	let mut config = match &args.config {
		Some(path) => TerrainConfig::load(path)
			.with_context(|| format!("Loading terrain config {}", path.display()))?,
		None => TerrainConfig::default(),
	};
	if let Some(threads) = args.threads {
		config.worker_threads = threads;
	}
	if let Some(seed) = args.seed {
		config.heightfield.seed = seed;
	}

	let mut terrain = TerrainManager::with_defaults(&config).context("Creating terrain")?;
	let mut scene = SceneSnapshot::new();
	info!(
		"block size {} x {} lods, finest radius {}",
		config.block_size, config.lod_count, config.finest_radius
	);

	let altitude = config.heightfield.base_height + config.heightfield.amplitude;
	for tick in 0..args.ticks {
		let angle = tick as f64 * args.speed / args.radius;
		let trigger = DVec3::new(
			args.radius * angle.cos(),
			altitude,
			args.radius * angle.sin(),
		);

		if args.dig_every > 0 && tick > 0 && tick % args.dig_every == 0 {
			let ground = trigger.as_ivec3() * IVec3::new(1, 0, 1)
				+ IVec3::Y * config.heightfield.base_height as i32;
			let touched = terrain.edit(VoxelEdit::sphere(ground, 8, DENSITY_VOID));
			info!("tick {tick}: dug crater at {ground} ({touched} blocks)");
		}

		let stats = terrain.update(&[trigger], &mut scene);
		info!(
			"tick {tick}: {} blocks (+{} -{}), jobs {}/{} voxel/mesh, {} committed, {} stale, {} in flight, {} shown, {} triangles{}",
			stats.block_count,
			stats.blocks_created,
			stats.blocks_evicted,
			stats.voxel_jobs,
			stats.mesh_jobs,
			stats.committed,
			stats.stale,
			stats.in_flight,
			scene.shown.len(),
			scene.triangle_count(),
			if stats.budget_exhausted { " (budget exhausted)" } else { "" }
		);

		std::thread::sleep(Duration::from_millis(args.tick_ms));
	}

	let metrics = terrain.pipeline_metrics();
	info!(
		"done: {} jobs submitted, {} committed, {} stale, {} failed",
		metrics.jobs_submitted(),
		metrics.committed,
		metrics.stale,
		metrics.failed
	);
	info!(
		"synthesis avg {:.0}us, meshing avg {:.0}us",
		metrics.synthesis_timings_us.average(),
		metrics.mesh_timings_us.average()
	);
	Ok(())
}
