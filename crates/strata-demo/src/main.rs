//! Generates deposits into a patch of synthetic terrain and reports what was
//! placed.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use glam::IVec2;
use noise::{NoiseFn, Simplex};
use rustc_hash::FxHashMap;
use strata_config::{CliArgs, Config, default_config_dir};
use strata_deposits::{
    AsyncDepositPass, DepositCatalog, DepositGeneratorRegistry, DepositPass, DepositTask, NeighbourRegions,
    RegionNoiseGenerator, WorldDimensions,
};
use strata_voxel::{BlockDef, BlockId, BlockRegistry, ChunkColumn, MapRegion};
use tracing::{error, info, warn};

const ROCKS: [&str; 3] = ["basalt", "granite", "andesite"];
const GRADES: [&str; 3] = ["poor", "medium", "rich"];

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let config_dir = match args.config.clone().map_or_else(default_config_dir, Ok) {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("{e}, using the working directory");
            PathBuf::from(".")
        }
    };

    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    strata_log::init_logging(Some(&config_dir.join("logs")), cfg!(debug_assertions), Some(&config));

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let world = &config.world;
    let dims = WorldDimensions {
        chunk_size: world.chunk_size,
        map_size_y: world.map_size_y,
        sea_level: world.sea_level,
        region_size: world.region_size,
        ore_map_scale: world.ore_map_scale,
    };
    info!(seed = world.seed, ?dims, "starting deposit demo");

    let blocks = Arc::new(demo_blocks()?);
    let terrain = Terrain::new(world.seed, dims, &blocks)?;

    if !config.deposits.enabled {
        info!("deposit generation disabled, nothing to do");
        return Ok(());
    }

    let registry = DepositGeneratorRegistry::with_defaults(dims, Arc::clone(&blocks));
    let catalog = DepositCatalog::load_dir(&resolve_dir(&config.deposits.dir), &registry)?;
    for failure in catalog.failures() {
        warn!("skipped: {failure}");
    }

    let noise = RegionNoiseGenerator::new(world.seed, dims);
    let ore_codes = catalog.ore_map_codes();
    let pass = Arc::new(DepositPass::new(Arc::new(catalog), dims));
    info!(chunk_range = pass.chunk_range(), "neighbour chunks replayed per chunk");

    let pool = if world.workers == 0 {
        AsyncDepositPass::with_defaults(Arc::clone(&pass), world.seed)?
    } else {
        AsyncDepositPass::new(Arc::clone(&pass), world.seed, world.workers, 256)?
    };

    let radius = world.chunk_radius as i32;
    let mut regions: FxHashMap<IVec2, Arc<MapRegion>> = FxHashMap::default();
    let mut submitted = 0;
    let start = Instant::now();

    for chunk_z in -radius..=radius {
        for chunk_x in -radius..=radius {
            let mut neighbours = NeighbourRegions::new();
            for key in pass.required_regions(chunk_x, chunk_z) {
                let region = regions
                    .entry(key)
                    .or_insert_with(|| Arc::new(noise.generate(key.x, key.y, &ore_codes)));
                neighbours.insert(key.x, key.y, Arc::clone(region));
            }

            let region_key = IVec2::new(
                chunk_x.div_euclid(dims.region_chunk_size()),
                chunk_z.div_euclid(dims.region_chunk_size()),
            );
            let Some(region) = neighbours.get(region_key.x, region_key.y).cloned() else {
                return Err(format!("no region generated for chunk ({chunk_x}, {chunk_z})").into());
            };

            let column = terrain.column(chunk_x, chunk_z, region);
            let mut task = DepositTask::new(chunk_x, chunk_z, column).with_regions(neighbours);
            // A full queue hands the task back; wait for a free slot.
            loop {
                match pool.submit(task) {
                    Ok(()) => break,
                    Err(rejected) => {
                        task = rejected;
                        std::thread::sleep(Duration::from_millis(1));
                    }
                }
            }
            submitted += 1;
        }
    }

    let mut totals: FxHashMap<BlockId, usize> = FxHashMap::default();
    let mut received = 0;
    let deadline = Instant::now() + Duration::from_secs(120);
    while received < submitted && Instant::now() < deadline {
        for done in pool.drain_results() {
            received += 1;
            info!(
                chunk = ?done.chunk,
                deposits = done.stats.deposits,
                children = done.stats.children,
                climate_skips = done.stats.climate_skips,
                us = done.generation_time_us,
                "chunk done"
            );
            for id in terrain.deposit_blocks.iter().copied() {
                *totals.entry(id).or_default() += done.column.count(id);
            }
        }
        std::thread::sleep(Duration::from_millis(5));
    }

    if received < submitted {
        warn!(received, submitted, "timed out waiting for chunks");
    }
    info!(chunks = received, elapsed = ?start.elapsed(), "deposit pass finished");

    let mut report: Vec<_> = totals.into_iter().filter(|&(_, count)| count > 0).collect();
    report.sort_by(|a, b| b.1.cmp(&a.1));
    for (id, count) in report {
        info!("{:>28} {count:>8}", blocks.get(id).code);
    }
    Ok(())
}

/// Relative deposit directories are tried against the working directory
/// first, then against this crate.
fn resolve_dir(dir: &Path) -> PathBuf {
    if dir.is_relative() && !dir.exists() {
        let bundled = Path::new(env!("CARGO_MANIFEST_DIR")).join(dir);
        if bundled.exists() {
            return bundled;
        }
    }
    dir.to_path_buf()
}

fn demo_blocks() -> Result<BlockRegistry, strata_voxel::RegistryError> {
    let mut blocks = BlockRegistry::new();
    blocks.register(BlockDef::solid("soil"))?;
    blocks.register(BlockDef::solid("clay"))?;
    blocks.register(BlockDef::solid("ore-tin-granite"))?;
    for rock in ROCKS {
        blocks.register(BlockDef::solid(format!("rock-{rock}")))?;
        blocks.register(BlockDef::solid(format!("quartz-{rock}")))?;
        blocks.register(BlockDef::solid(format!("ore-gold-{rock}")))?;
        blocks.register(BlockDef::non_solid(format!("looseores-copper-{rock}")))?;
        for grade in GRADES {
            blocks.register(BlockDef::solid(format!("ore-{grade}-copper-{rock}")))?;
        }
    }
    Ok(blocks)
}

/// Layered rock under a simplex heightmap.
struct Terrain {
    dims: WorldDimensions,
    height: Simplex,
    soil: BlockId,
    layers: [BlockId; 3],
    deposit_blocks: Vec<BlockId>,
}

impl Terrain {
    fn new(seed: i64, dims: WorldDimensions, blocks: &BlockRegistry) -> Result<Self, String> {
        let id = |code: &str| blocks.lookup_by_code(code).ok_or_else(|| format!("missing block {code}"));
        let layers = [id("rock-basalt")?, id("rock-granite")?, id("rock-andesite")?];
        let soil = id("soil")?;
        let deposit_blocks = blocks
            .search("*")
            .into_iter()
            .filter(|&block| block != BlockId::AIR && block != soil && !layers.contains(&block))
            .collect();

        Ok(Self {
            dims,
            height: Simplex::new((seed as u32).wrapping_add(0x0301)),
            soil,
            layers,
            deposit_blocks,
        })
    }

    fn column(&self, chunk_x: i32, chunk_z: i32, region: Arc<MapRegion>) -> ChunkColumn {
        let cs = self.dims.chunk_size;
        let top = self.dims.map_size_y - 2;
        let mut column = ChunkColumn::new(cs, self.dims.map_size_y, region);

        for lz in 0..cs {
            for lx in 0..cs {
                let wx = f64::from(chunk_x * cs + lx);
                let wz = f64::from(chunk_z * cs + lz);
                let noise = self.height.get([wx / 96.0, wz / 96.0]);
                let surface = (self.dims.sea_level + (noise * 24.0) as i32).clamp(4, top);

                let basalt_top = surface * 3 / 10;
                let granite_top = surface * 6 / 10;
                column.fill_column(lx, lz, 0, basalt_top, self.layers[0]);
                column.fill_column(lx, lz, basalt_top, granite_top, self.layers[1]);
                column.fill_column(lx, lz, granite_top, surface - 3, self.layers[2]);
                column.fill_column(lx, lz, surface - 3, surface + 1, self.soil);
                column.set_heights(lx, lz, surface as u16, surface as u16);
            }
        }
        column
    }
}
