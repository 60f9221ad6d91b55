//! Vertical placement strategies for disc deposits.
//!
//! Each [`PlacementMode`] contributes two hooks to the disc scan: one picks
//! the deposit's reference Y before scanning, the other decides the start Y
//! and thickness of every column inside the footprint.

use glam::IVec3;
use strata_voxel::ChunkColumn;

use crate::generator::WorldDimensions;
use crate::nat_float::NatFloat;
use crate::random::{LcgRandom, RandomSource};

/// How a disc deposit chooses its height.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlacementMode {
    /// `depth` is a fraction of the world height.
    Anywhere,
    /// `depth` is a fraction of the local terrain height.
    FollowSurface,
    /// `depth` is a fraction of sea level.
    FollowSeaLevel,
    /// `depth` is blocks below the local terrain surface.
    FollowSurfaceBelow,
}

impl PlacementMode {
    pub const ALL: [PlacementMode; 4] = [
        PlacementMode::Anywhere,
        PlacementMode::FollowSurface,
        PlacementMode::FollowSeaLevel,
        PlacementMode::FollowSurfaceBelow,
    ];

    /// Generator tag registered for this mode.
    pub fn tag(self) -> &'static str {
        match self {
            PlacementMode::Anywhere => "disc-anywhere",
            PlacementMode::FollowSurface => "disc-followsurface",
            PlacementMode::FollowSeaLevel => "disc-followsealevel",
            PlacementMode::FollowSurfaceBelow => "disc-followsurfacebelow",
        }
    }

    /// Depth used when a definition leaves it out.
    pub fn default_depth(self) -> NatFloat {
        match self {
            PlacementMode::FollowSurfaceBelow => NatFloat::uniform(5.0, 0.0),
            _ => NatFloat::uniform(0.5, 0.0),
        }
    }

    pub(crate) fn hooks(self) -> PlacementHooks {
        match self {
            PlacementMode::Anywhere => PlacementHooks {
                before_gen: anywhere_before_gen,
                load_y_and_thickness: anywhere_load,
            },
            PlacementMode::FollowSurface => PlacementHooks {
                before_gen: follow_surface_before_gen,
                load_y_and_thickness: follow_surface_load,
            },
            PlacementMode::FollowSeaLevel => PlacementHooks {
                before_gen: follow_sea_level_before_gen,
                load_y_and_thickness: follow_sea_level_load,
            },
            PlacementMode::FollowSurfaceBelow => PlacementHooks {
                before_gen: follow_surface_below_before_gen,
                load_y_and_thickness: follow_surface_below_load,
            },
        }
    }
}

/// Per-call scan state, owned by the stack frame of one placement call.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct DiscScan {
    /// Deposit centre; `y` holds the reference Y once `before_gen` ran.
    pub pos: IVec3,
    pub depth_f: f32,
    pub depth_i: i32,
    /// Distortion layer cells per chunk.
    pub step: f32,
    pub deposit_thickness: i32,
}

/// Read-only inputs the hooks need.
pub(crate) struct HookEnv<'a> {
    pub column: &'a ChunkColumn,
    pub dims: &'a WorldDimensions,
    pub depth: &'a NatFloat,
}

/// One footprint column handed to `load_y_and_thickness`.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ColumnSample {
    pub lx: i32,
    pub lz: i32,
    pub world_x: i32,
    pub world_z: i32,
    pub distance_to_edge: f64,
}

/// Start Y and block count of one column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ColumnPlan {
    pub y: i32,
    pub thickness: i32,
}

pub(crate) type BeforeGenFn = fn(&HookEnv<'_>, &mut DiscScan, &mut LcgRandom);
pub(crate) type LoadYFn = fn(&HookEnv<'_>, &DiscScan, ColumnSample, &mut LcgRandom) -> ColumnPlan;

/// Hook table built once per generator.
#[derive(Clone, Copy)]
pub(crate) struct PlacementHooks {
    pub before_gen: BeforeGenFn,
    pub load_y_and_thickness: LoadYFn,
}

/// Vertical offset from the region distortion layers at one column.
///
/// Blends the bottom layer into the top layer by the reference Y's share of
/// the world height. A layer value of 20 means no offset.
pub(crate) fn deposit_y_distort(env: &HookEnv<'_>, scan: &DiscScan, sample: &ColumnSample) -> f32 {
    let cs = env.dims.chunk_size;
    let region_chunks = env.dims.region_chunk_size();
    let rdx = sample.world_x.div_euclid(cs).rem_euclid(region_chunks);
    let rdz = sample.world_z.div_euclid(cs).rem_euclid(region_chunks);

    let step = scan.step;
    let x = rdx as f32 * step + step * (sample.lx as f32 / cs as f32);
    let z = rdz as f32 * step + step * (sample.lz as f32 / cs as f32);

    let region = env.column.region();
    let top = (region.ore_map_vertical_distort_top.get_int_lerped(x, z) - 20) as f32;
    let bottom = (region.ore_map_vertical_distort_bottom.get_int_lerped(x, z) - 20) as f32;

    let y_rel = scan.pos.y as f32 / env.dims.map_size_y as f32;
    bottom * (1.0 - y_rel) + top * y_rel
}

fn sample_depth(env: &HookEnv<'_>, scan: &mut DiscScan, rand: &mut LcgRandom) {
    scan.depth_f = env.depth.next_float(1.0, rand);
    scan.depth_i = scan.depth_f as i32;
    scan.step = env.column.region().ore_map_vertical_distort_top.inner_size() as f32
        / env.dims.region_chunk_size() as f32;
}

fn terrain_at_centre(env: &HookEnv<'_>, scan: &DiscScan) -> i32 {
    let cs = env.dims.chunk_size;
    env.column
        .terrain_height(scan.pos.x.rem_euclid(cs), scan.pos.z.rem_euclid(cs))
}

// --- anywhere ---

fn anywhere_before_gen(env: &HookEnv<'_>, scan: &mut DiscScan, rand: &mut LcgRandom) {
    sample_depth(env, scan, rand);
    scan.pos.y = scan.depth_i;
}

fn anywhere_load(env: &HookEnv<'_>, scan: &DiscScan, sample: ColumnSample, rand: &mut LcgRandom) -> ColumnPlan {
    // Thins out towards the rim.
    let current = scan.deposit_thickness as f64 * (sample.distance_to_edge * 2.0 - 0.2).clamp(0.0, 1.0);
    let whole = current as i32;
    let thickness = whole + i32::from(rand.next_double() < current - whole as f64);

    ColumnPlan {
        y: scan.depth_i + deposit_y_distort(env, scan, &sample) as i32,
        thickness,
    }
}

// --- follow surface ---

fn follow_surface_before_gen(env: &HookEnv<'_>, scan: &mut DiscScan, rand: &mut LcgRandom) {
    sample_depth(env, scan, rand);
    scan.pos.y = (terrain_at_centre(env, scan) as f32 * scan.depth_f) as i32;
}

fn follow_surface_load(env: &HookEnv<'_>, scan: &DiscScan, sample: ColumnSample, _rand: &mut LcgRandom) -> ColumnPlan {
    let terrain = env.column.terrain_height(sample.lx, sample.lz);
    ColumnPlan {
        y: (terrain as f32 * scan.depth_f) as i32 + deposit_y_distort(env, scan, &sample) as i32,
        thickness: scan.deposit_thickness,
    }
}

// --- follow sea level ---

fn follow_sea_level_before_gen(env: &HookEnv<'_>, scan: &mut DiscScan, rand: &mut LcgRandom) {
    sample_depth(env, scan, rand);
    scan.pos.y = (env.dims.sea_level as f32 * scan.depth_f) as i32;
}

fn follow_sea_level_load(env: &HookEnv<'_>, scan: &DiscScan, sample: ColumnSample, _rand: &mut LcgRandom) -> ColumnPlan {
    ColumnPlan {
        y: (env.dims.sea_level as f32 * scan.depth_f) as i32 + deposit_y_distort(env, scan, &sample) as i32,
        thickness: scan.deposit_thickness,
    }
}

// --- follow surface below ---

fn follow_surface_below_before_gen(env: &HookEnv<'_>, scan: &mut DiscScan, rand: &mut LcgRandom) {
    sample_depth(env, scan, rand);
    scan.pos.y = terrain_at_centre(env, scan) - scan.depth_i;
}

fn follow_surface_below_load(
    env: &HookEnv<'_>,
    scan: &DiscScan,
    sample: ColumnSample,
    _rand: &mut LcgRandom,
) -> ColumnPlan {
    let terrain = env.column.terrain_height(sample.lx, sample.lz);
    ColumnPlan {
        y: terrain - scan.depth_i + deposit_y_distort(env, scan, &sample) as i32,
        thickness: scan.deposit_thickness,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use strata_voxel::{IntDataMap2D, MapRegion};

    use super::*;

    fn dims() -> WorldDimensions {
        WorldDimensions {
            chunk_size: 16,
            map_size_y: 256,
            sea_level: 100,
            region_size: 256,
            ore_map_scale: 16,
        }
    }

    fn column(region: MapRegion) -> ChunkColumn {
        let mut column = ChunkColumn::new(16, 256, Arc::new(region));
        for lx in 0..16 {
            for lz in 0..16 {
                column.set_heights(lx, lz, 80 + lx as u16, 80 + lx as u16);
            }
        }
        column
    }

    fn sample(lx: i32, lz: i32, distance_to_edge: f64) -> ColumnSample {
        ColumnSample {
            lx,
            lz,
            world_x: lx,
            world_z: lz,
            distance_to_edge,
        }
    }

    fn run(mode: PlacementMode, depth: NatFloat, column: &ChunkColumn, col: ColumnSample) -> (DiscScan, ColumnPlan) {
        let dims = dims();
        let env = HookEnv {
            column,
            dims: &dims,
            depth: &depth,
        };
        let hooks = mode.hooks();
        let mut rand = LcgRandom::new(1);
        let mut scan = DiscScan {
            pos: IVec3::new(4, 0, 4),
            deposit_thickness: 3,
            ..Default::default()
        };
        (hooks.before_gen)(&env, &mut scan, &mut rand);
        let plan = (hooks.load_y_and_thickness)(&env, &scan, col, &mut rand);
        (scan, plan)
    }

    #[test]
    fn test_tags_are_unique() {
        let tags: std::collections::HashSet<_> = PlacementMode::ALL.iter().map(|m| m.tag()).collect();
        assert_eq!(tags.len(), 4);
    }

    #[test]
    fn test_anywhere_uses_absolute_depth() {
        let column = column(MapRegion::flat(16));
        let (scan, plan) = run(
            PlacementMode::Anywhere,
            NatFloat::uniform(40.0, 0.0),
            &column,
            sample(2, 2, 1.0),
        );
        assert_eq!(scan.pos.y, 40);
        assert_eq!(plan, ColumnPlan { y: 40, thickness: 3 });
    }

    #[test]
    fn test_anywhere_thins_at_the_rim() {
        let column = column(MapRegion::flat(16));
        let (_, plan) = run(
            PlacementMode::Anywhere,
            NatFloat::uniform(40.0, 0.0),
            &column,
            sample(2, 2, 0.05),
        );
        assert_eq!(plan.thickness, 0);
    }

    #[test]
    fn test_follow_surface_scales_terrain_height() {
        let column = column(MapRegion::flat(16));
        let (scan, plan) = run(
            PlacementMode::FollowSurface,
            NatFloat::uniform(0.5, 0.0),
            &column,
            sample(10, 3, 1.0),
        );
        assert_eq!(scan.pos.y, 42);
        assert_eq!(plan, ColumnPlan { y: 45, thickness: 3 });
    }

    #[test]
    fn test_follow_sea_level() {
        let column = column(MapRegion::flat(16));
        let (scan, plan) = run(
            PlacementMode::FollowSeaLevel,
            NatFloat::uniform(0.25, 0.0),
            &column,
            sample(10, 3, 1.0),
        );
        assert_eq!(scan.pos.y, 25);
        assert_eq!(plan.y, 25);
    }

    #[test]
    fn test_follow_surface_below_subtracts_depth() {
        let column = column(MapRegion::flat(16));
        let (scan, plan) = run(
            PlacementMode::FollowSurfaceBelow,
            NatFloat::uniform(6.0, 0.0),
            &column,
            sample(10, 3, 1.0),
        );
        assert_eq!(scan.pos.y, 84 - 6);
        assert_eq!(plan, ColumnPlan { y: 90 - 6, thickness: 3 });
    }

    #[test]
    fn test_distortion_blends_layers_by_height() {
        let mut region = MapRegion::flat(16);
        region.ore_map_vertical_distort_top = IntDataMap2D::filled(18, 1, 30);
        let column = column(region);
        let dims = dims();
        let depth = NatFloat::default();
        let env = HookEnv {
            column: &column,
            dims: &dims,
            depth: &depth,
        };
        let scan = DiscScan {
            pos: IVec3::new(0, 128, 0),
            step: 1.0,
            ..Default::default()
        };
        // Top layer says +10, bottom says 0, halfway up the world.
        let offset = deposit_y_distort(&env, &scan, &sample(3, 3, 1.0));
        assert!((offset - 5.0).abs() < 1e-4, "{offset}");
    }
}
