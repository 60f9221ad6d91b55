//! The deposit generator contract and the world constants generators share.

use std::sync::Arc;

use glam::IVec3;
use strata_voxel::{BlockId, BlockPlacer, ChunkColumn};

use crate::child::ChildDepositPlacements;
use crate::error::DepositWarning;
use crate::random::LcgRandom;
use crate::variant::DepositVariant;

/// World layout constants captured by generator factories.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorldDimensions {
    /// Side length of a chunk in blocks.
    pub chunk_size: i32,
    /// World height in blocks.
    pub map_size_y: i32,
    /// Sea level Y.
    pub sea_level: i32,
    /// Side length of a map region in blocks.
    pub region_size: i32,
    /// Blocks per ore map cell.
    pub ore_map_scale: i32,
}

impl Default for WorldDimensions {
    fn default() -> Self {
        Self {
            chunk_size: 32,
            map_size_y: 256,
            sea_level: 110,
            region_size: 512,
            ore_map_scale: 16,
        }
    }
}

impl WorldDimensions {
    /// Chunks along one side of a map region.
    pub fn region_chunk_size(&self) -> i32 {
        (self.region_size / self.chunk_size.max(1)).max(1)
    }

    /// Inner cells along one side of an ore map layer.
    pub fn noise_size_ore(&self) -> i32 {
        (self.region_size / self.ore_map_scale.max(1)).max(1)
    }

    /// Blocks in one horizontal chunk slice.
    pub fn chunk_area(&self) -> i32 {
        self.chunk_size * self.chunk_size
    }
}

/// One placement call: where to put a deposit and the column to write into.
pub struct DepositRequest<'a> {
    /// Full-height column of the chunk being generated.
    pub column: &'a mut ChunkColumn,
    /// Placement callback for blocks with world-gen side effects.
    pub placer: &'a mut dyn BlockPlacer,
    /// Chunk x of `column`.
    pub origin_chunk_x: i32,
    /// Chunk z of `column`.
    pub origin_chunk_z: i32,
    /// Deposit centre in world coordinates. May lie in a neighbouring chunk.
    pub pos: IVec3,
}

impl DepositRequest<'_> {
    /// World x of the column's first block.
    pub fn base_x(&self) -> i32 {
        self.origin_chunk_x * self.column.chunk_size()
    }

    /// World z of the column's first block.
    pub fn base_z(&self) -> i32 {
        self.origin_chunk_z * self.column.chunk_size()
    }
}

/// A deposit type: configured once, then asked to place deposits into many
/// chunk columns.
///
/// Implementations keep no per-call state, so one instance may serve every
/// worker thread at once.
pub trait DepositGenerator: Send + Sync {
    /// The variant this generator was created for.
    fn variant(&self) -> &Arc<DepositVariant>;

    /// Resolves block templates against the registry. Called once, before the
    /// generator is shared. Returned warnings have already been logged.
    fn init(&mut self) -> Vec<DepositWarning>;

    /// Places one deposit centred at `req.pos` into `req.column`, recording
    /// any child deposits it spawns into `children`.
    fn generate_deposit(
        &self,
        req: &mut DepositRequest<'_>,
        rand: &mut LcgRandom,
        children: &mut ChildDepositPlacements,
    );

    /// Expected blocks placed per chunk, estimated without touching the seeded stream.
    fn abs_avg_quantity(&self) -> f32;

    /// Mother blocks this deposit can replace.
    fn bearing_blocks(&self) -> Vec<BlockId>;

    /// Horizontal reach from the deposit centre, in blocks.
    fn max_radius(&self) -> f32;
}
