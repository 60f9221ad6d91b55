//! The deposit pass: fills one chunk column with every deposit that reaches it.
//!
//! Deposits centred in neighbouring chunks can extend into this one, so the
//! pass replays the tries of every source chunk within reach. Each source
//! chunk reseeds the random source from its own coordinates, which makes the
//! outcome independent of the order chunks are generated in.

use std::sync::Arc;

use glam::{IVec2, IVec3};
use hashbrown::HashMap;
use strata_voxel::{BlockPlacer, ChunkColumn, MapRegion};

use crate::child::ChildDepositPlacements;
use crate::generator::{DepositRequest, WorldDimensions};
use crate::loader::{DepositCatalog, DepositEntry};
use crate::random::{LcgRandom, RandomSource};

/// Counters for one [`DepositPass::generate_chunk`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PassStats {
    /// Source chunks replayed, the target chunk included.
    pub source_chunks: u32,
    /// Primary deposits generated.
    pub deposits: u32,
    /// Tries dropped because the climate at the deposit centre did not match.
    pub climate_skips: u32,
    /// Child deposits generated after the primary pass.
    pub children: u32,
}

/// Map regions keyed by region x/z, covering the source chunks of a pass.
///
/// Source chunks are gated by the ore maps and climate of the region that
/// owns them. A region missing from the map falls back to the target
/// column's own region.
#[derive(Clone, Debug, Default)]
pub struct NeighbourRegions {
    regions: HashMap<IVec2, Arc<MapRegion>>,
}

impl NeighbourRegions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, region_x: i32, region_z: i32, region: Arc<MapRegion>) {
        self.regions.insert(IVec2::new(region_x, region_z), region);
    }

    pub fn get(&self, region_x: i32, region_z: i32) -> Option<&Arc<MapRegion>> {
        self.regions.get(&IVec2::new(region_x, region_z))
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

/// Runs a loaded catalog over chunk columns.
pub struct DepositPass {
    catalog: Arc<DepositCatalog>,
    dims: WorldDimensions,
    chunk_range: i32,
}

impl DepositPass {
    pub fn new(catalog: Arc<DepositCatalog>, dims: WorldDimensions) -> Self {
        let chunk_size = dims.chunk_size.max(1) as f32;
        let chunk_range = (catalog.max_reach() / chunk_size).ceil() as i32;
        tracing::debug!(deposits = catalog.len(), chunk_range, "deposit pass ready");
        Self {
            catalog,
            dims,
            chunk_range,
        }
    }

    pub fn catalog(&self) -> &DepositCatalog {
        &self.catalog
    }

    pub fn dims(&self) -> WorldDimensions {
        self.dims
    }

    /// Neighbour chunks replayed in each direction.
    pub fn chunk_range(&self) -> i32 {
        self.chunk_range
    }

    /// Region coordinates of every source chunk replayed for chunk
    /// `(chunk_x, chunk_z)`, row by row.
    pub fn required_regions(&self, chunk_x: i32, chunk_z: i32) -> Vec<IVec2> {
        let region_chunks = self.dims.region_chunk_size();
        let range = self.chunk_range;
        let span = |centre: i32| (centre - range).div_euclid(region_chunks)..=(centre + range).div_euclid(region_chunks);

        let mut keys = Vec::new();
        for region_z in span(chunk_z) {
            for region_x in span(chunk_x) {
                keys.push(IVec2::new(region_x, region_z));
            }
        }
        keys
    }

    /// Generates every deposit reaching chunk `(chunk_x, chunk_z)` into
    /// `column`, then the child deposits they spawned.
    ///
    /// `regions` should hold every region named by
    /// [`required_regions`](Self::required_regions).
    pub fn generate_chunk(
        &self,
        column: &mut ChunkColumn,
        placer: &mut dyn BlockPlacer,
        chunk_x: i32,
        chunk_z: i32,
        regions: &NeighbourRegions,
        rand: &mut LcgRandom,
    ) -> PassStats {
        let mut stats = PassStats::default();
        let mut children = ChildDepositPlacements::new();
        let mut req = DepositRequest {
            column,
            placer,
            origin_chunk_x: chunk_x,
            origin_chunk_z: chunk_z,
            pos: IVec3::ZERO,
        };

        let range = self.chunk_range;
        for source_z in chunk_z - range..=chunk_z + range {
            for source_x in chunk_x - range..=chunk_x + range {
                rand.init_position_seed(source_x, source_z);
                stats.source_chunks += 1;
                let region = self.source_region(&*req.column, regions, source_x, source_z);
                for entry in self.catalog.entries() {
                    self.generate_source(&mut req, &region, entry, source_x, source_z, rand, &mut children, &mut stats);
                }
            }
        }

        for (pos, child) in children.drain_sorted() {
            rand.init_position_seed(pos.x, pos.z);
            req.pos = pos;
            let mut nested = ChildDepositPlacements::new();
            child.generator.generate_deposit(&mut req, rand, &mut nested);
            stats.children += 1;
            if !nested.is_empty() {
                tracing::trace!(code = %child.variant.code, dropped = nested.len(), "child deposit recorded its own children");
            }
        }

        tracing::trace!(chunk_x, chunk_z, ?stats, "deposit pass finished");
        stats
    }

    fn source_region(
        &self,
        column: &ChunkColumn,
        regions: &NeighbourRegions,
        source_x: i32,
        source_z: i32,
    ) -> Arc<MapRegion> {
        let region_chunks = self.dims.region_chunk_size();
        let (region_x, region_z) = (source_x.div_euclid(region_chunks), source_z.div_euclid(region_chunks));
        match regions.get(region_x, region_z) {
            Some(region) => Arc::clone(region),
            None => {
                if !regions.is_empty() {
                    tracing::trace!(region_x, region_z, "neighbour region missing, using the column's region");
                }
                Arc::clone(&column.map_chunk().region)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn generate_source(
        &self,
        req: &mut DepositRequest<'_>,
        region: &MapRegion,
        entry: &DepositEntry,
        source_x: i32,
        source_z: i32,
        rand: &mut LcgRandom,
        children: &mut ChildDepositPlacements,
        stats: &mut PassStats,
    ) {
        let cs = self.dims.chunk_size;
        let origin_x = source_x * cs;
        let origin_z = source_z * cs;
        let variant = &entry.variant;

        let mut quantity = variant.tries_per_chunk;
        if variant.with_ore_map {
            let (centre_x, centre_z) = (origin_x + cs / 2, origin_z + cs / 2);
            quantity *= region.ore_map_factor(&variant.code, centre_x, centre_z, self.dims.region_size);
        }

        while quantity > 0.0 {
            if quantity < 1.0 && rand.next_float() > quantity {
                break;
            }
            quantity -= 1.0;

            let pos = IVec3::new(origin_x + rand.next_int(cs), 0, origin_z + rand.next_int(cs));

            if let Some(climate) = &variant.climate {
                let here = region.climate_at(pos.x, pos.z, self.dims.region_size);
                if !climate.matches(here) {
                    stats.climate_skips += 1;
                    continue;
                }
            }

            req.pos = pos;
            entry.generator.generate_deposit(req, rand, children);
            stats.deposits += 1;
        }
    }
}
