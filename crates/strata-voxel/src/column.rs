//! Chunk column buffers: the full-height stack of flat block arrays for one
//! chunk x/z position, plus its height maps and map region.
//!
//! Blocks are indexed `((y % size) * size + lz) * size + lx` inside the chunk
//! `y / size`. Height maps are indexed `lz * size + lx`.

use std::sync::Arc;

use glam::IVec3;

use crate::map::MapRegion;
use crate::registry::BlockId;

/// Per-column surface data shared by every chunk of the column.
#[derive(Clone, Debug)]
pub struct MapChunk {
    /// Y of the topmost rain-blocking block per column.
    pub rain_height_map: Vec<u16>,
    /// Y of the generated terrain surface per column.
    pub terrain_height_map: Vec<u16>,
    /// Region data layers covering this column.
    pub region: Arc<MapRegion>,
}

/// A full-height column of chunks at one chunk x/z position.
#[derive(Clone, Debug)]
pub struct ChunkColumn {
    chunk_size: i32,
    chunks: Vec<Box<[BlockId]>>,
    map_chunk: MapChunk,
}

impl ChunkColumn {
    /// Creates an all-air column `map_size_y` blocks tall with zero height maps.
    ///
    /// `map_size_y` is rounded up to a whole number of chunks.
    pub fn new(chunk_size: i32, map_size_y: i32, region: Arc<MapRegion>) -> Self {
        let chunk_size = chunk_size.max(1);
        let chunk_count = ((map_size_y.max(1) + chunk_size - 1) / chunk_size) as usize;
        let volume = (chunk_size * chunk_size * chunk_size) as usize;
        let area = (chunk_size * chunk_size) as usize;
        Self {
            chunk_size,
            chunks: (0..chunk_count)
                .map(|_| vec![BlockId::AIR; volume].into_boxed_slice())
                .collect(),
            map_chunk: MapChunk {
                rain_height_map: vec![0; area],
                terrain_height_map: vec![0; area],
                region,
            },
        }
    }

    /// Side length of each chunk.
    pub fn chunk_size(&self) -> i32 {
        self.chunk_size
    }

    /// Total height in blocks.
    pub fn height(&self) -> i32 {
        self.chunks.len() as i32 * self.chunk_size
    }

    /// Map data for this column.
    pub fn map_chunk(&self) -> &MapChunk {
        &self.map_chunk
    }

    /// Region layers covering this column.
    pub fn region(&self) -> &MapRegion {
        &self.map_chunk.region
    }

    /// Returns `true` if `(lx, y, lz)` lies inside the column.
    pub fn contains(&self, lx: i32, y: i32, lz: i32) -> bool {
        (0..self.chunk_size).contains(&lx)
            && (0..self.chunk_size).contains(&lz)
            && (0..self.height()).contains(&y)
    }

    /// Flat index of `(lx, y, lz)` inside chunk `y / size`.
    #[inline]
    pub fn index3d(&self, lx: i32, y: i32, lz: i32) -> usize {
        let size = self.chunk_size;
        (((y % size) * size + lz) * size + lx) as usize
    }

    /// Returns the block at local `(lx, y, lz)`, or Air outside the column.
    pub fn get(&self, lx: i32, y: i32, lz: i32) -> BlockId {
        if !self.contains(lx, y, lz) {
            return BlockId::AIR;
        }
        let index = self.index3d(lx, y, lz);
        self.chunks[(y / self.chunk_size) as usize][index]
    }

    /// Writes the block at local `(lx, y, lz)`. Writes outside the column are
    /// ignored and reported as `false`.
    pub fn set(&mut self, lx: i32, y: i32, lz: i32, block: BlockId) -> bool {
        if !self.contains(lx, y, lz) {
            tracing::warn!("ChunkColumn::set out of bounds: ({lx}, {y}, {lz})");
            return false;
        }
        let index = self.index3d(lx, y, lz);
        self.chunks[(y / self.chunk_size) as usize][index] = block;
        true
    }

    /// Flat block array of the chunk at vertical index `chunk_y`.
    pub fn chunk(&self, chunk_y: usize) -> Option<&[BlockId]> {
        self.chunks.get(chunk_y).map(|c| &**c)
    }

    /// Number of chunks stacked in this column.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Rain height at local `(lx, lz)`.
    pub fn rain_height(&self, lx: i32, lz: i32) -> i32 {
        self.map_chunk
            .rain_height_map
            .get(self.index2d(lx, lz))
            .map_or(0, |&h| h as i32)
    }

    /// Terrain surface height at local `(lx, lz)`.
    pub fn terrain_height(&self, lx: i32, lz: i32) -> i32 {
        self.map_chunk
            .terrain_height_map
            .get(self.index2d(lx, lz))
            .map_or(0, |&h| h as i32)
    }

    /// Sets both height maps for local `(lx, lz)`.
    pub fn set_heights(&mut self, lx: i32, lz: i32, terrain: u16, rain: u16) {
        let index = self.index2d(lx, lz);
        if let Some(h) = self.map_chunk.terrain_height_map.get_mut(index) {
            *h = terrain;
        }
        if let Some(h) = self.map_chunk.rain_height_map.get_mut(index) {
            *h = rain;
        }
    }

    /// Fills `[from_y, to_y)` of one column with `block`.
    pub fn fill_column(&mut self, lx: i32, lz: i32, from_y: i32, to_y: i32, block: BlockId) {
        for y in from_y.max(0)..to_y.min(self.height()) {
            self.set(lx, y, lz, block);
        }
    }

    /// Counts blocks equal to `block` across the whole column.
    pub fn count(&self, block: BlockId) -> usize {
        self.chunks
            .iter()
            .map(|chunk| chunk.iter().filter(|&&b| b == block).count())
            .sum()
    }

    #[inline]
    fn index2d(&self, lx: i32, lz: i32) -> usize {
        if lx < 0 || lz < 0 || lx >= self.chunk_size || lz >= self.chunk_size {
            return usize::MAX;
        }
        (lz * self.chunk_size + lx) as usize
    }
}

/// Places blocks that need world-gen side effects (multi-block structures,
/// attached entities) instead of a plain array write.
pub trait BlockPlacer {
    /// Attempts to place `block` at local position `local` of `column`.
    ///
    /// `world` is the same position in global coordinates.
    fn try_place_for_worldgen(
        &mut self,
        column: &mut ChunkColumn,
        local: IVec3,
        world: IVec3,
        block: BlockId,
    ) -> bool;
}

/// A [`BlockPlacer`] that writes straight into the column.
#[derive(Clone, Copy, Debug, Default)]
pub struct DirectPlacer;

impl BlockPlacer for DirectPlacer {
    fn try_place_for_worldgen(
        &mut self,
        column: &mut ChunkColumn,
        local: IVec3,
        _world: IVec3,
        block: BlockId,
    ) -> bool {
        column.set(local.x, local.y, local.z, block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column() -> ChunkColumn {
        ChunkColumn::new(16, 64, Arc::new(MapRegion::flat(4)))
    }

    #[test]
    fn test_new_column_is_air() {
        let column = column();
        assert_eq!(column.chunk_count(), 4);
        assert_eq!(column.height(), 64);
        assert_eq!(column.count(BlockId::AIR), 16 * 16 * 64);
    }

    #[test]
    fn test_index_layout_matches_flat_formula() {
        let column = column();
        assert_eq!(column.index3d(3, 17, 5), ((16 + 5) * 16 + 3) as usize);
    }

    #[test]
    fn test_set_and_get_across_chunks() {
        let mut column = column();
        assert!(column.set(1, 40, 2, BlockId(7)));
        assert_eq!(column.get(1, 40, 2), BlockId(7));
        assert_eq!(column.chunk(2).unwrap()[column.index3d(1, 40, 2)], BlockId(7));
        assert_eq!(column.get(1, 8, 2), BlockId::AIR);
    }

    #[test]
    fn test_out_of_bounds_is_ignored() {
        let mut column = column();
        assert!(!column.set(16, 0, 0, BlockId(7)));
        assert!(!column.set(0, 64, 0, BlockId(7)));
        assert_eq!(column.get(-1, 0, 0), BlockId::AIR);
    }

    #[test]
    fn test_heights() {
        let mut column = column();
        column.set_heights(4, 9, 30, 31);
        assert_eq!(column.terrain_height(4, 9), 30);
        assert_eq!(column.rain_height(4, 9), 31);
        assert_eq!(column.terrain_height(99, 0), 0);
    }

    #[test]
    fn test_direct_placer_writes() {
        let mut column = column();
        let mut placer = DirectPlacer;
        assert!(placer.try_place_for_worldgen(
            &mut column,
            IVec3::new(2, 3, 4),
            IVec3::new(34, 3, 4),
            BlockId(5)
        ));
        assert_eq!(column.get(2, 3, 4), BlockId(5));
    }
}
