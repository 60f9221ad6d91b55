//! Block registry, chunk column buffers and region data layers for world generation.

pub mod column;
pub mod map;
pub mod registry;
pub mod wildcard;

pub use column::{BlockPlacer, ChunkColumn, DirectPlacer, MapChunk};
pub use map::{Climate, IntDataMap2D, MapRegion};
pub use registry::{BlockDef, BlockId, BlockRegistry, RegistryError};
