//! Mineral deposit generation: data-driven disc deposits, child point clouds
//! and the per-chunk pass that places them.

mod async_pass;
mod child;
mod deposit_block;
mod error;
mod generator;
mod loader;
mod noise_maps;
mod pass;
mod placement;
mod registry;
mod variant;

pub mod disc;
pub mod nat_float;
pub mod random;

pub use async_pass::{AsyncDepositPass, DepositTask, DepositedChunk};
pub use child::{ChildDepositPlacement, ChildDepositPlacements, PointCloudConfig, PointCloudGenerator};
pub use deposit_block::{DepositBlock, MotherMatch, ResolvedDepositBlock};
pub use disc::{DiscConfig, DiscDepositGenerator};
pub use error::{DepositError, DepositWarning};
pub use generator::{DepositGenerator, DepositRequest, WorldDimensions};
pub use loader::{DepositCatalog, DepositEntry};
pub use nat_float::{Distribution, NatFloat};
pub use noise_maps::RegionNoiseGenerator;
pub use pass::{DepositPass, NeighbourRegions, PassStats};
pub use placement::PlacementMode;
pub use random::{LcgRandom, RandomSource, stochastic_round};
pub use registry::{DepositGeneratorRegistry, GeneratorFactory};
pub use variant::{ClimateConditions, DepositVariant};
