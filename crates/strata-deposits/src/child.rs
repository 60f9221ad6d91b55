//! Child deposits: the scheduler that collects them during a parent scan and
//! the point-cloud generator that places them afterwards.

use std::fmt;
use std::sync::Arc;

use glam::IVec3;
use hashbrown::HashMap;
use serde::Deserialize;
use strata_voxel::{BlockId, BlockRegistry};

use crate::deposit_block::{DepositBlock, MotherMatch, ResolvedDepositBlock};
use crate::error::{DepositError, DepositWarning, log_warnings};
use crate::generator::{DepositGenerator, DepositRequest, WorldDimensions};
use crate::nat_float::NatFloat;
use crate::random::{LcgRandom, RandomSource};
use crate::variant::DepositVariant;

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// A child deposit waiting to be generated at a recorded position.
#[derive(Clone)]
pub struct ChildDepositPlacement {
    pub variant: Arc<DepositVariant>,
    pub generator: Arc<dyn DepositGenerator>,
}

impl fmt::Debug for ChildDepositPlacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildDepositPlacement")
            .field("variant", &self.variant.code)
            .finish_non_exhaustive()
    }
}

/// Child deposits recorded during one chunk pass, keyed by world position.
///
/// A later record at the same position replaces the earlier one.
#[derive(Debug, Default)]
pub struct ChildDepositPlacements {
    placements: HashMap<IVec3, ChildDepositPlacement>,
}

impl ChildDepositPlacements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, pos: IVec3, placement: ChildDepositPlacement) {
        self.placements.insert(pos, placement);
    }

    pub fn get(&self, pos: IVec3) -> Option<&ChildDepositPlacement> {
        self.placements.get(&pos)
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    /// Empties the scheduler, returning records ordered by `(x, y, z)` so the
    /// child pass does not depend on hash order.
    pub fn drain_sorted(&mut self) -> Vec<(IVec3, ChildDepositPlacement)> {
        let mut drained: Vec<_> = self.placements.drain().collect();
        drained.sort_unstable_by_key(|(pos, _)| (pos.x, pos.y, pos.z));
        drained
    }
}

// ---------------------------------------------------------------------------
// Point-cloud generator
// ---------------------------------------------------------------------------

/// Attributes of a point-cloud deposit.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PointCloudConfig {
    /// Mother rock when used on its own. Child deposits inherit the parent's.
    pub in_block: Option<DepositBlock>,
    pub place_block: DepositBlock,
    pub radius: Option<NatFloat>,
    pub random_tries: Option<NatFloat>,
}

/// Scatters single blocks at random offsets around the deposit position,
/// replacing mother rock only.
pub struct PointCloudGenerator {
    variant: Arc<DepositVariant>,
    dims: WorldDimensions,
    blocks: Arc<BlockRegistry>,
    config: PointCloudConfig,
    radius: NatFloat,
    random_tries: NatFloat,
    place_by_mother: HashMap<BlockId, ResolvedDepositBlock>,
}

impl PointCloudGenerator {
    /// Builds the generator from a variant's attributes blob.
    pub fn from_attributes(
        variant: Arc<DepositVariant>,
        attributes: &serde_json::Value,
        dims: WorldDimensions,
        blocks: Arc<BlockRegistry>,
    ) -> Result<Self, DepositError> {
        let config: PointCloudConfig =
            serde_json::from_value(attributes.clone()).map_err(|source| DepositError::InvalidAttributes {
                file: variant.from_file.clone(),
                source,
            })?;
        Ok(Self::new(variant, config, dims, blocks))
    }

    pub fn new(variant: Arc<DepositVariant>, config: PointCloudConfig, dims: WorldDimensions, blocks: Arc<BlockRegistry>) -> Self {
        Self {
            variant,
            dims,
            blocks,
            radius: config.radius.unwrap_or(NatFloat::uniform(3.0, 0.0)),
            random_tries: config.random_tries.unwrap_or(NatFloat::uniform(5.0, 0.0)),
            config,
            place_by_mother: HashMap::new(),
        }
    }

    /// Resolves the placement block against a mother already chosen by a
    /// parent deposit, without searching for mothers of its own.
    pub fn init_for_mother(&mut self, mother: &MotherMatch, key: Option<&str>) -> Vec<DepositWarning> {
        let mut warnings = Vec::new();
        self.resolve_mother(mother, key, &mut warnings);
        log_warnings(warnings)
    }

    fn resolve_mother(&mut self, mother: &MotherMatch, key: Option<&str>, warnings: &mut Vec<DepositWarning>) {
        let resolved = self.config.place_block.resolve(
            &self.variant.from_file,
            &self.blocks,
            &mother.code,
            key,
            mother.value.as_deref(),
            warnings,
        );
        self.place_by_mother.insert(mother.id, resolved);
    }
}

impl DepositGenerator for PointCloudGenerator {
    fn variant(&self) -> &Arc<DepositVariant> {
        &self.variant
    }

    fn init(&mut self) -> Vec<DepositWarning> {
        let mut warnings = Vec::new();
        let Some(in_block) = self.config.in_block.clone() else {
            warnings.push(DepositWarning::MissingInBlock {
                file: self.variant.from_file.clone(),
            });
            return log_warnings(warnings);
        };

        let mothers = in_block.resolve_mothers(&self.variant.from_file, &self.blocks, &mut warnings);
        for mother in &mothers {
            self.resolve_mother(mother, in_block.name.as_deref(), &mut warnings);
        }
        log_warnings(warnings)
    }

    fn generate_deposit(
        &self,
        req: &mut DepositRequest<'_>,
        rand: &mut LcgRandom,
        _children: &mut ChildDepositPlacements,
    ) {
        let max_grade = self.config.place_block.max_grade;
        let grade = if max_grade == 0 { 0 } else { rand.next_int(max_grade) };

        let radius = (self.radius.next_float(1.0, rand) as i32).min(64);
        if radius < 0 {
            return;
        }
        let tries = self.random_tries.next_float(1.0, rand) as i32;

        let (base_x, base_z) = (req.base_x(), req.base_z());
        let cs = req.column.chunk_size();
        let height = req.column.height().min(self.dims.map_size_y);

        for _ in 0..tries {
            let target = req.pos
                + IVec3::new(
                    rand.next_int(2 * radius + 1) - radius,
                    rand.next_int(2 * radius + 1) - radius,
                    rand.next_int(2 * radius + 1) - radius,
                );
            let (lx, lz) = (target.x - base_x, target.z - base_z);
            if target.y <= 1 || target.y >= height || !(0..cs).contains(&lx) || !(0..cs).contains(&lz) {
                continue;
            }

            let existing = req.column.get(lx, target.y, lz);
            let Some(resolved) = self.place_by_mother.get(&existing) else {
                continue;
            };
            let Some(&block) = resolved.blocks.get((grade as usize).min(resolved.blocks.len().saturating_sub(1)))
            else {
                continue;
            };
            req.column.set(lx, target.y, lz, block);
        }
    }

    fn abs_avg_quantity(&self) -> f32 {
        let mut rng = rand::rng();
        let tries: f32 = (0..100).map(|_| self.random_tries.next_float(1.0, &mut rng)).sum::<f32>() / 100.0;
        tries * self.variant.tries_per_chunk
    }

    fn bearing_blocks(&self) -> Vec<BlockId> {
        let mut ids: Vec<_> = self.place_by_mother.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    fn max_radius(&self) -> f32 {
        self.radius.avg + self.radius.var
    }
}
