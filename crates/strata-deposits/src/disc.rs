//! Disc-shaped deposits: a randomly deformed, flat ellipse of ore laid into
//! mother rock, with optional child deposits and surface indicators.

use std::f32::consts::PI;
use std::sync::Arc;

use glam::IVec3;
use hashbrown::HashMap;
use serde::Deserialize;
use strata_voxel::{BlockId, BlockRegistry, ChunkColumn};

use crate::child::{ChildDepositPlacement, ChildDepositPlacements, PointCloudConfig, PointCloudGenerator};
use crate::deposit_block::{DepositBlock, ResolvedDepositBlock};
use crate::error::{DepositError, DepositWarning, log_warnings};
use crate::generator::{DepositGenerator, DepositRequest, WorldDimensions};
use crate::nat_float::NatFloat;
use crate::placement::{ColumnSample, DiscScan, HookEnv, PlacementHooks, PlacementMode};
use crate::random::{LcgRandom, RandomSource, stochastic_round};
use crate::variant::DepositVariant;

/// Upper bound on a realized deposit radius.
pub const MAX_RADIUS: i32 = 64;

/// Constant in the containment test. Values above 1 would widen every
/// footprint; a noise field here would give ragged edges.
const EDGE_SHARPNESS: f64 = 1.0;

/// Attributes of a disc deposit.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DiscConfig {
    /// Mother rock pattern.
    pub in_block: Option<DepositBlock>,
    /// Ore template, one block per grade.
    pub place_block: DepositBlock,
    /// Indicator placed on the surface above shallow ore.
    pub surface_block: Option<DepositBlock>,
    /// Radius in blocks, capped at [`MAX_RADIUS`].
    pub radius: Option<NatFloat>,
    /// Thickness in blocks.
    pub thickness: Option<NatFloat>,
    /// Vertical position; meaning depends on the placement mode.
    #[serde(alias = "yPosRel")]
    pub depth: Option<NatFloat>,
    pub surface_block_chance: f32,
    /// Chance that one deposit seeds surface blocks at all.
    pub gen_surface_block_chance: f32,
    /// Reuse the last mother lookup while walking a column.
    pub ignore_parent_test_per_block: bool,
    /// Columns whose start deviates further from the reference Y are skipped.
    pub max_y_roughness: i32,
    /// Place the bottom layer through the placement callback.
    pub with_last_layer_block_callback: bool,
}

impl Default for DiscConfig {
    fn default() -> Self {
        Self {
            in_block: None,
            place_block: DepositBlock::default(),
            surface_block: None,
            radius: None,
            thickness: None,
            depth: None,
            surface_block_chance: 0.05,
            gen_surface_block_chance: 1.0,
            ignore_parent_test_per_block: false,
            max_y_roughness: 999,
            with_last_layer_block_callback: false,
        }
    }
}

struct ChildTemplate {
    variant: Arc<DepositVariant>,
    config: PointCloudConfig,
}

/// Generator for the four `disc-*` tags.
pub struct DiscDepositGenerator {
    variant: Arc<DepositVariant>,
    mode: PlacementMode,
    hooks: PlacementHooks,
    dims: WorldDimensions,
    blocks: Arc<BlockRegistry>,
    config: DiscConfig,
    radius: NatFloat,
    thickness: NatFloat,
    depth: NatFloat,
    child_templates: Vec<ChildTemplate>,
    place_by_mother: HashMap<BlockId, ResolvedDepositBlock>,
    surface_by_mother: HashMap<BlockId, ResolvedDepositBlock>,
    /// Per mother, one generator per entry of `variant.child_deposits`.
    children_by_mother: HashMap<BlockId, Vec<Arc<dyn DepositGenerator>>>,
}

impl DiscDepositGenerator {
    /// Builds an uninitialised generator from a variant's attributes blob.
    ///
    /// Child variant attributes are parsed here too, so a bad child fails the
    /// whole variant.
    pub fn from_attributes(
        mode: PlacementMode,
        variant: Arc<DepositVariant>,
        attributes: &serde_json::Value,
        dims: WorldDimensions,
        blocks: Arc<BlockRegistry>,
    ) -> Result<Self, DepositError> {
        let config: DiscConfig =
            serde_json::from_value(attributes.clone()).map_err(|source| DepositError::InvalidAttributes {
                file: variant.from_file.clone(),
                source,
            })?;

        let child_templates = variant
            .child_deposits
            .iter()
            .map(|child| {
                let config = serde_json::from_value(child.attributes.clone()).map_err(|source| {
                    DepositError::InvalidAttributes {
                        file: child.from_file.clone(),
                        source,
                    }
                })?;
                Ok(ChildTemplate {
                    variant: Arc::clone(child),
                    config,
                })
            })
            .collect::<Result<Vec<_>, DepositError>>()?;

        Ok(Self {
            variant,
            mode,
            hooks: mode.hooks(),
            dims,
            blocks,
            radius: NatFloat::uniform(10.0, 0.0),
            thickness: NatFloat::uniform(1.0, 0.0),
            depth: mode.default_depth(),
            config,
            child_templates,
            place_by_mother: HashMap::new(),
            surface_by_mother: HashMap::new(),
            children_by_mother: HashMap::new(),
        })
    }

    /// Draws a radius, capped at [`MAX_RADIUS`].
    pub(crate) fn sample_radius(&self, rand: &mut impl RandomSource) -> i32 {
        (self.radius.next_float(1.0, rand) as i32).min(MAX_RADIUS)
    }

    fn resolve_radius(&self, warnings: &mut Vec<DepositWarning>) -> NatFloat {
        let file = &self.variant.from_file;
        let Some(radius) = self.config.radius else {
            warnings.push(DepositWarning::MissingRadius { file: file.clone() });
            return NatFloat::uniform(10.0, 0.0);
        };
        if self.variant.climate.is_some() && radius.avg + radius.var >= 32.0 {
            warnings.push(DepositWarning::ClimateRadiusTooLarge { file: file.clone() });
            return NatFloat::uniform(10.0, 0.0);
        }
        radius
    }

    fn resolve_depth(&self, warnings: &mut Vec<DepositWarning>) -> NatFloat {
        let depth = self.config.depth.unwrap_or_else(|| {
            let default = self.mode.default_depth();
            warnings.push(DepositWarning::MissingDepth {
                file: self.variant.from_file.clone(),
                default: default.avg,
            });
            default
        });
        match self.mode {
            PlacementMode::Anywhere => depth.scaled(self.dims.map_size_y as f32),
            _ => depth,
        }
    }

    /// Places one surface indicator above `(lx, y, lz)` if the roll succeeds
    /// and the spot is an empty cell on a solid top.
    fn seed_surface(&self, column: &mut ChunkColumn, lx: i32, y: i32, lz: i32, mother: BlockId, rand: &mut LcgRandom) {
        let surface_y = column.rain_height(lx, lz);
        let depth = surface_y - y;
        let chance = self.config.surface_block_chance * (1.0 - depth as f32 / 9.0).max(0.0);

        if surface_y >= self.dims.map_size_y || rand.next_float() >= chance {
            return;
        }
        if surface_y + 1 >= column.height() {
            return;
        }
        let below = column.get(lx, surface_y, lz);
        if !self.blocks.is_side_solid_up(below) || column.get(lx, surface_y + 1, lz) != BlockId::AIR {
            return;
        }
        if let Some(&block) = self.surface_by_mother.get(&mother).and_then(|r| r.blocks.first()) {
            column.set(lx, surface_y + 1, lz, block);
        }
    }
}

/// One child-deposit roll. `ore_factor` is the ore map factor when the child
/// is ore-map gated.
pub(crate) fn roll_child(quantity: f32, ore_factor: Option<f32>, rand: &mut impl RandomSource) -> bool {
    let roll = rand.next_float();
    quantity > roll && ore_factor.is_none_or(|factor| factor * quantity > roll)
}

impl DepositGenerator for DiscDepositGenerator {
    fn variant(&self) -> &Arc<DepositVariant> {
        &self.variant
    }

    fn init(&mut self) -> Vec<DepositWarning> {
        let mut warnings = Vec::new();
        let mut child_warnings = Vec::new();

        self.radius = self.resolve_radius(&mut warnings);
        self.thickness = self.config.thickness.unwrap_or(NatFloat::uniform(1.0, 0.0));
        self.depth = self.resolve_depth(&mut warnings);

        let Some(in_block) = self.config.in_block.clone() else {
            warnings.push(DepositWarning::MissingInBlock {
                file: self.variant.from_file.clone(),
            });
            return log_warnings(warnings);
        };

        let file = self.variant.from_file.clone();
        let key = in_block.name.as_deref();
        for mother in in_block.resolve_mothers(&file, &self.blocks, &mut warnings) {
            let value = mother.value.as_deref();
            let place = self
                .config
                .place_block
                .resolve(&file, &self.blocks, &mother.code, key, value, &mut warnings);
            self.place_by_mother.insert(mother.id, place);

            if let Some(surface) = &self.config.surface_block {
                let resolved = surface.resolve(&file, &self.blocks, &mother.code, key, value, &mut warnings);
                self.surface_by_mother.insert(mother.id, resolved);
            }

            if self.child_templates.is_empty() {
                continue;
            }
            let mut children: Vec<Arc<dyn DepositGenerator>> = Vec::with_capacity(self.child_templates.len());
            for template in &self.child_templates {
                let mut child = PointCloudGenerator::new(
                    Arc::clone(&template.variant),
                    template.config.clone(),
                    self.dims,
                    Arc::clone(&self.blocks),
                );
                child_warnings.extend(child.init_for_mother(&mother, key));
                children.push(Arc::new(child));
            }
            self.children_by_mother.insert(mother.id, children);
        }

        tracing::debug!(
            file = %file,
            code = %self.variant.code,
            mothers = self.place_by_mother.len(),
            "initialised disc deposit"
        );

        let mut warnings = log_warnings(warnings);
        warnings.extend(child_warnings);
        warnings
    }

    fn generate_deposit(
        &self,
        req: &mut DepositRequest<'_>,
        rand: &mut LcgRandom,
        children: &mut ChildDepositPlacements,
    ) {
        let cs = self.dims.chunk_size;
        let max_grade = self.config.place_block.max_grade;
        let grade = if max_grade == 0 { 0 } else { rand.next_int(max_grade) };

        let radius = self.sample_radius(rand);
        if radius <= 0 {
            return;
        }

        // Deform the circle by up to 25% either way.
        let deform = (rand.next_float() - 0.5).clamp(-0.25, 0.25);
        let radius_x = radius - (radius as f32 * deform) as i32;
        let radius_z = radius + (radius as f32 * deform) as i32;

        let (base_x, base_z) = (req.base_x(), req.base_z());
        let pos = req.pos;
        if pos.x + radius_x < base_x - 6
            || pos.z + radius_z < base_z - 6
            || pos.x - radius_x >= base_x + cs + 6
            || pos.z - radius_z >= base_z + cs + 6
        {
            return;
        }

        let mut scan = DiscScan {
            pos,
            ..Default::default()
        };
        {
            let env = HookEnv {
                column: &*req.column,
                dims: &self.dims,
                depth: &self.depth,
            };
            (self.hooks.before_gen)(&env, &mut scan, rand);
        }

        let th = self.thickness.next_float(1.0, rand);
        scan.deposit_thickness = stochastic_round(th, rand);

        let should_gen_surface =
            rand.next_float() <= self.config.gen_surface_block_chance && self.config.surface_block.is_some();

        // Scan box relative to the deposit centre, padded for distortion but
        // never far outside the origin chunk.
        let lx0 = pos.x - base_x;
        let lz0 = pos.z - base_z;
        let min_x = (lx0 - radius_x).clamp(-8, cs + 8) - lx0;
        let max_x = (lx0 + radius_x).clamp(-8, cs + 8) - lx0;
        let min_z = (lz0 - radius_z).clamp(-8, cs + 8) - lz0;
        let max_z = (lz0 + radius_z).clamp(-8, cs + 8) - lz0;

        let x_rad_sq = i64::from(radius_x * radius_x);
        let z_rad_sq = i64::from(radius_z * radius_z);
        let inv_chunk_area = 1.0 / self.dims.chunk_area() as f32;
        let height = req.column.height().min(self.dims.map_size_y);

        // Ore maps gate children per chunk, sampled at the chunk centre.
        let child_ore_factors: Vec<Option<f32>> = self
            .variant
            .child_deposits
            .iter()
            .map(|child| {
                child.with_ore_map.then(|| {
                    req.column
                        .region()
                        .ore_map_factor(&child.code, base_x + cs / 2, base_z + cs / 2, self.dims.region_size)
                })
            })
            .collect();

        let mut resolved: Option<&ResolvedDepositBlock> = None;
        let mut mother = BlockId::AIR;

        for dx in min_x..=max_x {
            let world_x = pos.x + dx;
            let lx = world_x - base_x;

            for dz in min_z..=max_z {
                let world_z = pos.z + dz;
                let lz = world_z - base_z;

                let spread = i64::from(dx * dx) * z_rad_sq + i64::from(dz * dz) * x_rad_sq;
                let distance_to_edge = EDGE_SHARPNESS - spread as f64 / (x_rad_sq * z_rad_sq) as f64;
                if distance_to_edge < 0.0 || !(0..cs).contains(&lx) || !(0..cs).contains(&lz) {
                    continue;
                }

                let sample = ColumnSample {
                    lx,
                    lz,
                    world_x,
                    world_z,
                    distance_to_edge,
                };
                let plan = {
                    let env = HookEnv {
                        column: &*req.column,
                        dims: &self.dims,
                        depth: &self.depth,
                    };
                    (self.hooks.load_y_and_thickness)(&env, &scan, sample, rand)
                };

                // Keeps deposits off cliff faces.
                if (scan.pos.y - plan.y).abs() > self.config.max_y_roughness {
                    continue;
                }

                let mut y = plan.y;
                for layer in 0..plan.thickness {
                    if y <= 1 || y >= height {
                        y -= 1;
                        continue;
                    }

                    let existing = req.column.get(lx, y, lz);
                    if !self.config.ignore_parent_test_per_block || resolved.is_none() {
                        resolved = self.place_by_mother.get(&existing);
                        mother = existing;
                    }

                    if let Some(place) = resolved
                        && let Some(&block) = place.blocks.get((grade as usize).min(place.blocks.len().saturating_sub(1)))
                    {
                        let last_layer = layer == plan.thickness - 1;
                        if self.variant.with_block_callback || (self.config.with_last_layer_block_callback && last_layer) {
                            req.placer.try_place_for_worldgen(
                                req.column,
                                IVec3::new(lx, y, lz),
                                IVec3::new(world_x, y, world_z),
                                block,
                            );
                        } else {
                            req.column.set(lx, y, lz, block);
                        }

                        for (i, child) in self.variant.child_deposits.iter().enumerate() {
                            let quantity = child.tries_per_chunk * inv_chunk_area;
                            if !roll_child(quantity, child_ore_factors[i], rand) {
                                continue;
                            }
                            if let Some(generator) = self.children_by_mother.get(&mother).and_then(|c| c.get(i)) {
                                children.record(
                                    IVec3::new(world_x, y, world_z),
                                    ChildDepositPlacement {
                                        variant: Arc::clone(child),
                                        generator: Arc::clone(generator),
                                    },
                                );
                            }
                        }

                        if should_gen_surface {
                            self.seed_surface(req.column, lx, y, lz, mother, rand);
                        }
                    }

                    y -= 1;
                }
            }
        }
    }

    fn abs_avg_quantity(&self) -> f32 {
        let mut rng = rand::rng();
        let mut radius = 0.0;
        let mut thickness = 0.0;
        for _ in 0..100 {
            radius += self.radius.next_float(1.0, &mut rng);
            thickness += self.thickness.next_float(1.0, &mut rng);
        }
        radius /= 100.0;
        thickness /= 100.0;
        thickness * radius * radius * PI * self.variant.tries_per_chunk
    }

    fn bearing_blocks(&self) -> Vec<BlockId> {
        let mut ids: Vec<_> = self.place_by_mother.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    fn max_radius(&self) -> f32 {
        (self.radius.avg + self.radius.var) * 1.3
    }
}
