//! Deposit variant descriptors as read from definition files.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strata_voxel::Climate;

/// Climate window a variant may spawn in.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClimateConditions {
    /// Minimum temperature in °C.
    pub min_temp: f32,
    /// Maximum temperature in °C.
    pub max_temp: f32,
    /// Minimum rainfall, `[0, 1]`.
    pub min_rain: f32,
    /// Maximum rainfall, `[0, 1]`.
    pub max_rain: f32,
}

impl Default for ClimateConditions {
    fn default() -> Self {
        Self {
            min_temp: -50.0,
            max_temp: 50.0,
            min_rain: 0.0,
            max_rain: 1.0,
        }
    }
}

impl ClimateConditions {
    /// Returns `true` if `climate` lies inside the window (bounds inclusive).
    pub fn matches(&self, climate: Climate) -> bool {
        (self.min_temp..=self.max_temp).contains(&climate.temperature)
            && (self.min_rain..=self.max_rain).contains(&climate.rainfall)
    }
}

/// Static configuration of one deposit type.
///
/// Immutable once loaded and shared through [`Arc`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DepositVariant {
    /// Deposit code, also the key of its ore map.
    pub code: String,
    /// Definition file this variant was loaded from.
    #[serde(skip)]
    pub from_file: String,
    /// Generator type tag, e.g. `disc-followsurface`.
    pub generator: String,
    /// Expected placement attempts per chunk. Fractional parts are rolled.
    pub tries_per_chunk: f32,
    /// Scale tries by the region ore map.
    pub with_ore_map: bool,
    /// Place every block through the world-gen placement callback.
    pub with_block_callback: bool,
    /// Only spawn where the region climate fits.
    pub climate: Option<ClimateConditions>,
    /// Generator-specific configuration.
    pub attributes: serde_json::Value,
    /// Secondary deposits spawned inside this one.
    pub child_deposits: Vec<Arc<DepositVariant>>,
}

impl DepositVariant {
    /// Records `file` as the origin of this variant and all of its children.
    pub fn stamp_file(&mut self, file: &str) {
        self.from_file = file.to_string();
        for child in &mut self.child_deposits {
            Arc::make_mut(child).stamp_file(file);
        }
    }
}
