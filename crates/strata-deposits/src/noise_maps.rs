//! Region data layers filled from simplex noise.
//!
//! Every layer carries one cell of padding on each side so bilinear lookups
//! at the region edge blend into the neighbouring region's values.

use noise::{NoiseFn, Simplex};
use strata_voxel::{Climate, IntDataMap2D, MapRegion};

use crate::generator::WorldDimensions;

const PADDING: i32 = 1;

const DISTORT_FREQUENCY: f64 = 1.0 / 256.0;
const ORE_FREQUENCY: f64 = 1.0 / 160.0;
const CLIMATE_FREQUENCY: f64 = 1.0 / 1024.0;

/// Builds [`MapRegion`] layers for a world seed.
pub struct RegionNoiseGenerator {
    seed: u32,
    dims: WorldDimensions,
    distort_top: Simplex,
    distort_bottom: Simplex,
    temperature: Simplex,
    rainfall: Simplex,
}

impl RegionNoiseGenerator {
    pub fn new(seed: i64, dims: WorldDimensions) -> Self {
        let seed = seed as u32;
        Self {
            seed,
            dims,
            distort_top: Simplex::new(seed.wrapping_add(0x0101)),
            distort_bottom: Simplex::new(seed.wrapping_add(0x0102)),
            temperature: Simplex::new(seed.wrapping_add(0x0201)),
            rainfall: Simplex::new(seed.wrapping_add(0x0202)),
        }
    }

    /// Generates all layers of region `(region_x, region_z)`, with one ore
    /// map per entry of `ore_codes`.
    pub fn generate(&self, region_x: i32, region_z: i32, ore_codes: &[String]) -> MapRegion {
        let origin = (
            f64::from(region_x) * f64::from(self.dims.region_size),
            f64::from(region_z) * f64::from(self.dims.region_size),
        );

        // 20 is the neutral distortion value.
        let distortion = |noise: &Simplex| self.layer(origin, |x, z| (normalized(noise, x, z, DISTORT_FREQUENCY) * 40.0).round() as i32);

        let ore_maps = ore_codes
            .iter()
            .map(|code| {
                let noise = Simplex::new(self.seed ^ code_seed(code));
                let map = self.layer(origin, |x, z| (normalized(&noise, x, z, ORE_FREQUENCY) * 255.0).round() as i32);
                (code.clone(), map)
            })
            .collect();

        let climate_map = self.layer(origin, |x, z| {
            Climate {
                temperature: (normalized(&self.temperature, x, z, CLIMATE_FREQUENCY) * 100.0 - 50.0) as f32,
                rainfall: normalized(&self.rainfall, x, z, CLIMATE_FREQUENCY) as f32,
            }
            .pack()
        });

        tracing::debug!(region_x, region_z, ore_maps = ore_codes.len(), "generated region noise layers");

        MapRegion {
            ore_map_vertical_distort_top: distortion(&self.distort_top),
            ore_map_vertical_distort_bottom: distortion(&self.distort_bottom),
            ore_maps,
            climate_map,
        }
    }

    /// Samples `value` at the centre of every cell, padding included.
    fn layer(&self, origin: (f64, f64), value: impl Fn(f64, f64) -> i32) -> IntDataMap2D {
        let inner = self.dims.noise_size_ore();
        let cell = f64::from(self.dims.region_size) / f64::from(inner);
        let mut map = IntDataMap2D::filled(inner + 2 * PADDING, PADDING, 0);

        for z in 0..map.size {
            for x in 0..map.size {
                let wx = origin.0 + (f64::from(x - PADDING) + 0.5) * cell;
                let wz = origin.1 + (f64::from(z - PADDING) + 0.5) * cell;
                map.set_int(x, z, value(wx, wz));
            }
        }
        map
    }
}

/// Noise at a world position mapped from `[-1, 1]` to `[0, 1]`.
fn normalized(noise: &Simplex, x: f64, z: f64, frequency: f64) -> f64 {
    ((noise.get([x * frequency, z * frequency]) + 1.0) * 0.5).clamp(0.0, 1.0)
}

/// Stable per-code seed offset (FNV-1a).
fn code_seed(code: &str) -> u32 {
    code.bytes()
        .fold(0x811c_9dc5_u32, |hash, byte| (hash ^ u32::from(byte)).wrapping_mul(0x0100_0193))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator() -> RegionNoiseGenerator {
        RegionNoiseGenerator::new(1234, WorldDimensions::default())
    }

    fn all_cells(map: &IntDataMap2D) -> impl Iterator<Item = i32> + '_ {
        map.data.iter().copied()
    }

    #[test]
    fn test_layers_have_padding() {
        let region = generator().generate(0, 0, &["copper".to_string()]);
        let inner = WorldDimensions::default().noise_size_ore();
        for map in [
            &region.ore_map_vertical_distort_top,
            &region.ore_map_vertical_distort_bottom,
            &region.climate_map,
            &region.ore_maps["copper"],
        ] {
            assert_eq!(map.inner_size(), inner);
            assert_eq!(map.size, inner + 2);
        }
    }

    #[test]
    fn test_value_ranges() {
        let region = generator().generate(3, -2, &["copper".to_string(), "tin".to_string()]);
        assert!(all_cells(&region.ore_map_vertical_distort_top).all(|v| (0..=40).contains(&v)));
        assert!(all_cells(&region.ore_map_vertical_distort_bottom).all(|v| (0..=40).contains(&v)));
        for map in region.ore_maps.values() {
            assert!(all_cells(map).all(|v| (0..=255).contains(&v)));
        }
        for packed in all_cells(&region.climate_map) {
            let climate = Climate::unpack(packed);
            assert!((-50.0..=50.0).contains(&climate.temperature));
            assert!((0.0..=1.0).contains(&climate.rainfall));
        }
    }

    #[test]
    fn test_deterministic_per_seed_and_region() {
        let codes = ["copper".to_string()];
        assert_eq!(generator().generate(1, 1, &codes), generator().generate(1, 1, &codes));
        assert_ne!(generator().generate(1, 1, &codes), generator().generate(2, 1, &codes));
    }

    #[test]
    fn test_ore_maps_differ_per_code() {
        let region = generator().generate(0, 0, &["copper".to_string(), "tin".to_string()]);
        assert_ne!(region.ore_maps["copper"], region.ore_maps["tin"]);
        let factor = region.ore_map_factor("tin", 100, 100, 512);
        assert!((0.0..=1.0).contains(&factor));
    }

    #[test]
    fn test_code_seed_is_stable() {
        assert_eq!(code_seed(""), 0x811c_9dc5);
        assert_ne!(code_seed("copper"), code_seed("tin"));
    }
}
