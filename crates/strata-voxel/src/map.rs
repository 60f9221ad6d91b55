//! Region-scale 2D data layers: vertical distortion, ore density and climate.
//!
//! A map region covers `region_size × region_size` blocks. Each layer is a
//! small integer grid with optional padding cells around the border so that
//! bilinear sampling near the region edge has neighbours to read.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Square integer grid with border padding.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IntDataMap2D {
    /// Row-major cells, `size * size` entries.
    pub data: Vec<i32>,
    /// Side length including padding.
    pub size: i32,
    /// Padding cells before the first inner cell, on both axes.
    pub top_left_padding: i32,
    /// Padding cells after the last inner cell, on both axes.
    pub bottom_right_padding: i32,
}

impl IntDataMap2D {
    /// Creates a map where every cell holds `value`.
    pub fn filled(size: i32, padding: i32, value: i32) -> Self {
        let size = size.max(1);
        Self {
            data: vec![value; (size * size) as usize],
            size,
            top_left_padding: padding,
            bottom_right_padding: padding,
        }
    }

    /// Side length without padding.
    pub fn inner_size(&self) -> i32 {
        self.size - self.top_left_padding - self.bottom_right_padding
    }

    /// Reads a raw cell. Coordinates are clamped to the grid.
    pub fn get_int(&self, x: i32, z: i32) -> i32 {
        let x = x.clamp(0, self.size - 1);
        let z = z.clamp(0, self.size - 1);
        self.data
            .get((z * self.size + x) as usize)
            .copied()
            .unwrap_or_default()
    }

    /// Writes a raw cell. Out-of-range writes are ignored.
    pub fn set_int(&mut self, x: i32, z: i32, value: i32) {
        if x < 0 || z < 0 || x >= self.size || z >= self.size {
            return;
        }
        let index = (z * self.size + x) as usize;
        if let Some(cell) = self.data.get_mut(index) {
            *cell = value;
        }
    }

    /// Bilinearly interpolated value at fractional *inner* coordinates.
    ///
    /// Cell centres sit at `n + 0.5`, so `(0.5, 0.5)` returns the first inner
    /// cell exactly.
    pub fn get_int_lerped(&self, x: f32, z: f32) -> i32 {
        let left = (x - 0.5).floor() as i32;
        let bottom = (z - 0.5).floor() as i32;
        let fx = x - (left as f32 + 0.5);
        let fz = z - (bottom as f32 + 0.5);

        let pad = self.top_left_padding;
        let left_bottom = self.get_int(left + pad, bottom + pad) as f32;
        let right_bottom = self.get_int(left + 1 + pad, bottom + pad) as f32;
        let left_top = self.get_int(left + pad, bottom + 1 + pad) as f32;
        let right_top = self.get_int(left + 1 + pad, bottom + 1 + pad) as f32;

        bilerp(left_bottom, right_bottom, left_top, right_top, fx, fz) as i32
    }
}

fn bilerp(left_bottom: f32, right_bottom: f32, left_top: f32, right_top: f32, fx: f32, fz: f32) -> f32 {
    let bottom = left_bottom + (right_bottom - left_bottom) * fx;
    let top = left_top + (right_top - left_top) * fx;
    bottom + (top - bottom) * fz
}

/// Climate sample decoded from the region climate layer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Climate {
    /// Temperature in degrees Celsius, `[-50, 50]`.
    pub temperature: f32,
    /// Rainfall, `[0, 1]`.
    pub rainfall: f32,
}

impl Climate {
    /// Decodes a packed `0x00TTRR00` cell (temperature byte, rainfall byte).
    pub fn unpack(packed: i32) -> Self {
        let temp = (packed >> 16) & 0xff;
        let rain = (packed >> 8) & 0xff;
        Self {
            temperature: temp as f32 / 255.0 * 100.0 - 50.0,
            rainfall: rain as f32 / 255.0,
        }
    }

    /// Packs a climate sample into a layer cell.
    pub fn pack(self) -> i32 {
        let temp = (((self.temperature + 50.0) / 100.0 * 255.0).round() as i32).clamp(0, 255);
        let rain = ((self.rainfall * 255.0).round() as i32).clamp(0, 255);
        (temp << 16) | (rain << 8)
    }
}

/// All data layers of one map region. Built once, then shared read-only.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MapRegion {
    /// Vertical deposit offset near the world ceiling; 20 means no offset.
    pub ore_map_vertical_distort_top: IntDataMap2D,
    /// Vertical deposit offset near the world floor; 20 means no offset.
    pub ore_map_vertical_distort_bottom: IntDataMap2D,
    /// Ore density per deposit code, low byte `[0, 255]`.
    pub ore_maps: FxHashMap<String, IntDataMap2D>,
    /// Packed temperature/rainfall.
    pub climate_map: IntDataMap2D,
}

impl MapRegion {
    /// A region with neutral layers: no distortion, no ore maps, mild climate.
    pub fn flat(layer_size: i32) -> Self {
        let neutral_climate = Climate {
            temperature: 15.0,
            rainfall: 0.5,
        };
        Self {
            ore_map_vertical_distort_top: IntDataMap2D::filled(layer_size + 2, 1, 20),
            ore_map_vertical_distort_bottom: IntDataMap2D::filled(layer_size + 2, 1, 20),
            ore_maps: FxHashMap::default(),
            climate_map: IntDataMap2D::filled(layer_size + 2, 1, neutral_climate.pack()),
        }
    }

    /// Ore density factor `[0, 1]` for `code` at a world block position.
    ///
    /// Returns 0 when the region carries no ore map for `code`.
    pub fn ore_map_factor(&self, code: &str, pos_x: i32, pos_z: i32, region_size: i32) -> f32 {
        let Some(map) = self.ore_maps.get(code) else {
            return 0.0;
        };
        let (x, z) = region_local(map, pos_x, pos_z, region_size);
        (map.get_int_lerped(x, z) & 0xff) as f32 / 255.0
    }

    /// Climate at a world block position.
    pub fn climate_at(&self, pos_x: i32, pos_z: i32, region_size: i32) -> Climate {
        let (x, z) = region_local(&self.climate_map, pos_x, pos_z, region_size);
        Climate::unpack(self.climate_map.get_int_lerped(x, z))
    }
}

fn region_local(map: &IntDataMap2D, pos_x: i32, pos_z: i32, region_size: i32) -> (f32, f32) {
    let region_size = region_size.max(1);
    let inner = map.inner_size().max(1) as f32;
    let scale = inner / region_size as f32;
    let x = (pos_x.rem_euclid(region_size) as f32 * scale).clamp(0.0, inner - 1.0);
    let z = (pos_z.rem_euclid(region_size) as f32 * scale).clamp(0.0, inner - 1.0);
    (x, z)
}
