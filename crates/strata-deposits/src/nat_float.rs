//! Configurable random number distributions for deposit dimensions.

use serde::{Deserialize, Serialize};

use crate::random::RandomSource;

/// Shape of a [`NatFloat`] distribution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Distribution {
    /// Flat over `avg ± var`.
    #[default]
    Uniform,
    /// Mean of two uniform draws.
    Triangle,
    /// Mean of three uniform draws.
    Gaussian,
    /// Mean of six uniform draws.
    NarrowGaussian,
    /// Gaussian folded so values cluster at `avg ± var`.
    InverseGaussian,
    /// Narrow gaussian folded so values cluster at `avg ± var`.
    NarrowInverseGaussian,
    /// `avg + var * u²`.
    InvExp,
    /// `avg + var * u³`.
    StrongInvExp,
    /// `avg + var * u⁴`.
    StrongerInvExp,
    /// Always `avg`.
    Dirac,
}

impl Distribution {
    /// Number of uniform draws one sample consumes.
    pub fn draws(self) -> usize {
        match self {
            Distribution::Dirac => 0,
            Distribution::Uniform
            | Distribution::InvExp
            | Distribution::StrongInvExp
            | Distribution::StrongerInvExp => 1,
            Distribution::Triangle => 2,
            Distribution::Gaussian | Distribution::InverseGaussian => 3,
            Distribution::NarrowGaussian | Distribution::NarrowInverseGaussian => 6,
        }
    }
}

/// A number described by average, variance and distribution shape.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NatFloat {
    /// Centre of the distribution.
    pub avg: f32,
    /// Half-width of the distribution.
    pub var: f32,
    /// Added after scaling by the multiplier.
    pub offset: f32,
    /// Distribution shape.
    pub dist: Distribution,
}

impl NatFloat {
    /// A uniform distribution over `avg ± var`.
    pub fn uniform(avg: f32, var: f32) -> Self {
        Self {
            avg,
            var,
            offset: 0.0,
            dist: Distribution::Uniform,
        }
    }

    /// The same distribution with `avg` and `var` multiplied by `factor`.
    pub fn scaled(self, factor: f32) -> Self {
        Self {
            avg: self.avg * factor,
            var: self.var * factor,
            ..self
        }
    }

    /// Samples the distribution: `offset + multiplier * (avg + spread)`.
    pub fn next_float(&self, multiplier: f32, rand: &mut impl RandomSource) -> f32 {
        let mut mean_of = |n: usize| (0..n).map(|_| rand.next_float()).sum::<f32>() / n as f32;

        let value = match self.dist {
            Distribution::Uniform => self.centered(mean_of(1)),
            Distribution::Triangle => self.centered(mean_of(2)),
            Distribution::Gaussian => self.centered(mean_of(3)),
            Distribution::NarrowGaussian => self.centered(mean_of(6)),
            Distribution::InverseGaussian => self.centered(fold(mean_of(3))),
            Distribution::NarrowInverseGaussian => self.centered(fold(mean_of(6))),
            Distribution::InvExp => self.avg + self.var * mean_of(1).powi(2),
            Distribution::StrongInvExp => self.avg + self.var * mean_of(1).powi(3),
            Distribution::StrongerInvExp => self.avg + self.var * mean_of(1).powi(4),
            Distribution::Dirac => self.avg,
        };

        self.offset + multiplier * value
    }

    /// Maps a `[0, 1)` draw onto `avg ± var`.
    fn centered(&self, unit: f32) -> f32 {
        self.avg + (unit - 0.5) * 2.0 * self.var
    }
}

/// Moves mass from the middle of `[0, 1)` to its ends.
fn fold(unit: f32) -> f32 {
    if unit > 0.5 { unit - 0.5 } else { unit + 0.5 }
}
