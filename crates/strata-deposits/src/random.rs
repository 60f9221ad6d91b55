//! Deterministic random source for deposit placement.
//!
//! [`LcgRandom`] is a small linear-congruential generator keyed by the world
//! seed and re-keyed per chunk or block position, so every chunk task draws a
//! reproducible stream regardless of thread or generation order.

const MULTIPLIER: i64 = 6_364_136_223_846_793_005;
const INCREMENT: i64 = 1_442_695_040_888_963_407;

/// Uniform draws consumed by distributions and placement rolls.
pub trait RandomSource {
    /// Uniform integer in `[0, bound)`. Returns 0 when `bound <= 0`.
    fn next_int(&mut self, bound: i32) -> i32;
    /// Uniform float in `[0, 1)`.
    fn next_float(&mut self) -> f32;
    /// Uniform double in `[0, 1)`.
    fn next_double(&mut self) -> f64;
}

/// Seeded linear-congruential generator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LcgRandom {
    world_seed: i64,
    map_gen_seed: i64,
    current_seed: i64,
}

#[inline]
fn step(seed: i64) -> i64 {
    seed.wrapping_mul(seed.wrapping_mul(MULTIPLIER).wrapping_add(INCREMENT))
}

impl LcgRandom {
    /// Creates a generator for `world_seed`, ready to draw without further keying.
    pub fn new(world_seed: i64) -> Self {
        let map_gen_seed = world_seed.wrapping_mul(MULTIPLIER).wrapping_add(INCREMENT);
        Self {
            world_seed,
            map_gen_seed,
            current_seed: map_gen_seed,
        }
    }

    /// The world seed this generator was created with.
    pub fn world_seed(&self) -> i64 {
        self.world_seed
    }

    /// Re-keys the stream for a chunk or block position.
    pub fn init_position_seed(&mut self, x: i32, z: i32) {
        let mut seed = self.map_gen_seed;
        for value in [x, z, x, z] {
            seed = step(seed).wrapping_add(value as i64);
        }
        self.current_seed = seed;
    }
}

impl RandomSource for LcgRandom {
    fn next_int(&mut self, bound: i32) -> i32 {
        if bound <= 0 {
            return 0;
        }
        let bound = bound as i64;
        let mut r = (self.current_seed >> 24) % bound;
        if r < 0 {
            r += bound;
        }
        self.current_seed = step(self.current_seed).wrapping_add(self.map_gen_seed);
        r as i32
    }

    fn next_float(&mut self) -> f32 {
        self.next_int(1 << 24) as f32 / (1 << 24) as f32
    }

    fn next_double(&mut self) -> f64 {
        self.next_int(1 << 30) as f64 / (1 << 30) as f64
    }
}

/// Unseeded draws for estimators that must not perturb the seeded stream.
impl RandomSource for rand::rngs::ThreadRng {
    fn next_int(&mut self, bound: i32) -> i32 {
        use rand::Rng;
        if bound <= 0 {
            return 0;
        }
        self.random_range(0..bound)
    }

    fn next_float(&mut self) -> f32 {
        rand::Rng::random::<f32>(self)
    }

    fn next_double(&mut self) -> f64 {
        rand::Rng::random::<f64>(self)
    }
}

/// Rounds `value` to an integer, rounding up with probability equal to its
/// fractional part so the expected value is preserved.
///
/// Consumes exactly one float draw.
pub fn stochastic_round(value: f32, rand: &mut impl RandomSource) -> i32 {
    let whole = value as i32;
    whole + i32::from(rand.next_float() < value - whole as f32)
}
