//! Dice for the resolver.
//!
//! One seedable stream feeds the success check, effect magnitudes and the
//! sandbox's skill-gain coin, so a seeded scenario replays identically.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A percentile success check: passes when `roll` lands under `chance`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SuccessRoll {
    /// Uniform in [0, 100)
    pub roll: f32,
    /// Success chance in percent
    pub chance: f32,
}

impl SuccessRoll {
    pub fn passed(&self) -> bool {
        self.roll < self.chance
    }
}

#[derive(Debug, Clone)]
pub struct GameRng {
    rng: StdRng,
}

impl GameRng {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    fn unit(&mut self) -> f32 {
        self.rng.gen()
    }

    /// Roll against a success chance given in percent.
    pub fn check_success(&mut self, chance: f32) -> SuccessRoll {
        SuccessRoll {
            roll: self.unit() * 100.0,
            chance,
        }
    }

    /// Magnitude inside a spell's `(min, max)` power band. A collapsed or
    /// inverted band yields its minimum without drawing.
    pub fn power_in(&mut self, (min, max): (f32, f32)) -> f32 {
        if max > min {
            min + self.unit() * (max - min)
        } else {
            min
        }
    }

    /// Coin that comes up true with probability `p`; never true at `p <= 0`.
    pub fn chance(&mut self, p: f32) -> bool {
        p > 0.0 && self.unit() < p
    }
}

impl Default for GameRng {
    fn default() -> Self {
        Self::from_entropy()
    }
}
