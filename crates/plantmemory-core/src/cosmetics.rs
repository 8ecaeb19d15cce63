//! Random cosmetic attributes: icon variant and garden grid position.
//!
//! These carry no domain meaning. They are drawn through an injected
//! [`CosmeticSource`] so a test can script the exact values it expects.

use std::collections::VecDeque;

use rand::prelude::*;
use rand_pcg::Mcg128Xsl64;

use crate::icon::{MAX_VARIANT, MIN_VARIANT};

pub trait CosmeticSource: Send {
    /// Variant within an icon type, in `1..=8`.
    fn icon_variant(&mut self) -> u8;

    /// Grid coordinate in `[0.0, 1.0)`.
    fn grid_coordinate(&mut self) -> f32;
}

/// PCG-backed source used in production.
pub struct RandomCosmetics {
    rng: Mcg128Xsl64,
}

impl RandomCosmetics {
    pub fn from_entropy() -> Self {
        Self {
            rng: Mcg128Xsl64::from_entropy(),
        }
    }

    /// Reproducible sequence for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mcg128Xsl64::seed_from_u64(seed),
        }
    }
}

impl CosmeticSource for RandomCosmetics {
    fn icon_variant(&mut self) -> u8 {
        self.rng.gen_range(MIN_VARIANT..=MAX_VARIANT)
    }

    fn grid_coordinate(&mut self) -> f32 {
        self.rng.gen::<f32>()
    }
}

/// Replays fixed sequences.
///
/// Out-of-range values are clamped. Once a sequence runs dry it keeps
/// returning its last value (or the lower bound if it was empty).
#[derive(Debug, Clone, Default)]
pub struct ScriptedCosmetics {
    variants: VecDeque<u8>,
    coordinates: VecDeque<f32>,
    last_variant: Option<u8>,
    last_coordinate: Option<f32>,
}

impl ScriptedCosmetics {
    pub fn new(
        variants: impl IntoIterator<Item = u8>,
        coordinates: impl IntoIterator<Item = f32>,
    ) -> Self {
        Self {
            variants: variants.into_iter().collect(),
            coordinates: coordinates.into_iter().collect(),
            last_variant: None,
            last_coordinate: None,
        }
    }
}

impl CosmeticSource for ScriptedCosmetics {
    fn icon_variant(&mut self) -> u8 {
        if let Some(v) = self.variants.pop_front() {
            self.last_variant = Some(v.clamp(MIN_VARIANT, MAX_VARIANT));
        }
        self.last_variant.unwrap_or(MIN_VARIANT)
    }

    fn grid_coordinate(&mut self) -> f32 {
        if let Some(c) = self.coordinates.pop_front() {
            // Largest f32 below 1.0 keeps the half-open range.
            self.last_coordinate = Some(c.clamp(0.0, 1.0 - f32::EPSILON / 2.0));
        }
        self.last_coordinate.unwrap_or(0.0)
    }
}
