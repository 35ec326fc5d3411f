//! Beta-distribution belief over one combination's reward

use rand::Rng;
use rand_distr::{Beta, Distribution};
use serde::{Deserialize, Serialize};

use crate::error::{HfbpoError, Result};

use super::key::CombinationKey;

/// Beta(alpha, beta) posterior over the expected reward in [0, 1].
///
/// Both parameters start at 1 (uniform prior) and only ever grow, so
/// `alpha >= 1 && beta >= 1` holds for every belief.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BetaBelief {
    pub alpha: f64,
    pub beta: f64,
}

impl Default for BetaBelief {
    fn default() -> Self {
        Self::uniform()
    }
}

impl BetaBelief {
    /// Uninformed prior
    pub fn uniform() -> Self {
        Self {
            alpha: 1.0,
            beta: 1.0,
        }
    }

    /// Create from explicit parameters; both must be finite and at least 1.
    pub fn new(alpha: f64, beta: f64) -> Option<Self> {
        let valid = |x: f64| x.is_finite() && x >= 1.0;
        (valid(alpha) && valid(beta)).then_some(Self { alpha, beta })
    }

    /// Posterior mean alpha / (alpha + beta)
    pub fn mean(&self) -> f64 {
        self.alpha / (self.alpha + self.beta)
    }

    /// Total pseudo-observations
    pub fn evidence(&self) -> f64 {
        self.alpha + self.beta
    }

    /// Apply one reward observation; returns the clamped value actually used.
    pub fn observe(&mut self, reward: f64) -> Result<f64> {
        let r = clamp_reward(reward)?;
        self.alpha += r;
        self.beta += 1.0 - r;
        Ok(r)
    }

    /// Thompson sample from the posterior
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match Beta::new(self.alpha, self.beta) {
            Ok(dist) => dist.sample(rng),
            Err(_) => self.mean(),
        }
    }
}

/// A belief together with the combination it describes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinationBelief {
    pub key: CombinationKey,
    pub alpha: f64,
    pub beta: f64,
}

impl CombinationBelief {
    pub fn new(key: CombinationKey, belief: BetaBelief) -> Self {
        Self {
            key,
            alpha: belief.alpha,
            beta: belief.beta,
        }
    }

    pub fn belief(&self) -> BetaBelief {
        BetaBelief {
            alpha: self.alpha,
            beta: self.beta,
        }
    }

    pub fn mean(&self) -> f64 {
        self.belief().mean()
    }
}

/// Clamp a reward into [0, 1]. NaN cannot be clamped and is rejected.
pub fn clamp_reward(reward: f64) -> Result<f64> {
    if reward.is_nan() {
        return Err(HfbpoError::InvalidReward(reward));
    }
    Ok(reward.clamp(0.0, 1.0))
}
