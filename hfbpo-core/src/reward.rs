//! Reward policies
//!
//! Turn raw engagement metrics for a published item into the scalar reward in
//! `[0, 1]` that the bandit consumes. The bandit itself never looks at raw
//! metrics, so policies can change without touching learned state.

use serde::{Deserialize, Serialize};

/// Raw engagement counters for one published item.
///
/// Missing fields default to zero, so partial reports parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngagementMetrics {
    pub views: u64,
    pub impressions: u64,
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
    /// Average share of the item watched, either as a fraction or a percentage
    #[serde(alias = "average_watch_percentage")]
    pub avg_view_percentage: f64,
    pub subscribers_gained: u64,
    pub subscribers_lost: u64,
    /// Mean comment sentiment in `[-1, 1]`
    pub sentiment_mean: f64,
}

impl EngagementMetrics {
    /// Watch share as a fraction; values above 1 are read as percentages
    fn retention(&self) -> f64 {
        let pct = self.avg_view_percentage;
        let fraction = if pct > 1.0 { pct / 100.0 } else { pct };
        unit(fraction)
    }

    fn interactions(&self) -> f64 {
        (self.likes + self.comments + self.shares) as f64
    }
}

fn unit(x: f64) -> f64 {
    if x.is_nan() { 0.0 } else { x.clamp(0.0, 1.0) }
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

/// Maps metrics to a reward in `[0, 1]`
pub trait RewardPolicy: Send + Sync {
    fn reward(&self, metrics: &EngagementMetrics) -> f64;
}

/// Which policy the service applies to raw metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardPolicyKind {
    /// [`WeightedBlend`]
    #[default]
    WeightedBlend,
    /// [`EngagementBlend`]
    EngagementBlend,
}

impl RewardPolicyKind {
    pub fn build(self, weights: RewardWeights) -> Box<dyn RewardPolicy> {
        match self {
            Self::WeightedBlend => Box::new(WeightedBlend::new(weights)),
            Self::EngagementBlend => Box::new(EngagementBlend),
        }
    }
}

/// Weights of the five factors in [`WeightedBlend`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardWeights {
    pub ctr: f64,
    pub retention: f64,
    pub engagement: f64,
    pub sentiment: f64,
    pub subscriber: f64,
}

impl Default for RewardWeights {
    fn default() -> Self {
        Self {
            ctr: 0.2,
            retention: 0.4,
            engagement: 0.2,
            sentiment: 0.1,
            subscriber: 0.1,
        }
    }
}

/// Weighted sum of click-through, retention, interaction rate, sentiment and
/// net subscriber growth, each normalized to `[0, 1]`.
///
/// An item with no views earns nothing.
#[derive(Debug, Clone, Default)]
pub struct WeightedBlend {
    weights: RewardWeights,
}

impl WeightedBlend {
    pub fn new(weights: RewardWeights) -> Self {
        Self { weights }
    }
}

impl RewardPolicy for WeightedBlend {
    fn reward(&self, m: &EngagementMetrics) -> f64 {
        if m.views == 0 {
            return 0.0;
        }
        let views = m.views as f64;

        let ctr = if m.impressions > 0 {
            unit(views / m.impressions as f64)
        } else {
            0.0
        };
        let engagement = unit(m.interactions() / views);
        let sentiment = unit((m.sentiment_mean + 1.0) / 2.0);
        let net_subs = m.subscribers_gained as f64 - m.subscribers_lost as f64;
        // Net growth per view is tiny; scale so 10% of views subscribing saturates
        let subscriber = unit((net_subs / views * 10.0).max(0.0));

        let w = &self.weights;
        unit(
            w.ctr * ctr
                + w.retention * m.retention()
                + w.engagement * engagement
                + w.sentiment * sentiment
                + w.subscriber * subscriber,
        )
    }
}

/// Per-factor contributions of [`EngagementBlend`], already weighted
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RewardBreakdown {
    pub reward: f64,
    pub ctr: f64,
    pub watch: f64,
    pub engagement: f64,
    pub growth: f64,
}

/// Four-factor blend with saturating targets.
///
/// Interaction rate saturates at 5% of views, weighted interactions
/// (comments x5, shares x10) at 10%, watch share at 100% and subscriber gain
/// at 10. Weights are 0.2 / 0.4 / 0.2 / 0.2.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngagementBlend;

impl EngagementBlend {
    const W_CTR: f64 = 0.2;
    const W_WATCH: f64 = 0.4;
    const W_ENGAGEMENT: f64 = 0.2;
    const W_GROWTH: f64 = 0.2;

    /// Score with each weighted component rounded to four decimals
    pub fn breakdown(&self, m: &EngagementMetrics) -> RewardBreakdown {
        let (ctr, engagement) = if m.views > 0 {
            let views = m.views as f64;
            let weighted = (m.likes + m.comments * 5 + m.shares * 10) as f64;
            (
                (m.interactions() / views / 0.05).min(1.0),
                (weighted / views / 0.1).min(1.0),
            )
        } else {
            (0.0, 0.0)
        };
        let watch = unit(m.avg_view_percentage / 100.0);
        let growth = (m.subscribers_gained as f64 / 10.0).min(1.0);

        let reward = Self::W_CTR * ctr
            + Self::W_WATCH * watch
            + Self::W_ENGAGEMENT * engagement
            + Self::W_GROWTH * growth;

        RewardBreakdown {
            reward: round4(unit(reward)),
            ctr: round4(ctr * Self::W_CTR),
            watch: round4(watch * Self::W_WATCH),
            engagement: round4(engagement * Self::W_ENGAGEMENT),
            growth: round4(growth * Self::W_GROWTH),
        }
    }
}

impl RewardPolicy for EngagementBlend {
    fn reward(&self, metrics: &EngagementMetrics) -> f64 {
        self.breakdown(metrics).reward
    }
}
