//! Configuration types for hfbpo.
//!
//! Every section has serde defaults, so a partial TOML file (or none at all)
//! yields a working configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::embedder::DEFAULT_EMBEDDING_DIM;
use crate::reward::{RewardPolicyKind, RewardWeights};

/// Default number of places kept by retrieval
pub const DEFAULT_TOP_K_PLACES: usize = 3;
/// Default number of verbs kept by retrieval
pub const DEFAULT_TOP_K_VERBS: usize = 5;
/// Default number of scenarios kept by retrieval
pub const DEFAULT_TOP_K_SCENARIOS: usize = 5;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HfbpoConfig {
    /// Directory holding the corpus artifacts
    pub corpus_dir: PathBuf,
    /// Durable bandit state file
    pub state_path: PathBuf,
    /// When set, candidate arms are computed once for this topic and reused
    pub fixed_topic: Option<String>,
    pub retrieval: RetrievalConfig,
    pub fallback: FallbackConfig,
    pub embedder: EmbedderConfig,
    pub reward: RewardConfig,
}

impl Default for HfbpoConfig {
    fn default() -> Self {
        Self {
            corpus_dir: hfbpo_paths::corpus_dir(),
            state_path: hfbpo_paths::state_path(),
            fixed_topic: None,
            retrieval: RetrievalConfig::default(),
            fallback: FallbackConfig::default(),
            embedder: EmbedderConfig::default(),
            reward: RewardConfig::default(),
        }
    }
}

/// Shortlist sizes for candidate assembly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k_places: usize,
    pub top_k_verbs: usize,
    pub top_k_scenarios: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k_places: DEFAULT_TOP_K_PLACES,
            top_k_verbs: DEFAULT_TOP_K_VERBS,
            top_k_scenarios: DEFAULT_TOP_K_SCENARIOS,
        }
    }
}

/// Sentinel returned when there is nothing to select from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub place: String,
    pub verb: String,
    pub scenario: String,
    pub estimated_reward: f64,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            place: "default place".into(),
            verb: "default verb".into(),
            scenario: "default scenario".into(),
            estimated_reward: 0.5,
        }
    }
}

/// Topic embedder settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedderConfig {
    /// Vector width; must match the corpus
    pub dimensions: usize,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIM,
        }
    }
}

/// How raw engagement metrics become a reward
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    pub policy: RewardPolicyKind,
    /// Weights for the weighted-blend policy
    pub weights: RewardWeights,
}
