//! hfbpo-core - Modifier retrieval and combinatorial bandit
//!
//! Recommends a (place, verb, scenario) modifier combination for a topic and
//! learns from delayed engagement feedback. Retrieval narrows the vocabulary
//! with embedding similarity and a co-occurrence graph; a Beta/Thompson
//! sampling bandit over combination keys picks among the candidates and keeps
//! its beliefs in a crash-safe state file.

pub mod bandit;
pub mod config;
pub mod corpus;
pub mod embedder;
pub mod error;
pub mod retrieval;
pub mod reward;
pub mod service;

pub use bandit::{
    BanditStore, BetaBelief, CandidateSet, CombinationBelief, CombinationKey, Durability,
    RankedCombination, SelectionResult, Selector, UpdateOutcome,
};
pub use config::{EmbedderConfig, FallbackConfig, HfbpoConfig, RetrievalConfig, RewardConfig};
pub use corpus::{
    BuildStats, CooccurrenceGraph, Corpus, CorpusBuilder, CorpusInfo, EmbeddingIndex, GraphKind,
    ModifierTerm, Observation, Pool,
};
pub use embedder::{EmbedderError, HashingEmbedder, TopicEmbedder};
pub use error::{HfbpoError, Result};
pub use retrieval::{CandidateAssembler, Retrieval};
pub use reward::{
    EngagementBlend, EngagementMetrics, RewardBreakdown, RewardPolicy, RewardPolicyKind,
    RewardWeights, WeightedBlend,
};
pub use service::{
    ArmListing, ArmState, BatchSummary, ModifierService, Recommendation, RewardRequest,
    ServiceStats,
};
