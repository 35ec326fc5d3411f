//! Recommendation service
//!
//! Wires the topic embedder, candidate assembler, selector and bandit store
//! into the operations callers actually use: recommend a combination for a
//! topic, feed rewards back, and inspect what has been learned.
//!
//! In fixed-topic mode the candidate arms are retrieved once at construction
//! and every recommendation samples from that same set.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::bandit::{
    BanditStore, CandidateSet, RankedCombination, SelectionResult, Selector, UpdateOutcome,
};
use crate::config::{HfbpoConfig, RetrievalConfig};
use crate::corpus::{Corpus, CorpusInfo};
use crate::embedder::TopicEmbedder;
use crate::error::{HfbpoError, Result};
use crate::retrieval::{CandidateAssembler, Retrieval};
use crate::reward::{EngagementMetrics, RewardPolicy};

/// Candidate arms precomputed for the configured topic
#[derive(Debug, Clone)]
struct FixedArms {
    topic: String,
    retrieval: Retrieval,
}

/// A selection plus the context it was made in
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub topic: String,
    #[serde(flatten)]
    pub selection: SelectionResult,
    /// Whether the arms came from the fixed-topic set
    pub fixed_arms: bool,
    /// Why the sentinel was returned when retrieval could not run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded_reason: Option<String>,
}

/// One entry of a batch reward request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardRequest {
    pub key: String,
    pub reward: f64,
}

/// Result of a batch reward application
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub applied: usize,
    pub ignored: usize,
    pub outcomes: Vec<UpdateOutcome>,
    /// Entries rejected outright, such as NaN rewards
    pub errors: Vec<String>,
}

/// Current belief for one arm of a listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArmState {
    pub key: String,
    pub alpha: f64,
    pub beta: f64,
    pub mean_reward: f64,
    /// False when the arm has never been offered to the store
    pub registered: bool,
}

/// Arms available for a topic
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArmListing {
    pub topic: String,
    pub fixed_arms: bool,
    pub places: Vec<String>,
    pub verbs: Vec<String>,
    pub scenarios: Vec<String>,
    pub arms: Vec<ArmState>,
}

/// Summary of the service and its learned state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceStats {
    pub fixed_topic: Option<String>,
    pub fixed_arm_count: usize,
    pub learned_combinations: usize,
    pub degraded: bool,
    pub state_path: Option<PathBuf>,
    pub corpus: CorpusInfo,
    pub top: Vec<RankedCombination>,
}

/// Facade over retrieval and the bandit
pub struct ModifierService {
    embedder: Arc<dyn TopicEmbedder>,
    assembler: CandidateAssembler,
    selector: Selector,
    store: Arc<BanditStore>,
    retrieval: RetrievalConfig,
    policy: Box<dyn RewardPolicy>,
    fixed: Option<FixedArms>,
}

impl ModifierService {
    /// Build a service for dynamic topics. Use [`with_fixed_topic`] or
    /// [`from_config`] for fixed-topic mode.
    ///
    /// [`with_fixed_topic`]: Self::with_fixed_topic
    /// [`from_config`]: Self::from_config
    pub fn new(
        corpus: Arc<Corpus>,
        store: Arc<BanditStore>,
        embedder: Arc<dyn TopicEmbedder>,
        config: &HfbpoConfig,
    ) -> Self {
        let corpus_dims = corpus.dimensions();
        if corpus_dims.is_some_and(|dims| dims != embedder.dimensions()) {
            warn!(
                corpus = ?corpus_dims,
                embedder = embedder.dimensions(),
                "Embedder and corpus dimensions differ; recommendations will fall back"
            );
        }

        Self {
            selector: Selector::new(Arc::clone(&store), config.fallback.clone()),
            assembler: CandidateAssembler::new(corpus),
            embedder,
            store,
            retrieval: config.retrieval,
            policy: config.reward.policy.build(config.reward.weights),
            fixed: None,
        }
    }

    /// Build a service and, if the configuration names a fixed topic,
    /// precompute its arms.
    pub async fn from_config(
        corpus: Arc<Corpus>,
        store: Arc<BanditStore>,
        embedder: Arc<dyn TopicEmbedder>,
        config: &HfbpoConfig,
    ) -> Result<Self> {
        let service = Self::new(corpus, store, embedder, config);
        match config.fixed_topic.as_deref().map(str::trim) {
            Some(topic) if !topic.is_empty() => service.with_fixed_topic(topic).await,
            _ => Ok(service),
        }
    }

    /// Retrieve the arms for `topic` once and reuse them for every request.
    ///
    /// Embedding failures here are errors rather than a fallback, since the
    /// service would otherwise run without the arms it was configured for.
    pub async fn with_fixed_topic(mut self, topic: &str) -> Result<Self> {
        let retrieval = self
            .assemble_candidates(
                topic,
                self.retrieval.top_k_places,
                self.retrieval.top_k_verbs,
                self.retrieval.top_k_scenarios,
            )
            .await?;
        info!(topic, arms = retrieval.candidates.len(), "Fixed arms initialized");
        if retrieval.is_empty() {
            warn!(topic, "Fixed topic produced no arms; falling back to dynamic retrieval");
        }

        self.fixed = Some(FixedArms {
            topic: topic.to_string(),
            retrieval,
        });
        Ok(self)
    }

    /// Replace the selector RNG with a seeded one
    pub fn with_seed(mut self, seed: u64) -> Self {
        let fallback = self.selector.fallback().clone();
        self.selector = Selector::with_seed(Arc::clone(&self.store), fallback, seed);
        self
    }

    pub fn store(&self) -> &Arc<BanditStore> {
        &self.store
    }

    pub fn fixed_topic(&self) -> Option<&str> {
        self.fixed.as_ref().map(|f| f.topic.as_str())
    }

    fn active_fixed(&self) -> Option<&FixedArms> {
        self.fixed.as_ref().filter(|f| !f.retrieval.is_empty())
    }

    fn resolve_topic(&self, topic: Option<&str>) -> Result<String> {
        topic
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .or(self.fixed_topic())
            .map(str::to_string)
            .ok_or(HfbpoError::MissingTopic)
    }

    /// Embed `topic` and assemble its candidate set
    pub async fn assemble_candidates(
        &self,
        topic: &str,
        k_places: usize,
        k_verbs: usize,
        k_scenarios: usize,
    ) -> Result<Retrieval> {
        let embedding = self
            .embedder
            .embed(topic)
            .await
            .map_err(|e| HfbpoError::Embedding(e.to_string()))?;
        self.assembler
            .assemble(&embedding, k_places, k_verbs, k_scenarios)
    }

    /// Recommend a combination using the configured shortlist sizes
    pub async fn recommend(&self, topic: Option<&str>) -> Result<Recommendation> {
        self.recommend_with(topic, self.retrieval).await
    }

    /// Recommend a combination.
    ///
    /// With active fixed arms the topic is ignored. Otherwise the topic is
    /// required; an embedding failure or a topic of the wrong dimension
    /// yields the sentinel with `degraded_reason` set.
    pub async fn recommend_with(
        &self,
        topic: Option<&str>,
        retrieval: RetrievalConfig,
    ) -> Result<Recommendation> {
        let topic = self.resolve_topic(topic)?;

        if let Some(fixed) = self.active_fixed() {
            if topic != fixed.topic {
                debug!(requested = %topic, fixed = %fixed.topic, "Using fixed arms");
            }
            let selection = self.selector.select(&fixed.retrieval.candidates).await;
            return Ok(Recommendation {
                topic: fixed.topic.clone(),
                selection,
                fixed_arms: true,
                degraded_reason: None,
            });
        }

        let (candidates, degraded_reason) = match self
            .assemble_candidates(
                &topic,
                retrieval.top_k_places,
                retrieval.top_k_verbs,
                retrieval.top_k_scenarios,
            )
            .await
        {
            Ok(r) => (r.candidates, None),
            Err(e @ (HfbpoError::Embedding(_) | HfbpoError::DimensionMismatch { .. })) => {
                warn!(topic = %topic, error = %e, "Retrieval failed, returning fallback");
                (CandidateSet::default(), Some(e.to_string()))
            }
            Err(e) => return Err(e),
        };

        let selection = self.selector.select(&candidates).await;
        Ok(Recommendation {
            topic,
            selection,
            fixed_arms: false,
            degraded_reason,
        })
    }

    /// Apply a reward in `[0, 1]` to a serialized key
    pub async fn apply_reward(&self, key: &str, reward: f64) -> Result<UpdateOutcome> {
        self.store.update_raw(key, reward).await
    }

    /// Convert raw metrics with the configured policy and apply the result
    pub async fn apply_metrics(
        &self,
        key: &str,
        metrics: &EngagementMetrics,
    ) -> Result<UpdateOutcome> {
        let reward = self.policy.reward(metrics);
        debug!(key, reward, "Computed reward from metrics");
        self.apply_reward(key, reward).await
    }

    /// Apply several rewards in order. One bad entry does not stop the rest.
    pub async fn apply_rewards(&self, requests: &[RewardRequest]) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for request in requests {
            match self.apply_reward(&request.key, request.reward).await {
                Ok(outcome) => {
                    if outcome.applied {
                        summary.applied += 1;
                    } else {
                        summary.ignored += 1;
                    }
                    summary.outcomes.push(outcome);
                }
                Err(e) => {
                    warn!(key = %request.key, error = %e, "Batch reward entry rejected");
                    summary.errors.push(format!("{}: {e}", request.key));
                }
            }
        }
        info!(
            applied = summary.applied,
            ignored = summary.ignored,
            rejected = summary.errors.len(),
            "Applied batch rewards"
        );
        summary
    }

    /// Best combinations by posterior mean
    pub async fn top_combinations(&self, n: usize) -> Vec<RankedCombination> {
        self.store.top_n(n).await
    }

    /// List the arms for a topic with their current beliefs, without
    /// registering anything.
    pub async fn arms(&self, topic: Option<&str>) -> Result<ArmListing> {
        let (topic, retrieval, fixed_arms) = match self.active_fixed() {
            Some(fixed) => (fixed.topic.clone(), fixed.retrieval.clone(), true),
            None => {
                let topic = self.resolve_topic(topic)?;
                let retrieval = self
                    .assemble_candidates(
                        &topic,
                        self.retrieval.top_k_places,
                        self.retrieval.top_k_verbs,
                        self.retrieval.top_k_scenarios,
                    )
                    .await?;
                (topic, retrieval, false)
            }
        };

        let keys = retrieval.candidates.keys();
        let beliefs = self.store.snapshot(keys).await;
        let arms = keys
            .iter()
            .zip(beliefs)
            .map(|(key, belief)| {
                let b = belief.unwrap_or_default();
                ArmState {
                    key: key.to_string(),
                    alpha: b.alpha,
                    beta: b.beta,
                    mean_reward: b.mean(),
                    registered: belief.is_some(),
                }
            })
            .collect();

        Ok(ArmListing {
            topic,
            fixed_arms,
            places: retrieval.places,
            verbs: retrieval.verbs,
            scenarios: retrieval.scenarios,
            arms,
        })
    }

    /// Service summary with the top `n` combinations
    pub async fn stats(&self, n: usize) -> ServiceStats {
        ServiceStats {
            fixed_topic: self.fixed_topic().map(str::to_string),
            fixed_arm_count: self
                .fixed
                .as_ref()
                .map_or(0, |f| f.retrieval.candidates.len()),
            learned_combinations: self.store.len().await,
            degraded: self.store.is_degraded(),
            state_path: self.store.state_path().map(PathBuf::from),
            corpus: self.assembler.corpus().info(),
            top: self.store.top_n(n).await,
        }
    }
}
