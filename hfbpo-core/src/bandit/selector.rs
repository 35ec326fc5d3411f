//! Thompson-sampling selection over a candidate set

use std::sync::{Arc, Mutex, PoisonError};

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tracing::debug;

use crate::config::FallbackConfig;

use super::key::CombinationKey;
use super::store::BanditStore;

/// Transient list of combination keys eligible for one request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CandidateSet {
    keys: Vec<CombinationKey>,
}

impl CandidateSet {
    pub fn new(keys: Vec<CombinationKey>) -> Self {
        Self { keys }
    }

    pub fn keys(&self) -> &[CombinationKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl FromIterator<CombinationKey> for CandidateSet {
    fn from_iter<I: IntoIterator<Item = CombinationKey>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Outcome of one selection.
///
/// `key` is `None` only for the sentinel, which carries the configured
/// default texts and must not be rewarded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionResult {
    pub key: Option<CombinationKey>,
    pub place: String,
    pub verb: String,
    pub scenario: String,
    /// The winning Thompson sample, not the posterior mean
    pub estimated_reward: f64,
    pub candidates_count: usize,
}

impl SelectionResult {
    pub fn sentinel(fallback: &FallbackConfig) -> Self {
        Self {
            key: None,
            place: fallback.place.clone(),
            verb: fallback.verb.clone(),
            scenario: fallback.scenario.clone(),
            estimated_reward: fallback.estimated_reward,
            candidates_count: 0,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.key.is_none()
    }
}

/// Picks one combination per request by Thompson sampling.
///
/// The RNG lives here and nowhere else; seed it with [`Selector::with_seed`]
/// for reproducible runs.
pub struct Selector {
    store: Arc<BanditStore>,
    rng: Mutex<StdRng>,
    fallback: FallbackConfig,
}

impl Selector {
    pub fn new(store: Arc<BanditStore>, fallback: FallbackConfig) -> Self {
        Self {
            store,
            rng: Mutex::new(StdRng::from_entropy()),
            fallback,
        }
    }

    pub fn with_seed(store: Arc<BanditStore>, fallback: FallbackConfig, seed: u64) -> Self {
        Self {
            store,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            fallback,
        }
    }

    pub fn store(&self) -> &Arc<BanditStore> {
        &self.store
    }

    pub fn fallback(&self) -> &FallbackConfig {
        &self.fallback
    }

    /// Register unseen candidates, draw one sample per candidate and return
    /// the arg-max. Ties go to the candidate listed first.
    pub async fn select(&self, candidates: &CandidateSet) -> SelectionResult {
        if candidates.is_empty() {
            debug!("Empty candidate set, returning sentinel");
            return SelectionResult::sentinel(&self.fallback);
        }

        let keys = candidates.keys();
        self.store.ensure_all(keys).await;
        let beliefs = self.store.snapshot(keys).await;

        let samples: Vec<f64> = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            beliefs
                .iter()
                .map(|belief| belief.unwrap_or_default().sample(&mut *rng))
                .collect()
        };
        let best = first_max(samples.into_iter().enumerate());

        let Some((index, sample)) = best else {
            return SelectionResult::sentinel(&self.fallback);
        };
        let key = keys[index].clone();
        let (place, verb, scenario) = key.parts();
        debug!(key = %key, sample, candidates = keys.len(), "Selected combination");

        SelectionResult {
            place: place.to_string(),
            verb: verb.to_string(),
            scenario: scenario.to_string(),
            key: Some(key),
            estimated_reward: sample,
            candidates_count: keys.len(),
        }
    }
}

/// Highest sample with its index. A later sample must be strictly greater to
/// win, so equal samples resolve to the earliest.
fn first_max(samples: impl IntoIterator<Item = (usize, f64)>) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (i, sample) in samples {
        if best.is_none_or(|(_, top)| sample > top) {
            best = Some((i, sample));
        }
    }
    best
}
