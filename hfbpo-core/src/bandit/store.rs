//! File-backed store of per-combination beliefs
//!
//! One store per process, shared by reference. All mutation happens under a
//! store-wide write lock that stays held through the flush, so two updates
//! never interleave their read-modify-write-persist sequences and the state
//! file always holds a whole document.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use rand::Rng;
use serde::Serialize;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{HfbpoError, Result};

use super::belief::{BetaBelief, CombinationBelief};
use super::key::CombinationKey;

/// Whether an update reached durable storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Durability {
    /// Flushed to the state file
    Persisted,
    /// Applied in memory only; the flush failed or the store has no file
    MemoryOnly { reason: String },
    /// Nothing changed, nothing to flush
    Unchanged,
}

/// Result of applying one reward
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateOutcome {
    pub key: String,
    /// False when the key was never registered; the store is untouched then
    pub applied: bool,
    /// Reward after clamping to [0, 1]
    pub reward: Option<f64>,
    pub belief: Option<CombinationBelief>,
    pub durability: Durability,
}

impl UpdateOutcome {
    fn rejected(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            applied: false,
            reward: None,
            belief: None,
            durability: Durability::Unchanged,
        }
    }
}

/// One row of the ranking query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCombination {
    pub key: CombinationKey,
    pub place: String,
    pub verb: String,
    pub scenario: String,
    pub mean_reward: f64,
    pub alpha: f64,
    pub beta: f64,
}

/// Growable mapping from combination key to belief, persisted as JSON
pub struct BanditStore {
    beliefs: RwLock<HashMap<CombinationKey, BetaBelief>>,
    state_path: Option<PathBuf>,
    degraded: AtomicBool,
}

impl BanditStore {
    /// Open the store backed by `path`, merging any persisted beliefs.
    ///
    /// A missing file starts an empty store. A file that cannot be parsed is
    /// an error: overwriting it on the next flush would discard learned state.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let beliefs = load_state(&path).await?;
        info!(path = %path.display(), count = beliefs.len(), "Opened bandit store");

        Ok(Self {
            beliefs: RwLock::new(beliefs),
            state_path: Some(path),
            degraded: AtomicBool::new(false),
        })
    }

    /// A store without durable storage
    pub fn in_memory() -> Self {
        Self {
            beliefs: RwLock::new(HashMap::new()),
            state_path: None,
            degraded: AtomicBool::new(false),
        }
    }

    pub fn state_path(&self) -> Option<&Path> {
        self.state_path.as_deref()
    }

    /// True after a failed flush, until the next successful one
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.beliefs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.beliefs.read().await.is_empty()
    }

    pub async fn get(&self, key: &CombinationKey) -> Option<CombinationBelief> {
        let beliefs = self.beliefs.read().await;
        beliefs
            .get(key)
            .map(|b| CombinationBelief::new(key.clone(), *b))
    }

    /// Return the belief for `key`, registering a uniform prior if unseen.
    pub async fn ensure(&self, key: &CombinationKey) -> CombinationBelief {
        self.ensure_all(std::slice::from_ref(key)).await;
        let beliefs = self.beliefs.read().await;
        let belief = beliefs.get(key).copied().unwrap_or_default();
        CombinationBelief::new(key.clone(), belief)
    }

    /// Register every unseen key with a uniform prior.
    ///
    /// Existing beliefs are never touched. When anything new was registered
    /// the state is flushed once, so feedback for these keys stays
    /// attributable across a restart. Returns the number of new keys.
    pub async fn ensure_all(&self, keys: &[CombinationKey]) -> usize {
        {
            let beliefs = self.beliefs.read().await;
            if keys.iter().all(|k| beliefs.contains_key(k)) {
                return 0;
            }
        }

        let mut beliefs = self.beliefs.write().await;
        let mut added = 0;
        for key in keys {
            if !beliefs.contains_key(key) {
                beliefs.insert(key.clone(), BetaBelief::uniform());
                added += 1;
            }
        }

        if added > 0 {
            debug!(added, total = beliefs.len(), "Registered combinations");
            // A failed flush is logged there; registration stays in memory
            self.flush(&beliefs).await;
        }
        added
    }

    /// Consistent read of several beliefs; `None` for unregistered keys
    pub async fn snapshot(&self, keys: &[CombinationKey]) -> Vec<Option<BetaBelief>> {
        let beliefs = self.beliefs.read().await;
        keys.iter().map(|k| beliefs.get(k).copied()).collect()
    }

    /// Draw one Thompson sample for `key` using the thread-local RNG
    pub async fn sample(&self, key: &CombinationKey) -> Option<f64> {
        self.sample_with(key, &mut rand::thread_rng()).await
    }

    /// Draw one Thompson sample for `key` from the given RNG
    pub async fn sample_with<R: Rng + ?Sized>(
        &self,
        key: &CombinationKey,
        rng: &mut R,
    ) -> Option<f64> {
        let belief = self.beliefs.read().await.get(key).copied()?;
        Some(belief.sample(rng))
    }

    /// Apply a reward to a registered combination.
    ///
    /// The reward is clamped to [0, 1]. Unknown keys are rejected with
    /// `applied: false` instead of being created, so feedback can only land on
    /// combinations that were actually offered. A failed flush keeps the
    /// in-memory change and reports `Durability::MemoryOnly`.
    pub async fn update(&self, key: &CombinationKey, reward: f64) -> Result<UpdateOutcome> {
        let mut beliefs = self.beliefs.write().await;

        let Some(belief) = beliefs.get_mut(key) else {
            warn!(key = %key, reward, "Reward for unknown combination ignored");
            return Ok(UpdateOutcome::rejected(key.as_str()));
        };

        let applied = belief.observe(reward)?;
        let updated = *belief;
        info!(
            key = %key,
            reward = applied,
            alpha = updated.alpha,
            beta = updated.beta,
            "Updated combination"
        );

        let durability = self.flush(&beliefs).await;
        Ok(UpdateOutcome {
            key: key.to_string(),
            applied: true,
            reward: Some(applied),
            belief: Some(CombinationBelief::new(key.clone(), updated)),
            durability,
        })
    }

    /// Apply a reward addressed by its serialized key.
    ///
    /// A string that is not a valid key cannot name a registered combination
    /// and is rejected the same way as an unknown key.
    pub async fn update_raw(&self, key: &str, reward: f64) -> Result<UpdateOutcome> {
        match CombinationKey::parse(key) {
            Ok(parsed) => self.update(&parsed, reward).await,
            Err(_) => {
                warn!(key, reward, "Reward for malformed combination key ignored");
                Ok(UpdateOutcome::rejected(key))
            }
        }
    }

    /// Top `n` combinations by posterior mean, ties by key
    pub async fn top_n(&self, n: usize) -> Vec<RankedCombination> {
        let beliefs = self.beliefs.read().await;
        let mut ranked: Vec<RankedCombination> = beliefs
            .iter()
            .map(|(key, b)| {
                let (place, verb, scenario) = key.parts();
                RankedCombination {
                    key: key.clone(),
                    place: place.to_string(),
                    verb: verb.to_string(),
                    scenario: scenario.to_string(),
                    mean_reward: b.mean(),
                    alpha: b.alpha,
                    beta: b.beta,
                }
            })
            .collect();
        drop(beliefs);

        ranked.sort_by(|a, b| {
            b.mean_reward
                .total_cmp(&a.mean_reward)
                .then_with(|| a.key.cmp(&b.key))
        });
        ranked.truncate(n);
        ranked
    }

    /// Write the whole document. Caller holds the write lock.
    async fn flush(&self, beliefs: &HashMap<CombinationKey, BetaBelief>) -> Durability {
        let Some(path) = &self.state_path else {
            return Durability::MemoryOnly {
                reason: "store has no state file".into(),
            };
        };

        match write_state(path, beliefs).await {
            Ok(()) => {
                if self.degraded.swap(false, Ordering::SeqCst) {
                    info!(path = %path.display(), "Bandit state persisted again");
                }
                Durability::Persisted
            }
            Err(e) => {
                self.degraded.store(true, Ordering::SeqCst);
                warn!(path = %path.display(), error = %e, "Failed to persist bandit state");
                Durability::MemoryOnly {
                    reason: e.to_string(),
                }
            }
        }
    }
}

async fn load_state(path: &Path) -> Result<HashMap<CombinationKey, BetaBelief>> {
    if !fs::try_exists(path).await? {
        return Ok(HashMap::new());
    }

    let content = fs::read_to_string(path).await?;
    let raw: BTreeMap<String, BetaBelief> =
        serde_json::from_str(&content).map_err(|e| HfbpoError::StateCorrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let mut beliefs = HashMap::with_capacity(raw.len());
    for (key, belief) in raw {
        let Ok(parsed) = CombinationKey::parse(&key) else {
            warn!(key, "Skipping persisted belief with malformed key");
            continue;
        };
        let Some(valid) = BetaBelief::new(belief.alpha, belief.beta) else {
            warn!(key, alpha = belief.alpha, beta = belief.beta, "Skipping invalid persisted belief");
            continue;
        };
        beliefs.insert(parsed, valid);
    }
    Ok(beliefs)
}

async fn write_state(path: &Path, beliefs: &HashMap<CombinationKey, BetaBelief>) -> Result<()> {
    let document: BTreeMap<&str, &BetaBelief> =
        beliefs.iter().map(|(k, b)| (k.as_str(), b)).collect();
    let content = serde_json::to_string_pretty(&document)
        .map_err(|e| HfbpoError::Serialization(e.to_string()))?;

    let persist_err = |e: std::io::Error| HfbpoError::PersistenceWrite {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(persist_err)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, content).await.map_err(persist_err)?;
    fs::rename(&tmp, path).await.map_err(persist_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn key(s: &str) -> CombinationKey {
        CombinationKey::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_ensure_creates_uniform_prior() {
        let store = BanditStore::in_memory();
        let belief = store.ensure(&key("cafe|pan|cozy")).await;
        assert_eq!(belief.alpha, 1.0);
        assert_eq!(belief.beta, 1.0);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_ensure_is_idempotent() {
        let store = BanditStore::in_memory();
        let k = key("cafe|pan|cozy");
        store.ensure(&k).await;
        store.update(&k, 0.8).await.unwrap();
        let before = store.get(&k).await.unwrap();

        let again = store.ensure(&k).await;
        assert_eq!(again, before);
        assert_eq!(store.ensure_all(std::slice::from_ref(&k)).await, 0);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_update_unknown_key_not_applied() {
        let store = BanditStore::in_memory();
        store.ensure(&key("a|b|c")).await;

        let outcome = store.update(&key("x|y|z"), 0.9).await.unwrap();
        assert!(!outcome.applied);
        assert_eq!(outcome.durability, Durability::Unchanged);
        assert_eq!(store.len().await, 1);
        assert!(store.get(&key("x|y|z")).await.is_none());
    }

    #[tokio::test]
    async fn test_update_raw_rejects_malformed_key() {
        let store = BanditStore::in_memory();
        let outcome = store.update_raw("not-a-key", 0.5).await.unwrap();
        assert!(!outcome.applied);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_update_then_opposite_reward() {
        let store = BanditStore::in_memory();
        let k = key("castle|pan|dreamy");
        store.ensure(&k).await;
        store.update(&k, 1.0).await.unwrap();
        let outcome = store.update(&k, 0.0).await.unwrap();

        let belief = outcome.belief.unwrap();
        assert_eq!((belief.alpha, belief.beta), (2.0, 2.0));
        assert!((belief.mean() - 0.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_update_clamps_reward() {
        let store = BanditStore::in_memory();
        let k = key("a|b|c");
        store.ensure(&k).await;

        let outcome = store.update(&k, 7.0).await.unwrap();
        assert_eq!(outcome.reward, Some(1.0));
        let outcome = store.update(&k, -1.0).await.unwrap();
        assert_eq!(outcome.reward, Some(0.0));
    }

    #[tokio::test]
    async fn test_nan_reward_is_error() {
        let store = BanditStore::in_memory();
        let k = key("a|b|c");
        store.ensure(&k).await;
        assert!(store.update(&k, f64::NAN).await.is_err());
        assert_eq!(store.get(&k).await.unwrap().alpha, 1.0);
    }

    #[tokio::test]
    async fn test_in_memory_update_reports_memory_only() {
        let store = BanditStore::in_memory();
        let k = key("a|b|c");
        store.ensure(&k).await;
        let outcome = store.update(&k, 0.5).await.unwrap();
        assert!(matches!(outcome.durability, Durability::MemoryOnly { .. }));
        assert!(!store.is_degraded());
    }

    #[tokio::test]
    async fn test_top_n_sorted_with_key_tiebreak() {
        let store = BanditStore::in_memory();
        for k in ["b|v|s", "a|v|s", "c|v|s"] {
            store.ensure(&key(k)).await;
        }
        store.update(&key("c|v|s"), 1.0).await.unwrap();

        let top = store.top_n(10).await;
        let keys: Vec<&str> = top.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["c|v|s", "a|v|s", "b|v|s"]);
        assert_eq!(top[0].place, "c");
        assert!((top[0].mean_reward - 2.0 / 3.0).abs() < 1e-12);

        assert_eq!(store.top_n(1).await.len(), 1);
    }

    #[tokio::test]
    async fn test_sample_unknown_key_is_none() {
        let store = BanditStore::in_memory();
        assert!(store.sample(&key("a|b|c")).await.is_none());
        store.ensure(&key("a|b|c")).await;
        let s = store.sample(&key("a|b|c")).await.unwrap();
        assert!((0.0..=1.0).contains(&s));
    }

    #[tokio::test]
    async fn test_state_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state/bandit.json");
        let k = key("harbor|dolly in|calm");

        {
            let store = BanditStore::open(&path).await.unwrap();
            store.ensure(&k).await;
            let outcome = store.update(&k, 0.25).await.unwrap();
            assert_eq!(outcome.durability, Durability::Persisted);
        }

        let reopened = BanditStore::open(&path).await.unwrap();
        let belief = reopened.get(&k).await.unwrap();
        assert!((belief.alpha - 1.25).abs() < 1e-12);
        assert!((belief.beta - 1.75).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_registered_keys_survive_restart() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bandit.json");
        let k = key("a|b|c");

        BanditStore::open(&path).await.unwrap().ensure(&k).await;

        let reopened = BanditStore::open(&path).await.unwrap();
        assert!(reopened.update(&k, 1.0).await.unwrap().applied);
    }

    #[tokio::test]
    async fn test_state_file_is_sorted_plain_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bandit.json");
        let store = BanditStore::open(&path).await.unwrap();
        store.ensure_all(&[key("b|v|s"), key("a|v|s")]).await;

        let content = std::fs::read_to_string(&path).unwrap();
        let a = content.find("a|v|s").unwrap();
        let b = content.find("b|v|s").unwrap();
        assert!(a < b);
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed["a|v|s"]["alpha"], 1.0);
    }

    #[tokio::test]
    async fn test_corrupt_state_fails_open() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bandit.json");
        std::fs::write(&path, "[1, 2").unwrap();

        assert!(matches!(
            BanditStore::open(&path).await,
            Err(HfbpoError::StateCorrupt { .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_entries_skipped_on_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bandit.json");
        std::fs::write(
            &path,
            r#"{
                "a|b|c": {"alpha": 3.0, "beta": 1.0},
                "bad key": {"alpha": 1.0, "beta": 1.0},
                "x|y|z": {"alpha": 0.2, "beta": 1.0}
            }"#,
        )
        .unwrap();

        let store = BanditStore::open(&path).await.unwrap();
        assert_eq!(store.len().await, 1);
        assert_eq!(store.get(&key("a|b|c")).await.unwrap().alpha, 3.0);
    }

    #[tokio::test]
    async fn test_failed_flush_keeps_mutation_and_degrades() {
        let dir = tempdir().unwrap();
        // A directory where the state file should be makes the rename fail
        let path = dir.path().join("bandit.json");
        let store = BanditStore::open(&path).await.unwrap();
        std::fs::create_dir_all(path.join("occupied")).unwrap();

        let k = key("a|b|c");
        store.ensure(&k).await;
        assert!(store.is_degraded());

        let outcome = store.update(&k, 1.0).await.unwrap();
        assert!(outcome.applied);
        assert!(matches!(outcome.durability, Durability::MemoryOnly { .. }));
        assert_eq!(store.get(&k).await.unwrap().alpha, 2.0);
        assert!(store.is_degraded());

        std::fs::remove_dir_all(&path).unwrap();
        let outcome = store.update(&k, 0.0).await.unwrap();
        assert_eq!(outcome.durability, Durability::Persisted);
        assert!(!store.is_degraded());
    }
}
