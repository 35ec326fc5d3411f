//! Offline corpus construction from co-occurrence observations
//!
//! Each observation lists the places, verbs and scenarios that appeared
//! together in one historical item. Every place is linked to every verb and
//! scenario of the same observation. Terms are embedded once, in first-seen
//! order, with the same [`TopicEmbedder`] the live process uses for topics.
//!
//! This runs as a separate batch command and shares nothing with the live
//! decision path except the artifacts it writes.

use std::collections::HashSet;
use std::io::BufRead;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::embedder::TopicEmbedder;
use crate::error::{HfbpoError, Result};

use super::loader::{CORPUS_INFO_FILE, CorpusInfo};
use super::{CooccurrenceGraph, Corpus, EmbeddingIndex, GraphKind, ModifierTerm, Pool};

/// One row of observation input
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    #[serde(default)]
    pub places: Vec<String>,
    #[serde(default)]
    pub verbs: Vec<String>,
    #[serde(default)]
    pub scenarios: Vec<String>,
}

/// Row counters from ingestion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    pub rows: usize,
    pub accepted: usize,
    pub skipped: usize,
}

#[derive(Debug, Default)]
struct TermList {
    texts: Vec<String>,
    seen: HashSet<String>,
}

impl TermList {
    fn add(&mut self, text: &str) {
        if self.seen.insert(text.to_string()) {
            self.texts.push(text.to_string());
        }
    }
}

/// Accumulates observations into term lists and graphs
#[derive(Debug, Default)]
pub struct CorpusBuilder {
    places: TermList,
    verbs: TermList,
    scenarios: TermList,
    place_verb: CooccurrenceGraph,
    place_scenario: CooccurrenceGraph,
    stats: BuildStats,
}

fn cleaned(items: &[String]) -> Vec<&str> {
    items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect()
}

impl CorpusBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> BuildStats {
        self.stats
    }

    /// Record one observation. Rows lacking any of the three kinds are
    /// skipped and `false` is returned.
    pub fn add_observation(&mut self, observation: &Observation) -> bool {
        self.stats.rows += 1;

        let places = cleaned(&observation.places);
        let verbs = cleaned(&observation.verbs);
        let scenarios = cleaned(&observation.scenarios);

        if places.is_empty() || verbs.is_empty() || scenarios.is_empty() {
            self.stats.skipped += 1;
            return false;
        }

        for place in &places {
            self.places.add(place);
            for verb in &verbs {
                self.verbs.add(verb);
                self.place_verb.add_edge(*place, *verb);
            }
            for scenario in &scenarios {
                self.scenarios.add(scenario);
                self.place_scenario.add_edge(*place, *scenario);
            }
        }

        self.stats.accepted += 1;
        true
    }

    /// Ingest JSON Lines observations. Blank lines are ignored; lines that do
    /// not parse are logged and counted as skipped.
    pub fn read_jsonl(&mut self, reader: impl BufRead) -> Result<BuildStats> {
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Observation>(&line) {
                Ok(observation) => {
                    self.add_observation(&observation);
                }
                Err(e) => {
                    warn!(line = line_no + 1, error = %e, "Skipping malformed observation");
                    self.stats.rows += 1;
                    self.stats.skipped += 1;
                }
            }
        }
        Ok(self.stats)
    }

    fn terms(&self, pool: Pool) -> &[String] {
        match pool {
            Pool::Place => &self.places.texts,
            Pool::Verb => &self.verbs.texts,
            Pool::Scenario => &self.scenarios.texts,
        }
    }

    fn graph(&self, kind: GraphKind) -> &CooccurrenceGraph {
        match kind {
            GraphKind::PlaceVerb => &self.place_verb,
            GraphKind::PlaceScenario => &self.place_scenario,
        }
    }

    async fn embed_pool(
        &self,
        pool: Pool,
        embedder: &dyn TopicEmbedder,
    ) -> Result<Vec<ModifierTerm>> {
        let texts = self.terms(pool);
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let embeddings = embedder
            .embed_batch(&refs)
            .await
            .map_err(|e| HfbpoError::Embedding(e.to_string()))?;
        debug!(%pool, count = texts.len(), "Embedded terms");

        Ok(texts
            .iter()
            .zip(embeddings)
            .map(|(text, embedding)| ModifierTerm::new(text.clone(), embedding))
            .collect())
    }

    /// Embed all terms and produce an in-memory corpus
    pub async fn build(&self, embedder: &dyn TopicEmbedder) -> Result<Corpus> {
        Corpus::new(
            EmbeddingIndex::new(Pool::Place, self.embed_pool(Pool::Place, embedder).await?)?,
            EmbeddingIndex::new(Pool::Verb, self.embed_pool(Pool::Verb, embedder).await?)?,
            EmbeddingIndex::new(
                Pool::Scenario,
                self.embed_pool(Pool::Scenario, embedder).await?,
            )?,
            self.place_verb.clone(),
            self.place_scenario.clone(),
        )
    }

    /// Embed all terms and write the corpus artifacts into `dir`
    pub async fn write_to(&self, dir: &Path, embedder: &dyn TopicEmbedder) -> Result<CorpusInfo> {
        tokio::fs::create_dir_all(dir).await?;

        for pool in Pool::ALL {
            let terms = self.embed_pool(pool, embedder).await?;
            write_json(&dir.join(pool.file_name()), &terms).await?;
        }
        for kind in [GraphKind::PlaceVerb, GraphKind::PlaceScenario] {
            let edges: Vec<(&str, &str)> = self.graph(kind).edges().collect();
            write_json(&dir.join(kind.file_name()), &edges).await?;
        }

        let info = CorpusInfo {
            places: self.places.texts.len(),
            verbs: self.verbs.texts.len(),
            scenarios: self.scenarios.texts.len(),
            place_verb_edges: self.place_verb.edge_count(),
            place_scenario_edges: self.place_scenario.edge_count(),
            dimensions: Some(embedder.dimensions()),
        };
        write_json(&dir.join(CORPUS_INFO_FILE), &info).await?;

        info!(
            dir = %dir.display(),
            places = info.places,
            verbs = info.verbs,
            scenarios = info.scenarios,
            "Wrote corpus"
        );
        Ok(info)
    }
}

async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let content =
        serde_json::to_string_pretty(value).map_err(|e| HfbpoError::Serialization(e.to_string()))?;
    tokio::fs::write(path, content).await?;
    Ok(())
}
