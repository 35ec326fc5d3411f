//! Loading corpus artifacts from a directory

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use tokio::fs;
use tracing::{debug, info};

use crate::error::{HfbpoError, Result};

use super::{CooccurrenceGraph, Corpus, EmbeddingIndex, GraphKind, ModifierTerm, Pool};

/// Informational summary written next to the artifacts
pub const CORPUS_INFO_FILE: &str = "corpus_info.json";

/// Sizes of a corpus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusInfo {
    pub places: usize,
    pub verbs: usize,
    pub scenarios: usize,
    pub place_verb_edges: usize,
    pub place_scenario_edges: usize,
    pub dimensions: Option<usize>,
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let corpus_err = |reason: String| HfbpoError::Corpus {
        path: path.to_path_buf(),
        reason,
    };
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| corpus_err(e.to_string()))?;
    serde_json::from_str(&content).map_err(|e| corpus_err(e.to_string()))
}

async fn load_pool(dir: &Path, pool: Pool) -> Result<EmbeddingIndex> {
    let terms: Vec<ModifierTerm> = read_json(&dir.join(pool.file_name())).await?;
    debug!(%pool, count = terms.len(), "Loaded terms");
    EmbeddingIndex::new(pool, terms)
}

async fn load_graph(dir: &Path, kind: GraphKind) -> Result<CooccurrenceGraph> {
    let edges: Vec<(String, String)> = read_json(&dir.join(kind.file_name())).await?;
    debug!(%kind, count = edges.len(), "Loaded edges");
    Ok(CooccurrenceGraph::from_edges(edges))
}

impl Corpus {
    /// Load every artifact from `dir`.
    ///
    /// All five artifact files must be present; a missing or malformed file,
    /// a dimension mismatch or a duplicate term fails the whole load.
    pub async fn load(dir: &Path) -> Result<Self> {
        let corpus = Corpus::new(
            load_pool(dir, Pool::Place).await?,
            load_pool(dir, Pool::Verb).await?,
            load_pool(dir, Pool::Scenario).await?,
            load_graph(dir, GraphKind::PlaceVerb).await?,
            load_graph(dir, GraphKind::PlaceScenario).await?,
        )?;

        let summary = corpus.info();
        info!(
            dir = %dir.display(),
            places = summary.places,
            verbs = summary.verbs,
            scenarios = summary.scenarios,
            "Loaded corpus"
        );
        Ok(corpus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(dir: &Path, name: &str, value: serde_json::Value) {
        std::fs::write(dir.join(name), value.to_string()).unwrap();
    }

    fn write_valid(dir: &Path) {
        write(
            dir,
            "place_terms.json",
            serde_json::json!([{"text": "park", "embedding": [1.0, 0.0]}]),
        );
        write(
            dir,
            "verb_terms.json",
            serde_json::json!([{"text": "pan", "embedding": [0.0, 1.0]}]),
        );
        write(
            dir,
            "scenario_terms.json",
            serde_json::json!([{"text": "calm", "embedding": [0.5, 0.5]}]),
        );
        write(dir, "graph_place_verb.json", serde_json::json!([["park", "pan"]]));
        write(dir, "graph_place_scenario.json", serde_json::json!([["park", "calm"]]));
    }

    #[tokio::test]
    async fn test_load_valid_corpus() {
        let dir = tempdir().unwrap();
        write_valid(dir.path());

        let corpus = Corpus::load(dir.path()).await.unwrap();
        assert_eq!(corpus.index(Pool::Place).texts(), ["park".to_string()]);
        assert!(corpus.graph(GraphKind::PlaceScenario).has_edge("park", "calm"));
        assert_eq!(corpus.dimensions(), Some(2));
    }

    #[tokio::test]
    async fn test_missing_artifact_fails() {
        let dir = tempdir().unwrap();
        write_valid(dir.path());
        std::fs::remove_file(dir.path().join("graph_place_verb.json")).unwrap();

        assert!(matches!(
            Corpus::load(dir.path()).await,
            Err(HfbpoError::Corpus { .. })
        ));
    }

    #[tokio::test]
    async fn test_dimension_mismatch_fails_load() {
        let dir = tempdir().unwrap();
        write_valid(dir.path());
        write(
            dir.path(),
            "verb_terms.json",
            serde_json::json!([
                {"text": "pan", "embedding": [0.0, 1.0]},
                {"text": "zoom", "embedding": [0.0, 1.0, 0.0]}
            ]),
        );

        assert!(matches!(
            Corpus::load(dir.path()).await,
            Err(HfbpoError::DimensionMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_malformed_json_fails() {
        let dir = tempdir().unwrap();
        write_valid(dir.path());
        std::fs::write(dir.path().join("place_terms.json"), "{not json").unwrap();

        assert!(Corpus::load(dir.path()).await.is_err());
    }
}
