//! Read-only modifier corpus: three embedding pools and two co-occurrence graphs
//!
//! The corpus is produced offline (see [`CorpusBuilder`]) and loaded once at
//! startup with [`Corpus::load`]. Any inconsistency fails the load; no partial
//! corpus is served.

mod builder;
mod graph;
mod index;
mod loader;

pub use builder::{BuildStats, CorpusBuilder, Observation};
pub use graph::{CooccurrenceGraph, GraphKind};
pub use index::{EmbeddingIndex, ModifierTerm, top_k};
pub use loader::{CORPUS_INFO_FILE, CorpusInfo};

use serde::{Deserialize, Serialize};

use crate::error::{HfbpoError, Result};

/// The three disjoint modifier pools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pool {
    Place,
    Verb,
    Scenario,
}

impl Pool {
    pub const ALL: [Pool; 3] = [Pool::Place, Pool::Verb, Pool::Scenario];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Place => "place",
            Self::Verb => "verb",
            Self::Scenario => "scenario",
        }
    }

    /// Artifact file name inside a corpus directory
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Place => "place_terms.json",
            Self::Verb => "verb_terms.json",
            Self::Scenario => "scenario_terms.json",
        }
    }
}

impl std::fmt::Display for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Embedding pools plus adjacency graphs
#[derive(Debug, Clone)]
pub struct Corpus {
    places: EmbeddingIndex,
    verbs: EmbeddingIndex,
    scenarios: EmbeddingIndex,
    place_verb: CooccurrenceGraph,
    place_scenario: CooccurrenceGraph,
}

impl Corpus {
    /// Assemble a corpus; all non-empty pools must share one dimensionality.
    pub fn new(
        places: EmbeddingIndex,
        verbs: EmbeddingIndex,
        scenarios: EmbeddingIndex,
        place_verb: CooccurrenceGraph,
        place_scenario: CooccurrenceGraph,
    ) -> Result<Self> {
        let mut shared: Option<usize> = None;
        for index in [&places, &verbs, &scenarios] {
            let Some(dims) = index.dimensions() else {
                continue;
            };
            match shared {
                None => shared = Some(dims),
                Some(expected) if expected != dims => {
                    return Err(HfbpoError::DimensionMismatch {
                        context: format!("{} pool vs corpus", index.pool()),
                        expected,
                        actual: dims,
                    });
                }
                Some(_) => {}
            }
        }

        Ok(Self {
            places,
            verbs,
            scenarios,
            place_verb,
            place_scenario,
        })
    }

    pub fn index(&self, pool: Pool) -> &EmbeddingIndex {
        match pool {
            Pool::Place => &self.places,
            Pool::Verb => &self.verbs,
            Pool::Scenario => &self.scenarios,
        }
    }

    pub fn graph(&self, kind: GraphKind) -> &CooccurrenceGraph {
        match kind {
            GraphKind::PlaceVerb => &self.place_verb,
            GraphKind::PlaceScenario => &self.place_scenario,
        }
    }

    /// Neighbors of `node` in the given graph
    pub fn neighbors(&self, node: &str, kind: GraphKind) -> std::collections::BTreeSet<String> {
        self.graph(kind).neighbors(node)
    }

    /// Shared embedding dimensionality, `None` for an entirely empty corpus
    pub fn dimensions(&self) -> Option<usize> {
        Pool::ALL
            .iter()
            .find_map(|pool| self.index(*pool).dimensions())
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }

    pub fn info(&self) -> CorpusInfo {
        CorpusInfo {
            places: self.places.len(),
            verbs: self.verbs.len(),
            scenarios: self.scenarios.len(),
            place_verb_edges: self.place_verb.edge_count(),
            place_scenario_edges: self.place_scenario.edge_count(),
            dimensions: self.dimensions(),
        }
    }
}
