//! Candidate assembly
//!
//! Narrows the modifier vocabulary to a topic-relevant candidate set:
//! the closest places by embedding, their graph neighbors as verb and
//! scenario pools, each pool re-ranked against the topic, then the full
//! cross-product of the three shortlists.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::bandit::{CandidateSet, CombinationKey, KEY_SEPARATOR, is_key_component};
use crate::corpus::{Corpus, EmbeddingIndex, GraphKind, Pool};
use crate::error::Result;

/// Shortlists and the candidate keys built from them
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Retrieval {
    pub places: Vec<String>,
    pub verbs: Vec<String>,
    pub scenarios: Vec<String>,
    pub candidates: CandidateSet,
}

impl Retrieval {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Builds candidate sets from a loaded corpus
#[derive(Debug, Clone)]
pub struct CandidateAssembler {
    corpus: Arc<Corpus>,
}

impl CandidateAssembler {
    pub fn new(corpus: Arc<Corpus>) -> Self {
        Self { corpus }
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    /// Assemble candidates for a topic embedding.
    ///
    /// Fails only when the embedding does not match the corpus dimensionality.
    /// An empty shortlist of any kind yields an empty candidate set.
    pub fn assemble(
        &self,
        topic: &[f32],
        k_places: usize,
        k_verbs: usize,
        k_scenarios: usize,
    ) -> Result<Retrieval> {
        let places: Vec<String> = self
            .corpus
            .index(Pool::Place)
            .top_k_texts_where(topic, k_places, keyable)?
            .into_iter()
            .map(str::to_string)
            .collect();

        let verb_pool = self.neighbor_pool(&places, GraphKind::PlaceVerb);
        let scenario_pool = self.neighbor_pool(&places, GraphKind::PlaceScenario);

        let verbs = rerank(self.corpus.index(Pool::Verb), verb_pool, topic, k_verbs);
        let scenarios = rerank(
            self.corpus.index(Pool::Scenario),
            scenario_pool,
            topic,
            k_scenarios,
        );

        let candidates = cross_product(&places, &verbs, &scenarios);
        debug!(
            places = places.len(),
            verbs = verbs.len(),
            scenarios = scenarios.len(),
            candidates = candidates.len(),
            "Assembled candidates"
        );

        Ok(Retrieval {
            places,
            verbs,
            scenarios,
            candidates,
        })
    }

    /// Union of neighbors of the selected places, in place rank order and
    /// lexical order within a place, first occurrence kept. Neighbors that
    /// cannot form a key are left out.
    fn neighbor_pool(&self, places: &[String], kind: GraphKind) -> Vec<String> {
        let graph = self.corpus.graph(kind);
        let mut seen = HashSet::new();
        let mut pool = Vec::new();
        for place in places {
            for neighbor in graph.place_neighbors(place) {
                if seen.insert(neighbor) && keyable(neighbor) {
                    pool.push(neighbor.to_string());
                }
            }
        }
        pool
    }
}

fn keyable(text: &str) -> bool {
    if is_key_component(text) {
        return true;
    }
    warn!(
        text = %text,
        separator = %KEY_SEPARATOR,
        "Skipping modifier that cannot form a key"
    );
    false
}

/// Order a neighbor pool by similarity to the topic and keep `k`.
///
/// Members unknown to the index are left out of the ranking. If none are
/// known the pool is kept in its given order.
fn rerank(index: &EmbeddingIndex, pool: Vec<String>, topic: &[f32], k: usize) -> Vec<String> {
    let mut scored: Vec<(f32, String)> = Vec::with_capacity(pool.len());
    let mut unknown = 0usize;
    for text in &pool {
        match index.similarity(text, topic) {
            Some(score) => scored.push((score, text.clone())),
            None => unknown += 1,
        }
    }

    if scored.is_empty() {
        if !pool.is_empty() {
            warn!(
                pool = %index.pool(),
                count = pool.len(),
                "No neighbors found in the index, using unranked pool"
            );
        }
        let mut pool = pool;
        pool.truncate(k);
        return pool;
    }

    if unknown > 0 {
        debug!(pool = %index.pool(), unknown, "Dropped neighbors missing from the index");
    }

    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.into_iter().take(k).map(|(_, text)| text).collect()
}

/// Place-major cross-product. Every text has already passed `keyable`.
fn cross_product(places: &[String], verbs: &[String], scenarios: &[String]) -> CandidateSet {
    let mut keys = Vec::with_capacity(places.len() * verbs.len() * scenarios.len());
    for place in places {
        for verb in verbs {
            for scenario in scenarios {
                if let Ok(key) = CombinationKey::new(place, verb, scenario) {
                    keys.push(key);
                }
            }
        }
    }
    CandidateSet::new(keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{CooccurrenceGraph, ModifierTerm};

    fn index(pool: Pool, terms: &[(&str, [f32; 2])]) -> EmbeddingIndex {
        EmbeddingIndex::new(
            pool,
            terms
                .iter()
                .map(|(t, e)| ModifierTerm::new(*t, e.to_vec()))
                .collect(),
        )
        .unwrap()
    }

    fn assembler(
        places: &[(&str, [f32; 2])],
        verbs: &[(&str, [f32; 2])],
        scenarios: &[(&str, [f32; 2])],
        pv: &[(&str, &str)],
        ps: &[(&str, &str)],
    ) -> CandidateAssembler {
        let corpus = Corpus::new(
            index(Pool::Place, places),
            index(Pool::Verb, verbs),
            index(Pool::Scenario, scenarios),
            CooccurrenceGraph::from_edges(pv.iter().copied()),
            CooccurrenceGraph::from_edges(ps.iter().copied()),
        )
        .unwrap();
        CandidateAssembler::new(Arc::new(corpus))
    }

    fn keys(retrieval: &Retrieval) -> Vec<&str> {
        retrieval
            .candidates
            .keys()
            .iter()
            .map(CombinationKey::as_str)
            .collect()
    }

    fn split_graph() -> CandidateAssembler {
        // V is adjacent only to A, S only to B
        assembler(
            &[("A", [1.0, 0.0]), ("B", [0.6, 0.8])],
            &[("V", [0.0, 1.0])],
            &[("S", [1.0, 1.0])],
            &[("A", "V")],
            &[("B", "S")],
        )
    }

    #[test]
    fn test_single_place_without_scenarios_is_empty() {
        let retrieval = split_graph().assemble(&[1.0, 0.0], 1, 5, 5).unwrap();
        assert_eq!(retrieval.places, vec!["A"]);
        assert_eq!(retrieval.verbs, vec!["V"]);
        assert!(retrieval.scenarios.is_empty());
        assert!(retrieval.is_empty());
    }

    #[test]
    fn test_neighbors_unioned_across_places() {
        let retrieval = split_graph().assemble(&[1.0, 0.0], 2, 5, 5).unwrap();
        assert_eq!(keys(&retrieval), vec!["A|V|S", "B|V|S"]);
    }

    #[test]
    fn test_size_is_product_of_shortlists() {
        let a = assembler(
            &[("p1", [1.0, 0.0]), ("p2", [0.9, 0.1]), ("p3", [0.0, 1.0])],
            &[("v1", [1.0, 0.0]), ("v2", [0.5, 0.5]), ("v3", [0.0, 1.0])],
            &[("s1", [1.0, 0.0]), ("s2", [0.0, 1.0])],
            &[("p1", "v1"), ("p1", "v2"), ("p2", "v3"), ("p3", "v3")],
            &[("p1", "s1"), ("p2", "s2")],
        );
        let retrieval = a.assemble(&[1.0, 0.0], 2, 2, 5).unwrap();

        assert_eq!(retrieval.places, vec!["p1", "p2"]);
        assert_eq!(retrieval.verbs, vec!["v1", "v2"]);
        assert_eq!(retrieval.scenarios, vec!["s1", "s2"]);
        assert_eq!(retrieval.candidates.len(), 2 * 2 * 2);
        assert_eq!(keys(&retrieval)[..3], ["p1|v1|s1", "p1|v1|s2", "p1|v2|s1"]);
    }

    #[test]
    fn test_drifted_pool_falls_back_to_unranked() {
        // Graph mentions verbs the verb index does not know
        let a = assembler(
            &[("A", [1.0, 0.0])],
            &[("known", [0.0, 1.0])],
            &[("S", [1.0, 0.0])],
            &[("A", "ghost-b"), ("A", "ghost-a"), ("A", "ghost-c")],
            &[("A", "S")],
        );
        let retrieval = a.assemble(&[1.0, 0.0], 1, 2, 1).unwrap();
        assert_eq!(retrieval.verbs, vec!["ghost-a", "ghost-b"]);
        assert_eq!(retrieval.candidates.len(), 2);
    }

    #[test]
    fn test_unknown_members_dropped_when_others_known() {
        let a = assembler(
            &[("A", [1.0, 0.0])],
            &[("zoom", [1.0, 0.0])],
            &[("S", [1.0, 0.0])],
            &[("A", "ghost"), ("A", "zoom")],
            &[("A", "S")],
        );
        let retrieval = a.assemble(&[1.0, 0.0], 1, 5, 5).unwrap();
        assert_eq!(retrieval.verbs, vec!["zoom"]);
    }

    #[test]
    fn test_wrong_topic_dimension_is_error() {
        assert!(split_graph().assemble(&[1.0, 0.0, 0.0], 2, 5, 5).is_err());
    }

    #[test]
    fn test_empty_corpus_gives_empty_set() {
        let corpus = Corpus::new(
            EmbeddingIndex::empty(Pool::Place),
            EmbeddingIndex::empty(Pool::Verb),
            EmbeddingIndex::empty(Pool::Scenario),
            CooccurrenceGraph::new(),
            CooccurrenceGraph::new(),
        )
        .unwrap();
        let retrieval = CandidateAssembler::new(Arc::new(corpus))
            .assemble(&[1.0, 0.0], 3, 5, 5)
            .unwrap();
        assert!(retrieval.is_empty());
    }

    #[test]
    fn test_separator_in_text_skipped() {
        let a = assembler(
            &[("A", [1.0, 0.0])],
            &[("pan|tilt", [1.0, 0.0]), ("zoom", [0.9, 0.1])],
            &[("S", [1.0, 0.0])],
            &[("A", "pan|tilt"), ("A", "zoom")],
            &[("A", "S")],
        );
        let retrieval = a.assemble(&[1.0, 0.0], 1, 5, 5).unwrap();
        assert_eq!(keys(&retrieval), vec!["A|zoom|S"]);
    }

    #[test]
    fn test_unkeyable_verb_does_not_take_shortlist_slot() {
        // "pan|tilt" ranks first but can never form a key
        let a = assembler(
            &[("A", [1.0, 0.0])],
            &[("pan|tilt", [1.0, 0.0]), ("zoom", [0.9, 0.1])],
            &[("S", [1.0, 0.0])],
            &[("A", "pan|tilt"), ("A", "zoom")],
            &[("A", "S")],
        );
        let retrieval = a.assemble(&[1.0, 0.0], 1, 1, 1).unwrap();
        assert_eq!(retrieval.verbs, vec!["zoom"]);
        assert_eq!(
            retrieval.candidates.len(),
            retrieval.places.len() * retrieval.verbs.len() * retrieval.scenarios.len()
        );
        assert_eq!(keys(&retrieval), vec!["A|zoom|S"]);
    }

    #[test]
    fn test_unkeyable_place_does_not_take_shortlist_slot() {
        let a = assembler(
            &[("A|B", [1.0, 0.0]), ("C", [0.9, 0.1])],
            &[("V", [1.0, 0.0])],
            &[("S", [1.0, 0.0])],
            &[("A|B", "V"), ("C", "V")],
            &[("A|B", "S"), ("C", "S")],
        );
        let retrieval = a.assemble(&[1.0, 0.0], 1, 1, 1).unwrap();
        assert_eq!(retrieval.places, vec!["C"]);
        assert_eq!(keys(&retrieval), vec!["C|V|S"]);
    }
}
