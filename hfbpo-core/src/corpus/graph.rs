//! Undirected co-occurrence graph between places and verbs or scenarios

use std::collections::{BTreeMap, BTreeSet};

/// Which of the two bipartite graphs to query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphKind {
    PlaceVerb,
    PlaceScenario,
}

impl GraphKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlaceVerb => "place_verb",
            Self::PlaceScenario => "place_scenario",
        }
    }

    /// Artifact file name inside a corpus directory
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::PlaceVerb => "graph_place_verb.json",
            Self::PlaceScenario => "graph_place_scenario.json",
        }
    }
}

impl std::fmt::Display for GraphKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Unweighted undirected bipartite adjacency between places and one other
/// pool. Parallel edges collapse into one.
///
/// The two sides are kept apart so a place and a verb sharing the same text
/// remain distinct nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CooccurrenceGraph {
    places: BTreeMap<String, BTreeSet<String>>,
    others: BTreeMap<String, BTreeSet<String>>,
    edge_count: usize,
}

impl CooccurrenceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(place, other)` pairs
    pub fn from_edges<I, A, B>(edges: I) -> Self
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<String>,
        B: Into<String>,
    {
        let mut graph = Self::new();
        for (place, other) in edges {
            graph.add_edge(place, other);
        }
        graph
    }

    /// Add an edge. Returns false if it was already present.
    pub fn add_edge(&mut self, place: impl Into<String>, other: impl Into<String>) -> bool {
        let (place, other) = (place.into(), other.into());

        let inserted = self
            .places
            .entry(place.clone())
            .or_default()
            .insert(other.clone());
        if inserted {
            self.others.entry(other).or_default().insert(place);
            self.edge_count += 1;
        }
        inserted
    }

    /// Neighbors of `node` in lexical order; empty if the node is unknown
    pub fn neighbors(&self, node: &str) -> BTreeSet<String> {
        self.neighbors_iter(node).map(str::to_string).collect()
    }

    /// Borrowing variant of [`neighbors`](Self::neighbors); may repeat a text
    /// only when `node` exists on both sides.
    pub fn neighbors_iter<'a>(&'a self, node: &str) -> impl Iterator<Item = &'a str> + 'a {
        let from_place = self.places.get(node).into_iter().flatten();
        let from_other = self.others.get(node).into_iter().flatten();
        from_place.chain(from_other).map(String::as_str)
    }

    /// Neighbors of `place` looked up on the place side only, lexical order
    pub fn place_neighbors<'a>(&'a self, place: &str) -> impl Iterator<Item = &'a str> + 'a {
        self.places
            .get(place)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    pub fn has_edge(&self, place: &str, other: &str) -> bool {
        self.places.get(place).is_some_and(|set| set.contains(other))
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Each edge once as `(place, other)`, places in lexical order
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.places
            .iter()
            .flat_map(|(p, set)| set.iter().map(move |o| (p.as_str(), o.as_str())))
    }
}
