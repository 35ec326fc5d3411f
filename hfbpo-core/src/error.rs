//! Error types for hfbpo-core

use std::path::PathBuf;

use thiserror::Error;

/// Error type for corpus, retrieval and bandit operations
#[derive(Debug, Error)]
pub enum HfbpoError {
    /// Embedding vectors of inconsistent size within a pool or across a query
    #[error("Dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    /// A term text appears twice in the same pool
    #[error("Duplicate {pool} term: {text}")]
    DuplicateTerm { pool: String, text: String },

    /// An embedding contains NaN or infinite components
    #[error("Non-finite embedding for {pool} term: {text}")]
    InvalidEmbedding { pool: String, text: String },

    /// Corpus artifacts are missing or unreadable
    #[error("Corpus error at {path}: {reason}")]
    Corpus { path: PathBuf, reason: String },

    /// Combination key string is not a `place|verb|scenario` triple
    #[error("Invalid combination key: {0}")]
    InvalidKey(String),

    /// Reward value cannot be clamped into [0, 1]
    #[error("Invalid reward: {0}")]
    InvalidReward(f64),

    /// Persisted bandit state cannot be parsed
    #[error("Corrupt bandit state at {path}: {reason}")]
    StateCorrupt { path: PathBuf, reason: String },

    /// Writing the bandit state to durable storage failed
    #[error("Persistence write failed for {path}: {reason}")]
    PersistenceWrite { path: PathBuf, reason: String },

    /// Topic embedding failed
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// A recommendation needs a topic and none is configured
    #[error("No topic given and no fixed topic configured")]
    MissingTopic,

    /// Configuration could not be loaded
    #[error("Config error: {0}")]
    Config(String),

    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for hfbpo operations
pub type Result<T> = std::result::Result<T, HfbpoError>;
