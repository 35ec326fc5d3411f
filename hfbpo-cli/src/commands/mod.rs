pub mod arms;
pub mod config;
pub mod corpus;
pub mod recommend;
pub mod reward;
pub mod stats;

use std::sync::Arc;

use anyhow::{Context, Result};
use hfbpo_core::{BanditStore, Corpus, HashingEmbedder, HfbpoConfig, ModifierService, TopicEmbedder};
use tracing::warn;

/// Hashing embedder sized from the configuration
pub fn embedder(config: &HfbpoConfig) -> Result<Arc<dyn TopicEmbedder>> {
    let embedder = HashingEmbedder::new(config.embedder.dimensions)?;
    Ok(Arc::new(embedder))
}

/// Load the corpus and state, and start the service
pub async fn open_service(config: &HfbpoConfig) -> Result<ModifierService> {
    let corpus = Corpus::load(&config.corpus_dir).await.with_context(|| {
        format!(
            "Failed to load corpus from {} (build one with `hfbpo corpus build`)",
            config.corpus_dir.display()
        )
    })?;
    if corpus.is_empty() {
        warn!(
            dir = %config.corpus_dir.display(),
            "Corpus has no places; every recommendation will fall back"
        );
    }
    let store = BanditStore::open(&config.state_path).await?;

    let service =
        ModifierService::from_config(Arc::new(corpus), Arc::new(store), embedder(config)?, config)
            .await?;
    Ok(service)
}

/// Print a value as pretty JSON on stdout
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
