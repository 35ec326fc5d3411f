use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use hfbpo_core::HfbpoConfig;
use toml::Table;

/// Environment variable overriding `fixed_topic`
pub const FIXED_TOPIC_ENV: &str = "HFBPO_FIXED_TOPIC";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration.
    ///
    /// An explicit path is read on its own and must exist. Otherwise the user
    /// config and then the project config are layered over the defaults;
    /// either may be missing. `HFBPO_FIXED_TOPIC` wins over both.
    pub fn load(explicit: Option<&Path>) -> Result<HfbpoConfig> {
        let merged = match explicit {
            Some(path) => Self::read_table(path)?,
            None => {
                let mut merged = Table::new();
                for path in [Self::user_config_path(), Self::project_config_path()] {
                    if path.exists() {
                        merge_tables(&mut merged, Self::read_table(&path)?);
                    }
                }
                merged
            }
        };

        let config: HfbpoConfig = toml::Value::Table(merged)
            .try_into()
            .context("Invalid configuration")?;
        Ok(Self::apply_env(config, std::env::var(FIXED_TOPIC_ENV).ok()))
    }

    /// User config path
    pub fn user_config_path() -> PathBuf {
        hfbpo_paths::config_dir().join("config.toml")
    }

    /// Project config path
    /// Can be overridden with HFBPO_PROJECT_CONFIG_DIR
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("HFBPO_PROJECT_CONFIG_DIR") {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".hfbpo/config.toml")
        }
    }

    fn read_table(path: &Path) -> Result<Table> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    fn apply_env(mut config: HfbpoConfig, fixed_topic: Option<String>) -> HfbpoConfig {
        if let Some(topic) = fixed_topic.filter(|t| !t.trim().is_empty()) {
            config.fixed_topic = Some(topic);
        }
        config
    }
}

/// Overlay `overlay` onto `base`, recursing into nested tables
fn merge_tables(base: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        match value {
            toml::Value::Table(nested) => {
                if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                    merge_tables(existing, nested);
                } else {
                    base.insert(key, toml::Value::Table(nested));
                }
            }
            other => {
                base.insert(key, other);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_explicit_file_loaded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hfbpo.toml");
        std::fs::write(
            &path,
            r#"
            corpus_dir = "/srv/corpus"

            [retrieval]
            top_k_places = 4
            "#,
        )
        .unwrap();

        let config = ConfigLoader::load(Some(&path)).unwrap();
        assert_eq!(config.corpus_dir, PathBuf::from("/srv/corpus"));
        assert_eq!(config.retrieval.top_k_places, 4);
        assert_eq!(config.retrieval.top_k_verbs, 5);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempdir().unwrap();
        assert!(ConfigLoader::load(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn test_invalid_value_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hfbpo.toml");
        std::fs::write(&path, "[retrieval]\ntop_k_places = \"many\"\n").unwrap();
        assert!(ConfigLoader::load(Some(&path)).is_err());
    }

    #[test]
    fn test_merge_overlays_nested_tables() {
        let mut base: Table = toml::from_str(
            r#"
            fixed_topic = "castles"
            [retrieval]
            top_k_places = 2
            top_k_verbs = 2
            "#,
        )
        .unwrap();
        let overlay: Table = toml::from_str(
            r#"
            [retrieval]
            top_k_verbs = 7
            "#,
        )
        .unwrap();

        merge_tables(&mut base, overlay);
        let config: HfbpoConfig = toml::Value::Table(base).try_into().unwrap();
        assert_eq!(config.fixed_topic.as_deref(), Some("castles"));
        assert_eq!(config.retrieval.top_k_places, 2);
        assert_eq!(config.retrieval.top_k_verbs, 7);
    }

    #[test]
    fn test_env_overrides_fixed_topic() {
        let config = ConfigLoader::apply_env(HfbpoConfig::default(), Some("harbors".into()));
        assert_eq!(config.fixed_topic.as_deref(), Some("harbors"));

        let mut base = HfbpoConfig::default();
        base.fixed_topic = Some("castles".into());
        let config = ConfigLoader::apply_env(base, Some("  ".into()));
        assert_eq!(config.fixed_topic.as_deref(), Some("castles"));
    }
}
