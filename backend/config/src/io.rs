//! Config file read/write with atomic replace and backup rotation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::schema::StorytalkConfig;

const CONFIG_FILE_NAME: &str = "config.yaml";

const MAX_BACKUPS: usize = 3;

/// Resolve the config directory: `STORYTALK_CONFIG_DIR` env, else `~/.storytalk/`.
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("STORYTALK_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .map(|home| home.join(".storytalk"))
        .unwrap_or_else(|| PathBuf::from(".storytalk"))
}

pub fn config_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE_NAME)
}

/// Load and parse the config from disk. A missing file yields the default
/// config (first run).
pub async fn load_config(path: &Path) -> Result<StorytalkConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(StorytalkConfig::default());
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    // An empty file parses as YAML null.
    if raw.trim().is_empty() {
        return Ok(StorytalkConfig::default());
    }

    let config: StorytalkConfig = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse config YAML at: {}", path.display()))?;

    info!(path = %path.display(), "Loaded config");
    Ok(config)
}

/// Write config to disk atomically (temp file, then rename), keeping a
/// rolling backup of the previous file.
pub async fn write_config(config: &StorytalkConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.with_context(|| {
            format!("Failed to create config directory: {}", parent.display())
        })?;
    }

    if path.exists() {
        rotate_backups(path).await;
    }

    let yaml = serde_yaml::to_string(config).context("Failed to serialize config to YAML")?;

    let tmp_path = path.with_extension("yaml.tmp");
    fs::write(&tmp_path, yaml.as_bytes())
        .await
        .with_context(|| format!("Failed to write temp config: {}", tmp_path.display()))?;

    fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("Failed to rename temp config to: {}", path.display()))?;

    info!(path = %path.display(), "Wrote config");
    Ok(())
}

fn backup_path(path: &Path, n: usize) -> PathBuf {
    path.with_extension(format!("yaml.bak.{n}"))
}

/// config.yaml.bak.1 → .bak.2 → ... → .bak.N; failures are logged only.
async fn rotate_backups(path: &Path) {
    for i in (1..MAX_BACKUPS).rev() {
        let old = backup_path(path, i);
        if old.exists() {
            if let Err(e) = fs::rename(&old, backup_path(path, i + 1)).await {
                warn!(backup = %old.display(), error = %e, "Failed to rotate config backup");
            }
        }
    }

    let bak = backup_path(path, 1);
    if let Err(e) = fs::copy(path, &bak).await {
        warn!(backup = %bak.display(), error = %e, "Failed to back up config");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ConversationConfig, RetryConfig};

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config(&config_file_path(dir.path())).await.unwrap();
        assert!(cfg.providers.is_none());
        assert!(cfg.conversation.is_none());
    }

    #[tokio::test]
    async fn write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_file_path(&dir.path().join("nested"));

        let mut cfg = StorytalkConfig::default();
        cfg.conversation = Some(ConversationConfig {
            window_turns: Some(12),
            ..Default::default()
        });
        write_config(&cfg, &path).await.unwrap();

        let loaded = load_config(&path).await.unwrap();
        assert_eq!(loaded.conversation().window_turns, Some(12));
        assert!(!path.with_extension("yaml.tmp").exists());
    }

    #[tokio::test]
    async fn rewrite_keeps_backup_of_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_file_path(dir.path());

        write_config(&StorytalkConfig::default(), &path).await.unwrap();
        let mut cfg = StorytalkConfig::default();
        cfg.retry = Some(RetryConfig {
            max_retries: Some(1),
            base_delay_ms: None,
        });
        write_config(&cfg, &path).await.unwrap();

        let backup = std::fs::read_to_string(backup_path(&path, 1)).unwrap();
        assert_eq!(backup.trim(), "{}");
        assert_eq!(load_config(&path).await.unwrap().retry().max_retries, Some(1));
    }

    #[tokio::test]
    async fn invalid_yaml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_file_path(dir.path());
        std::fs::write(&path, "retry: [not, a, map").unwrap();

        let err = load_config(&path).await.unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config YAML"));
    }
}
