//! JSON-file server settings store.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use twobot_core::{
    error::BotError, server::ServerSettings, snowflake::Snowflake, traits::ServerRepository,
};

/// On-disk layout: `{"global_prefix": "...", "servers": {"<guild id>": {...}}}`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ServersFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    global_prefix: Option<String>,
    #[serde(default)]
    servers: BTreeMap<Snowflake, ServerSettings>,
}

/// Server settings held in memory and flushed to a JSON file on `persist`.
#[derive(Clone)]
pub struct ServerStore {
    /// `None` for a store that never touches disk.
    path: Option<PathBuf>,
    servers: Arc<RwLock<BTreeMap<Snowflake, ServerSettings>>>,
    global_prefix: Arc<RwLock<Option<String>>>,
}

impl ServerStore {
    /// Load settings from `path`. A missing file starts an empty store.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, BotError> {
        let path = path.as_ref().to_path_buf();

        let file = match tokio::fs::read_to_string(&path).await {
            Ok(text) if text.trim().is_empty() => ServersFile::default(),
            Ok(text) => serde_json::from_str::<ServersFile>(&text).map_err(|e| {
                BotError::Store(format!("failed to parse {}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => ServersFile::default(),
            Err(e) => {
                return Err(BotError::Store(format!(
                    "failed to read {}: {e}",
                    path.display()
                )))
            }
        };

        info!(
            "Server store loaded {} guild(s) from {}",
            file.servers.len(),
            path.display()
        );

        Ok(Self {
            path: Some(path),
            servers: Arc::new(RwLock::new(file.servers)),
            global_prefix: Arc::new(RwLock::new(file.global_prefix)),
        })
    }

    /// A store with no backing file; `persist` is a no-op.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            servers: Arc::new(RwLock::new(BTreeMap::new())),
            global_prefix: Arc::new(RwLock::new(None)),
        }
    }

    /// Backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of guilds with settings.
    pub async fn len(&self) -> usize {
        self.servers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.servers.read().await.is_empty()
    }
}

#[async_trait]
impl ServerRepository for ServerStore {
    async fn get(&self, guild_id: Snowflake) -> Result<Option<ServerSettings>, BotError> {
        Ok(self.servers.read().await.get(&guild_id).cloned())
    }

    async fn set(&self, guild_id: Snowflake, settings: ServerSettings) -> Result<(), BotError> {
        self.servers.write().await.insert(guild_id, settings);
        Ok(())
    }

    async fn global_prefix(&self) -> Result<Option<String>, BotError> {
        Ok(self.global_prefix.read().await.clone())
    }

    async fn set_global_prefix(&self, prefix: String) -> Result<(), BotError> {
        *self.global_prefix.write().await = Some(prefix);
        Ok(())
    }

    async fn persist(&self) -> Result<(), BotError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let json = {
            let servers = self.servers.read().await;
            let global_prefix = self.global_prefix.read().await;
            serde_json::to_string_pretty(&ServersFile {
                global_prefix: global_prefix.clone(),
                servers: servers.clone(),
            })?
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    BotError::Store(format!("failed to create {}: {e}", parent.display()))
                })?;
            }
        }

        // Write-then-rename: readers never see a partial file.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| BotError::Store(format!("failed to write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| BotError::Store(format!("failed to replace {}: {e}", path.display())))?;

        debug!("server settings persisted to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GUILD: Snowflake = Snowflake(81_384_788_765_712_384);

    fn settings(prefix: &str) -> ServerSettings {
        ServerSettings {
            prefix: prefix.to_string(),
            owner_id: Some(Snowflake(42)),
            moderators: vec![Snowflake(7)],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_in_memory_get_set() {
        let store = ServerStore::in_memory();
        assert!(store.get(GUILD).await.unwrap().is_none());
        store.set(GUILD, settings("?")).await.unwrap();
        assert_eq!(store.get(GUILD).await.unwrap(), Some(settings("?")));
        store.persist().await.unwrap();
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ServerStore::open(dir.path().join("servers.json"))
            .await
            .unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_persist_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("servers.json");

        let store = ServerStore::open(&path).await.unwrap();
        store.set(GUILD, settings("$ ")).await.unwrap();
        store.persist().await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"servers\""));
        assert!(text.contains("\"server_prefix\": \"$ \""));
        assert!(text.contains("\"81384788765712384\""));

        let reloaded = ServerStore::open(&path).await.unwrap();
        assert_eq!(reloaded.get(GUILD).await.unwrap(), Some(settings("$ ")));
    }

    #[tokio::test]
    async fn test_global_prefix_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("servers.json");

        let store = ServerStore::open(&path).await.unwrap();
        assert_eq!(store.global_prefix().await.unwrap(), None);
        store.persist().await.unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(!text.contains("global_prefix"), "unset override is omitted");

        store.set_global_prefix("tb ".to_string()).await.unwrap();
        store.persist().await.unwrap();

        let reloaded = ServerStore::open(&path).await.unwrap();
        assert_eq!(
            reloaded.global_prefix().await.unwrap().as_deref(),
            Some("tb ")
        );
    }

    #[tokio::test]
    async fn test_legacy_document_without_optional_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("servers.json");
        std::fs::write(
            &path,
            r#"{"servers": {"81384788765712384": {"server_prefix": "~"}}}"#,
        )
        .unwrap();

        let store = ServerStore::open(&path).await.unwrap();
        let got = store.get(GUILD).await.unwrap().unwrap();
        assert_eq!(got.prefix, "~");
        assert!(got.moderators.is_empty());
        assert!(!got.kicked);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("servers.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = ServerStore::open(&path).await.err().unwrap();
        assert!(matches!(err, BotError::Store(_)));
    }
}
