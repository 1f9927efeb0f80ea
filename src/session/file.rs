use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use super::{tail, KeyedSlots, SessionRecord, SessionStore};
use crate::config::{default_session_dir, RunnerConfig};
use crate::error::RociError;
use crate::types::ModelMessage;

/// Session store writing one JSON-lines file per session key.
///
/// Each line is a [`SessionRecord`]: `{role, content, timestamp, call_id?}`.
///
/// ```no_run
/// use roci_agents::session::{FileSessionStore, SessionStore};
/// use roci_agents::types::ModelMessage;
///
/// # async fn demo() -> Result<(), roci_agents::error::RociError> {
/// let store = FileSessionStore::new("/tmp/roci-sessions");
/// store.append("conversation_123", &[ModelMessage::user("hi")]).await?;
/// let last = store.read("conversation_123", Some(1)).await?;
/// assert_eq!(last[0].text(), "hi");
/// # Ok(())
/// # }
/// ```
pub struct FileSessionStore {
    base_dir: PathBuf,
    locks: KeyedSlots<()>,
}

impl FileSessionStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            locks: KeyedSlots::new(),
        }
    }

    /// Store under `~/.roci/sessions`.
    pub fn new_default() -> Self {
        Self::new(default_session_dir())
    }

    /// Store under the configured session directory.
    pub fn from_config(config: &RunnerConfig) -> Self {
        Self::new(config.session_dir())
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// File holding the session `key`.
    pub fn session_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{}.jsonl", file_stem(key)))
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn append(&self, key: &str, messages: &[ModelMessage]) -> Result<(), RociError> {
        if messages.is_empty() {
            return Ok(());
        }
        let mut buf = String::new();
        for message in messages {
            buf.push_str(&serde_json::to_string(&SessionRecord::from(message))?);
            buf.push('\n');
        }

        let lock = self.locks.slot(key).await;
        let written = {
            let _guard = lock.lock().await;
            self.write_lines(key, &buf).await
        };
        self.locks.release(key, lock).await;
        written?;
        tracing::debug!(session = key, count = messages.len(), "appended session items");
        Ok(())
    }

    async fn read(&self, key: &str, limit: Option<usize>) -> Result<Vec<ModelMessage>, RociError> {
        let lock = self.locks.slot(key).await;
        let raw = {
            let _guard = lock.lock().await;
            self.read_raw(key).await
        };
        self.locks.release(key, lock).await;
        let Some(raw) = raw? else {
            return Ok(Vec::new());
        };
        let records = raw
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(serde_json::from_str::<SessionRecord>)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tail(records, limit).into_iter().map(ModelMessage::from).collect())
    }
}

impl FileSessionStore {
    async fn write_lines(&self, key: &str, buf: &str) -> Result<(), RociError> {
        let path = self.session_path(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(buf.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// File contents, or `None` when the session was never written.
    async fn read_raw(&self, key: &str) -> Result<Option<String>, RociError> {
        match tokio::fs::read_to_string(self.session_path(key)).await {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

/// Reversible file-name encoding of a session key.
///
/// ASCII alphanumerics and `-` pass through; every other byte becomes `_xx`.
fn file_stem(key: &str) -> String {
    if key.is_empty() {
        return "_".to_string();
    }
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("_{byte:02x}"));
        }
    }
    out
}
