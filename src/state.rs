//! Persisted updater state.
//!
//! The state file only short-circuits work; the provider stays the authority
//! on what is actually published.

use crate::error::{DdnsError, Result};
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// State carried between passes and daemon runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    /// Last public IP seen by a fully successful pass ("" = unknown).
    #[serde(default, alias = "last_ip")]
    pub last_public_ip: String,

    /// When a pass last changed a record (`None` = never).
    #[serde(default, deserialize_with = "deserialize_last_updated")]
    pub last_updated: Option<DateTime<Utc>>,

    /// Record key to the value last known to be published for it.
    #[serde(default)]
    pub records: BTreeMap<String, String>,
}

/// Year-1 timestamps are the "never" marker written by older versions.
fn deserialize_last_updated<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let timestamp = Option::<DateTime<Utc>>::deserialize(deserializer)?;
    Ok(timestamp.filter(|t| t.year() > 1))
}

impl State {
    /// Load state from `path`.
    ///
    /// A missing file yields a fresh state, which is written out immediately.
    /// A file that exists but does not parse is a [`DdnsError::StateCorrupt`].
    pub fn load(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "No state file, creating one");
                let state = State::default();
                state.save(path)?;
                return Ok(state);
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&content).map_err(|e| DdnsError::StateCorrupt {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Save state to `path` as pretty-printed JSON.
    ///
    /// Parent directories are created as needed. The document is written to a
    /// sibling temporary file and renamed over `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(self)?;
        let tmp = temp_path(path);
        std::fs::write(&tmp, content)?;
        if let Err(e) = std::fs::rename(&tmp, path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }

        tracing::debug!(path = %path.display(), records = self.records.len(), "Saved state");
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "state.json".into());
    name.push(".tmp");
    path.with_file_name(name)
}
