use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::remote::RemoteSource;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataSyncOutcome {
    /// Local copy replaced with the remote document.
    Updated,
    UpToDate,
    /// Remote unavailable or not JSON; local copy untouched.
    Skipped(String),
    /// Remote differed but the local write failed.
    Failed(String),
}

impl MetadataSyncOutcome {
    pub fn wrote(&self) -> bool {
        matches!(self, Self::Updated)
    }
}

/// Replaces `local_path` with the remote `file_name` document when the two
/// differ as JSON values. Never merges.
pub async fn sync_metadata(
    remote: &dyn RemoteSource,
    file_name: &str,
    local_path: &Path,
) -> MetadataSyncOutcome {
    let remote_doc = match fetch_remote_json(remote, file_name).await {
        Ok(doc) => doc,
        Err(err) => {
            warn!(file = file_name, "skipping metadata sync: {err:#}");
            return MetadataSyncOutcome::Skipped(format!("{err:#}"));
        }
    };

    let local_doc = read_local_json(local_path).await;
    if local_doc == remote_doc {
        info!(file = file_name, "metadata already up to date");
        return MetadataSyncOutcome::UpToDate;
    }

    match write_pretty(local_path, &remote_doc).await {
        Ok(()) => {
            info!(file = file_name, path = %local_path.display(), "metadata updated from remote");
            MetadataSyncOutcome::Updated
        }
        Err(err) => {
            warn!(file = file_name, "failed to write metadata: {err:#}");
            MetadataSyncOutcome::Failed(format!("{err:#}"))
        }
    }
}

async fn fetch_remote_json(remote: &dyn RemoteSource, file_name: &str) -> Result<Value> {
    let body = remote.fetch_file(file_name).await?;
    serde_json::from_slice(&body).with_context(|| format!("remote {file_name} is not valid JSON"))
}

/// Local document, or `{}` when the file is missing or unparseable.
async fn read_local_json(path: &Path) -> Value {
    let empty = || Value::Object(Map::new());
    match tokio::fs::read(path).await {
        Ok(raw) => serde_json::from_slice(&raw).unwrap_or_else(|err| {
            debug!(path = %path.display(), "local metadata unparseable, treating as empty: {err}");
            empty()
        }),
        Err(err) if err.kind() == ErrorKind::NotFound => empty(),
        Err(err) => {
            warn!(path = %path.display(), "failed to read local metadata: {err}");
            empty()
        }
    }
}

async fn write_pretty(path: &Path, doc: &Value) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let rendered = serde_json::to_string_pretty(doc)?;
    tokio::fs::write(path, rendered)
        .await
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
