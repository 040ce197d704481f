//! Remote listing and fetching.
//!
//! `RemoteSource` is the seam between the synchronizer and the network.
//! The GitHub implementation talks to the contents API for listings and to
//! the raw host for file bodies.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{BoxStream, StreamExt, TryStreamExt};
use reqwest::{header, Client};
use serde::Deserialize;
use stickerdb_config::RemoteConfig;
use tracing::{debug, warn};

/// One entry of a remote folder listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteEntry {
    pub name: String,
    /// `None` for directories and submodules.
    pub download_url: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

impl RemoteEntry {
    pub fn file(name: impl Into<String>, download_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            download_url: Some(download_url.into()),
            kind: Some("file".to_string()),
        }
    }
}

pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// Trait that all remote sources must implement.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Entries currently present in `path`, in listing order.
    async fn list_folder(&self, path: &str) -> Result<Vec<RemoteEntry>>;

    /// Body of a file addressed relative to the repository root.
    async fn fetch_file(&self, path: &str) -> Result<Bytes>;

    /// Body behind an entry's `download_url`, chunk by chunk.
    async fn download(&self, url: &str) -> Result<ByteStream>;

    fn name(&self) -> &'static str;
}

/// GitHub contents API + raw.githubusercontent.com.
#[derive(Clone)]
pub struct GithubRemote {
    http: Client,
    contents_base: String,
    raw_base: String,
    token: Option<String>,
}

impl GithubRemote {
    pub fn from_remote_config(config: &RemoteConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("stickerdb/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building http client")?;

        Ok(Self {
            http,
            contents_base: config.contents_base(),
            raw_base: config.raw_base_for_branch(),
            token: config.github_token.clone(),
        })
    }

    async fn get(&self, url: &str, authorized: bool) -> Result<reqwest::Response> {
        let mut req = self.http.get(url);
        if authorized {
            req = req.header(header::ACCEPT, "application/vnd.github+json");
            if let Some(token) = &self.token {
                req = req.bearer_auth(token);
            }
        }

        let resp = req.send().await.map_err(|err| {
            warn!(%url, "remote request failed: {err}");
            err
        })?;

        let status = resp.status();
        if !status.is_success() {
            warn!(%url, %status, "remote returned non-success status");
            return Err(anyhow!("GET {url} returned {status}"));
        }
        Ok(resp)
    }
}

fn join_path(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[async_trait]
impl RemoteSource for GithubRemote {
    async fn list_folder(&self, path: &str) -> Result<Vec<RemoteEntry>> {
        let url = join_path(&self.contents_base, path);
        debug!(%url, "listing remote folder");

        let resp = self.get(&url, true).await?;
        let entries: Vec<RemoteEntry> = resp
            .json()
            .await
            .with_context(|| format!("decoding listing from {url}"))?;
        Ok(entries)
    }

    async fn fetch_file(&self, path: &str) -> Result<Bytes> {
        let url = join_path(&self.raw_base, path);
        debug!(%url, "fetching remote file");

        let resp = self.get(&url, false).await?;
        Ok(resp.bytes().await?)
    }

    async fn download(&self, url: &str) -> Result<ByteStream> {
        let resp = self.get(url, false).await?;
        Ok(resp.bytes_stream().map_err(anyhow::Error::from).boxed())
    }

    fn name(&self) -> &'static str {
        "github"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_entries_decode_from_contents_api() {
        let raw = r#"[
            {"name": "cat.png", "path": "static/stickers/cat.png", "type": "file",
             "download_url": "https://raw.example.com/cat.png", "size": 10},
            {"name": "old", "path": "static/stickers/old", "type": "dir", "download_url": null}
        ]"#;
        let entries: Vec<RemoteEntry> = serde_json::from_str(raw).unwrap();
        assert_eq!(entries[0], RemoteEntry::file("cat.png", "https://raw.example.com/cat.png"));
        assert_eq!(entries[1].download_url, None);
        assert_eq!(entries[1].kind.as_deref(), Some("dir"));
    }

    #[test]
    fn urls_join_without_double_slashes() {
        assert_eq!(
            join_path("https://api.github.com/repos/a/b/contents/", "/static/stickers"),
            "https://api.github.com/repos/a/b/contents/static/stickers"
        );
    }

    #[test]
    fn client_uses_derived_bases() {
        let config = RemoteConfig {
            repo: "someone/stickers".into(),
            ..RemoteConfig::default()
        };
        let remote = GithubRemote::from_remote_config(&config).unwrap();
        assert_eq!(remote.contents_base, "https://api.github.com/repos/someone/stickers/contents");
        assert_eq!(remote.raw_base, "https://raw.githubusercontent.com/someone/stickers/main");
        assert_eq!(remote.name(), "github");
    }
}
