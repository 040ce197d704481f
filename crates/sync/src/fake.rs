//! In-memory `RemoteSource` for tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, StreamExt};

use crate::remote::{ByteStream, RemoteEntry, RemoteSource};

#[derive(Default)]
pub struct FakeRemote {
    listing: Mutex<Option<Vec<RemoteEntry>>>,
    files: Mutex<HashMap<String, Bytes>>,
    failing: Mutex<HashSet<String>>,
    delay: Option<Duration>,
    pub downloads: AtomicUsize,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Adds a listed file served at `mem://<name>`.
    pub fn add_image(&self, name: &str, body: &[u8]) {
        let url = format!("mem://{name}");
        self.listing
            .lock()
            .unwrap()
            .get_or_insert_with(Vec::new)
            .push(RemoteEntry::file(name, url.clone()));
        self.files
            .lock()
            .unwrap()
            .insert(url, Bytes::copy_from_slice(body));
    }

    pub fn add_entry(&self, entry: RemoteEntry) {
        self.listing.lock().unwrap().get_or_insert_with(Vec::new).push(entry);
    }

    pub fn set_file(&self, path: &str, body: &[u8]) {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), Bytes::copy_from_slice(body));
    }

    pub fn fail(&self, key: &str) {
        self.failing.lock().unwrap().insert(key.to_string());
    }

    fn lookup(&self, key: &str) -> Result<Bytes> {
        if self.failing.lock().unwrap().contains(key) {
            return Err(anyhow!("GET {key} returned 500 Internal Server Error"));
        }
        self.files
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| anyhow!("GET {key} returned 404 Not Found"))
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl RemoteSource for FakeRemote {
    async fn list_folder(&self, path: &str) -> Result<Vec<RemoteEntry>> {
        self.pause().await;
        self.listing
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| anyhow!("GET {path} returned 404 Not Found"))
    }

    async fn fetch_file(&self, path: &str) -> Result<Bytes> {
        self.pause().await;
        self.lookup(path)
    }

    async fn download(&self, url: &str) -> Result<ByteStream> {
        self.pause().await;
        let body = self.lookup(url)?;
        self.downloads.fetch_add(1, Ordering::SeqCst);
        let mid = body.len() / 2;
        let chunks = vec![Ok(body.slice(..mid)), Ok(body.slice(mid..))];
        Ok(stream::iter(chunks).boxed())
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}
