use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use futures_util::StreamExt;
use stickerdb_storage::{is_safe_file_name, is_sticker_file, list_file_names};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::remote::{RemoteEntry, RemoteSource};

/// A sticker that could not be fetched or written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadFailure {
    pub file: String,
    pub reason: String,
}

/// Per-run outcome of image sync.
#[derive(Debug, Clone, Default)]
pub struct ImageSyncReport {
    pub listed: usize,
    pub downloaded: Vec<String>,
    pub skipped_existing: Vec<String>,
    /// Non-sticker, unsafe or URL-less entries.
    pub ignored: Vec<String>,
    pub failed: Vec<DownloadFailure>,
}

/// Downloads every remote sticker not already present in `stickers_dir`.
///
/// Existing local files are never overwritten and local files missing
/// remotely are left alone. A failed listing is returned as an error; a
/// failed download is recorded in the report and the batch continues.
pub async fn sync_images(
    remote: &dyn RemoteSource,
    folder: &str,
    stickers_dir: &Path,
) -> Result<ImageSyncReport> {
    let mut slot = None;
    sync_images_into(remote, folder, stickers_dir, &mut slot).await?;
    Ok(slot.unwrap_or_default())
}

/// Same as [`sync_images`], but records progress into `slot` as it goes.
///
/// `slot` is filled once the listing succeeds and updated after every
/// entry, so a caller that drops this future (a deadline) still sees what
/// was written before it stopped.
pub async fn sync_images_into(
    remote: &dyn RemoteSource,
    folder: &str,
    stickers_dir: &Path,
    slot: &mut Option<ImageSyncReport>,
) -> Result<()> {
    let entries = remote
        .list_folder(folder)
        .await
        .with_context(|| format!("listing {folder} on {}", remote.name()))?;

    tokio::fs::create_dir_all(stickers_dir)
        .await
        .with_context(|| format!("creating {}", stickers_dir.display()))?;
    remove_partial_downloads(stickers_dir).await?;
    let mut existing: HashSet<String> = list_file_names(stickers_dir).await?.into_iter().collect();

    let report = slot.insert(ImageSyncReport {
        listed: entries.len(),
        ..ImageSyncReport::default()
    });

    for entry in entries {
        let Some(url) = wanted_url(&entry).map(str::to_string) else {
            debug!(file = %entry.name, "ignoring remote entry");
            report.ignored.push(entry.name);
            continue;
        };

        if existing.contains(&entry.name) {
            debug!(file = %entry.name, "already present locally");
            report.skipped_existing.push(entry.name);
            continue;
        }

        info!(file = %entry.name, "downloading sticker");
        match download_one(remote, &url, stickers_dir, &entry.name).await {
            Ok(bytes) => {
                debug!(file = %entry.name, bytes, "sticker written");
                existing.insert(entry.name.clone());
                report.downloaded.push(entry.name);
            }
            Err(err) => {
                warn!(file = %entry.name, %url, "sticker download failed: {err:#}");
                report.failed.push(DownloadFailure {
                    file: entry.name,
                    reason: format!("{err:#}"),
                });
            }
        }
    }

    info!(
        listed = report.listed,
        downloaded = report.downloaded.len(),
        skipped = report.skipped_existing.len(),
        failed = report.failed.len(),
        "image sync finished"
    );
    Ok(())
}

/// Deletes `*.part` leftovers from interrupted downloads. Returns how many
/// were removed.
pub async fn remove_partial_downloads(stickers_dir: &Path) -> Result<usize> {
    let mut removed = 0;
    for name in list_file_names(stickers_dir).await? {
        if !name.ends_with(PART_SUFFIX) {
            continue;
        }
        let path = stickers_dir.join(&name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(file = %name, "removed partial download");
                removed += 1;
            }
            Err(err) => warn!(file = %name, "failed to remove partial download: {err}"),
        }
    }
    Ok(removed)
}

fn wanted_url(entry: &RemoteEntry) -> Option<&str> {
    if !is_sticker_file(&entry.name) || !is_safe_file_name(&entry.name) {
        return None;
    }
    if matches!(entry.kind.as_deref(), Some(kind) if kind != "file") {
        return None;
    }
    entry.download_url.as_deref()
}

const PART_SUFFIX: &str = ".part";

fn partial_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}{PART_SUFFIX}"))
}

/// Streams into `<name>.part`, then renames it into place.
async fn download_one(
    remote: &dyn RemoteSource,
    url: &str,
    dir: &Path,
    name: &str,
) -> Result<u64> {
    let part = partial_path(dir, name);
    let result = write_stream(remote, url, &part).await;

    match result {
        Ok(written) => {
            tokio::fs::rename(&part, dir.join(name))
                .await
                .with_context(|| format!("moving {} into place", part.display()))?;
            Ok(written)
        }
        Err(err) => {
            let _ = tokio::fs::remove_file(&part).await;
            Err(err)
        }
    }
}

async fn write_stream(remote: &dyn RemoteSource, url: &str, part: &Path) -> Result<u64> {
    let mut stream = remote.download(url).await?;
    let mut file = tokio::fs::File::create(part)
        .await
        .with_context(|| format!("creating {}", part.display()))?;

    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}
