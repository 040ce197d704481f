//! Startup synchronization against the remote sticker repository.
//!
//! Runs once, before the server accepts connections: images first, then
//! each mapping file in turn. Nothing here is fatal; every failure is
//! logged and recorded in the [`StartupReport`].

mod images;
mod metadata;
mod remote;

#[cfg(test)]
mod fake;

use std::path::PathBuf;
use std::time::Duration;

use stickerdb_config::AppConfig;
use tracing::{info, warn};

pub use images::{
    remove_partial_downloads, sync_images, sync_images_into, DownloadFailure, ImageSyncReport,
};
pub use metadata::{sync_metadata, MetadataSyncOutcome};
pub use remote::{ByteStream, GithubRemote, RemoteEntry, RemoteSource};

/// A mapping file: its name in the remote repo and where it lives locally.
#[derive(Debug, Clone)]
pub struct MetadataTarget {
    pub file_name: String,
    pub local_path: PathBuf,
}

/// Configuration values for the startup sync.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub remote_folder: String,
    pub stickers_dir: PathBuf,
    pub metadata: Vec<MetadataTarget>,
    pub deadline: Duration,
}

impl SyncConfig {
    pub fn from_app_config(app: &AppConfig) -> Self {
        Self {
            remote_folder: app.remote.folder.clone(),
            stickers_dir: app.stickers_dir.clone(),
            metadata: vec![
                MetadataTarget {
                    file_name: app.artists_file.clone(),
                    local_path: app.artists_path(),
                },
                MetadataTarget {
                    file_name: app.programs_file.clone(),
                    local_path: app.programs_path(),
                },
            ],
            deadline: app.remote.startup_deadline,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetadataReport {
    pub file: String,
    pub outcome: MetadataSyncOutcome,
}

/// What the startup sync did.
#[derive(Debug, Clone, Default)]
pub struct StartupReport {
    /// `None` when the remote listing could not be fetched. Filled in as
    /// downloads land, so it stays accurate when the deadline cuts in.
    pub images: Option<ImageSyncReport>,
    pub listing_error: Option<String>,
    pub metadata: Vec<MetadataReport>,
    pub deadline_exceeded: bool,
}

impl StartupReport {
    pub fn downloaded(&self) -> usize {
        self.images.as_ref().map(|r| r.downloaded.len()).unwrap_or(0)
    }

    pub fn download_failures(&self) -> usize {
        self.images.as_ref().map(|r| r.failed.len()).unwrap_or(0)
    }

    pub fn metadata_updated(&self) -> usize {
        self.metadata.iter().filter(|m| m.outcome.wrote()).count()
    }
}

/// Images, then each mapping file, sequentially and bounded by
/// `config.deadline`. Steps not reached before the deadline are skipped;
/// work finished before it stays in the report.
pub async fn run_startup_sync(config: &SyncConfig, remote: &dyn RemoteSource) -> StartupReport {
    let mut report = StartupReport::default();
    info!(remote = remote.name(), folder = %config.remote_folder, "starting sync");

    let steps = run_steps(config, remote, &mut report);
    if tokio::time::timeout(config.deadline, steps).await.is_err() {
        warn!(deadline = ?config.deadline, "startup sync deadline exceeded, serving what is on disk");
        report.deadline_exceeded = true;
        if let Err(err) = remove_partial_downloads(&config.stickers_dir).await {
            warn!("failed to clear partial downloads: {err:#}");
        }
    }

    info!(
        downloaded = report.downloaded(),
        failed = report.download_failures(),
        metadata_updated = report.metadata_updated(),
        deadline_exceeded = report.deadline_exceeded,
        "sync finished"
    );
    report
}

async fn run_steps(config: &SyncConfig, remote: &dyn RemoteSource, report: &mut StartupReport) {
    let images = sync_images_into(
        remote,
        &config.remote_folder,
        &config.stickers_dir,
        &mut report.images,
    )
    .await;
    match images {
        Ok(()) => {}
        Err(err) => {
            warn!("sticker listing unavailable, nothing to sync this run: {err:#}");
            report.listing_error = Some(format!("{err:#}"));
        }
    }

    for target in &config.metadata {
        let outcome = sync_metadata(remote, &target.file_name, &target.local_path).await;
        report.metadata.push(MetadataReport {
            file: target.file_name.clone(),
            outcome,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeRemote;
    use std::path::Path;

    fn sync_config(root: &Path) -> SyncConfig {
        SyncConfig {
            remote_folder: "static/stickers".into(),
            stickers_dir: root.join("static/stickers"),
            metadata: vec![
                MetadataTarget {
                    file_name: "artists.json".into(),
                    local_path: root.join("artists.json"),
                },
                MetadataTarget {
                    file_name: "programs.json".into(),
                    local_path: root.join("programs.json"),
                },
            ],
            deadline: Duration::from_secs(5),
        }
    }

    #[test]
    fn config_targets_both_mapping_files() {
        let app = AppConfig::default();
        let config = SyncConfig::from_app_config(&app);
        let names: Vec<&str> = config.metadata.iter().map(|m| m.file_name.as_str()).collect();
        assert_eq!(names, vec!["artists.json", "programs.json"]);
        assert_eq!(config.stickers_dir, PathBuf::from("static/stickers"));
        assert_eq!(config.deadline, app.remote.startup_deadline);
    }

    #[tokio::test]
    async fn syncs_images_then_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let remote = FakeRemote::new();
        remote.add_image("cat.png", b"cat");
        remote.set_file("artists.json", br#"{"jane": ["cat.png"]}"#);
        remote.set_file("programs.json", br#"{"summer": ["cat.png"]}"#);

        let report = run_startup_sync(&sync_config(dir.path()), &remote).await;

        assert_eq!(report.downloaded(), 1);
        assert_eq!(report.metadata_updated(), 2);
        assert!(!report.deadline_exceeded);
        assert!(dir.path().join("static/stickers/cat.png").exists());
        assert!(dir.path().join("programs.json").exists());

        let again = run_startup_sync(&sync_config(dir.path()), &remote).await;
        assert_eq!(again.downloaded(), 0);
        assert_eq!(again.metadata_updated(), 0);
    }

    #[tokio::test]
    async fn listing_failure_still_syncs_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let remote = FakeRemote::new();
        remote.set_file("artists.json", br#"{"jane": ["cat.png"]}"#);

        let report = run_startup_sync(&sync_config(dir.path()), &remote).await;

        assert!(report.images.is_none());
        assert!(report.listing_error.is_some());
        assert_eq!(report.metadata[0].outcome, MetadataSyncOutcome::Updated);
        assert!(matches!(report.metadata[1].outcome, MetadataSyncOutcome::Skipped(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_cuts_sync_short() {
        let dir = tempfile::tempdir().unwrap();
        let remote = FakeRemote::with_delay(Duration::from_secs(30));
        remote.add_image("cat.png", b"cat");

        let mut config = sync_config(dir.path());
        config.deadline = Duration::from_secs(10);

        let report = run_startup_sync(&config, &remote).await;

        assert!(report.deadline_exceeded);
        assert!(report.images.is_none());
        assert!(report.metadata.is_empty());
        assert!(!dir.path().join("static/stickers/cat.png").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_keeps_downloads_finished_before_it() {
        let dir = tempfile::tempdir().unwrap();
        let remote = FakeRemote::with_delay(Duration::from_secs(3));
        remote.add_image("a.png", b"a");
        remote.add_image("b.png", b"b");
        remote.add_image("c.png", b"c");

        let mut config = sync_config(dir.path());
        config.deadline = Duration::from_secs(8);

        let report = run_startup_sync(&config, &remote).await;

        let mut on_disk = stickerdb_storage::list_file_names(&config.stickers_dir).await.unwrap();
        on_disk.sort();
        assert!(report.deadline_exceeded);
        assert!((1..3).contains(&report.downloaded()));
        assert_eq!(report.downloaded(), on_disk.len());
        assert_eq!(report.images.as_ref().unwrap().downloaded, on_disk);
        assert_eq!(report.images.as_ref().unwrap().listed, 3);
        assert!(on_disk.iter().all(|name| !name.ends_with(".part")));
        assert!(report.metadata.is_empty());
    }
}
