//! Local sticker state: the image directory and the two mapping files.
//!
//! Nothing here is cached. Every call re-lists the directory and reloads
//! the mapping files, so whatever the startup sync left on disk is what
//! gets served.

mod files;
mod mapping;

use std::path::PathBuf;

use anyhow::Result;
use stickerdb_config::AppConfig;
use tracing::debug;

pub use files::{
    display_name, is_safe_file_name, is_sticker_file, list_file_names, list_sticker_files,
    resolve_within,
};
pub use mapping::{load_lookup, Lookup};

/// Sentinel for a sticker with no artist or program entry.
pub const UNMAPPED: &str = "none";

/// One sticker as shown to clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StickerView {
    pub name: String,
    pub file: String,
    pub artist: String,
    pub program: String,
}

/// Case-insensitive `artist` / `program` filters. Empty means "any".
#[derive(Debug, Clone, Default)]
pub struct StickerFilter {
    pub artist: Option<String>,
    pub program: Option<String>,
}

impl StickerFilter {
    pub fn matches(&self, view: &StickerView) -> bool {
        field_matches(self.artist.as_deref(), &view.artist)
            && field_matches(self.program.as_deref(), &view.program)
    }
}

fn field_matches(filter: Option<&str>, value: &str) -> bool {
    match filter.map(str::trim) {
        None | Some("") => true,
        Some(wanted) => value.to_lowercase() == wanted.to_lowercase(),
    }
}

/// Read-only handle over the sticker directory and mapping files.
#[derive(Debug, Clone)]
pub struct StickerLibrary {
    stickers_dir: PathBuf,
    artists_path: PathBuf,
    programs_path: PathBuf,
}

impl StickerLibrary {
    pub fn new(
        stickers_dir: impl Into<PathBuf>,
        artists_path: impl Into<PathBuf>,
        programs_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            stickers_dir: stickers_dir.into(),
            artists_path: artists_path.into(),
            programs_path: programs_path.into(),
        }
    }

    pub fn from_app_config(config: &AppConfig) -> Self {
        Self::new(
            config.stickers_dir.clone(),
            config.artists_path(),
            config.programs_path(),
        )
    }

    /// All local stickers with artist/program attached, sorted by
    /// case-insensitive display name.
    pub async fn views(&self) -> Result<Vec<StickerView>> {
        let artists = load_lookup(&self.artists_path).await;
        let programs = load_lookup(&self.programs_path).await;
        let files = list_sticker_files(&self.stickers_dir).await?;

        let mut views: Vec<StickerView> = files
            .into_iter()
            .map(|file| StickerView {
                name: display_name(&file).to_string(),
                artist: artists.get(&file).unwrap_or(UNMAPPED).to_string(),
                program: programs.get(&file).unwrap_or(UNMAPPED).to_string(),
                file,
            })
            .collect();
        sort_views(&mut views);

        debug!(
            count = views.len(),
            artists = artists.len(),
            programs = programs.len(),
            "composed sticker views"
        );
        Ok(views)
    }

    pub async fn filtered_views(&self, filter: &StickerFilter) -> Result<Vec<StickerView>> {
        let mut views = self.views().await?;
        views.retain(|view| filter.matches(view));
        Ok(views)
    }

    /// Path of an existing sticker file, or `None` when the name is unsafe
    /// or nothing is there.
    pub async fn sticker_path(&self, file: &str) -> Option<PathBuf> {
        let path = resolve_within(&self.stickers_dir, file)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Some(path),
            _ => None,
        }
    }
}

/// Case-insensitive by display name; file name breaks ties so the order is
/// stable across directory listings.
pub fn sort_views(views: &mut [StickerView]) {
    views.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.file.cmp(&b.file))
    });
}
