use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

const STICKER_EXTENSIONS: &[&str] = &["png", "svg"];

/// `true` for `.png` / `.svg` names, any case.
pub fn is_sticker_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            STICKER_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
        .unwrap_or(false)
}

/// A name that stays inside the directory it is joined onto: one normal
/// path component. Dot-prefixed names are fine; `.` and `..` are not.
pub fn is_safe_file_name(name: &str) -> bool {
    if name.is_empty() || name.contains(['/', '\\', '\0']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Filename without its extension.
pub fn display_name(file: &str) -> &str {
    match file.rfind('.') {
        Some(idx) if idx > 0 => &file[..idx],
        _ => file,
    }
}

/// Every file name in `dir`. A missing directory is an empty listing.
pub async fn list_file_names(dir: &Path) -> Result<Vec<String>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!(dir = %dir.display(), "directory missing, treating as empty");
            return Ok(Vec::new());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("listing {}", dir.display()));
        }
    };

    let mut names = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .with_context(|| format!("reading entry in {}", dir.display()))?
    {
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

/// Sticker file names in `dir`, unsorted.
pub async fn list_sticker_files(dir: &Path) -> Result<Vec<String>> {
    let mut names = list_file_names(dir).await?;
    names.retain(|name| is_sticker_file(name) && is_safe_file_name(name));
    Ok(names)
}

/// Joins `file` onto `dir` when it is a safe name. No existence check.
pub fn resolve_within(dir: &Path, file: &str) -> Option<PathBuf> {
    is_safe_file_name(file).then(|| dir.join(file))
}
