use std::{env, fs, path::Path};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Configuration loaded from `stickerdb-config.toml` (or `stickerdb.config.toml`) at repo root.
/// All fields are optional; if present they will populate environment variables
/// consumed by [`crate::AppConfig::from_env`]. Variables already set win.
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub remote: RemoteSection,
    #[serde(default)]
    pub api: ApiSection,
}

#[derive(Debug, Default, Deserialize)]
pub struct AppSection {
    pub stickers_dir: Option<String>,
    pub metadata_dir: Option<String>,
    pub artists_file: Option<String>,
    pub programs_file: Option<String>,
    pub sync_on_startup: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RemoteSection {
    pub repo: Option<String>,
    pub branch: Option<String>,
    pub folder: Option<String>,
    pub github_api_base: Option<String>,
    pub raw_base: Option<String>,
    pub github_token: Option<String>,
    pub request_timeout_ms: Option<u64>,
    pub startup_deadline_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiSection {
    pub addr: Option<String>,
    pub public_base_url: Option<String>,
}

const CANDIDATES: &[&str] = &[
    "stickerdb-config.toml",
    "stickerdb.config.toml",
    "config/stickerdb-config.toml",
];

pub fn load_file_config_into_env() -> Result<()> {
    if let Some(cfg) = read_first_config()? {
        apply_to_env(cfg);
    }
    Ok(())
}

fn apply_to_env(cfg: FileConfig) {
    set_if_missing("STICKERDB_STICKERS_DIR", cfg.app.stickers_dir);
    set_if_missing("STICKERDB_METADATA_DIR", cfg.app.metadata_dir);
    set_if_missing("STICKERDB_ARTISTS_FILE", cfg.app.artists_file);
    set_if_missing("STICKERDB_PROGRAMS_FILE", cfg.app.programs_file);
    set_if_missing(
        "STICKERDB_SYNC_ON_STARTUP",
        cfg.app
            .sync_on_startup
            .map(|v| if v { "true".into() } else { "false".into() }),
    );

    set_if_missing("STICKERDB_REPO", cfg.remote.repo);
    set_if_missing("STICKERDB_BRANCH", cfg.remote.branch);
    set_if_missing("STICKERDB_REMOTE_FOLDER", cfg.remote.folder);
    set_if_missing("STICKERDB_GITHUB_API_BASE", cfg.remote.github_api_base);
    set_if_missing("STICKERDB_RAW_BASE", cfg.remote.raw_base);
    set_if_missing("GITHUB_TOKEN", cfg.remote.github_token);
    set_if_missing(
        "STICKERDB_REQUEST_TIMEOUT_MS",
        cfg.remote.request_timeout_ms.map(|v| v.to_string()),
    );
    set_if_missing(
        "STICKERDB_STARTUP_DEADLINE_MS",
        cfg.remote.startup_deadline_ms.map(|v| v.to_string()),
    );

    set_if_missing("STICKERDB_API_ADDR", cfg.api.addr);
    set_if_missing("STICKERDB_PUBLIC_BASE_URL", cfg.api.public_base_url);
}

fn read_first_config() -> Result<Option<FileConfig>> {
    for candidate in CANDIDATES {
        let path = Path::new(candidate);
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            let cfg = parse_file_config(&contents)
                .with_context(|| format!("parsing {}", path.display()))?;
            return Ok(Some(cfg));
        }
    }
    Ok(None)
}

fn parse_file_config(contents: &str) -> Result<FileConfig> {
    Ok(toml::from_str(contents)?)
}

fn set_if_missing(key: &str, val: Option<String>) {
    if let Some(val) = val {
        let trimmed = val.trim();
        if trimmed.is_empty() {
            return;
        }
        if env::var(key).is_err() {
            env::set_var(key, trimmed);
        }
    }
}
