//! Application-wide configuration helpers.
//!
//! Reads environment variables (with optional `.env` and
//! `stickerdb-config.toml`) and provides strongly typed config structs
//! consumed by the sync and storage crates.

mod file_loader;

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

pub use file_loader::load_file_config_into_env;

pub const DEFAULT_API_ADDR: &str = "0.0.0.0:41579";
pub const DEFAULT_STICKERS_DIR: &str = "static/stickers";
pub const DEFAULT_METADATA_DIR: &str = ".";
pub const DEFAULT_ARTISTS_FILE: &str = "artists.json";
pub const DEFAULT_PROGRAMS_FILE: &str = "programs.json";
pub const DEFAULT_PUBLIC_BASE_URL: &str = "https://stickers.dld.hackclub.app";
pub const DEFAULT_REPO: &str = "danieliscrazy/stickerdb";
pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_REMOTE_FOLDER: &str = "static/stickers";
pub const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_RAW_BASE: &str = "https://raw.githubusercontent.com";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_addr: String,
    pub stickers_dir: PathBuf,
    /// Directory holding the artist and program mapping files.
    pub metadata_dir: PathBuf,
    pub artists_file: String,
    pub programs_file: String,
    /// Prefix for the `picture` URLs handed out by the JSON listing.
    pub public_base_url: String,
    pub remote: RemoteConfig,
    pub sync_on_startup: bool,
}

/// Where the source of truth lives and how long we wait for it.
#[derive(Clone)]
pub struct RemoteConfig {
    pub repo: String,
    pub branch: String,
    pub folder: String,
    pub github_api_base: String,
    pub raw_base: String,
    pub github_token: Option<String>,
    pub request_timeout: Duration,
    pub startup_deadline: Duration,
}

impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("repo", &self.repo)
            .field("branch", &self.branch)
            .field("folder", &self.folder)
            .field("github_api_base", &self.github_api_base)
            .field("raw_base", &self.raw_base)
            .field("github_token", &self.github_token.as_ref().map(|_| "<redacted>"))
            .field("request_timeout", &self.request_timeout)
            .field("startup_deadline", &self.startup_deadline)
            .finish()
    }
}

impl RemoteConfig {
    /// `{api}/repos/{owner}/{name}/contents`
    pub fn contents_base(&self) -> String {
        format!(
            "{}/repos/{}/contents",
            self.github_api_base.trim_end_matches('/'),
            self.repo
        )
    }

    /// `{raw}/{owner}/{name}/{branch}`
    pub fn raw_base_for_branch(&self) -> String {
        format!(
            "{}/{}/{}",
            self.raw_base.trim_end_matches('/'),
            self.repo,
            self.branch
        )
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            repo: DEFAULT_REPO.to_string(),
            branch: DEFAULT_BRANCH.to_string(),
            folder: DEFAULT_REMOTE_FOLDER.to_string(),
            github_api_base: DEFAULT_GITHUB_API_BASE.to_string(),
            raw_base: DEFAULT_RAW_BASE.to_string(),
            github_token: None,
            request_timeout: Duration::from_millis(5_000),
            startup_deadline: Duration::from_millis(60_000),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_addr: DEFAULT_API_ADDR.to_string(),
            stickers_dir: PathBuf::from(DEFAULT_STICKERS_DIR),
            metadata_dir: PathBuf::from(DEFAULT_METADATA_DIR),
            artists_file: DEFAULT_ARTISTS_FILE.to_string(),
            programs_file: DEFAULT_PROGRAMS_FILE.to_string(),
            public_base_url: DEFAULT_PUBLIC_BASE_URL.to_string(),
            remote: RemoteConfig::default(),
            sync_on_startup: true,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        load_file_config_into_env()?;

        let defaults = RemoteConfig::default();
        let request_timeout_ms = read_env_u64(
            "STICKERDB_REQUEST_TIMEOUT_MS",
            defaults.request_timeout.as_millis() as u64,
        )?;
        let startup_deadline_ms = read_env_u64(
            "STICKERDB_STARTUP_DEADLINE_MS",
            defaults.startup_deadline.as_millis() as u64,
        )?;

        let remote = RemoteConfig {
            repo: read_env_string("STICKERDB_REPO", DEFAULT_REPO),
            branch: read_env_string("STICKERDB_BRANCH", DEFAULT_BRANCH),
            folder: read_env_string("STICKERDB_REMOTE_FOLDER", DEFAULT_REMOTE_FOLDER),
            github_api_base: read_env_string("STICKERDB_GITHUB_API_BASE", DEFAULT_GITHUB_API_BASE),
            raw_base: read_env_string("STICKERDB_RAW_BASE", DEFAULT_RAW_BASE),
            github_token: env::var("GITHUB_TOKEN").ok().filter(|t| !t.trim().is_empty()),
            request_timeout: Duration::from_millis(request_timeout_ms),
            startup_deadline: Duration::from_millis(startup_deadline_ms),
        };

        Ok(Self {
            api_addr: read_env_string("STICKERDB_API_ADDR", DEFAULT_API_ADDR),
            stickers_dir: PathBuf::from(read_env_string(
                "STICKERDB_STICKERS_DIR",
                DEFAULT_STICKERS_DIR,
            )),
            metadata_dir: PathBuf::from(read_env_string(
                "STICKERDB_METADATA_DIR",
                DEFAULT_METADATA_DIR,
            )),
            artists_file: read_env_string("STICKERDB_ARTISTS_FILE", DEFAULT_ARTISTS_FILE),
            programs_file: read_env_string("STICKERDB_PROGRAMS_FILE", DEFAULT_PROGRAMS_FILE),
            public_base_url: read_env_string("STICKERDB_PUBLIC_BASE_URL", DEFAULT_PUBLIC_BASE_URL),
            remote,
            sync_on_startup: read_env_bool("STICKERDB_SYNC_ON_STARTUP", true)?,
        })
    }

    pub fn artists_path(&self) -> PathBuf {
        self.metadata_dir.join(&self.artists_file)
    }

    pub fn programs_path(&self) -> PathBuf {
        self.metadata_dir.join(&self.programs_file)
    }
}

fn read_env_string(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn read_env_u64(key: &str, default: u64) -> Result<u64> {
    match env::var(key) {
        Ok(val) => val
            .trim()
            .parse::<u64>()
            .with_context(|| format!("Failed to parse {key} as u64")),
        Err(_) => Ok(default),
    }
}

fn read_env_bool(key: &str, default: bool) -> Result<bool> {
    match env::var(key) {
        Ok(val) => parse_bool(&val).with_context(|| format!("Invalid boolean for {key}: {val}")),
        Err(_) => Ok(default),
    }
}

fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}
