//! Configuration loading and root folder resolution
//!
//! Scout reads a single TOML file. Every field has a built-in default, so a
//! missing file (or a missing section) never prevents a job from starting;
//! jobs decide for themselves whether they have enough configuration to run.
//!
//! # Resolution priority
//!
//! Config file path:
//! 1. Command-line argument
//! 2. `SCOUT_CONFIG` environment variable
//! 3. `<config_dir>/scout/config.toml`
//!
//! Root folder (holds `scout.db`):
//! 1. Command-line argument
//! 2. `SCOUT_ROOT_FOLDER` environment variable
//! 3. `root_folder` in the TOML file
//! 4. OS-dependent default

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

pub const CONFIG_ENV_VAR: &str = "SCOUT_CONFIG";
pub const ROOT_FOLDER_ENV_VAR: &str = "SCOUT_ROOT_FOLDER";
pub const DATABASE_FILE_NAME: &str = "scout.db";

const MILLIS_PER_DAY: u64 = 24 * 60 * 60 * 1000;

/// Top-level TOML configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Root folder holding the database (optional)
    pub root_folder: Option<PathBuf>,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Catalog discovery job settings
    pub catalog_discovery: CatalogDiscoveryConfig,

    /// ListenBrainz recommendation job settings (job skipped when absent)
    pub listenbrainz: Option<ListenBrainzConfig>,

    /// Whether recommendations are queued as albums or single tracks
    pub mode: FetchMode,

    /// Number of collaborative-filtering recommendations to request
    pub fetch_count: u32,

    /// Minimum recommendation score (0-1 or percent) for queueing
    pub min_score: Option<f64>,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            logging: LoggingConfig::default(),
            catalog_discovery: CatalogDiscoveryConfig::default(),
            listenbrainz: None,
            mode: FetchMode::Album,
            fetch_count: 100,
            min_score: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "scout_discovery=info".to_string(),
        }
    }
}

/// Approval mode for newly discovered items
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalMode {
    /// Items are added to the pending queue for review
    #[default]
    Manual,
    /// Items bypass review (not yet backed by a wishlist)
    Auto,
}

/// Recommendation queueing granularity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    #[default]
    Album,
    Track,
}

/// Where ListenBrainz recommendations come from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationSource {
    /// Weekly exploration playlist (no token needed)
    #[default]
    WeeklyPlaylist,
    /// Collaborative filtering API (token required)
    Collaborative,
}

/// Subsonic-compatible library server
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubsonicConfig {
    pub host: String,
    pub username: String,
    pub password: String,
}

/// Last.fm provider settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LastFmConfig {
    pub api_key: String,
}

/// Toggle for the token-free ListenBrainz similarity provider
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProviderToggle {
    #[serde(default)]
    pub enabled: bool,
}

/// Catalog discovery job settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CatalogDiscoveryConfig {
    pub enabled: bool,
    pub subsonic: Option<SubsonicConfig>,
    pub lastfm: Option<LastFmConfig>,
    pub listenbrainz: Option<ProviderToggle>,
    /// Similar artists requested per library artist per provider
    pub similar_artist_limit: u32,
    /// Per-provider deadline for one library artist
    pub provider_timeout_ms: u64,
    /// Cached similarity rows older than this are refetched (0 = always refetch)
    pub similarity_cache_ttl_days: u64,
    /// Minimum average similarity for a candidate to be considered
    pub min_similarity: f64,
    pub max_artists_per_run: usize,
    pub albums_per_artist: u32,
    pub mode: ApprovalMode,
}

impl Default for CatalogDiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            subsonic: None,
            lastfm: None,
            listenbrainz: None,
            similar_artist_limit: 10,
            provider_timeout_ms: 30_000,
            similarity_cache_ttl_days: 30,
            min_similarity: 0.3,
            max_artists_per_run: 10,
            albums_per_artist: 3,
            mode: ApprovalMode::Manual,
        }
    }
}

impl CatalogDiscoveryConfig {
    /// Cache TTL in milliseconds
    pub fn cache_ttl_ms(&self) -> u64 {
        self.similarity_cache_ttl_days.saturating_mul(MILLIS_PER_DAY)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    /// Whether the Last.fm provider has a usable key
    pub fn lastfm_api_key(&self) -> Option<&str> {
        self.lastfm
            .as_ref()
            .map(|lastfm| lastfm.api_key.as_str())
            .filter(|key| !key.trim().is_empty())
    }

    pub fn listenbrainz_enabled(&self) -> bool {
        self.listenbrainz.as_ref().map(|lb| lb.enabled).unwrap_or(false)
    }
}

/// ListenBrainz recommendation job settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenBrainzConfig {
    pub username: String,
    pub token: Option<String>,
    pub source_type: RecommendationSource,
    pub approval_mode: ApprovalMode,
}

/// Parse a TOML configuration file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Resolve the config file path (CLI → ENV → platform config dir)
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::config_dir().map(|d| d.join("scout").join("config.toml"))
}

/// Load configuration, falling back to defaults when no file exists
///
/// A file that exists but cannot be parsed is an error; a missing file is not.
pub fn load_or_default(cli_arg: Option<&Path>) -> Result<TomlConfig> {
    match resolve_config_path(cli_arg) {
        Some(path) if path.exists() => {
            let config = load_toml_config(&path)?;
            info!("Loaded configuration: {}", path.display());
            Ok(config)
        }
        Some(path) => {
            warn!(
                "Config file not found: {} (using built-in defaults)",
                path.display()
            );
            Ok(TomlConfig::default())
        }
        None => {
            warn!("Could not determine config directory (using built-in defaults)");
            Ok(TomlConfig::default())
        }
    }
}

/// Resolve root folder (CLI → ENV → TOML → OS default)
pub fn resolve_root_folder(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV_VAR) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// Database file inside the root folder
pub fn database_path(root_folder: &Path) -> PathBuf {
    root_folder.join(DATABASE_FILE_NAME)
}

/// OS-dependent default root folder
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\scout
        dirs::data_local_dir()
            .map(|d| d.join("scout"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\scout"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/scout
        dirs::data_dir()
            .map(|d| d.join("scout"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/scout"))
    } else {
        // ~/.local/share/scout
        dirs::data_local_dir()
            .map(|d| d.join("scout"))
            .unwrap_or_else(|| PathBuf::from("./scout_data"))
    }
}

/// User-Agent sent to every external API (MusicBrainz requires one)
pub fn get_user_agent() -> String {
    format!(
        "Scout/{} ( https://github.com/scout-music/scout )",
        env!("CARGO_PKG_VERSION")
    )
}
