//! # Sync Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                            │
//! │     CATALOG_REMOTE_BACKEND=billy                                        │
//! │     CATALOG_BILLY_ACCESS_TOKEN=...                                      │
//! │                                                                         │
//! │  2. TOML Config File                                                    │
//! │     ~/.config/sync/sync.toml (Linux)                                    │
//! │     ~/Library/Application Support/com.catalog.sync/sync.toml (macOS)    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                    │
//! │     in-memory remote, local locks, page size 10                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [remote]
//! backend = "billy"   # billy | erp | memory
//!
//! [billy]
//! base_url = "https://api.billysbilling.com/v2"
//! access_token = "..."
//!
//! [erp]
//! base_url = "https://erp.example.com/api"
//! api_key = "..."
//!
//! [defaults]
//! organization_id = "cwNMzNn1TOWhrYwyb6jdfA"
//! account_id = "4qAjMzZRRoO7sOAjzkorjw"
//! sales_tax_ruleset_id = "K5A89XDhQJeiyC9HtTX6Hw"
//!
//! [import]
//! page_size = 10
//!
//! [lock]
//! backend = "local"   # local | redis
//! redis_url = "redis://127.0.0.1/"
//! lease_ms = 30000
//! retry_interval_ms = 50
//!
//! [http]
//! timeout_secs = 15
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{SyncError, SyncResult};
use catalog_core::validation::validate_page_size;
use catalog_core::{LinkDefaults, DEFAULT_IMPORT_PAGE_SIZE};

// =============================================================================
// Remote Backend
// =============================================================================

/// Which remote catalog the process talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteBackend {
    /// Billy accounting API.
    Billy,

    /// Generic ERP REST API.
    Erp,

    /// In-process catalog, for local development.
    #[default]
    Memory,
}

impl std::fmt::Display for RemoteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteBackend::Billy => write!(f, "billy"),
            RemoteBackend::Erp => write!(f, "erp"),
            RemoteBackend::Memory => write!(f, "memory"),
        }
    }
}

impl std::str::FromStr for RemoteBackend {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "billy" => Ok(RemoteBackend::Billy),
            "erp" => Ok(RemoteBackend::Erp),
            "memory" | "in-memory" => Ok(RemoteBackend::Memory),
            other => Err(SyncError::InvalidConfig(format!(
                "Unknown remote backend: '{}'. Valid options: billy, erp, memory",
                other
            ))),
        }
    }
}

/// Which lock service guards product writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockBackend {
    /// Per-process mutex registry. Enough for a single admin-api instance.
    #[default]
    Local,

    /// Redis leases, shared by every process using the same server.
    Redis,
}

impl std::fmt::Display for LockBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LockBackend::Local => write!(f, "local"),
            LockBackend::Redis => write!(f, "redis"),
        }
    }
}

impl std::str::FromStr for LockBackend {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(LockBackend::Local),
            "redis" => Ok(LockBackend::Redis),
            other => Err(SyncError::InvalidConfig(format!(
                "Unknown lock backend: '{}'. Valid options: local, redis",
                other
            ))),
        }
    }
}

// =============================================================================
// Sections
// =============================================================================

/// `[remote]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteSettings {
    #[serde(default)]
    pub backend: RemoteBackend,
}

/// `[billy]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillySettings {
    #[serde(default = "default_billy_url")]
    pub base_url: String,

    /// Sent as the `X-Access-Token` header.
    #[serde(default)]
    pub access_token: Option<String>,
}

fn default_billy_url() -> String {
    "https://api.billysbilling.com/v2".to_string()
}

impl Default for BillySettings {
    fn default() -> Self {
        BillySettings {
            base_url: default_billy_url(),
            access_token: None,
        }
    }
}

/// `[erp]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErpSettings {
    #[serde(default)]
    pub base_url: Option<String>,

    /// Sent as a bearer token when set.
    #[serde(default)]
    pub api_key: Option<String>,
}

/// `[import]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSettings {
    /// Products requested per remote page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page_size() -> u32 {
    DEFAULT_IMPORT_PAGE_SIZE
}

impl Default for ImportSettings {
    fn default() -> Self {
        ImportSettings {
            page_size: default_page_size(),
        }
    }
}

/// `[lock]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockSettings {
    #[serde(default)]
    pub backend: LockBackend,

    #[serde(default)]
    pub redis_url: Option<String>,

    /// How long a Redis lock survives a holder that never releases it.
    /// Must cover one remote call (`http.timeout_secs`) plus
    /// [`LEASE_MARGIN_MS`], since the lease is not renewed while held.
    #[serde(default = "default_lease_ms")]
    pub lease_ms: u64,

    /// Poll interval while waiting for a held Redis lock.
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,
}

/// Time a lock holder needs on top of one remote call: local reads and the
/// final commit.
pub const LEASE_MARGIN_MS: u64 = 5_000;

fn default_lease_ms() -> u64 {
    30_000
}

fn default_retry_interval_ms() -> u64 {
    50
}

impl Default for LockSettings {
    fn default() -> Self {
        LockSettings {
            backend: LockBackend::default(),
            redis_url: None,
            lease_ms: default_lease_ms(),
            retry_interval_ms: default_retry_interval_ms(),
        }
    }
}

/// `[http]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpSettings {
    /// Per-request timeout for remote catalog calls.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    15
}

impl Default for HttpSettings {
    fn default() -> Self {
        HttpSettings {
            timeout_secs: default_timeout_secs(),
        }
    }
}

// =============================================================================
// Main Sync Configuration
// =============================================================================

/// Complete sync configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub remote: RemoteSettings,

    #[serde(default)]
    pub billy: BillySettings,

    #[serde(default)]
    pub erp: ErpSettings,

    /// Remote-linkage values for fields a write leaves unset.
    #[serde(default)]
    pub defaults: LinkDefaults,

    #[serde(default)]
    pub import: ImportSettings,

    #[serde(default)]
    pub lock: LockSettings,

    #[serde(default)]
    pub http: HttpSettings,
}

impl SyncConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (sync.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading sync config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());

        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load sync config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Sync config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        validate_page_size(self.import.page_size)
            .map_err(|e| SyncError::InvalidConfig(format!("import.{}", e)))?;

        match self.remote.backend {
            RemoteBackend::Billy => {
                parse_http_url(&self.billy.base_url)?;
                if self.billy.access_token.as_deref().map_or(true, str::is_empty) {
                    return Err(SyncError::InvalidConfig(
                        "billy.access_token is required for the billy backend".into(),
                    ));
                }
            }
            RemoteBackend::Erp => {
                let base_url = self.erp.base_url.as_deref().ok_or_else(|| {
                    SyncError::InvalidConfig("erp.base_url is required for the erp backend".into())
                })?;
                parse_http_url(base_url)?;
            }
            RemoteBackend::Memory => {}
        }

        if self.lock.backend == LockBackend::Redis {
            let redis_url = self.lock.redis_url.as_deref().ok_or_else(|| {
                SyncError::InvalidConfig("lock.redis_url is required for the redis backend".into())
            })?;
            let parsed = Url::parse(redis_url)?;
            if !matches!(parsed.scheme(), "redis" | "rediss") {
                return Err(SyncError::InvalidUrl(format!(
                    "Redis URL must start with redis:// or rediss://, got: {}",
                    redis_url
                )));
            }
        }

        if self.lock.lease_ms == 0 || self.lock.retry_interval_ms == 0 {
            return Err(SyncError::InvalidConfig(
                "lock.lease_ms and lock.retry_interval_ms must be greater than 0".into(),
            ));
        }

        if self.http.timeout_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "http.timeout_secs must be greater than 0".into(),
            ));
        }

        if self.lock.backend == LockBackend::Redis {
            let min_lease_ms = self
                .http
                .timeout_secs
                .saturating_mul(1_000)
                .saturating_add(LEASE_MARGIN_MS);
            if self.lock.lease_ms < min_lease_ms {
                return Err(SyncError::InvalidConfig(format!(
                    "lock.lease_ms ({}) must be at least {} ms (http.timeout_secs plus {} ms)",
                    self.lock.lease_ms, min_lease_ms, LEASE_MARGIN_MS
                )));
            }
        }

        let defaults = &self.defaults;
        if defaults.organization_id.is_empty()
            || defaults.account_id.is_empty()
            || defaults.sales_tax_ruleset_id.is_empty()
        {
            return Err(SyncError::InvalidConfig(
                "defaults must not contain empty ids".into(),
            ));
        }

        Ok(())
    }

    /// Applies `CATALOG_*` overrides read through `lookup`.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(backend) = lookup("CATALOG_REMOTE_BACKEND") {
            match backend.parse() {
                Ok(parsed) => {
                    debug!(backend = %backend, "Overriding remote backend from environment");
                    self.remote.backend = parsed;
                }
                Err(_) => warn!(backend = %backend, "Unknown remote backend in environment"),
            }
        }

        if let Some(url) = lookup("CATALOG_BILLY_URL") {
            self.billy.base_url = url;
        }

        if let Some(token) = lookup("CATALOG_BILLY_ACCESS_TOKEN") {
            self.billy.access_token = Some(token);
        }

        if let Some(url) = lookup("CATALOG_ERP_URL") {
            self.erp.base_url = Some(url);
        }

        if let Some(key) = lookup("CATALOG_ERP_API_KEY") {
            self.erp.api_key = Some(key);
        }

        if let Some(size) = lookup("CATALOG_IMPORT_PAGE_SIZE") {
            if let Ok(size) = size.parse::<u32>() {
                debug!(page_size = size, "Overriding import page size from environment");
                self.import.page_size = size;
            }
        }

        if let Some(backend) = lookup("CATALOG_LOCK_BACKEND") {
            match backend.parse() {
                Ok(parsed) => self.lock.backend = parsed,
                Err(_) => warn!(backend = %backend, "Unknown lock backend in environment"),
            }
        }

        if let Some(url) = lookup("CATALOG_REDIS_URL") {
            self.lock.redis_url = Some(url);
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "catalog", "sync")
            .map(|dirs| dirs.config_dir().join("sync.toml"))
    }
}

fn parse_http_url(raw: &str) -> SyncResult<Url> {
    let url = Url::parse(raw)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(SyncError::InvalidUrl(format!(
            "Remote URL must start with http:// or https://, got: {}",
            raw
        )));
    }
    Ok(url)
}
