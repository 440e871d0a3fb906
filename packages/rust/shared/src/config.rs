//! Application configuration for DealScout.
//!
//! User config lives at `~/.dealscout/dealscout.toml`.
//! CLI flags override config file values, which override defaults.
//! API keys are never stored in the file, only the names of the env vars holding them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DealScoutError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "dealscout.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".dealscout";

// ---------------------------------------------------------------------------
// Config structs (matching dealscout.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Enrichment pipeline settings.
    #[serde(default)]
    pub enrichment: EnrichmentConfig,

    /// AI inference provider settings.
    #[serde(default)]
    pub ai: AiConfig,

    /// Web search provider settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Places discovery settings.
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Path to the libSQL database file (`~/` is expanded).
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Records fetched per enrichment page.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            batch_size: default_batch_size(),
        }
    }
}

impl DefaultsConfig {
    /// Resolve `database_path`, expanding a leading `~/`.
    pub fn resolve_database_path(&self) -> Result<PathBuf> {
        expand_home(&self.database_path)
    }
}

fn default_database_path() -> String {
    "~/.dealscout/dealscout.db".into()
}
fn default_batch_size() -> u32 {
    50
}

/// `[enrichment]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    /// Per-request HTTP timeout for module network calls.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_seconds: u64,

    /// User-Agent sent by every module.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Upper bound on a single module invocation (covers multi-request modules).
    #[serde(default = "default_module_timeout")]
    pub module_timeout_seconds: u64,

    /// Per-module feature toggles.
    #[serde(default)]
    pub modules: ModuleToggles,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            http_timeout_seconds: default_http_timeout(),
            user_agent: default_user_agent(),
            module_timeout_seconds: default_module_timeout(),
            modules: ModuleToggles::default(),
        }
    }
}

fn default_http_timeout() -> u64 {
    15
}
fn default_user_agent() -> String {
    "PE-Sourcing-Engine/1.0".into()
}
fn default_module_timeout() -> u64 {
    120
}

/// `[enrichment.modules]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleToggles {
    #[serde(default = "default_true")]
    pub domain: bool,
    #[serde(default = "default_true")]
    pub about: bool,
    #[serde(default = "default_true")]
    pub linkedin_finder: bool,
    #[serde(default = "default_true")]
    pub ecommerce: bool,
    /// Page-weight traffic proxy; off unless explicitly enabled.
    #[serde(default)]
    pub traffic: bool,
    #[serde(default = "default_true")]
    pub industry: bool,
    #[serde(default = "default_true")]
    pub news_finder: bool,
    #[serde(default = "default_true")]
    pub ai_classifier: bool,
    #[serde(default = "default_true")]
    pub owner_finder: bool,
    #[serde(default = "default_true")]
    pub email_finder: bool,
    #[serde(default = "default_true")]
    pub revenue: bool,
}

impl Default for ModuleToggles {
    fn default() -> Self {
        Self {
            domain: true,
            about: true,
            linkedin_finder: true,
            ecommerce: true,
            traffic: false,
            industry: true,
            news_finder: true,
            ai_classifier: true,
            owner_finder: true,
            email_finder: true,
            revenue: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// `[ai]` section. Any OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_ai_key_env")]
    pub api_key_env: String,

    /// Model used for classification and owner extraction.
    #[serde(default = "default_ai_model")]
    pub model: String,

    /// API base URL (without `/chat/completions`).
    #[serde(default = "default_ai_base_url")]
    pub base_url: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_ai_key_env(),
            model: default_ai_model(),
            base_url: default_ai_base_url(),
        }
    }
}

fn default_ai_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_ai_model() -> String {
    "google/gemini-2.5-flash".into()
}
fn default_ai_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}

/// `[search]` section (Serper-compatible web and news search).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_search_base_url")]
    pub base_url: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_search_key_env(),
            base_url: default_search_base_url(),
        }
    }
}

fn default_search_key_env() -> String {
    "SERPER_API_KEY".into()
}
fn default_search_base_url() -> String {
    "https://google.serper.dev".into()
}

/// `[discovery]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    #[serde(default = "default_places_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_places_base_url")]
    pub base_url: String,

    /// Pause between result pages of one query.
    #[serde(default = "default_page_delay")]
    pub page_delay_ms: u64,

    /// Text queries to run, in order.
    #[serde(default)]
    pub queries: Vec<DiscoveryQuery>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_places_key_env(),
            base_url: default_places_base_url(),
            page_delay_ms: default_page_delay(),
            queries: Vec::new(),
        }
    }
}

fn default_places_key_env() -> String {
    "GOOGLE_PLACES_API_KEY".into()
}
fn default_places_base_url() -> String {
    "https://places.googleapis.com/v1".into()
}
fn default_page_delay() -> u64 {
    2000
}

/// `[[discovery.queries]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryQuery {
    /// Free-text places query, e.g. "commercial cleaning in Austin TX".
    pub text_query: String,

    /// Maximum places to ingest for this query.
    #[serde(default = "default_query_limit")]
    pub limit: u32,

    #[serde(default = "default_region_code")]
    pub region_code: String,
}

fn default_query_limit() -> u32 {
    20
}
fn default_region_code() -> String {
    "US".into()
}

// ---------------------------------------------------------------------------
// Module config (runtime, shared by every enrichment module)
// ---------------------------------------------------------------------------

/// Runtime configuration injected into every enrichment module.
#[derive(Debug, Clone)]
pub struct ModuleConfig {
    /// Per-request HTTP timeout in seconds.
    pub http_timeout_seconds: u64,
    /// User-Agent header for outbound requests.
    pub user_agent: String,
    /// Which modules are registered.
    pub toggles: ModuleToggles,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for ModuleConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            http_timeout_seconds: config.enrichment.http_timeout_seconds,
            user_agent: config.enrichment.user_agent.clone(),
            toggles: config.enrichment.modules.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.dealscout/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| DealScoutError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.dealscout/dealscout.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DealScoutError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| DealScoutError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DealScoutError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| DealScoutError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DealScoutError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read an API key from the named env var. Empty values count as missing.
pub fn read_api_key(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Some(val),
        _ => None,
    }
}

/// Like [`read_api_key`], but a missing key is a config error.
pub fn require_api_key(var_name: &str, purpose: &str) -> Result<String> {
    read_api_key(var_name).ok_or_else(|| {
        DealScoutError::config(format!(
            "{purpose} API key not found. Set the {var_name} environment variable."
        ))
    })
}

fn expand_home(path: &str) -> Result<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => {
            let home = dirs::home_dir()
                .ok_or_else(|| DealScoutError::config("could not determine home directory"))?;
            Ok(home.join(rest))
        }
        None => Ok(PathBuf::from(path)),
    }
}
