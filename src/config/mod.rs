//! Configuration (layered: setters > env > TOML file > defaults).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ToolturnError};
use crate::provider::{http, openrouter, OpenRouterProvider};
use crate::tools::search::{brave, duckduckgo, BraveSearch, DuckDuckGoSearch, SearchProvider};
use crate::tools::ToolRegistry;
use crate::turn::{TurnController, TurnOptions};
use crate::util::RetryPolicy;

/// Environment variable holding the upstream API key.
pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// Everything needed to build a [`TurnController`] and serve it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnConfig {
    pub upstream: UpstreamConfig,
    pub tools: ToolsConfig,
    pub search: SearchConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
    /// Attempts to open a stream; 1 disables retry.
    pub max_attempts: u32,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: openrouter::DEFAULT_BASE_URL.to_string(),
            timeout_secs: 120,
            max_attempts: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub timeout_ms: u64,
    pub clamp_limit: usize,
    pub max_concurrency: usize,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        let options = TurnOptions::default();
        Self {
            timeout_ms: options.tool_timeout.as_millis() as u64,
            clamp_limit: options.clamp_limit,
            max_concurrency: options.max_concurrency,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub max_results: usize,
    pub brave_api_key: Option<String>,
    pub brave_base_url: String,
    pub duckduckgo_base_url: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: 3,
            brave_api_key: None,
            brave_base_url: brave::DEFAULT_BASE_URL.to_string(),
            duckduckgo_base_url: duckduckgo::DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
        }
    }
}

impl TurnConfig {
    /// Defaults, then the default config file if present, then `.env` and
    /// process environment.
    pub fn load() -> Result<Self> {
        let mut config = match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// `<config_dir>/toolturn/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "toolturn")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw).map_err(|e| match e {
            ToolturnError::Configuration(msg) => {
                ToolturnError::Configuration(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(raw).map_err(|e| ToolturnError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay `.env` and process environment variables.
    pub fn apply_env(&mut self) -> Result<()> {
        let _ = dotenvy::dotenv();
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Overlay variables resolved through `lookup`. Blank values are ignored.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get(API_KEY_ENV) {
            self.upstream.api_key = Some(v);
        }
        if let Some(v) = get("OPENROUTER_BASE_URL") {
            self.upstream.base_url = v;
        }
        if let Some(v) = get("OPENROUTER_TIMEOUT") {
            self.upstream.timeout_secs = parse_number("OPENROUTER_TIMEOUT", &v)?;
        }
        if let Some(v) = get("TOOLTURN_UPSTREAM_MAX_ATTEMPTS") {
            self.upstream.max_attempts = parse_number("TOOLTURN_UPSTREAM_MAX_ATTEMPTS", &v)?;
        }
        if let Some(v) = get("TOOLTURN_TOOL_TIMEOUT_MS") {
            self.tools.timeout_ms = parse_number("TOOLTURN_TOOL_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = get("TOOLTURN_CLAMP_LIMIT") {
            self.tools.clamp_limit = parse_number("TOOLTURN_CLAMP_LIMIT", &v)?;
        }
        if let Some(v) = get("TOOLTURN_TOOL_CONCURRENCY") {
            self.tools.max_concurrency = parse_number("TOOLTURN_TOOL_CONCURRENCY", &v)?;
        }
        if let Some(v) = get("TOOLTURN_SEARCH_MAX_RESULTS") {
            self.search.max_results = parse_number("TOOLTURN_SEARCH_MAX_RESULTS", &v)?;
        }
        if let Some(v) = get("BRAVE_API_KEY") {
            self.search.brave_api_key = Some(v);
        }
        if let Some(v) = get("BRAVE_BASE_URL") {
            self.search.brave_base_url = v;
        }
        if let Some(v) = get("DUCKDUCKGO_BASE_URL") {
            self.search.duckduckgo_base_url = v;
        }
        if let Some(v) = get("TOOLTURN_BIND") {
            self.server.bind = v;
        }
        self.validate()
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.upstream.api_key = Some(key.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.upstream.base_url = url.into();
        self
    }

    pub fn with_clamp_limit(mut self, limit: usize) -> Self {
        self.tools.clamp_limit = limit;
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tools.timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_bind(mut self, bind: impl Into<String>) -> Self {
        self.server.bind = bind.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.tools.clamp_limit == 0 {
            return Err(ToolturnError::Configuration(
                "tools.clamp_limit must be at least 1".into(),
            ));
        }
        if self.tools.timeout_ms == 0 {
            return Err(ToolturnError::Configuration(
                "tools.timeout_ms must be positive".into(),
            ));
        }
        if self.upstream.timeout_secs == 0 {
            return Err(ToolturnError::Configuration(
                "upstream.timeout_secs must be positive".into(),
            ));
        }
        if self.upstream.base_url.trim().is_empty() {
            return Err(ToolturnError::Configuration(
                "upstream.base_url must not be empty".into(),
            ));
        }
        Ok(())
    }

    pub fn api_key(&self) -> Option<&str> {
        self.upstream.api_key.as_deref()
    }

    pub fn turn_options(&self) -> TurnOptions {
        TurnOptions {
            clamp_limit: self.tools.clamp_limit,
            tool_timeout: Duration::from_millis(self.tools.timeout_ms),
            max_concurrency: self.tools.max_concurrency.max(1),
            ..TurnOptions::default()
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.upstream.max_attempts.max(1),
            ..RetryPolicy::default()
        }
    }

    /// Tool registry backed by Brave when a key is set, DuckDuckGo otherwise.
    pub fn build_registry(&self) -> ToolRegistry {
        let client = http::shared_client();
        let search: Arc<dyn SearchProvider> = match &self.search.brave_api_key {
            Some(key) => Arc::new(BraveSearch::new(client, key.clone(), &self.search.brave_base_url)),
            None => Arc::new(DuckDuckGoSearch::new(client, &self.search.duckduckgo_base_url)),
        };
        ToolRegistry::new(search).with_max_results(self.search.max_results)
    }

    /// Build a controller. Fails when no upstream API key is configured.
    pub fn build_controller(&self) -> Result<TurnController> {
        let api_key = self.api_key().ok_or_else(|| {
            ToolturnError::Configuration(format!("{API_KEY_ENV} is not set"))
        })?;
        let client = http::build_client(Duration::from_secs(self.upstream.timeout_secs))?;
        let provider = OpenRouterProvider::new(api_key, Some(self.upstream.base_url.clone()))
            .with_client(client)
            .with_retry(self.retry_policy());
        Ok(
            TurnController::new(Arc::new(provider), Arc::new(self.build_registry()))
                .with_options(self.turn_options()),
        )
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| ToolturnError::Configuration(format!("{key} must be a number, got {raw:?}")))
}
