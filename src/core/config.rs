//! Configuration for tile loading and rendering
//!
//! Settings come either from presets ([`RenderProfile`]) or from JSON, where
//! every field is optional and falls back to the balanced defaults.

use crate::core::constants::{DEFAULT_TILE_URL, DEFAULT_USER_AGENT, FALLBACK_TILE_RGBA};
use crate::layers::marker::Color;
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum RenderProfile {
    Balanced,
    LowResource,
    HighPerformance,
    Testing,
    Custom(RenderConfig),
}

impl RenderProfile {
    pub fn resolve(&self) -> RenderConfig {
        match self {
            Self::Balanced => RenderConfig::default(),
            Self::LowResource => RenderConfig {
                cache_capacity: Some(64),
                tile_loader: TileLoaderConfig::low_resource(),
                ..RenderConfig::default()
            },
            Self::HighPerformance => RenderConfig {
                cache_capacity: Some(1024),
                tile_loader: TileLoaderConfig::high_performance(),
                ..RenderConfig::default()
            },
            Self::Testing => RenderConfig {
                cache_capacity: None,
                tile_loader: TileLoaderConfig::for_testing(),
                ..RenderConfig::default()
            },
            Self::Custom(config) => config.clone(),
        }
    }
}

impl Default for RenderProfile {
    fn default() -> Self {
        Self::Balanced
    }
}

/// Configuration for the tile fetcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileLoaderConfig {
    /// Maximum concurrent tile downloads
    pub max_concurrent: usize,
    /// Per-request timeout
    pub request_timeout_ms: u64,
    /// Retry attempts after the first failed request
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub exponential_backoff: bool,
}

impl Default for TileLoaderConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 8,
            request_timeout_ms: 10_000,
            max_retries: 1,
            retry_delay_ms: 100,
            exponential_backoff: false,
        }
    }
}

impl TileLoaderConfig {
    pub fn low_resource() -> Self {
        Self {
            max_concurrent: 2,
            request_timeout_ms: 15_000,
            max_retries: 1,
            retry_delay_ms: 250,
            exponential_backoff: false,
        }
    }

    pub fn high_performance() -> Self {
        Self {
            max_concurrent: 32,
            request_timeout_ms: 5_000,
            max_retries: 2,
            retry_delay_ms: 50,
            exponential_backoff: true,
        }
    }

    pub fn for_testing() -> Self {
        Self {
            max_concurrent: 4,
            request_timeout_ms: 500,
            max_retries: 0,
            retry_delay_ms: 0,
            exponential_backoff: false,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let multiplier = if self.exponential_backoff {
            2_u64.saturating_pow(attempt.saturating_sub(1))
        } else {
            1
        };
        Duration::from_millis(self.retry_delay_ms.saturating_mul(multiplier))
    }
}

/// Everything a renderer needs besides the map request itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Either a base URL (tiles at `{base}/{z}/{x}/{y}.png`) or a template
    /// with `{z}`, `{x}`, `{y}` and optionally `{s}` placeholders.
    pub tile_url_template: String,
    /// Values substituted for `{s}`.
    pub subdomains: Vec<String>,
    pub user_agent: String,
    /// Color of placeholder tiles for anything that could not be fetched.
    pub fallback_color: Color,
    /// Best-effort budget for all tile fetches of one render.
    pub deadline_ms: Option<u64>,
    /// Capacity of the shared tile cache; `None` disables caching.
    pub cache_capacity: Option<usize>,
    pub tile_loader: TileLoaderConfig,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            tile_url_template: DEFAULT_TILE_URL.to_string(),
            subdomains: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            user_agent: DEFAULT_USER_AGENT.to_string(),
            fallback_color: Color(FALLBACK_TILE_RGBA),
            deadline_ms: None,
            cache_capacity: Some(256),
            tile_loader: TileLoaderConfig::default(),
        }
    }
}

impl RenderConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tile_url_template.trim().is_empty() {
            return Err(MapError::Config("tile_url_template must not be empty".into()));
        }
        if self.tile_url_template.contains("{s}") && self.subdomains.is_empty() {
            return Err(MapError::Config(
                "template uses {s} but no subdomains are configured".into(),
            ));
        }
        if self.tile_loader.max_concurrent == 0 {
            return Err(MapError::Config("max_concurrent must be at least 1".into()));
        }
        if self.cache_capacity == Some(0) {
            return Err(MapError::Config("cache_capacity must be positive".into()));
        }
        Ok(())
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }

    pub fn with_tile_url(mut self, template: impl Into<String>) -> Self {
        self.tile_url_template = template.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline_ms = Some(deadline.as_millis() as u64);
        self
    }
}
