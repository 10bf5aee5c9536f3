//! Site configuration (_config.yml)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Environment variable that overrides `prismic.access_token`
pub const ACCESS_TOKEN_ENV: &str = "PRISMIC_ACCESS_TOKEN";

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub language: String,
    pub timezone: String,
    pub logo: String,

    // URL
    pub root: String,

    // Directory
    pub public_dir: String,
    pub static_dir: String,

    // Content store
    pub prismic: PrismicConfig,
    /// JSON file of documents used instead of the Prismic API
    pub fixtures: Option<String>,
    /// Slugs rendered ahead of time; empty means every post
    pub static_paths: Vec<String>,

    // Rendering
    pub reading: ReadingConfig,
    pub nav_title_length: usize,
    pub date_format: String,
    pub edited_format: String,

    pub revalidate: RevalidateConfig,
    pub comments: CommentsConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "blogatin".to_string(),
            language: "pt-BR".to_string(),
            timezone: "America/Sao_Paulo".to_string(),
            logo: "/images/codeVector.svg".to_string(),

            root: "/".to_string(),

            public_dir: "public".to_string(),
            static_dir: "static".to_string(),

            prismic: PrismicConfig::default(),
            fixtures: None,
            static_paths: Vec::new(),

            reading: ReadingConfig::default(),
            nav_title_length: 20,
            date_format: "dd MMM yyyy".to_string(),
            edited_format: "'*editado em 'dd MMM yyyy 'ás' HH:mm".to_string(),

            revalidate: RevalidateConfig::default(),
            comments: CommentsConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("reading {:?}", path.as_ref()))?;
        let mut config: SiteConfig = serde_yaml::from_str(&content)?;
        config.apply_env();
        Ok(config)
    }

    /// Apply environment overrides
    pub fn apply_env(&mut self) {
        if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
            if !token.is_empty() {
                tracing::debug!("Using access token from {}", ACCESS_TOKEN_ENV);
                self.prismic.access_token = Some(token);
            }
        }
    }

    /// Parsed timezone, UTC when the name is unknown
    pub fn tz(&self) -> chrono_tz::Tz {
        self.timezone.parse().unwrap_or_else(|_| {
            tracing::warn!("Unknown timezone {:?}, falling back to UTC", self.timezone);
            chrono_tz::UTC
        })
    }
}

/// Prismic repository settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrismicConfig {
    /// API entry point, e.g. `https://my-repo.cdn.prismic.io/api/v2`
    pub endpoint: String,
    pub access_token: Option<String>,
    pub document_type: String,
    pub page_size: u32,
}

impl Default for PrismicConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            access_token: None,
            document_type: "posts".to_string(),
            page_size: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadingConfig {
    pub words_per_minute: usize,
}

impl Default for ReadingConfig {
    fn default() -> Self {
        Self {
            words_per_minute: 200,
        }
    }
}

/// Revalidation intervals, in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RevalidateConfig {
    pub listing: u64,
    pub detail: u64,
    pub fallback: u64,
}

impl Default for RevalidateConfig {
    fn default() -> Self {
        Self {
            listing: 60 * 60 * 24,
            detail: 60 * 60 * 24,
            fallback: 10,
        }
    }
}

impl RevalidateConfig {
    pub fn listing(&self) -> Duration {
        Duration::from_secs(self.listing)
    }

    pub fn detail(&self) -> Duration {
        Duration::from_secs(self.detail)
    }

    pub fn fallback(&self) -> Duration {
        Duration::from_secs(self.fallback)
    }
}

/// utterances comment widget
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentsConfig {
    /// GitHub repository (`owner/name`); comments are disabled when empty
    pub repo: String,
    pub issue_term: String,
    pub theme: String,
}

impl Default for CommentsConfig {
    fn default() -> Self {
        Self {
            repo: String::new(),
            issue_term: "pathname".to_string(),
            theme: "github-dark".to_string(),
        }
    }
}

impl CommentsConfig {
    pub fn enabled(&self) -> bool {
        !self.repo.trim().is_empty()
    }
}
