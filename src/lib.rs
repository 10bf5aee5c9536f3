//! blogatin: a static blog generator for posts hosted on Prismic
//!
//! Posts are read from the content store, rendered with embedded Tera
//! templates, and either written to the public directory or served by a
//! revalidating page server.

pub mod commands;
pub mod config;
pub mod content;
pub mod generator;
pub mod helpers;
pub mod i18n;
pub mod server;
pub mod store;
pub mod templates;

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use store::{ContentStore, MemoryStore, PrismicClient};

/// The main blog application
#[derive(Debug, Clone)]
pub struct Blog {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Public (output) directory
    pub public_dir: PathBuf,
    /// Static assets copied to the public directory
    pub static_dir: PathBuf,
    /// Language overrides
    pub languages_dir: PathBuf,
}

impl Blog {
    /// Create a new Blog instance from a directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let config_path = base_dir.as_ref().join("_config.yml");

        let config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            tracing::debug!("No _config.yml in {:?}, using defaults", base_dir.as_ref());
            let mut config = config::SiteConfig::default();
            config.apply_env();
            config
        };

        Ok(Self::with_config(base_dir, config))
    }

    /// Create a Blog instance with an explicit configuration
    pub fn with_config<P: AsRef<Path>>(base_dir: P, config: config::SiteConfig) -> Self {
        let base_dir = base_dir.as_ref().to_path_buf();
        let public_dir = base_dir.join(&config.public_dir);
        let static_dir = base_dir.join(&config.static_dir);
        let languages_dir = base_dir.join("languages");

        Self {
            config,
            base_dir,
            public_dir,
            static_dir,
            languages_dir,
        }
    }

    /// Open the configured content store
    pub fn store(&self) -> Result<Arc<dyn ContentStore>> {
        if let Some(fixtures) = &self.config.fixtures {
            let path = self.base_dir.join(fixtures);
            tracing::info!("Reading posts from {:?}", path);
            return Ok(Arc::new(MemoryStore::from_file(path)?));
        }

        let prismic = &self.config.prismic;
        if prismic.endpoint.is_empty() {
            bail!("No content store configured: set prismic.endpoint or fixtures in _config.yml");
        }
        tracing::info!("Reading posts from {}", prismic.endpoint);
        Ok(Arc::new(PrismicClient::new(
            &prismic.endpoint,
            prismic.access_token.clone(),
        )))
    }

    /// UI strings for the configured language
    pub fn i18n(&self) -> Result<i18n::I18n> {
        let mut i18n = i18n::I18n::new(&self.config.language);
        i18n.load_languages(&self.languages_dir)?;
        Ok(i18n)
    }

    /// Generate the static site
    pub async fn generate(&self, all: bool) -> Result<generator::GenerateReport> {
        commands::generate::run(self, all).await
    }

    /// Clean the public directory
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }
}
