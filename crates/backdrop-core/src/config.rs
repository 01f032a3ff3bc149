//! Configuration module
//!
//! Configuration is read from the environment (optionally seeded from a
//! `.env` file) once at startup and then shared read-only.

use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::constants::{
    DEFAULT_MAX_HEIGHT, DEFAULT_MAX_WIDTH, MIN_DIMENSION, WIDTH_CEILING,
};

// Common constants
const SERVER_PORT: u16 = 4444;
const PHOTO_DOWNLOAD_CONCURRENCY: usize = 4;
const REMOTE_FETCH_TIMEOUT_SECS: u64 = 30;
const MAX_SOURCE_SIZE_MB: usize = 25;
const HTTP_CONCURRENCY_LIMIT: usize = 10_000;
const DEFAULT_PHOTO: &str = "default.jpg";
const PHOTOS_DIR: &str = "photos";
const PHOTO_DOWNLOAD_URL: &str = "https://unsplash.com/photos/{id}/download?force=true&w=2000";
const GALLERY_TITLE: &str = "Telescope Background Gallery";

/// Log output format
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("Unknown LOG_FORMAT '{}'", other)),
        }
    }
}

/// Server-level settings
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    pub log_format: LogFormat,
    pub http_concurrency_limit: usize,
}

/// Managed photo directory and background refresh settings
#[derive(Clone, Debug)]
pub struct PhotoConfig {
    pub photos_dir: PathBuf,
    pub default_photo: String,
    /// When false, requests without an explicit source get the default photo
    pub catalog_enabled: bool,
    pub manifest_path: Option<PathBuf>,
    /// Download URL with an `{id}` placeholder
    pub download_url_template: String,
    pub download_concurrency: usize,
    pub gallery_title: String,
}

/// On-demand remote source settings
#[derive(Clone, Debug)]
pub struct RemoteSourceConfig {
    pub enabled: bool,
    /// If set, only these hosts (and their subdomains) may be fetched
    pub allowlist: Option<Vec<String>>,
    pub allow_private_ips: bool,
    pub fetch_timeout: Duration,
}

/// Request bounds and pipeline limits
#[derive(Clone, Debug)]
pub struct ImageLimits {
    pub max_width: u32,
    pub max_height: u32,
    pub max_source_bytes: usize,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub base: BaseConfig,
    pub photos: PhotoConfig,
    pub remote: RemoteSourceConfig,
    pub limits: ImageLimits,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let log_format = match env::var("LOG_FORMAT") {
            Ok(raw) => raw.parse::<LogFormat>().map_err(anyhow::Error::msg)?,
            Err(_) => LogFormat::default(),
        };

        let base = BaseConfig {
            server_port: env_parse("PORT", SERVER_PORT)?,
            cors_origins: parse_list(&env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string())),
            environment,
            log_format,
            http_concurrency_limit: env_parse("HTTP_CONCURRENCY_LIMIT", HTTP_CONCURRENCY_LIMIT)?
                .max(1),
        };

        let photos = PhotoConfig {
            photos_dir: PathBuf::from(
                env::var("PHOTOS_DIR").unwrap_or_else(|_| PHOTOS_DIR.to_string()),
            ),
            default_photo: env::var("DEFAULT_PHOTO").unwrap_or_else(|_| DEFAULT_PHOTO.to_string()),
            catalog_enabled: env_bool("PHOTO_CATALOG_ENABLED", true)?,
            manifest_path: env::var("PHOTO_MANIFEST_PATH")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            download_url_template: env::var("PHOTO_DOWNLOAD_URL")
                .unwrap_or_else(|_| PHOTO_DOWNLOAD_URL.to_string()),
            download_concurrency: env_parse("PHOTO_DOWNLOAD_CONCURRENCY", PHOTO_DOWNLOAD_CONCURRENCY)?
                .max(1),
            gallery_title: env::var("GALLERY_TITLE").unwrap_or_else(|_| GALLERY_TITLE.to_string()),
        };

        let remote = RemoteSourceConfig {
            enabled: env_bool("REMOTE_SOURCES_ENABLED", false)?,
            allowlist: env::var("REMOTE_ALLOWLIST")
                .ok()
                .map(|s| parse_list(&s))
                .filter(|list| !list.is_empty()),
            allow_private_ips: env_bool("REMOTE_ALLOW_PRIVATE_IPS", false)?,
            fetch_timeout: Duration::from_secs(env_parse(
                "REMOTE_FETCH_TIMEOUT_SECS",
                REMOTE_FETCH_TIMEOUT_SECS,
            )?),
        };

        let limits = ImageLimits {
            max_width: env_parse("IMAGE_MAX_WIDTH", DEFAULT_MAX_WIDTH)?,
            max_height: env_parse("IMAGE_MAX_HEIGHT", DEFAULT_MAX_HEIGHT)?,
            max_source_bytes: megabytes(
                "MAX_SOURCE_SIZE_MB",
                env_parse("MAX_SOURCE_SIZE_MB", MAX_SOURCE_SIZE_MB)?,
            )?,
        };

        let config = Config {
            base,
            photos,
            remote,
            limits,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that cannot be expressed by the parsers alone.
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.is_production() && self.base.cors_origins.iter().any(|o| o == "*") {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        if !(MIN_DIMENSION..=WIDTH_CEILING).contains(&self.limits.max_width) {
            return Err(anyhow::anyhow!(
                "IMAGE_MAX_WIDTH must be between {} and {}",
                MIN_DIMENSION,
                WIDTH_CEILING
            ));
        }

        if !(MIN_DIMENSION..=DEFAULT_MAX_HEIGHT).contains(&self.limits.max_height) {
            return Err(anyhow::anyhow!(
                "IMAGE_MAX_HEIGHT must be between {} and {}",
                MIN_DIMENSION,
                DEFAULT_MAX_HEIGHT
            ));
        }

        if self.limits.max_source_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_SOURCE_SIZE_MB cannot be 0"));
        }

        if !self.photos.download_url_template.contains("{id}") {
            return Err(anyhow::anyhow!(
                "PHOTO_DOWNLOAD_URL must contain an {{id}} placeholder"
            ));
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    // Convenience getters for common fields
    pub fn server_port(&self) -> u16 {
        self.base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.base.environment
    }

    pub fn log_format(&self) -> LogFormat {
        self.base.log_format
    }

    pub fn http_concurrency_limit(&self) -> usize {
        self.base.http_concurrency_limit
    }

    pub fn photos_dir(&self) -> &Path {
        &self.photos.photos_dir
    }

    pub fn default_photo(&self) -> &str {
        &self.photos.default_photo
    }

    /// Full path of the bundled fallback photo.
    pub fn default_photo_path(&self) -> PathBuf {
        self.photos.photos_dir.join(&self.photos.default_photo)
    }

    pub fn catalog_enabled(&self) -> bool {
        self.photos.catalog_enabled
    }

    pub fn manifest_path(&self) -> Option<&Path> {
        self.photos.manifest_path.as_deref()
    }

    pub fn download_url_template(&self) -> &str {
        &self.photos.download_url_template
    }

    pub fn download_concurrency(&self) -> usize {
        self.photos.download_concurrency
    }

    pub fn gallery_title(&self) -> &str {
        &self.photos.gallery_title
    }

    pub fn remote(&self) -> &RemoteSourceConfig {
        &self.remote
    }

    pub fn remote_sources_enabled(&self) -> bool {
        self.remote.enabled
    }

    pub fn max_width(&self) -> u32 {
        self.limits.max_width
    }

    pub fn max_height(&self) -> u32 {
        self.limits.max_height
    }

    pub fn max_source_bytes(&self) -> usize {
        self.limits.max_source_bytes
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> Result<T, anyhow::Error> {
    parse_or_default(key, env::var(key).ok(), default)
}

fn env_bool(key: &str, default: bool) -> Result<bool, anyhow::Error> {
    match env::var(key).ok().filter(|v| !v.trim().is_empty()) {
        None => Ok(default),
        Some(raw) => parse_bool(&raw)
            .ok_or_else(|| anyhow::anyhow!("{} must be true or false, got '{}'", key, raw)),
    }
}

/// Unset or blank keeps the default; anything else must parse.
fn parse_or_default<T: FromStr>(
    key: &str,
    raw: Option<String>,
    default: T,
) -> Result<T, anyhow::Error> {
    match raw.filter(|v| !v.trim().is_empty()) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| anyhow::anyhow!("{} must be a valid number, got '{}'", key, raw)),
    }
}

fn megabytes(key: &str, mb: usize) -> Result<usize, anyhow::Error> {
    mb.checked_mul(1024 * 1024)
        .ok_or_else(|| anyhow::anyhow!("{} is too large", key))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
