//! Configuration validation
//!
//! Checks that need the filesystem run here, at startup, so the server never
//! starts without something to serve.

use backdrop_core::{AppError, Config, PhotoName};

/// Validate configuration and the bundled default photo.
pub async fn validate_config(config: &Config) -> Result<(), AppError> {
    config
        .validate()
        .map_err(|e| AppError::Configuration(e.to_string()))?;

    PhotoName::parse(config.default_photo()).map_err(|e| {
        AppError::Configuration(format!("DEFAULT_PHOTO is not a valid photo name: {}", e))
    })?;

    let path = config.default_photo_path();
    match tokio::fs::metadata(&path).await {
        Ok(metadata) if metadata.is_file() => {}
        Ok(_) => {
            return Err(AppError::Configuration(format!(
                "Default photo {} is not a file",
                path.display()
            )));
        }
        Err(e) => {
            return Err(AppError::Configuration(format!(
                "Default photo {} is missing: {}",
                path.display(),
                e
            )));
        }
    }

    if config.remote_sources_enabled() && config.remote().allow_private_ips {
        tracing::warn!("Remote sources may target private addresses (REMOTE_ALLOW_PRIVATE_IPS)");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use backdrop_core::{BaseConfig, ImageLimits, LogFormat, PhotoConfig, RemoteSourceConfig};
    use std::path::Path;
    use std::time::Duration;

    fn config(photos_dir: &Path, default_photo: &str) -> Config {
        Config {
            base: BaseConfig {
                server_port: 4444,
                cors_origins: vec!["*".to_string()],
                environment: "development".to_string(),
                log_format: LogFormat::Pretty,
                http_concurrency_limit: 100,
            },
            photos: PhotoConfig {
                photos_dir: photos_dir.to_path_buf(),
                default_photo: default_photo.to_string(),
                catalog_enabled: true,
                manifest_path: None,
                download_url_template: "https://example.com/{id}".to_string(),
                download_concurrency: 1,
                gallery_title: "Gallery".to_string(),
            },
            remote: RemoteSourceConfig {
                enabled: false,
                allowlist: None,
                allow_private_ips: false,
                fetch_timeout: Duration::from_secs(5),
            },
            limits: ImageLimits {
                max_width: 2000,
                max_height: 3000,
                max_source_bytes: 1024 * 1024,
            },
        }
    }

    #[tokio::test]
    async fn test_missing_default_photo_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = validate_config(&config(dir.path(), "default.jpg"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_default_photo_must_be_a_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("default.jpg")).unwrap();
        let err = validate_config(&config(dir.path(), "default.jpg"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_invalid_default_photo_name() {
        let dir = tempfile::tempdir().unwrap();
        let err = validate_config(&config(dir.path(), "../default.jpg"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_present_default_photo_passes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("default.jpg"), b"jpeg").unwrap();
        assert!(validate_config(&config(dir.path(), "default.jpg")).await.is_ok());
    }
}
