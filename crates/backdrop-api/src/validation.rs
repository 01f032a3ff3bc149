//! Request validation for the image endpoints

use backdrop_core::constants::MIN_DIMENSION;
use backdrop_core::{AppError, Config, OutputFormat, PhotoName, TransformSpec};
use serde::Deserialize;
use url::Url;

use crate::utils::ssrf_validation::validate_url_for_ssrf;

/// Query string accepted by `/` and `/{image}`. Any other key is rejected.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageQuery {
    /// Target width
    pub w: Option<u32>,
    /// Target height
    pub h: Option<u32>,
    /// Output type: jpeg, jpg, png, webp or avif
    pub t: Option<String>,
    /// Remote source URL
    pub u: Option<String>,
}

/// Build the transform spec, enforcing `[200, max]` on both dimensions.
pub fn validate_transform(query: &ImageQuery, config: &Config) -> Result<TransformSpec, AppError> {
    let width = query
        .w
        .map(|w| check_dimension("w", w, config.max_width()))
        .transpose()?;
    let height = query
        .h
        .map(|h| check_dimension("h", h, config.max_height()))
        .transpose()?;
    let format = match query.t.as_deref() {
        Some(t) => OutputFormat::parse(t).map_err(AppError::InvalidInput)?,
        None => OutputFormat::default(),
    };

    Ok(TransformSpec::new(width, height, format))
}

fn check_dimension(name: &str, value: u32, max: u32) -> Result<u32, AppError> {
    if (MIN_DIMENSION..=max).contains(&value) {
        Ok(value)
    } else {
        Err(AppError::InvalidInput(format!(
            "{} must be between {} and {}",
            name, MIN_DIMENSION, max
        )))
    }
}

/// Parse the `{image}` path segment.
pub fn validate_photo_name(raw: &str) -> Result<PhotoName, AppError> {
    PhotoName::parse(raw).map_err(|e| AppError::InvalidInput(e.to_string()))
}

/// Parse and vet a `u=` URL before anything is fetched from it.
pub async fn validate_remote_url(raw: &str, config: &Config) -> Result<Url, AppError> {
    if !config.remote_sources_enabled() {
        return Err(AppError::InvalidInput(
            "Remote image sources are disabled on this server".to_string(),
        ));
    }

    let url = Url::parse(raw)
        .map_err(|e| AppError::InvalidInput(format!("Invalid URL in u: {}", e)))?;

    let remote = config.remote();
    validate_url_for_ssrf(&url, remote.allow_private_ips, remote.allowlist.as_deref())
        .await
        .map_err(AppError::InvalidInput)?;

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use backdrop_core::{BaseConfig, ImageLimits, LogFormat, PhotoConfig, RemoteSourceConfig};
    use std::path::PathBuf;
    use std::time::Duration;

    fn config(remote_enabled: bool) -> Config {
        Config {
            base: BaseConfig {
                server_port: 4444,
                cors_origins: vec!["*".to_string()],
                environment: "development".to_string(),
                log_format: LogFormat::Pretty,
                http_concurrency_limit: 100,
            },
            photos: PhotoConfig {
                photos_dir: PathBuf::from("photos"),
                default_photo: "default.jpg".to_string(),
                catalog_enabled: true,
                manifest_path: None,
                download_url_template: "https://example.com/{id}".to_string(),
                download_concurrency: 1,
                gallery_title: "Gallery".to_string(),
            },
            remote: RemoteSourceConfig {
                enabled: remote_enabled,
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

    fn query(w: Option<u32>, h: Option<u32>, t: Option<&str>) -> ImageQuery {
        ImageQuery {
            w,
            h,
            t: t.map(String::from),
            u: None,
        }
    }

    #[test]
    fn test_width_bounds_are_inclusive() {
        let config = config(false);
        assert!(validate_transform(&query(Some(200), None, None), &config).is_ok());
        assert!(validate_transform(&query(Some(2000), None, None), &config).is_ok());
        assert!(matches!(
            validate_transform(&query(Some(199), None, None), &config),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            validate_transform(&query(Some(2001), None, None), &config),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_height_bounds() {
        let config = config(false);
        assert!(validate_transform(&query(None, Some(3000), None), &config).is_ok());
        assert!(validate_transform(&query(None, Some(3001), None), &config).is_err());
        assert!(validate_transform(&query(None, Some(0), None), &config).is_err());
    }

    #[test]
    fn test_defaults() {
        let spec = validate_transform(&ImageQuery::default(), &config(false)).unwrap();
        assert_eq!(spec.width, Some(800));
        assert_eq!(spec.height, None);
        assert_eq!(spec.format, OutputFormat::Jpeg);
    }

    #[test]
    fn test_format_aliases_and_rejects() {
        let config = config(false);
        let spec = validate_transform(&query(None, None, Some("jpg")), &config).unwrap();
        assert_eq!(spec.format, OutputFormat::Jpeg);
        let spec = validate_transform(&query(None, None, Some("avif")), &config).unwrap();
        assert_eq!(spec.format, OutputFormat::Avif);
        assert!(validate_transform(&query(None, None, Some("gif")), &config).is_err());
    }

    #[test]
    fn test_photo_name() {
        assert!(validate_photo_name("_ok8uVzL2gI.jpg").is_ok());
        assert!(matches!(
            validate_photo_name("..%2Fsecret.jpg"),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_remote_url_rejected_when_disabled() {
        let err = validate_remote_url("https://images.example.com/a.jpg", &config(false))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_remote_url_must_parse_and_be_public() {
        let config = config(true);
        assert!(validate_remote_url("not a url", &config).await.is_err());
        assert!(validate_remote_url("http://10.0.0.8/a.jpg", &config).await.is_err());
        let url = validate_remote_url("http://93.184.216.34/a.jpg", &config)
            .await
            .unwrap();
        assert_eq!(url.host_str(), Some("93.184.216.34"));
    }
}
