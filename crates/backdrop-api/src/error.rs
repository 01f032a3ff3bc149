//! HTTP error response conversion
//!
//! Handlers return `Result<_, HttpAppError>`. Anything that converts into
//! [`AppError`] (including the storage and processing error types) renders
//! with the same status, JSON body and log level. Error details are added by
//! [`error_details_middleware`] outside production.

use axum::{
    body::Body,
    extract::rejection::QueryRejection,
    extract::{FromRequestParts, Query, Request, State},
    http::{request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use backdrop_core::{AppError, ErrorMetadata, LogLevel};
use backdrop_processing::TransformError;
use backdrop_storage::SourceError;
use serde::{de::DeserializeOwned, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether this error is recoverable (can be retried)
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

/// Wrapper type for AppError to implement IntoResponse
/// This is necessary because of Rust's orphan rules - we can't implement
/// IntoResponse (external trait) for AppError (external type from backdrop-core)
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        })
    }
}

/// Malformed or unknown query parameters are a 400 with our ErrorResponse format.
impl From<QueryRejection> for HttpAppError {
    fn from(rejection: QueryRejection) -> Self {
        HttpAppError(AppError::InvalidInput(format!(
            "Invalid query string: {}",
            rejection.body_text()
        )))
    }
}

/// Query string extractor that returns our ErrorResponse format (400 + JSON) on
/// deserialization failure. Use this instead of `Query<T>`.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(inner) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(HttpAppError::from)?;
        Ok(ValidatedQuery(inner))
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, "Error occurred");
        }
    }
}

/// Full error body, carried on the response for [`error_details_middleware`]
#[derive(Debug, Clone)]
struct DetailedError(ErrorResponse);

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        let body = ErrorResponse {
            error: app_error.client_message(),
            details: None,
            error_type: None,
            code: app_error.error_code().to_string(),
            recoverable: app_error.is_recoverable(),
            suggested_action: app_error.suggested_action().map(String::from),
        };
        // Sensitive errors never get a detailed body
        let detailed = (!app_error.is_sensitive()).then(|| ErrorResponse {
            details: Some(app_error.detailed_message()),
            error_type: Some(app_error.error_type().to_string()),
            ..body.clone()
        });

        let mut response = (status, Json(body)).into_response();
        if let Some(detailed) = detailed {
            response.extensions_mut().insert(DetailedError(detailed));
        }
        response
    }
}

/// Replace error bodies with their detailed form unless running in production.
///
/// State is `Config::is_production()`. Without this layer, clients only
/// ever see the safe body.
pub async fn error_details_middleware(
    State(is_production): State<bool>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;

    let Some(DetailedError(detailed)) = response.extensions_mut().remove::<DetailedError>() else {
        return response;
    };
    if is_production {
        return response;
    }

    match serde_json::to_vec(&detailed) {
        Ok(body) => {
            let (parts, _) = response.into_parts();
            Response::from_parts(parts, Body::from(body))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to serialize detailed error body");
            response
        }
    }
}

// Convert layer errors to HttpAppError (avoids orphan rule: we impl for local HttpAppError)

impl From<SourceError> for HttpAppError {
    fn from(err: SourceError) -> Self {
        let app = match err {
            SourceError::NotFound(msg) => AppError::NotFound(msg),
            // A key that escapes the photo directory is reported exactly like a missing photo
            SourceError::InvalidKey(msg) => AppError::NotFound(msg),
            SourceError::UpstreamUnavailable(msg) => AppError::UpstreamUnavailable(msg),
            SourceError::ReadFailed(msg) => AppError::Internal(msg),
            SourceError::ConfigError(msg) => AppError::Configuration(msg),
        };
        HttpAppError(app)
    }
}

impl From<TransformError> for HttpAppError {
    fn from(err: TransformError) -> Self {
        match err {
            TransformError::Source(source) => HttpAppError::from(source),
            TransformError::Internal(msg) => HttpAppError(AppError::Internal(msg)),
            other @ (TransformError::SourceTooLarge { .. }
            | TransformError::Decode(_)
            | TransformError::Encode(_)) => {
                HttpAppError(AppError::TransformFailed(other.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    async fn render(err: HttpAppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[test]
    fn test_source_errors_map_to_app_errors() {
        let cases = [
            (SourceError::NotFound("a.jpg".into()), 404),
            (SourceError::InvalidKey("../a.jpg".into()), 404),
            (SourceError::UpstreamUnavailable("refused".into()), 500),
            (SourceError::ReadFailed("eio".into()), 500),
            (SourceError::ConfigError("no dir".into()), 500),
        ];
        for (err, status) in cases {
            assert_eq!(HttpAppError::from(err).0.http_status_code(), status);
        }
    }

    #[test]
    fn test_transform_source_error_keeps_source_mapping() {
        let err = TransformError::Source(SourceError::NotFound("missing.jpg".into()));
        assert!(matches!(HttpAppError::from(err).0, AppError::NotFound(_)));

        let err = TransformError::Source(SourceError::UpstreamUnavailable("timeout".into()));
        assert!(matches!(
            HttpAppError::from(err).0,
            AppError::UpstreamUnavailable(_)
        ));
    }

    #[test]
    fn test_codec_errors_are_transform_failures() {
        for err in [
            TransformError::Decode("bad marker".into()),
            TransformError::Encode("broken pipe".into()),
            TransformError::SourceTooLarge { limit: 10 },
        ] {
            assert!(matches!(
                HttpAppError::from(err).0,
                AppError::TransformFailed(_)
            ));
        }
        assert!(matches!(
            HttpAppError::from(TransformError::Internal("join".into())).0,
            AppError::Internal(_)
        ));
    }

    #[tokio::test]
    async fn test_not_found_response_body() {
        let (status, body) = render(AppError::NotFound("missing.jpg".into()).into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Not Found");
        assert_eq!(body["code"], "NOT_FOUND");
        assert_eq!(body["recoverable"], false);
    }

    #[tokio::test]
    async fn test_sensitive_error_hides_details() {
        let err = AppError::UpstreamUnavailable("connect 10.0.0.3:80 refused".into());
        let (status, body) = render(err.into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "UPSTREAM_UNAVAILABLE");
        assert!(body.get("details").is_none());
        assert!(!body.to_string().contains("10.0.0.3"));
    }

    /// Router whose only route fails with `err`, behind the details layer
    async fn render_through_layer(
        err: fn() -> AppError,
        is_production: bool,
    ) -> (StatusCode, serde_json::Value) {
        let app = Router::new()
            .route(
                "/",
                get(move || async move { Err::<(), _>(HttpAppError::from(err())) }),
            )
            .layer(axum::middleware::from_fn_with_state(
                is_production,
                error_details_middleware,
            ));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn missing_photo() -> AppError {
        AppError::NotFound("missing.jpg".into())
    }

    #[tokio::test]
    async fn test_details_shown_outside_production() {
        let (status, body) = render_through_layer(missing_photo, false).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
        assert!(body["details"].as_str().unwrap().contains("missing.jpg"));
        assert!(body.get("error_type").is_some());
    }

    #[tokio::test]
    async fn test_details_hidden_in_production() {
        let (status, body) = render_through_layer(missing_photo, true).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
        assert!(body.get("details").is_none());
        assert!(body.get("error_type").is_none());
    }

    #[tokio::test]
    async fn test_sensitive_details_hidden_outside_production() {
        let (_, body) = render_through_layer(
            || AppError::UpstreamUnavailable("connect 10.0.0.3:80 refused".into()),
            false,
        )
        .await;
        assert!(body.get("details").is_none());
        assert!(!body.to_string().contains("10.0.0.3"));
    }

    #[tokio::test]
    async fn test_safe_body_without_layer() {
        let (_, body) = render(missing_photo().into()).await;
        assert!(body.get("details").is_none());
    }
}
