//! Image endpoints: `/` and `/{image}`

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use backdrop_core::{AppError, OutputFormat, PhotoName, SourceRequest, TransformSpec};
use backdrop_processing::{TransformError, TransformStream};
use futures::{stream, StreamExt};

use crate::error::{HttpAppError, ValidatedQuery};
use crate::handlers::gallery::render_gallery;
use crate::negotiation::{negotiate, Negotiated};
use crate::state::AppState;
use crate::validation::{validate_photo_name, validate_remote_url, validate_transform, ImageQuery};

/// Random, default or remote photo, or the gallery when the client wants HTML.
#[tracing::instrument(skip(state, headers, query), fields(operation = "get_image"))]
pub async fn get_image(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ValidatedQuery(query): ValidatedQuery<ImageQuery>,
) -> Result<Response, HttpAppError> {
    respond(&state, None, &query, &headers).await
}

/// A specific photo from the managed directory.
#[tracing::instrument(
    skip(state, image, headers, query),
    fields(operation = "get_named_image", photo = %image)
)]
pub async fn get_named_image(
    State(state): State<Arc<AppState>>,
    Path(image): Path<String>,
    headers: HeaderMap,
    ValidatedQuery(query): ValidatedQuery<ImageQuery>,
) -> Result<Response, HttpAppError> {
    let name = validate_photo_name(&image)?;
    if query.u.is_some() {
        return Err(AppError::InvalidInput(
            "u cannot be combined with an image name".to_string(),
        )
        .into());
    }
    respond(&state, Some(name), &query, &headers).await
}

async fn respond(
    state: &AppState,
    name: Option<PhotoName>,
    query: &ImageQuery,
    headers: &HeaderMap,
) -> Result<Response, HttpAppError> {
    let spec = validate_transform(query, &state.config)?;
    let remote = match query.u.as_deref() {
        Some(raw) => Some(validate_remote_url(raw, &state.config).await?),
        None => None,
    };
    let accept = headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok());

    let negotiated = negotiate(
        name,
        remote,
        state.config.catalog_enabled(),
        accept,
        spec.format,
    );

    let mut response = match negotiated {
        Negotiated::Gallery => render_gallery(state).into_response(),
        Negotiated::Image(request) => serve_image(state, request, spec).await?,
    };
    response
        .headers_mut()
        .insert(header::VARY, header::HeaderValue::from_static("Accept"));
    Ok(response)
}

async fn serve_image(
    state: &AppState,
    request: SourceRequest,
    spec: TransformSpec,
) -> Result<Response, HttpAppError> {
    tracing::debug!(
        source = request.kind(),
        format = %spec.format,
        width = ?spec.width,
        height = ?spec.height,
        "Serving image"
    );

    let source = state.resolver.resolve(&request);
    let output = state.pipeline.transform(source, spec);
    stream_response(spec.format, output).await
}

/// Turn transform output into a streamed image response.
///
/// The response is held until the first chunk, so a missing or corrupt
/// source still gets a proper status. A failure after that can only cut the
/// body short.
pub(crate) async fn stream_response(
    format: OutputFormat,
    mut output: TransformStream,
) -> Result<Response, HttpAppError> {
    let first = match output.next().await {
        Some(chunk) => chunk?,
        None => {
            return Err(AppError::Internal("Transform produced no output".to_string()).into());
        }
    };

    let body_stream = stream::once(async move { Ok::<_, TransformError>(first) })
        .chain(output)
        .map(|result| {
            result.map_err(|e| std::io::Error::other(format!("Transform stream error: {}", e)))
        });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, format.to_mime_type())
        .body(Body::from_stream(body_stream))
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to build response");
            HttpAppError::from(AppError::Internal(e.to_string()))
        })
}
