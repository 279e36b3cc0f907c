//! HTTP handlers for storage notifications.
//! The request body is handed to `EventProcessor` as raw bytes so decode and
//! parse failures can be told apart.

use crate::{
    errors::AppError,
    models::notification::Acknowledgement,
    services::event_processor::EventProcessor,
};
use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, Uri, header},
    response::Html,
};
use tracing::info;

/// `POST /` with a storage notification.
///
/// Answers 200 once the body parses as JSON, whatever the pipeline outcome.
pub async fn receive_notification(
    State(processor): State<EventProcessor>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Acknowledgement>, AppError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    info!("POST request, {} body bytes", body.len());

    let ack = processor.process(&body, content_type).await?;
    Ok(Json(ack))
}

/// `GET /{*path}`: diagnostic echo of the requested path.
pub async fn echo_path(uri: Uri) -> Html<String> {
    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    info!("GET request, Path: {}", path);
    Html(format!("GET request for {}", path))
}
