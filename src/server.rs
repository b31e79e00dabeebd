//! HTTP boundary
//!
//! Axum server exposing one POST route per render operation. Handlers are
//! thin: decode the request, call the service, encode the result. Error
//! bodies use a `detail` field so peers running either side of a fallback
//! pair read each other's failures.

use crate::request::RenderRequest;
use crate::service::RenderService;
use crate::RenderError;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

impl IntoResponse for RenderError {
    fn into_response(self) -> Response {
        let status = match &self {
            RenderError::ElementNotFound(_) => StatusCode::NOT_FOUND,
            RenderError::MissingParameter(_) | RenderError::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            RenderError::BrowserUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

pub fn build_router(service: Arc<RenderService>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/legacy_screenshot/", post(legacy_screenshot))
        .route("/page/", post(page_screenshot))
        .route("/element_screenshot/", post(element_screenshot))
        .route("/section_screenshot/", post(section_screenshot))
        .route("/source/", post(source))
        .with_state(service)
}

/// Bind `addr` and serve until `shutdown` resolves.
pub async fn serve(
    service: Arc<RenderService>,
    addr: SocketAddr,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let router = build_router(service);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({ "status": 200 }))
}

async fn legacy_screenshot(
    State(service): State<Arc<RenderService>>,
    Json(request): Json<RenderRequest>,
) -> Result<Response, RenderError> {
    let result = service.legacy_screenshot(request).await?;
    Ok(Json(result).into_response())
}

async fn page_screenshot(
    State(service): State<Arc<RenderService>>,
    Json(request): Json<RenderRequest>,
) -> Result<Response, RenderError> {
    let result = service.page_screenshot(request).await?;
    Ok(Json(result).into_response())
}

async fn element_screenshot(
    State(service): State<Arc<RenderService>>,
    Json(request): Json<RenderRequest>,
) -> Result<Response, RenderError> {
    let result = service.element_screenshot(request).await?;
    Ok(Json(result).into_response())
}

async fn section_screenshot(
    State(service): State<Arc<RenderService>>,
    Json(request): Json<RenderRequest>,
) -> Result<Response, RenderError> {
    let result = service.section_screenshot(request).await?;
    Ok(Json(result).into_response())
}

async fn source(
    State(service): State<Arc<RenderService>>,
    Json(request): Json<RenderRequest>,
) -> Result<Response, RenderError> {
    let html = service.source(request).await?;
    Ok(Json(html).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_status_mapping() {
        let cases = [
            (
                RenderError::ElementNotFound("body".into()),
                StatusCode::NOT_FOUND,
            ),
            (
                RenderError::MissingParameter("url"),
                StatusCode::BAD_REQUEST,
            ),
            (
                RenderError::InvalidRequest("both content and url supplied"),
                StatusCode::BAD_REQUEST,
            ),
            (
                RenderError::BrowserUnavailable,
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                RenderError::CaptureFailed("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }
}
