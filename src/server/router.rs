use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::http::{HeaderValue, header::CACHE_CONTROL};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{Router, routing::get};

use super::api::api_router;
use crate::auth::AuthService;
use crate::store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub auth: AuthService,
}

async fn status() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

/// Stamps every response with the API version and a short shared-cache
/// policy; entity reads pair this with Last-Modified revalidation.
async fn set_api_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    headers.insert(
        "X-API-Version",
        HeaderValue::from_static(env!("CARGO_PKG_VERSION")),
    );
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=15, must-revalidate"),
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/status", get(status))
        .nest("/api/v1", api_router())
        .layer(middleware::from_fn(set_api_headers))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
