//! HTTP surface.

pub mod cart;
pub mod catalog;
pub mod customers;
pub mod error;
pub mod extract;
pub mod orders;
pub mod payments;
pub mod views;

use axum::extract::{Request, State};
use axum::http::header::{
    CACHE_CONTROL, CONTENT_SECURITY_POLICY, ETAG, EXPIRES, LAST_MODIFIED, PRAGMA, REFERRER_POLICY,
    X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS, X_XSS_PROTECTION,
};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;
use crate::services::Services;
use crate::storage::Storage;

const CONTENT_SECURITY: &str = "default-src 'self'; script-src 'self' 'unsafe-inline' 'unsafe-eval'; \
    style-src 'self' 'unsafe-inline'; img-src 'self' data: https:; font-src 'self' data:; \
    connect-src 'self' http://localhost:* http://127.0.0.1:*";
const PERMISSIONS_POLICY: HeaderName = HeaderName::from_static("permissions-policy");

#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub storage: Arc<dyn Storage>,
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .merge(customers::routes())
        .merge(catalog::routes())
        .merge(cart::routes())
        .merge(orders::routes())
        .merge(payments::routes())
        .layer(middleware::from_fn(no_cache));

    Router::new()
        .route("/health", get(health))
        .route("/ready", get(|| async { Json(json!({ "status": "ready" })) }))
        .nest("/api", api)
        .layer(
            ServiceBuilder::new()
                .layer(SetResponseHeaderLayer::overriding(CONTENT_SECURITY_POLICY, HeaderValue::from_static(CONTENT_SECURITY)))
                .layer(SetResponseHeaderLayer::overriding(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")))
                .layer(SetResponseHeaderLayer::overriding(X_FRAME_OPTIONS, HeaderValue::from_static("DENY")))
                .layer(SetResponseHeaderLayer::overriding(X_XSS_PROTECTION, HeaderValue::from_static("1; mode=block")))
                .layer(SetResponseHeaderLayer::overriding(
                    REFERRER_POLICY,
                    HeaderValue::from_static("strict-origin-when-cross-origin"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    PERMISSIONS_POLICY,
                    HeaderValue::from_static("geolocation=(), microphone=(), camera=(), payment=()"),
                )),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// API responses carry user-specific data and must never be cached.
async fn no_cache(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache, no-store, must-revalidate, max-age=0, private"));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(EXPIRES, HeaderValue::from_static("0"));
    headers.remove(ETAG);
    headers.remove(LAST_MODIFIED);
    response
}

async fn health(State(s): State<AppState>) -> (StatusCode, Json<Value>) {
    match s.storage.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "healthy", "service": "mobile-store", "database": "connected" })),
        ),
        Err(e) => {
            warn!(error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unhealthy", "service": "mobile-store", "database": "disconnected" })),
            )
        }
    }
}
