use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::server::handlers::{auth, health, rag};
use crate::state::AppState;

/// Creates the application router.
///
/// Public: `/health`, `/register`, `/login`, `/query`.
/// Bearer token required: `/admin-data`, `/chat`.
pub fn router(state: Arc<AppState>) -> Router {
    let cors_layer = build_cors_layer(&state.settings.server.cors_allowed_origins);
    Router::new()
        .route("/health", get(health::health))
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/admin-data", get(auth::admin_data))
        .route("/chat", post(rag::chat))
        .route("/query", post(rag::query))
        .with_state(state)
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
}

const LOCAL_ORIGINS: [&str; 7] = [
    "http://localhost",
    "http://localhost:3000",
    "http://localhost:5173",
    "http://127.0.0.1",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:5173",
    "http://127.0.0.1:8000",
];

fn build_cors_layer(configured: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins(configured)
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Configured origins, or the local dev origins when none are set.
fn allowed_origins(configured: &[String]) -> Vec<String> {
    let origins: Vec<String> = configured
        .iter()
        .map(|origin| origin.trim())
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect();

    if origins.is_empty() {
        LOCAL_ORIGINS.iter().map(|origin| origin.to_string()).collect()
    } else {
        origins
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local() -> Vec<String> {
        LOCAL_ORIGINS.iter().map(|o| o.to_string()).collect()
    }

    #[test]
    fn falls_back_to_local_origins() {
        assert_eq!(allowed_origins(&[]), local());
        assert_eq!(allowed_origins(&["  ".to_string()]), local());
    }

    #[test]
    fn configured_origins_replace_defaults() {
        let configured = vec![" https://docs.example.com ".to_string()];

        assert_eq!(
            allowed_origins(&configured),
            vec!["https://docs.example.com".to_string()]
        );
    }
}
