mod app_state;
mod cache;
mod clients;
mod config;
mod devto_stats;
mod error;
mod fallback;
mod github_stats;
mod handlers;
mod history;
mod homepage;
mod models;
mod npm_stats;

#[cfg(test)]
mod test_support;

use app_state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use config::{Config, Environment};
use handlers::{
    cache_stats_handler, clear_cache_handler, devto_articles_handler, devto_combined_handler,
    devto_stats_handler, github_stats_handler, health_check, homepage_stats_handler,
    metrics_history_handler, npm_stats_handler, track_handler,
};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/github-stats", get(github_stats_handler))
        .route("/api/npm-stats", get(npm_stats_handler))
        .route("/api/devto-stats", get(devto_stats_handler))
        .route("/api/devto-articles", get(devto_articles_handler))
        .route("/api/devto-combined", get(devto_combined_handler))
        .route("/api/homepage-stats", get(homepage_stats_handler))
        .route("/api/metrics-history", get(metrics_history_handler))
        .route("/api/track", post(track_handler))
        .route(
            "/api/cache-stats",
            get(cache_stats_handler).delete(clear_cache_handler),
        )
        .route("/health", get(health_check))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env();
    info!(
        "Starting in {:?} mode, snapshots in {}",
        config.environment,
        config.snapshots_dir.display()
    );
    if config.github_token.is_none() {
        warn!("GITHUB_TOKEN not set, GitHub stats limited to public endpoints");
    }
    if config.devto_api_key.is_none() {
        warn!("DEVTO_API_KEY not set, dev.to views and followers use fallback values");
    }
    if config.environment == Environment::Development {
        info!("Development mode: metrics history is read from disk on every request");
    }

    let state = AppState::new(&config)?;
    let app = build_router(state);

    info!("Server starting on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Endpoints, HistoryFallback};
    use crate::test_support::{devto_article, mount_devto_public, mount_npm, mount_public_github};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use std::net::SocketAddr;
    use std::path::Path;
    use tempfile::TempDir;
    use tower::ServiceExt;
    use wiremock::MockServer;

    fn config(upstream: &str, snapshots: &Path) -> Config {
        Config {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            environment: Environment::Production,
            github_token: None,
            devto_api_key: None,
            snapshots_dir: snapshots.to_path_buf(),
            history_fallback: HistoryFallback::Empty,
            endpoints: Endpoints::single(upstream),
        }
    }

    async fn get_json(app: &Router, uri: &str) -> Value {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    async fn mount_healthy_upstreams(server: &MockServer, stars: (u64, u64)) {
        mount_public_github(server, stars).await;
        mount_npm(server, &[("eslint-plugin-pg", 120, 3)]).await;
        mount_devto_public(
            server,
            json!([devto_article(1, 0, 5, Some("2026-01-04T00:00:00Z"))]),
        )
        .await;
    }

    #[tokio::test]
    async fn cold_cache_homepage_sums_tracked_stars() {
        let server = MockServer::start().await;
        mount_healthy_upstreams(&server, (3, 8)).await;
        let tmp = TempDir::new().unwrap();
        let app = build_router(AppState::new(&config(&server.uri(), tmp.path())).unwrap());

        let body = get_json(&app, "/api/homepage-stats").await;

        assert_eq!(body["source"], "api");
        assert_eq!(body["github"]["totalStars"], 11);
        assert_eq!(body["github"]["source"], "api");
        assert_eq!(body["npm"]["totalDownloads"], 123);
        assert!(!body["fetchedAt"].is_null());
    }

    #[tokio::test]
    async fn warm_cache_ignores_changed_upstreams() {
        let server = MockServer::start().await;
        mount_healthy_upstreams(&server, (3, 8)).await;
        let tmp = TempDir::new().unwrap();
        let app = build_router(AppState::new(&config(&server.uri(), tmp.path())).unwrap());

        let mut first = get_json(&app, "/api/homepage-stats").await;

        server.reset().await;
        mount_healthy_upstreams(&server, (40, 40)).await;
        let mut second = get_json(&app, "/api/homepage-stats").await;

        assert_eq!(first["source"], "api");
        assert_eq!(second["source"], "cache");

        // Hors provenance, la réponse est identique.
        first["source"] = Value::Null;
        second["source"] = Value::Null;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn missing_credential_github_stats() {
        let server = MockServer::start().await;
        mount_public_github(&server, (3, 8)).await;
        let tmp = TempDir::new().unwrap();
        let app = build_router(AppState::new(&config(&server.uri(), tmp.path())).unwrap());

        let body = get_json(&app, "/api/github-stats").await;

        assert_eq!(body["authenticated"], false);
        assert_eq!(body["totalStars"], 11);
        assert_eq!(body["followers"], 51);
        assert_eq!(body["recentCommits"], fallback::GITHUB_RECENT_COMMITS);
        assert_eq!(body["source"], "api");
    }

    #[tokio::test]
    async fn empty_history_is_an_empty_array() {
        let server = MockServer::start().await;
        let tmp = TempDir::new().unwrap();
        let app = build_router(AppState::new(&config(&server.uri(), tmp.path())).unwrap());

        let body = get_json(&app, "/api/metrics-history").await;
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn every_endpoint_answers_when_upstreams_are_down() {
        let server = MockServer::start().await;
        let tmp = TempDir::new().unwrap();
        let app = build_router(AppState::new(&config(&server.uri(), tmp.path())).unwrap());

        for uri in [
            "/api/github-stats",
            "/api/npm-stats",
            "/api/devto-stats",
            "/api/devto-combined",
            "/api/homepage-stats",
        ] {
            let body = get_json(&app, uri).await;
            assert_eq!(body["source"], "fallback", "{uri}");
        }

        let articles = get_json(&app, "/api/devto-articles").await;
        assert_eq!(articles["articles"], json!([]));
        assert_eq!(articles["source"], "fallback");
    }

    #[tokio::test]
    async fn track_always_succeeds() {
        let server = MockServer::start().await;
        let tmp = TempDir::new().unwrap();
        let app = build_router(AppState::new(&config(&server.uri(), tmp.path())).unwrap());

        for body in ["{\"page\":\"/about\",\"event\":\"pageview\"}", "not json", ""] {
            let response = app
                .clone()
                .oneshot(
                    Request::builder()
                        .method("POST")
                        .uri("/api/track")
                        .header("x-forwarded-for", "198.51.100.2")
                        .body(Body::from(body))
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let json: Value = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(json, json!({ "success": true }));
        }
    }

    #[tokio::test]
    async fn health_reports_cache_size() {
        let server = MockServer::start().await;
        let tmp = TempDir::new().unwrap();
        let app = build_router(AppState::new(&config(&server.uri(), tmp.path())).unwrap());

        let health = get_json(&app, "/health").await;
        assert_eq!(health["status"], "healthy");
        assert_eq!(health["cache_entries"], 0);

        let stats = get_json(&app, "/api/cache-stats").await;
        assert_eq!(stats, json!({ "size": 0, "keys": [] }));
    }

    #[tokio::test]
    async fn cache_can_be_cleared() {
        let server = MockServer::start().await;
        mount_public_github(&server, (3, 8)).await;
        let tmp = TempDir::new().unwrap();
        let app = build_router(AppState::new(&config(&server.uri(), tmp.path())).unwrap());

        get_json(&app, "/api/github-stats").await;
        let stats = get_json(&app, "/api/cache-stats").await;
        assert_eq!(stats["keys"], json!(["github:stats", "github:stats:last-good"]));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/cache-stats")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let cleared: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(cleared["size"], 0);
    }
}
