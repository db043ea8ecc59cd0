// Handlers HTTP. Aucun ne renvoie d'erreur : la dégradation passe par le champ `source`.
use crate::app_state::AppState;
use crate::cache::CacheStats;
use crate::models::{
    ArticlesResponse, CompositeStats, DevtoCombined, DevtoStats, GithubStats, HealthStatus,
    NpmStats, Snapshot, TrackRequest, TrackResponse, VisitorEvent,
};
use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use chrono::Utc;
use std::time::SystemTime;
use tracing::{error, info};
use uuid::Uuid;

// Handler pour GET `/api/github-stats`.
pub async fn github_stats_handler(State(state): State<AppState>) -> Json<GithubStats> {
    Json(state.github.stats().await)
}

// Handler pour GET `/api/npm-stats`.
pub async fn npm_stats_handler(State(state): State<AppState>) -> Json<NpmStats> {
    Json(state.npm.stats().await)
}

pub async fn devto_stats_handler(State(state): State<AppState>) -> Json<DevtoStats> {
    Json(state.devto.stats().await)
}

pub async fn devto_articles_handler(State(state): State<AppState>) -> Json<ArticlesResponse> {
    Json(state.devto.articles().await)
}

pub async fn devto_combined_handler(State(state): State<AppState>) -> Json<DevtoCombined> {
    Json(state.devto.combined().await)
}

// Handler pour GET `/api/homepage-stats` : les trois sources en une réponse.
pub async fn homepage_stats_handler(State(state): State<AppState>) -> Json<CompositeStats> {
    Json(state.homepage.stats().await)
}

pub async fn metrics_history_handler(State(state): State<AppState>) -> Json<Vec<Snapshot>> {
    Json(state.history.list().await)
}

// Handler pour POST `/api/track`. Le corps est lu brut : un JSON invalide ou absent
// donne une requête vide plutôt qu'un rejet.
pub async fn track_handler(headers: HeaderMap, body: Bytes) -> Json<TrackResponse> {
    let request: TrackRequest = serde_json::from_slice(&body).unwrap_or_default();
    let event = visitor_event(&headers, request);

    match serde_json::to_string(&event) {
        Ok(line) => info!(target: "visitor", "{}", line),
        Err(e) => error!(target: "visitor", "Could not serialize visitor event: {}", e),
    }

    Json(TrackResponse { success: true })
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn visitor_event(headers: &HeaderMap, request: TrackRequest) -> VisitorEvent {
    // Premier saut de la chaîne de proxys.
    let ip = header(headers, "x-forwarded-for")
        .and_then(|chain| chain.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .unwrap_or("unknown");

    let referrer = header(headers, "referer")
        .map(str::to_string)
        .or(request.referrer)
        .unwrap_or_else(|| "direct".to_string());

    VisitorEvent {
        id: Uuid::new_v4(),
        timestamp: Utc::now(),
        ip: ip.to_string(),
        user_agent: header(headers, "user-agent")
            .unwrap_or("unknown")
            .to_string(),
        referrer,
        page: request.page.unwrap_or_else(|| "/".to_string()),
        country: header(headers, "x-vercel-ip-country").map(str::to_string),
        city: header(headers, "x-vercel-ip-city").map(str::to_string),
        event: request.event.unwrap_or_else(|| "pageview".to_string()),
    }
}

// Handler pour GET `/api/cache-stats`.
pub async fn cache_stats_handler(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.cache.stats().await)
}

// Handler pour DELETE `/api/cache-stats` : vide le cache et renvoie son état.
pub async fn clear_cache_handler(State(state): State<AppState>) -> Json<CacheStats> {
    state.cache.clear().await;
    info!("Cache cleared");
    Json(state.cache.stats().await)
}

// Handler pour GET `/health` : vérifie l'état de santé du service.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy".to_string(),
        timestamp: current_timestamp(),
        cache_entries: state.cache.stats().await.size,
    })
}

// Fonction utilitaire pour le timestamp.
fn current_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or_default()
}
