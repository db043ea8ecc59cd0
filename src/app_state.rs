use crate::cache::CacheStore;
use crate::clients::{DevtoClient, GithubClient, NpmClient};
use crate::config::{Config, GITHUB};
use crate::devto_stats::DevtoStatsService;
use crate::error::FetchError;
use crate::github_stats::GithubStatsService;
use crate::history::HistoryReader;
use crate::homepage::HomepageService;
use crate::npm_stats::NpmStatsService;
use std::sync::Arc;

// Un seul cache par processus, partagé par tous les services.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<CacheStore>,
    pub github: Arc<GithubStatsService>,
    pub npm: Arc<NpmStatsService>,
    pub devto: Arc<DevtoStatsService>,
    pub homepage: Arc<HomepageService>,
    pub history: Arc<HistoryReader>,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let cache = Arc::new(CacheStore::new());
        let endpoints = &config.endpoints;

        let github = Arc::new(GithubStatsService::new(
            GithubClient::new(
                endpoints.github_api.as_str(),
                GITHUB.username,
                config.github_token.as_deref(),
            )?,
            cache.clone(),
        ));
        let npm = Arc::new(NpmStatsService::new(
            NpmClient::new(
                endpoints.npm_registry.as_str(),
                endpoints.npm_downloads.as_str(),
            )?,
            cache.clone(),
        ));
        let devto = Arc::new(DevtoStatsService::new(
            DevtoClient::new(
                endpoints.devto_api.as_str(),
                config.devto_api_key.as_deref(),
            )?,
            cache.clone(),
        ));

        let homepage = Arc::new(HomepageService::new(
            github.clone(),
            npm.clone(),
            devto.clone(),
            cache.clone(),
        ));
        let history = Arc::new(HistoryReader::new(
            config.snapshots_dir.clone(),
            cache.clone(),
            config.environment,
            config.history_fallback,
        ));

        Ok(Self {
            cache,
            github,
            npm,
            devto,
            homepage,
            history,
        })
    }
}
