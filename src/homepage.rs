use crate::cache::{CacheStore, CacheTier};
use crate::devto_stats::DevtoStatsService;
use crate::error::FetchError;
use crate::fallback;
use crate::github_stats::GithubStatsService;
use crate::models::{CompositeStats, HomepageGithub, SourceTag};
use crate::npm_stats::NpmStatsService;
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info};

const UNIFIED_KEY: &str = "homepage:unified-stats";

// Un 0 sur un champ réservé aux appels authentifiés veut dire « inconnu », pas « aucune activité ».
pub fn with_display_fallbacks(mut github: HomepageGithub) -> HomepageGithub {
    if github.total_contributions == 0 {
        github.total_contributions = fallback::HOMEPAGE_TOTAL_CONTRIBUTIONS;
    }
    if github.recent_commits == 0 {
        github.recent_commits = fallback::HOMEPAGE_RECENT_COMMITS;
    }
    github
}

// Remplace une branche en échec par le fallback de sa source, sans toucher aux autres.
fn settle<T>(name: &str, result: Result<T, FetchError>, or_else: fn() -> T) -> (T, bool) {
    match result {
        Ok(value) => (value, true),
        Err(e) => {
            error!("Homepage {} summary failed, using fallback: {}", name, e);
            (or_else(), false)
        }
    }
}

pub struct HomepageService {
    github: Arc<GithubStatsService>,
    npm: Arc<NpmStatsService>,
    devto: Arc<DevtoStatsService>,
    cache: Arc<CacheStore>,
}

impl HomepageService {
    pub fn new(
        github: Arc<GithubStatsService>,
        npm: Arc<NpmStatsService>,
        devto: Arc<DevtoStatsService>,
        cache: Arc<CacheStore>,
    ) -> Self {
        Self {
            github,
            npm,
            devto,
            cache,
        }
    }

    pub async fn stats(&self) -> CompositeStats {
        if let Some(mut cached) = self.cache.get::<CompositeStats>(UNIFIED_KEY).await {
            cached.source = SourceTag::Cache;
            return cached;
        }

        // Les trois branches avancent ensemble ; chacune est réglée indépendamment.
        let (github, npm, devto) = tokio::join!(
            self.github.homepage_summary(),
            self.npm.homepage_summary(),
            self.devto.homepage_summary()
        );

        let (github, github_ok) = settle("github", github, fallback::homepage_github);
        let (npm, npm_ok) = settle("npm", npm, fallback::homepage_npm);
        let (devto, devto_ok) = settle("devto", devto, fallback::homepage_devto);

        let source = if github_ok || npm_ok || devto_ok {
            SourceTag::Api
        } else {
            SourceTag::Fallback
        };

        let composite = CompositeStats {
            github: with_display_fallbacks(github),
            npm,
            devto,
            source,
            fetched_at: Some(Utc::now()),
        };

        info!(
            "Homepage stats assembled (github={:?}, npm={:?}, devto={:?})",
            composite.github.source, composite.npm.source, composite.devto.source
        );

        self.cache
            .set(UNIFIED_KEY, composite.clone(), CacheTier::Fresh)
            .await;
        composite
    }
}
