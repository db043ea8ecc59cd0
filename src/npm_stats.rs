use crate::cache::{CacheStore, CacheTier};
use crate::clients::{NpmClient, FAST_TIMEOUT, REST_TIMEOUT};
use crate::config::{NpmIdentity, NPM};
use crate::error::FetchError;
use crate::fallback;
use crate::models::{DailyDownloads, HomepageNpm, NpmStats, PackageDownloads, SourceTag};
use chrono::{Days, NaiveDate, Utc};
use futures_util::future::join_all;
use std::sync::Arc;
use tracing::{error, info, warn};

const STATS_KEY: &str = "npm:stats";
const LAST_GOOD_KEY: &str = "npm:stats:last-good";

// Nombre de jours complets avant aujourd'hui inclus dans la série.
const HISTORY_DAYS: u64 = 30;

pub fn is_excluded(identity: &NpmIdentity, name: &str) -> bool {
    identity.excluded_packages.contains(&name)
        || identity
            .excluded_prefixes
            .iter()
            .any(|prefix| name.starts_with(prefix))
}

// Retire les paquets exclus. Idempotent : appliquer deux fois donne le même ensemble.
pub fn apply_exclusions(identity: &NpmIdentity, names: Vec<String>) -> Vec<String> {
    names
        .into_iter()
        .filter(|name| !is_excluded(identity, name))
        .collect()
}

// Une plage de téléchargements et le niveau de cache qui lui correspond.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub tier: CacheTier,
}

impl DownloadWindow {
    pub fn cache_key(&self, package: &str) -> String {
        format!("npm:downloads:{package}:{}:{}", self.start, self.end)
    }
}

// Les jours écoulés ne changent plus (Historical) ; aujourd'hui bouge encore (Fresh).
pub fn download_windows(today: NaiveDate) -> Vec<DownloadWindow> {
    let mut windows = Vec::with_capacity(2);

    if let (Some(start), Some(end)) = (
        today.checked_sub_days(Days::new(HISTORY_DAYS)),
        today.checked_sub_days(Days::new(1)),
    ) {
        windows.push(DownloadWindow {
            start,
            end,
            tier: CacheTier::Historical,
        });
    }

    windows.push(DownloadWindow {
        start: today,
        end: today,
        tier: CacheTier::Fresh,
    });

    windows
}

pub struct NpmStatsService {
    client: NpmClient,
    cache: Arc<CacheStore>,
}

impl NpmStatsService {
    pub fn new(client: NpmClient, cache: Arc<CacheStore>) -> Self {
        Self { client, cache }
    }

    pub async fn stats(&self) -> NpmStats {
        match self.cached_or_live().await {
            Ok(stats) => stats,
            Err(e) => {
                error!("Failed to fetch npm stats: {}", e);
                if let Some(mut last_good) = self.cache.get::<NpmStats>(LAST_GOOD_KEY).await {
                    warn!("Serving last known npm stats");
                    last_good.source = SourceTag::Cache;
                    return last_good;
                }
                fallback::npm_stats()
            }
        }
    }

    pub async fn homepage_summary(&self) -> Result<HomepageNpm, FetchError> {
        self.cached_or_live().await.map(HomepageNpm::from)
    }

    async fn cached_or_live(&self) -> Result<NpmStats, FetchError> {
        if let Some(mut cached) = self.cache.get::<NpmStats>(STATS_KEY).await {
            cached.source = SourceTag::Cache;
            return Ok(cached);
        }

        let stats = self.fetch_stats(Utc::now().date_naive()).await?;
        self.cache
            .set(STATS_KEY, stats.clone(), CacheTier::Fresh)
            .await;
        self.cache
            .set(LAST_GOOD_KEY, stats.clone(), CacheTier::Historical)
            .await;
        Ok(stats)
    }

    pub async fn fetch_stats(&self, today: NaiveDate) -> Result<NpmStats, FetchError> {
        let packages = self.tracked_packages().await?;
        let windows = download_windows(today);

        let mut downloads = join_all(
            packages
                .iter()
                .map(|package| self.package_downloads(package, &windows)),
        )
        .await;

        downloads.sort_by(|a, b| {
            b.downloads
                .cmp(&a.downloads)
                .then_with(|| a.name.cmp(&b.name))
        });
        let total_downloads: u64 = downloads.iter().map(|p| p.downloads).sum();

        // Heuristique conservée : un total nul est traité comme une panne du registre,
        // même si un paquet tout neuf peut légitimement être à zéro.
        if total_downloads == 0 {
            warn!("All packages returned 0 downloads, using fallback");
            return Err(FetchError::NoDownloads);
        }

        info!(
            "Fetched npm downloads for {} packages ({} total)",
            downloads.len(),
            total_downloads
        );

        Ok(NpmStats {
            package_count: downloads.len() as u64,
            packages: downloads,
            total_downloads,
            source: SourceTag::Api,
        })
    }

    // La liste change rarement : cache Standard, exclusions appliquées avant les totaux.
    // Une liste vide n'est jamais mise en cache.
    async fn tracked_packages(&self) -> Result<Vec<String>, FetchError> {
        let key = format!("npm:packages:{}", NPM.maintainer);
        self.cache
            .get_or_fetch(&key, CacheTier::Standard, || async {
                let names = self
                    .client
                    .maintainer_packages(NPM.maintainer, REST_TIMEOUT)
                    .await?;
                let names = apply_exclusions(&NPM, names);
                if names.is_empty() {
                    return Err(FetchError::NoPackages(NPM.maintainer.to_string()));
                }
                Ok(names)
            })
            .await
    }

    // Une fenêtre en échec ne contribue aucun jour ; le paquet reste dans la liste.
    async fn package_downloads(&self, package: &str, windows: &[DownloadWindow]) -> PackageDownloads {
        let ranges = join_all(windows.iter().map(|window| async move {
            let key = window.cache_key(package);
            let result = self
                .cache
                .get_or_fetch(&key, window.tier, || {
                    self.client
                        .download_range(package, window.start, window.end, FAST_TIMEOUT)
                })
                .await;
            result.unwrap_or_else(|e| {
                warn!("Failed to fetch downloads for {}: {}", package, e);
                Vec::new()
            })
        }))
        .await;

        let daily_data: Vec<DailyDownloads> = ranges.into_iter().flatten().collect();
        PackageDownloads {
            name: package.to_string(),
            downloads: daily_data.iter().map(|d| d.downloads).sum(),
            daily_data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::mount_npm;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service(server: &MockServer, cache: Arc<CacheStore>) -> NpmStatsService {
        let client = NpmClient::new(server.uri(), server.uri()).unwrap();
        NpmStatsService::new(client, cache)
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn exclusion_filter_is_idempotent() {
        let input = names(&[
            "eslint-plugin-secure-coding",
            "eslint-plugin-mcp",
            "@forge-js/core",
            "@forge-js/ESLint-Plugin",
            "@interlace/eslint-devkit",
        ]);

        let once = apply_exclusions(&NPM, input);
        let twice = apply_exclusions(&NPM, once.clone());

        assert_eq!(once, twice);
        assert_eq!(
            once,
            names(&["eslint-plugin-secure-coding", "@interlace/eslint-devkit"])
        );
    }

    #[test]
    fn prefix_match_is_literal() {
        assert!(is_excluded(&NPM, "@forge-js/MixedCase"));
        assert!(is_excluded(&NPM, "@forge-js/lower"));
        assert!(!is_excluded(&NPM, "@Forge-JS/lower"));
        // Les noms exacts ne sont pas des préfixes.
        assert!(!is_excluded(&NPM, "eslint-plugin-mcp-extra"));
    }

    #[test]
    fn today_and_past_use_distinct_keys_and_ttls() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();
        let windows = download_windows(today);
        assert_eq!(windows.len(), 2);

        let past = windows[0];
        let current = windows[1];

        assert_eq!(past.start, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        assert_eq!(past.end, NaiveDate::from_ymd_opt(2026, 1, 30).unwrap());
        assert!(past.end < today);
        assert_eq!(past.tier, CacheTier::Historical);

        assert_eq!((current.start, current.end), (today, today));
        assert_eq!(current.tier, CacheTier::Fresh);

        assert_ne!(past.cache_key("pkg"), current.cache_key("pkg"));
        assert_eq!(current.cache_key("pkg"), "npm:downloads:pkg:2026-01-31:2026-01-31");
        assert_ne!(past.tier.ttl(), current.tier.ttl());
    }

    #[tokio::test]
    async fn aggregates_and_excludes_packages() {
        let server = MockServer::start().await;
        mount_npm(
            &server,
            &[
                ("eslint-plugin-pg", 100, 2),
                ("eslint-plugin-crypto", 300, 1),
                ("eslint-plugin-mcp", 5000, 0),
            ],
        )
        .await;

        let cache = Arc::new(CacheStore::new());
        let stats = service(&server, cache.clone()).stats().await;

        assert_eq!(stats.source, SourceTag::Api);
        assert_eq!(stats.package_count, 2);
        assert_eq!(stats.total_downloads, 403);
        assert_eq!(stats.packages[0].name, "eslint-plugin-crypto");
        assert_eq!(stats.packages[0].downloads, 301);
        assert_eq!(stats.packages[0].daily_data.len(), 3);

        let keys = cache.stats().await.keys;
        assert!(keys.contains(&"npm:packages:ofriperetz".to_string()));
        assert_eq!(keys.iter().filter(|k| k.starts_with("npm:downloads:")).count(), 4);
    }

    #[tokio::test]
    async fn all_zero_downloads_fall_back() {
        let server = MockServer::start().await;
        mount_npm(&server, &[("eslint-plugin-pg", 0, 0)]).await;

        let stats = service(&server, Arc::new(CacheStore::new())).stats().await;
        assert_eq!(stats, fallback::npm_stats());
    }

    #[tokio::test]
    async fn search_failure_falls_back() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/-/v1/search"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let stats = service(&server, Arc::new(CacheStore::new())).stats().await;
        assert_eq!(stats.source, SourceTag::Fallback);
        assert_eq!(stats.total_downloads, 9500);
        assert!(!stats.packages.is_empty());
    }

    #[tokio::test]
    async fn failed_package_counts_as_zero() {
        let server = MockServer::start().await;
        mount_npm(&server, &[("eslint-plugin-pg", 40, 2)]).await;
        // Paquet présent dans la recherche mais sans statistiques.
        Mock::given(method("GET"))
            .and(path("/-/v1/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "objects": [
                    { "package": { "name": "eslint-plugin-pg" } },
                    { "package": { "name": "eslint-plugin-new" } }
                ]
            })))
            .with_priority(1)
            .mount(&server)
            .await;

        let stats = service(&server, Arc::new(CacheStore::new())).stats().await;
        assert_eq!(stats.package_count, 2);
        assert_eq!(stats.total_downloads, 42);
        assert_eq!(stats.packages[1].name, "eslint-plugin-new");
        assert_eq!(stats.packages[1].downloads, 0);
    }

    #[tokio::test]
    async fn empty_package_list_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/-/v1/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "objects": [{ "package": { "name": "eslint-plugin-mcp" } }]
            })))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        mount_npm(&server, &[("eslint-plugin-pg", 30, 3)]).await;

        let cache = Arc::new(CacheStore::new());
        let svc = service(&server, cache.clone());

        let first = svc.stats().await;
        assert_eq!(first.source, SourceTag::Fallback);
        assert!(!cache
            .stats()
            .await
            .keys
            .contains(&"npm:packages:ofriperetz".to_string()));

        let second = svc.stats().await;
        assert_eq!(second.source, SourceTag::Api);
        assert_eq!(second.total_downloads, 33);
    }

    #[tokio::test]
    async fn second_call_hits_cache() {
        let server = MockServer::start().await;
        mount_npm(&server, &[("eslint-plugin-pg", 10, 1)]).await;
        let svc = service(&server, Arc::new(CacheStore::new()));

        let first = svc.stats().await;
        server.reset().await;
        let second = svc.stats().await;

        assert_eq!(first.source, SourceTag::Api);
        assert_eq!(second.source, SourceTag::Cache);
        assert_eq!(second.total_downloads, first.total_downloads);
    }
}
