use crate::cache::{CacheStore, CacheTier};
use crate::config::{Environment, HistoryFallback};
use crate::error::HistoryError;
use crate::models::{DevtoSnapshot, EcosystemSnapshot, GithubSnapshot, NpmSnapshot, Snapshot};
use chrono::{Days, NaiveDate};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

const HISTORY_KEY: &str = "history:snapshots";
const AGGREGATION_FILE: &str = "aggregation.json";

// Lecture seule de la série quotidienne écrite par le job batch.
pub struct HistoryReader {
    dir: PathBuf,
    cache: Arc<CacheStore>,
    environment: Environment,
    fallback: HistoryFallback,
}

impl HistoryReader {
    pub fn new(
        dir: impl Into<PathBuf>,
        cache: Arc<CacheStore>,
        environment: Environment,
        fallback: HistoryFallback,
    ) -> Self {
        Self {
            dir: dir.into(),
            cache,
            environment,
            fallback,
        }
    }

    // Ordre chronologique. Série absente ou illisible : fallback configuré (vide ou seed).
    pub async fn list(&self) -> Vec<Snapshot> {
        // En développement les fichiers sont relus à chaque requête.
        let cached = self.environment == Environment::Production;
        if cached {
            if let Some(snapshots) = self.cache.get::<Vec<Snapshot>>(HISTORY_KEY).await {
                return snapshots;
            }
        }

        let snapshots = match read_series(&self.dir).await {
            Ok(snapshots) => snapshots,
            Err(e) => {
                warn!("Snapshot series unreadable: {}", e);
                Vec::new()
            }
        };

        if snapshots.is_empty() {
            info!("No historical snapshots found in {}", self.dir.display());
            return match self.fallback {
                HistoryFallback::Empty => Vec::new(),
                HistoryFallback::Seed => seed_series(),
            };
        }

        if cached {
            self.cache
                .set(HISTORY_KEY, snapshots.clone(), CacheTier::Historical)
                .await;
        }
        snapshots
    }
}

// Fichier agrégé s'il existe, sinon un fichier par jour. Répertoire absent = série vide.
pub async fn read_series(dir: &Path) -> Result<Vec<Snapshot>, HistoryError> {
    let aggregation = dir.join(AGGREGATION_FILE);
    let snapshots = match tokio::fs::read_to_string(&aggregation).await {
        Ok(content) => {
            serde_json::from_str::<Vec<Snapshot>>(&content).map_err(|source| {
                HistoryError::Parse {
                    path: aggregation.clone(),
                    source,
                }
            })?
        }
        Err(e) if e.kind() == ErrorKind::NotFound => read_daily_files(dir).await?,
        Err(source) => {
            return Err(HistoryError::Io {
                path: aggregation,
                source,
            })
        }
    };

    Ok(normalize(snapshots))
}

async fn read_daily_files(dir: &Path) -> Result<Vec<Snapshot>, HistoryError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(HistoryError::Io {
                path: dir.to_path_buf(),
                source,
            })
        }
    };

    let mut snapshots = Vec::new();
    loop {
        let entry = entries.next_entry().await.map_err(|source| HistoryError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let Some(entry) = entry else { break };

        let path = entry.path();
        if !is_daily_file(&path) {
            continue;
        }

        // Un fichier corrompu est ignoré, les autres jours restent lisibles.
        match read_snapshot(&path).await {
            Ok(snapshot) => snapshots.push(snapshot),
            Err(e) => warn!("Skipping snapshot: {}", e),
        }
    }

    debug!("Read {} daily snapshots from {}", snapshots.len(), dir.display());
    Ok(snapshots)
}

fn is_daily_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
        && path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .is_some_and(|stem| NaiveDate::parse_from_str(stem, "%Y-%m-%d").is_ok())
}

async fn read_snapshot(path: &Path) -> Result<Snapshot, HistoryError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| HistoryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    serde_json::from_str(&content).map_err(|source| HistoryError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

// Tri croissant, un seul snapshot par date (le dernier lu l'emporte).
fn normalize(snapshots: Vec<Snapshot>) -> Vec<Snapshot> {
    snapshots
        .into_iter()
        .map(|snapshot| (snapshot.date, snapshot))
        .collect::<BTreeMap<_, _>>()
        .into_values()
        .collect()
}

// --- Série synthétique ---

struct SeedTargets {
    npm_downloads: u64,
    npm_packages: u64,
    github_stars: u64,
    github_followers: u64,
    github_contributions: u64,
    github_commits: u64,
    devto_views: u64,
    devto_followers: u64,
    devto_reactions: u64,
    devto_comments: u64,
    devto_articles: u64,
    ecosystem: EcosystemSnapshot,
}

// Valeurs réelles au dernier jour de la série.
const SEED_TARGETS: SeedTargets = SeedTargets {
    npm_downloads: 8602,
    npm_packages: 14,
    github_stars: 1,
    github_followers: 6,
    github_contributions: 614,
    github_commits: 572,
    devto_views: 1699,
    devto_followers: 89,
    devto_reactions: 10,
    devto_comments: 9,
    devto_articles: 28,
    ecosystem: EcosystemSnapshot {
        packages: 14,
        plugins: 15,
        rules: 221,
        owasp_coverage: 100,
        test_coverage: 90,
    },
};

fn seed_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, 15).unwrap_or_default()
}

fn seed_end() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 9).unwrap_or_default()
}

// Courbe en S : lente au départ, accélère, puis plafonne.
fn logistic(target: u64, day: u64, days: u64, start_ratio: f64) -> u64 {
    let progress = day as f64 / days as f64;
    let curve = 1.0 / (1.0 + (-6.0 * (progress - 0.5)).exp());
    (target as f64 * (start_ratio + (1.0 - start_ratio) * curve)).floor() as u64
}

fn linear(target: u64, day: u64, days: u64, start_ratio: f64) -> u64 {
    let progress = day as f64 / days as f64;
    (target as f64 * (start_ratio + (1.0 - start_ratio) * progress)).floor() as u64
}

// Compteurs discrets (articles, plugins) : au moins 1.
fn step(target: u64, day: u64, days: u64) -> u64 {
    ((target as f64 * day as f64 / days as f64).floor() as u64).max(1)
}

// Série synthétique déterministe du 2025-11-15 au 2026-01-09, un point par jour,
// terminée exactement sur les valeurs relevées.
pub fn seed_series() -> Vec<Snapshot> {
    let start = seed_start();
    let days = (seed_end() - start).num_days().max(1) as u64;

    let mut series: Vec<Snapshot> = (0..=days)
        .filter_map(|day| {
            let date = start.checked_add_days(Days::new(day))?;
            Some(seed_snapshot(date, day, days))
        })
        .collect();

    if let Some(last) = series.last_mut() {
        *last = final_snapshot(last.date);
    }
    series
}

fn seed_snapshot(date: NaiveDate, day: u64, days: u64) -> Snapshot {
    let t = &SEED_TARGETS;
    let prev = day.saturating_sub(1);
    let delta = |now: u64, before: u64| Some(now.saturating_sub(before));

    let downloads = logistic(t.npm_downloads, day, days, 0.02);
    let contributions = linear(t.github_contributions, day, days, 0.05);
    let commits = linear(t.github_commits, day, days, 0.05);
    let views = logistic(t.devto_views, day, days, 0.01);
    let followers = logistic(t.devto_followers, day, days, 0.05);
    let reactions = linear(t.devto_reactions, day, days, 0.1);
    let comments = linear(t.devto_comments, day, days, 0.1);

    Snapshot {
        date,
        npm: NpmSnapshot {
            total_downloads: downloads,
            daily_downloads: delta(downloads, logistic(t.npm_downloads, prev, days, 0.02)),
            package_count: step(t.npm_packages, day, days).clamp(5, t.npm_packages),
        },
        github: GithubSnapshot {
            // La première étoile arrive la dernière semaine.
            stars: if day + 7 > days { t.github_stars } else { 0 },
            followers: linear(t.github_followers, day, days, 0.3),
            contributions: Some(contributions),
            daily_contributions: delta(
                contributions,
                linear(t.github_contributions, prev, days, 0.05),
            ),
            commits: Some(commits),
            daily_commits: delta(commits, linear(t.github_commits, prev, days, 0.05)),
        },
        devto: DevtoSnapshot {
            views,
            daily_views: delta(views, logistic(t.devto_views, prev, days, 0.01)),
            followers,
            daily_followers: delta(followers, logistic(t.devto_followers, prev, days, 0.05)),
            reactions,
            daily_reactions: delta(reactions, linear(t.devto_reactions, prev, days, 0.1)),
            comments,
            daily_comments: delta(comments, linear(t.devto_comments, prev, days, 0.1)),
            articles: Some(step(t.devto_articles, day, days)),
        },
        ecosystem: Some(EcosystemSnapshot {
            packages: step(t.ecosystem.packages, day, days).clamp(3, t.ecosystem.packages),
            plugins: step(t.ecosystem.plugins, day, days),
            rules: linear(t.ecosystem.rules, day, days, 0.1),
            owasp_coverage: (50 + 50 * day / days).min(t.ecosystem.owasp_coverage),
            test_coverage: (60 + 30 * day / days).min(t.ecosystem.test_coverage),
        }),
    }
}

fn final_snapshot(date: NaiveDate) -> Snapshot {
    let t = &SEED_TARGETS;
    Snapshot {
        date,
        npm: NpmSnapshot {
            total_downloads: t.npm_downloads,
            daily_downloads: Some(0),
            package_count: t.npm_packages,
        },
        github: GithubSnapshot {
            stars: t.github_stars,
            followers: t.github_followers,
            contributions: Some(t.github_contributions),
            daily_contributions: Some(0),
            commits: Some(t.github_commits),
            daily_commits: Some(0),
        },
        devto: DevtoSnapshot {
            views: t.devto_views,
            daily_views: Some(0),
            followers: t.devto_followers,
            daily_followers: Some(0),
            reactions: t.devto_reactions,
            daily_reactions: Some(0),
            comments: t.devto_comments,
            daily_comments: Some(0),
            articles: Some(t.devto_articles),
        },
        ecosystem: Some(t.ecosystem.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn reader(dir: &Path, environment: Environment, fallback: HistoryFallback) -> HistoryReader {
        HistoryReader::new(dir, Arc::new(CacheStore::new()), environment, fallback)
    }

    fn snapshot_json(date: &str, downloads: u64) -> serde_json::Value {
        json!({
            "date": date,
            "npm": { "totalDownloads": downloads, "packageCount": 3 },
            "github": { "stars": 1, "followers": 2 },
            "devto": { "views": 10, "followers": 4, "reactions": 0, "comments": 0 }
        })
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[tokio::test]
    async fn missing_directory_yields_empty_series() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope");

        let reader = reader(&missing, Environment::Production, HistoryFallback::Empty);
        assert!(reader.list().await.is_empty());
    }

    #[tokio::test]
    async fn aggregation_file_is_sorted_and_deduplicated() {
        let tmp = TempDir::new().unwrap();
        let series = json!([
            snapshot_json("2026-01-03", 30),
            snapshot_json("2026-01-01", 10),
            snapshot_json("2026-01-03", 33)
        ]);
        fs::write(tmp.path().join(AGGREGATION_FILE), series.to_string()).unwrap();

        let snapshots = read_series(tmp.path()).await.unwrap();

        let dates: Vec<NaiveDate> = snapshots.iter().map(|s| s.date).collect();
        assert_eq!(dates, vec![date("2026-01-01"), date("2026-01-03")]);
        assert_eq!(snapshots[1].npm.total_downloads, 33);
        assert!(snapshots[0].ecosystem.is_none());
    }

    #[tokio::test]
    async fn daily_files_are_read_when_aggregation_is_absent() {
        let tmp = TempDir::new().unwrap();
        for (day, downloads) in [("2026-01-02", 20), ("2025-12-31", 5)] {
            fs::write(
                tmp.path().join(format!("{day}.json")),
                snapshot_json(day, downloads).to_string(),
            )
            .unwrap();
        }
        fs::write(tmp.path().join("2026-01-05.json"), "{ not json").unwrap();
        fs::write(tmp.path().join("notes.json"), "{}").unwrap();

        let snapshots = read_series(tmp.path()).await.unwrap();

        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].date, date("2025-12-31"));
        assert_eq!(snapshots[1].npm.total_downloads, 20);
    }

    #[tokio::test]
    async fn corrupt_aggregation_file_yields_empty_series() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(AGGREGATION_FILE), "[{").unwrap();

        assert!(matches!(
            read_series(tmp.path()).await,
            Err(HistoryError::Parse { .. })
        ));
        let reader = reader(tmp.path(), Environment::Development, HistoryFallback::Empty);
        assert!(reader.list().await.is_empty());
    }

    #[tokio::test]
    async fn production_caches_the_series() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join(AGGREGATION_FILE);
        fs::write(&file, json!([snapshot_json("2026-01-01", 1)]).to_string()).unwrap();

        let reader = reader(tmp.path(), Environment::Production, HistoryFallback::Empty);
        assert_eq!(reader.list().await.len(), 1);

        fs::write(
            &file,
            json!([snapshot_json("2026-01-01", 1), snapshot_json("2026-01-02", 2)]).to_string(),
        )
        .unwrap();
        assert_eq!(reader.list().await.len(), 1);
    }

    #[tokio::test]
    async fn development_rereads_files() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join(AGGREGATION_FILE);
        fs::write(&file, json!([snapshot_json("2026-01-01", 1)]).to_string()).unwrap();

        let reader = reader(tmp.path(), Environment::Development, HistoryFallback::Empty);
        assert_eq!(reader.list().await.len(), 1);

        fs::write(
            &file,
            json!([snapshot_json("2026-01-01", 1), snapshot_json("2026-01-02", 2)]).to_string(),
        )
        .unwrap();
        assert_eq!(reader.list().await.len(), 2);
    }

    #[tokio::test]
    async fn seed_variant_replaces_empty_series() {
        let tmp = TempDir::new().unwrap();
        let reader = reader(tmp.path(), Environment::Development, HistoryFallback::Seed);

        assert_eq!(reader.list().await, seed_series());
    }

    #[test]
    fn seed_series_is_bounded_and_monotonic() {
        let series = seed_series();

        assert_eq!(series.len(), 56);
        assert_eq!(series[0].date, date("2025-11-15"));
        assert_eq!(series[55].date, date("2026-01-09"));
        assert!(series.windows(2).all(|w| w[0].date < w[1].date));
        assert!(series
            .windows(2)
            .all(|w| w[0].npm.total_downloads <= w[1].npm.total_downloads));

        let last = &series[55];
        assert_eq!(last.npm.total_downloads, 8602);
        assert_eq!(last.devto.followers, 89);
        assert_eq!(last.npm.daily_downloads, Some(0));

        // Déterministe : deux appels donnent la même série.
        assert_eq!(series, seed_series());
    }
}
