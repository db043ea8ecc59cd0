use crate::cache::{CacheStore, CacheTier};
use crate::clients::github::{ContributionSummary, Event, Repository, SearchKind};
use crate::clients::{GithubClient, FAST_TIMEOUT, REST_TIMEOUT};
use crate::config::GITHUB;
use crate::error::FetchError;
use crate::fallback;
use crate::models::{
    ActivityBreakdown, GithubStats, HomepageGithub, LanguageCount, RecentEvent, RepoActivity,
    RepoStars, SourceTag, TopRepo,
};
use chrono::{DateTime, Days, NaiveDate, Utc};
use futures_util::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

const STATS_KEY: &str = "github:stats";
const LAST_GOOD_KEY: &str = "github:stats:last-good";
const CONTRIBUTIONS_KEY: &str = "github:contributions";

const TOP_REPOS: usize = 5;
const TOP_LANGUAGES: usize = 6;
const RECENT_EVENTS: usize = 10;

// Les recherches décrivent une activité passée : une clé par dépôt et par date de fin.
pub fn search_cache_key(repo: &str, until: NaiveDate) -> String {
    format!("github:search:{repo}:{until}")
}

// Agrégats calculés sur la liste des dépôts.
#[derive(Debug, Clone, PartialEq)]
pub struct RepoSummary {
    pub own_repo_count: u64,
    pub total_stars: u64,
    pub total_forks: u64,
    pub total_watchers: u64,
    pub top_repos: Vec<TopRepo>,
    pub languages: Vec<LanguageCount>,
    pub stars_breakdown: Vec<RepoStars>,
}

// Seuls les dépôts non forkés de la liste autorisée comptent ; `own_repo_count` compte
// en revanche tous les dépôts non forkés.
pub fn summarize_repos(repos: &[Repository], targeted: &[&str]) -> RepoSummary {
    let own: Vec<&Repository> = repos.iter().filter(|r| !r.fork).collect();
    let mut tracked: Vec<&Repository> = own
        .iter()
        .copied()
        .filter(|r| targeted.contains(&r.name.as_str()))
        .collect();

    let total_stars = tracked.iter().map(|r| r.stargazers_count).sum();
    let total_forks = tracked.iter().map(|r| r.forks_count).sum();
    let total_watchers = tracked.iter().map(|r| r.watchers_count).sum();

    let stars_breakdown = tracked
        .iter()
        .map(|r| RepoStars {
            name: r.name.clone(),
            stars: r.stargazers_count,
            url: r.html_url.clone(),
        })
        .collect();

    let mut languages: HashMap<&str, u64> = HashMap::new();
    for repo in &tracked {
        if let Some(language) = repo.language.as_deref() {
            *languages.entry(language).or_default() += 1;
        }
    }
    let mut languages: Vec<LanguageCount> = languages
        .into_iter()
        .map(|(name, count)| LanguageCount {
            name: name.to_string(),
            count,
        })
        .collect();
    languages.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    languages.truncate(TOP_LANGUAGES);

    tracked.sort_by(|a, b| {
        b.stargazers_count
            .cmp(&a.stargazers_count)
            .then_with(|| a.name.cmp(&b.name))
    });
    let top_repos = tracked
        .iter()
        .take(TOP_REPOS)
        .map(|r| TopRepo {
            name: r.name.clone(),
            stars: r.stargazers_count,
            forks: r.forks_count,
            url: r.html_url.clone(),
            description: r.description.clone(),
        })
        .collect();

    RepoSummary {
        own_repo_count: own.len() as u64,
        total_stars,
        total_forks,
        total_watchers,
        top_repos,
        languages,
        stars_breakdown,
    }
}

pub fn summarize_events(events: &[Event]) -> (ActivityBreakdown, Vec<RecentEvent>) {
    let mut activity = ActivityBreakdown::default();
    let mut recent = Vec::with_capacity(RECENT_EVENTS);

    for event in events {
        let repo = event
            .repo
            .name
            .split_once('/')
            .map_or(event.repo.name.as_str(), |(_, name)| name);
        let payload = &event.payload;

        let entry = match event.kind.as_str() {
            "PushEvent" => {
                let commits = payload
                    .size
                    .or_else(|| payload.commits.as_ref().map(|c| c.len() as u64))
                    .unwrap_or(0);
                activity.commits += commits;
                (commits > 0).then(|| {
                    let plural = if commits > 1 { "s" } else { "" };
                    ("commit", format!("{commits} commit{plural}"))
                })
            }
            "PullRequestEvent" => {
                if matches!(payload.action.as_deref(), Some("opened") | Some("closed")) {
                    activity.pull_requests += 1;
                    let title = payload.pull_request.as_ref().and_then(|p| p.title.clone());
                    Some(("pr", title.unwrap_or_else(|| "Pull request".to_string())))
                } else {
                    None
                }
            }
            "PullRequestReviewEvent" => {
                activity.code_reviews += 1;
                let state = payload
                    .review
                    .as_ref()
                    .and_then(|r| r.state.clone())
                    .unwrap_or_else(|| "reviewed".to_string());
                Some(("review", format!("Code review: {state}")))
            }
            "IssuesEvent" => {
                activity.issues += 1;
                let title = payload.issue.as_ref().and_then(|i| i.title.clone());
                Some(("issue", title.unwrap_or_else(|| "Issue".to_string())))
            }
            // Les commentaires comptent dans l'activité issues, sans entrée récente.
            "IssueCommentEvent" => {
                activity.issues += 1;
                None
            }
            _ => None,
        };

        if let Some((kind, message)) = entry {
            if recent.len() < RECENT_EVENTS {
                recent.push(RecentEvent {
                    kind: kind.to_string(),
                    repo: repo.to_string(),
                    date: event.created_at,
                    message,
                });
            }
        }
    }

    (activity, recent)
}

fn fallback_contributions() -> ContributionSummary {
    ContributionSummary {
        total_contributions: fallback::GITHUB_TOTAL_CONTRIBUTIONS,
        commit_contributions: fallback::GITHUB_RECENT_COMMITS,
        pull_request_contributions: fallback::GITHUB_RECENT_PRS,
        issue_contributions: fallback::GITHUB_RECENT_ISSUES,
        repository_contributions: fallback::GITHUB_RECENT_REPOS,
        calendar: Vec::new(),
    }
}

pub struct GithubStatsService {
    client: GithubClient,
    cache: Arc<CacheStore>,
}

impl GithubStatsService {
    pub fn new(client: GithubClient, cache: Arc<CacheStore>) -> Self {
        Self { client, cache }
    }

    pub async fn stats(&self) -> GithubStats {
        if let Some(mut cached) = self.cache.get::<GithubStats>(STATS_KEY).await {
            cached.source = SourceTag::Cache;
            return cached;
        }

        match self.fetch_stats(Utc::now()).await {
            Ok(stats) => {
                self.cache
                    .set(STATS_KEY, stats.clone(), CacheTier::Fresh)
                    .await;
                self.cache
                    .set(LAST_GOOD_KEY, stats.clone(), CacheTier::Historical)
                    .await;
                stats
            }
            Err(e) => {
                error!("Failed to fetch GitHub stats: {}", e);
                if let Some(mut last_good) = self.cache.get::<GithubStats>(LAST_GOOD_KEY).await {
                    warn!("Serving last known GitHub stats");
                    last_good.source = SourceTag::Cache;
                    return last_good;
                }
                fallback::github_stats()
            }
        }
    }

    async fn fetch_stats(&self, now: DateTime<Utc>) -> Result<GithubStats, FetchError> {
        // Profil, dépôts et événements sont indépendants : on les lance ensemble.
        let (user, repos, events) = tokio::join!(
            self.client.user(REST_TIMEOUT),
            self.client.repositories(REST_TIMEOUT),
            self.client.public_events(REST_TIMEOUT)
        );
        let user = user?;
        let repos = repos?;
        let events = events.unwrap_or_else(|e| {
            warn!("GitHub events unavailable, activity left empty: {}", e);
            Vec::new()
        });

        let (contributions, repo_activity) =
            tokio::join!(self.contributions(), self.repo_activity(now.date_naive()));

        let repos = summarize_repos(&repos, GITHUB.targeted_repos);
        let (activity, recent_events) = summarize_events(&events);
        let account_age_years = (now - user.created_at).num_days().max(0) as u64 / 365;

        Ok(GithubStats {
            total_stars: repos.total_stars,
            total_forks: repos.total_forks,
            total_watchers: repos.total_watchers,
            total_repos: repos.own_repo_count,
            followers: user.followers,
            following: user.following,
            public_repos: user.public_repos,
            account_age_years,
            total_contributions: contributions.total_contributions,
            recent_commits: contributions.commit_contributions,
            recent_prs: contributions.pull_request_contributions,
            recent_issues: contributions.issue_contributions,
            recent_repos: contributions.repository_contributions,
            recent_reviews: activity.code_reviews,
            contribution_calendar: contributions.calendar,
            top_repos: repos.top_repos,
            languages: repos.languages,
            activity,
            recent_events,
            repo_activity,
            authenticated: self.client.is_authenticated(),
            source: SourceTag::Api,
        })
    }

    // Sans jeton, les contributions retombent sur les constantes.
    async fn contributions(&self) -> ContributionSummary {
        if !self.client.is_authenticated() {
            return fallback_contributions();
        }

        let result = self
            .cache
            .get_or_fetch(CONTRIBUTIONS_KEY, CacheTier::Standard, || {
                self.client.contributions(REST_TIMEOUT)
            })
            .await;

        result.unwrap_or_else(|e| {
            warn!("GraphQL error, using fallback contribution stats: {}", e);
            fallback_contributions()
        })
    }

    // Totaux commits/PR/issues par dépôt suivi, arrêtés à la veille.
    async fn repo_activity(&self, today: NaiveDate) -> Vec<RepoActivity> {
        if !self.client.is_authenticated() {
            return Vec::new();
        }
        let Some(until) = today.checked_sub_days(Days::new(1)) else {
            return Vec::new();
        };

        let tallies = join_all(GITHUB.targeted_repos.iter().map(|repo| async move {
            let key = search_cache_key(repo, until);
            let tally = self
                .cache
                .get_or_fetch(&key, CacheTier::Historical, || {
                    self.fetch_repo_activity(repo, until)
                })
                .await;
            (*repo, tally)
        }))
        .await;

        tallies
            .into_iter()
            .filter_map(|(repo, tally)| match tally {
                Ok(activity) => Some(activity),
                Err(e) => {
                    warn!("Search tallies unavailable for {}: {}", repo, e);
                    None
                }
            })
            .collect()
    }

    async fn fetch_repo_activity(
        &self,
        repo: &str,
        until: NaiveDate,
    ) -> Result<RepoActivity, FetchError> {
        let owner = self.client.username();
        let scope = format!("repo:{owner}/{repo} author:{owner}");
        let commits = format!("{scope} committer-date:<={until}");
        let pull_requests = format!("{scope} type:pr created:<={until}");
        let issues = format!("{scope} type:issue created:<={until}");

        let (commits, pull_requests, issues) = tokio::try_join!(
            self.client
                .search_count(SearchKind::Commits, &commits, REST_TIMEOUT),
            self.client
                .search_count(SearchKind::PullRequests, &pull_requests, REST_TIMEOUT),
            self.client
                .search_count(SearchKind::Issues, &issues, REST_TIMEOUT)
        )?;

        Ok(RepoActivity {
            name: repo.to_string(),
            commits,
            pull_requests,
            issues,
        })
    }

    // Résumé de la page d'accueil. Les erreurs remontent : c'est l'agrégateur unifié qui
    // choisit le fallback.
    pub async fn homepage_summary(&self) -> Result<HomepageGithub, FetchError> {
        let targeted = GITHUB.targeted_repos;

        if self.client.is_authenticated() {
            match self.client.batched_profile(targeted).await {
                Ok(profile) => {
                    return Ok(HomepageGithub {
                        total_stars: profile.repos.iter().map(|r| r.stars).sum(),
                        total_forks: profile.forks,
                        total_repos: profile.repository_count,
                        followers: profile.followers,
                        recent_commits: profile.commit_contributions,
                        total_contributions: profile.total_contributions,
                        stars_breakdown: profile.repos,
                        authenticated: true,
                        source: SourceTag::Api,
                    });
                }
                Err(e) => warn!("Batched GitHub query failed, falling back to REST: {}", e),
            }
        }

        let (user, repos) = tokio::try_join!(
            self.client.user(FAST_TIMEOUT),
            self.client.repositories(FAST_TIMEOUT)
        )?;
        let summary = summarize_repos(&repos, targeted);
        info!(
            "GitHub homepage summary from public endpoints ({} tracked repos)",
            summary.stars_breakdown.len()
        );

        Ok(HomepageGithub {
            total_stars: summary.total_stars,
            total_forks: summary.total_forks,
            total_repos: summary.own_repo_count,
            followers: user.followers,
            recent_commits: 0,
            total_contributions: 0,
            stars_breakdown: summary.stars_breakdown,
            authenticated: false,
            source: SourceTag::Api,
        })
    }
}
