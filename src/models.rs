use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// Provenance de la valeur effectivement renvoyée au client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceTag {
    Api,
    Cache,
    Fallback,
}

// --- GitHub ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GithubStats {
    pub total_stars: u64,
    pub total_forks: u64,
    pub total_watchers: u64,
    pub total_repos: u64,
    pub followers: u64,
    pub following: u64,
    pub public_repos: u64,
    pub account_age_years: u64,
    pub total_contributions: u64,
    pub recent_commits: u64,
    #[serde(rename = "recentPRs")]
    pub recent_prs: u64,
    pub recent_issues: u64,
    pub recent_repos: u64,
    pub recent_reviews: u64,
    pub contribution_calendar: Vec<ContributionDay>,
    pub top_repos: Vec<TopRepo>,
    pub languages: Vec<LanguageCount>,
    pub activity: ActivityBreakdown,
    pub recent_events: Vec<RecentEvent>,
    pub repo_activity: Vec<RepoActivity>,
    pub authenticated: bool,
    pub source: SourceTag,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionDay {
    pub date: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopRepo {
    pub name: String,
    pub stars: u64,
    pub forks: u64,
    pub url: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageCount {
    pub name: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityBreakdown {
    pub commits: u64,
    pub pull_requests: u64,
    pub code_reviews: u64,
    pub issues: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub repo: String,
    pub date: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoActivity {
    pub name: String,
    pub commits: u64,
    pub pull_requests: u64,
    pub issues: u64,
}

// --- npm ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NpmStats {
    pub packages: Vec<PackageDownloads>,
    pub total_downloads: u64,
    pub package_count: u64,
    pub source: SourceTag,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageDownloads {
    pub name: String,
    pub downloads: u64,
    pub daily_data: Vec<DailyDownloads>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyDownloads {
    pub day: String,
    pub downloads: u64,
}

// --- dev.to ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub url: String,
    pub slug: Option<String>,
    pub cover_image: Option<String>,
    pub social_image: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub reading_time_minutes: u64,
    pub reactions: u64,
    pub comments: u64,
    pub views: u64,
    pub tags: Vec<String>,
    pub author: Option<ArticleAuthor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleAuthor {
    pub name: String,
    pub username: String,
    pub profile_image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticlesResponse {
    pub articles: Vec<Article>,
    pub authenticated: bool,
    pub source: SourceTag,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevtoStats {
    pub followers: u64,
    pub total_views: u64,
    pub article_count: u64,
    pub total_reactions: u64,
    pub total_comments: u64,
    pub total_reading_minutes: u64,
    pub top_articles: Vec<ArticleRank>,
    pub authenticated: bool,
    pub source: SourceTag,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRank {
    pub title: String,
    pub url: String,
    pub views: u64,
    pub reactions: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DevtoCombined {
    pub articles: Vec<Article>,
    pub stats: DevtoCombinedStats,
    pub source: SourceTag,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevtoCombinedStats {
    pub followers: u64,
    pub total_views: u64,
}

// --- Page d'accueil ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeStats {
    pub github: HomepageGithub,
    pub npm: HomepageNpm,
    pub devto: HomepageDevto,
    pub source: SourceTag,
    pub fetched_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomepageGithub {
    pub total_stars: u64,
    pub total_forks: u64,
    pub total_repos: u64,
    pub followers: u64,
    pub recent_commits: u64,
    pub total_contributions: u64,
    pub stars_breakdown: Vec<RepoStars>,
    pub authenticated: bool,
    pub source: SourceTag,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoStars {
    pub name: String,
    pub stars: u64,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomepageNpm {
    pub total_downloads: u64,
    pub package_count: u64,
    pub source: SourceTag,
}

impl From<NpmStats> for HomepageNpm {
    fn from(stats: NpmStats) -> Self {
        Self {
            total_downloads: stats.total_downloads,
            package_count: stats.package_count,
            source: stats.source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomepageDevto {
    pub total_views: u64,
    pub followers: u64,
    pub article_count: u64,
    pub total_reactions: u64,
    pub total_comments: u64,
    pub total_reading_minutes: u64,
    pub source: SourceTag,
}

impl From<DevtoStats> for HomepageDevto {
    fn from(stats: DevtoStats) -> Self {
        Self {
            total_views: stats.total_views,
            followers: stats.followers,
            article_count: stats.article_count,
            total_reactions: stats.total_reactions,
            total_comments: stats.total_comments,
            total_reading_minutes: stats.total_reading_minutes,
            source: stats.source,
        }
    }
}

// --- Historique ---

// Un jour de métriques cumulées, écrit une seule fois par le job batch externe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub date: NaiveDate,
    #[serde(default)]
    pub npm: NpmSnapshot,
    #[serde(default)]
    pub github: GithubSnapshot,
    #[serde(default)]
    pub devto: DevtoSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ecosystem: Option<EcosystemSnapshot>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NpmSnapshot {
    pub total_downloads: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_downloads: Option<u64>,
    pub package_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GithubSnapshot {
    pub stars: u64,
    pub followers: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contributions: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_contributions: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commits: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_commits: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DevtoSnapshot {
    pub views: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_views: Option<u64>,
    pub followers: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_followers: Option<u64>,
    pub reactions: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_reactions: Option<u64>,
    pub comments: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_comments: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub articles: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EcosystemSnapshot {
    pub packages: u64,
    pub plugins: u64,
    pub rules: u64,
    pub owasp_coverage: u64,
    pub test_coverage: u64,
}

// --- Divers ---

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TrackRequest {
    pub page: Option<String>,
    pub event: Option<String>,
    pub referrer: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorEvent {
    pub id: uuid::Uuid,
    pub timestamp: DateTime<Utc>,
    pub ip: String,
    pub user_agent: String,
    pub referrer: String,
    pub page: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    pub event: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: f64,
    pub cache_entries: usize,
}
