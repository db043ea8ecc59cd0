use super::{endpoint, send_json, BATCH_TIMEOUT, USER_AGENT};
use crate::error::FetchError;
use crate::models::{ContributionDay, RepoStars};
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    #[serde(default)]
    pub public_repos: u64,
    #[serde(default)]
    pub followers: u64,
    #[serde(default)]
    pub following: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub name: String,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub watchers_count: u64,
    pub language: Option<String>,
    #[serde(default)]
    pub fork: bool,
    pub html_url: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: String,
    pub created_at: DateTime<Utc>,
    pub repo: EventRepo,
    #[serde(default)]
    pub payload: EventPayload,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventRepo {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventPayload {
    pub size: Option<u64>,
    pub commits: Option<Vec<Value>>,
    pub action: Option<String>,
    pub pull_request: Option<Titled>,
    pub issue: Option<Titled>,
    pub review: Option<Review>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Titled {
    pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Review {
    pub state: Option<String>,
}

// Totaux de contributions de l'année glissante (GraphQL, authentifié).
#[derive(Debug, Clone, PartialEq)]
pub struct ContributionSummary {
    pub total_contributions: u64,
    pub commit_contributions: u64,
    pub pull_request_contributions: u64,
    pub issue_contributions: u64,
    pub repository_contributions: u64,
    pub calendar: Vec<ContributionDay>,
}

// Résultat de la requête groupée de la page d'accueil.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchedProfile {
    pub followers: u64,
    pub repository_count: u64,
    pub commit_contributions: u64,
    pub total_contributions: u64,
    pub repos: Vec<RepoStars>,
    pub forks: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    Commits,
    PullRequests,
    Issues,
}

#[derive(Deserialize)]
struct SearchResponse {
    total_count: u64,
}

#[derive(Deserialize)]
struct GraphqlResponse {
    data: Option<Value>,
}

// Nombre de jours du calendrier de contributions renvoyés au client.
const CALENDAR_DAYS: usize = 30;

#[derive(Debug, Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    base_url: String,
    username: &'static str,
    authenticated: bool,
}

impl GithubClient {
    pub fn new(
        base_url: impl Into<String>,
        username: &'static str,
        token: Option<&str>,
    ) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github.v3+json"),
        );

        if let Some(token) = token {
            let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| FetchError::MissingCredential("github (invalid token)"))?;
            auth.set_sensitive(true);
            headers.insert(AUTHORIZATION, auth);
        }

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            username,
            authenticated: token.is_some(),
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn username(&self) -> &'static str {
        self.username
    }

    pub async fn user(&self, timeout: Duration) -> Result<User, FetchError> {
        let url = endpoint(&self.base_url, &["users", self.username])?;
        send_json(self.http.get(url.clone()).timeout(timeout), &url).await
    }

    pub async fn repositories(&self, timeout: Duration) -> Result<Vec<Repository>, FetchError> {
        let url = endpoint(&self.base_url, &["users", self.username, "repos"])?;
        let request = self
            .http
            .get(url.clone())
            .query(&[("per_page", "100"), ("sort", "pushed")])
            .timeout(timeout);
        send_json(request, &url).await
    }

    pub async fn public_events(&self, timeout: Duration) -> Result<Vec<Event>, FetchError> {
        let url = endpoint(&self.base_url, &["users", self.username, "events", "public"])?;
        let request = self
            .http
            .get(url.clone())
            .query(&[("per_page", "100")])
            .timeout(timeout);
        send_json(request, &url).await
    }

    pub async fn contributions(&self, timeout: Duration) -> Result<ContributionSummary, FetchError> {
        let data = self
            .graphql(&contributions_query(self.username), timeout)
            .await?;
        parse_contributions(&data)
    }

    pub async fn batched_profile(&self, repos: &[&str]) -> Result<BatchedProfile, FetchError> {
        let data = self
            .graphql(&batched_profile_query(self.username, repos), BATCH_TIMEOUT)
            .await?;
        parse_batched_profile(&data, repos)
    }

    // Total d'une recherche, sans récupérer les éléments (per_page=1).
    pub async fn search_count(
        &self,
        kind: SearchKind,
        query: &str,
        timeout: Duration,
    ) -> Result<u64, FetchError> {
        let path = match kind {
            SearchKind::Commits => "commits",
            SearchKind::PullRequests | SearchKind::Issues => "issues",
        };
        let url = endpoint(&self.base_url, &["search", path])?;
        let request = self
            .http
            .get(url.clone())
            .query(&[("q", query), ("per_page", "1")])
            .timeout(timeout);
        let response: SearchResponse = send_json(request, &url).await?;
        Ok(response.total_count)
    }

    async fn graphql(&self, query: &str, timeout: Duration) -> Result<Value, FetchError> {
        // GraphQL n'accepte aucun appel anonyme.
        if !self.authenticated {
            return Err(FetchError::MissingCredential("github graphql"));
        }

        let url = endpoint(&self.base_url, &["graphql"])?;
        let request = self
            .http
            .post(url.clone())
            .json(&serde_json::json!({ "query": query }))
            .timeout(timeout);
        let response: GraphqlResponse = send_json(request, &url).await?;
        response.data.ok_or(FetchError::MissingData("graphql data"))
    }
}

// `eslint-plugin-x` devient `repo_eslint_plugin_x`, un alias GraphQL valide.
pub fn repo_alias(name: &str) -> String {
    format!("repo_{}", name.replace(['-', '.'], "_"))
}

pub fn contributions_query(username: &str) -> String {
    format!(
        r#"query {{
  user(login: "{username}") {{
    contributionsCollection {{
      totalCommitContributions
      totalPullRequestContributions
      totalIssueContributions
      totalRepositoryContributions
      contributionCalendar {{
        totalContributions
        weeks {{ contributionDays {{ date contributionCount }} }}
      }}
    }}
  }}
}}"#
    )
}

pub fn batched_profile_query(username: &str, repos: &[&str]) -> String {
    let repo_queries: Vec<String> = repos
        .iter()
        .map(|name| {
            format!(
                r#"    {alias}: repository(owner: "{username}", name: "{name}") {{ name stargazerCount forkCount url }}"#,
                alias = repo_alias(name)
            )
        })
        .collect();

    format!(
        r#"query {{
  user(login: "{username}") {{
    followers {{ totalCount }}
    repositories(first: 1, privacy: PUBLIC) {{ totalCount }}
    contributionsCollection {{
      totalCommitContributions
      contributionCalendar {{ totalContributions }}
    }}
{repos}
  }}
}}"#,
        repos = repo_queries.join("\n")
    )
}

fn count(value: &Value, pointer: &str) -> u64 {
    value.pointer(pointer).and_then(Value::as_u64).unwrap_or(0)
}

pub fn parse_contributions(data: &Value) -> Result<ContributionSummary, FetchError> {
    let collection = data
        .pointer("/user/contributionsCollection")
        .filter(|c| c.is_object())
        .ok_or(FetchError::MissingData("contributionsCollection"))?;

    let mut days: Vec<ContributionDay> = collection
        .pointer("/contributionCalendar/weeks")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|week| week.get("contributionDays").and_then(Value::as_array))
        .flatten()
        .filter_map(|day| {
            Some(ContributionDay {
                date: day.get("date")?.as_str()?.to_string(),
                count: day.get("contributionCount")?.as_u64()?,
            })
        })
        .collect();

    // On ne garde que les derniers jours.
    let keep_from = days.len().saturating_sub(CALENDAR_DAYS);
    let calendar = days.split_off(keep_from);

    Ok(ContributionSummary {
        total_contributions: count(collection, "/contributionCalendar/totalContributions"),
        commit_contributions: count(collection, "/totalCommitContributions"),
        pull_request_contributions: count(collection, "/totalPullRequestContributions"),
        issue_contributions: count(collection, "/totalIssueContributions"),
        repository_contributions: count(collection, "/totalRepositoryContributions"),
        calendar,
    })
}

pub fn parse_batched_profile(data: &Value, repos: &[&str]) -> Result<BatchedProfile, FetchError> {
    let user = data
        .get("user")
        .filter(|u| u.is_object())
        .ok_or(FetchError::MissingData("user"))?;

    let mut forks = 0;
    let mut stars = Vec::with_capacity(repos.len());
    for name in repos {
        // Un dépôt absent (renommé, supprimé) est simplement ignoré.
        let Some(repo) = user.get(repo_alias(name)).filter(|r| r.is_object()) else {
            continue;
        };
        forks += count(repo, "/forkCount");
        stars.push(RepoStars {
            name: (*name).to_string(),
            stars: count(repo, "/stargazerCount"),
            url: repo
                .get("url")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        });
    }

    Ok(BatchedProfile {
        followers: count(user, "/followers/totalCount"),
        repository_count: count(user, "/repositories/totalCount"),
        commit_contributions: count(user, "/contributionsCollection/totalCommitContributions"),
        total_contributions: count(
            user,
            "/contributionsCollection/contributionCalendar/totalContributions",
        ),
        repos: stars,
        forks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn alias_is_graphql_safe() {
        assert_eq!(repo_alias("ofriperetz-dev"), "repo_ofriperetz_dev");
        assert_eq!(repo_alias("site.io"), "repo_site_io");
    }

    #[test]
    fn batched_query_contains_one_alias_per_repo() {
        let query = batched_profile_query("someone", &["a-b", "c"]);
        assert!(query.contains(r#"repo_a_b: repository(owner: "someone", name: "a-b")"#));
        assert!(query.contains(r#"repo_c: repository(owner: "someone", name: "c")"#));
        assert!(query.contains(r#"user(login: "someone")"#));
    }

    #[test]
    fn parse_contributions_keeps_last_thirty_days() {
        let days: Vec<Value> = (1..=40)
            .map(|d| json!({ "date": format!("day-{d:02}"), "contributionCount": d }))
            .collect();
        let data = json!({
            "user": { "contributionsCollection": {
                "totalCommitContributions": 10,
                "totalPullRequestContributions": 4,
                "totalIssueContributions": 3,
                "totalRepositoryContributions": 2,
                "contributionCalendar": {
                    "totalContributions": 820,
                    "weeks": [
                        { "contributionDays": days[..20] },
                        { "contributionDays": days[20..] }
                    ]
                }
            }}
        });

        let summary = parse_contributions(&data).unwrap();
        assert_eq!(summary.total_contributions, 820);
        assert_eq!(summary.commit_contributions, 10);
        assert_eq!(summary.pull_request_contributions, 4);
        assert_eq!(summary.issue_contributions, 3);
        assert_eq!(summary.repository_contributions, 2);
        assert_eq!(summary.calendar.len(), 30);
        assert_eq!(summary.calendar[0].date, "day-11");
        assert_eq!(summary.calendar[29].count, 40);
    }

    #[test]
    fn parse_contributions_without_user_is_an_error() {
        let data = json!({ "user": null });
        assert!(matches!(
            parse_contributions(&data),
            Err(FetchError::MissingData(_))
        ));
    }

    #[test]
    fn parse_batched_profile_skips_missing_repos() {
        let data = json!({
            "user": {
                "followers": { "totalCount": 6 },
                "repositories": { "totalCount": 35 },
                "contributionsCollection": {
                    "totalCommitContributions": 570,
                    "contributionCalendar": { "totalContributions": 610 }
                },
                "repo_ofriperetz_dev": { "name": "ofriperetz-dev", "stargazerCount": 3, "forkCount": 1, "url": "https://github.com/o/ofriperetz-dev" },
                "repo_eslint": null
            }
        });

        let profile = parse_batched_profile(&data, &["ofriperetz-dev", "eslint"]).unwrap();
        assert_eq!(profile.followers, 6);
        assert_eq!(profile.repository_count, 35);
        assert_eq!(profile.commit_contributions, 570);
        assert_eq!(profile.total_contributions, 610);
        assert_eq!(profile.forks, 1);
        assert_eq!(profile.repos.len(), 1);
        assert_eq!(profile.repos[0].stars, 3);
    }

    #[test]
    fn event_payload_defaults_when_missing() {
        let event: Event = serde_json::from_value(json!({
            "type": "WatchEvent",
            "created_at": "2026-01-02T10:00:00Z",
            "repo": { "name": "someone/thing" }
        }))
        .unwrap();

        assert_eq!(event.kind, "WatchEvent");
        assert!(event.payload.commits.is_none());
    }
}
