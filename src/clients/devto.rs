use super::{endpoint, send_json, USER_AGENT};
use crate::error::FetchError;
use crate::models::{Article, ArticleAuthor};
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{de::IgnoredAny, Deserialize};
use std::time::Duration;

// Forme brute d'un article dev.to ; seuls les champs utiles sont lus.
#[derive(Debug, Deserialize)]
struct WireArticle {
    id: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    url: String,
    slug: Option<String>,
    cover_image: Option<String>,
    social_image: Option<String>,
    published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    reading_time_minutes: u64,
    #[serde(default)]
    positive_reactions_count: u64,
    #[serde(default)]
    comments_count: u64,
    // Absent de la liste publique.
    #[serde(default)]
    page_views_count: u64,
    #[serde(default)]
    tag_list: TagList,
    user: Option<WireUser>,
}

// `/articles` renvoie un tableau, certaines routes une chaîne séparée par des virgules.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TagList {
    List(Vec<String>),
    Joined(String),
}

impl Default for TagList {
    fn default() -> Self {
        TagList::List(Vec::new())
    }
}

impl TagList {
    fn into_tags(self) -> Vec<String> {
        match self {
            TagList::List(tags) => tags,
            TagList::Joined(joined) => joined
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireUser {
    #[serde(default)]
    name: String,
    #[serde(default)]
    username: String,
    profile_image: Option<String>,
}

impl From<WireArticle> for Article {
    fn from(wire: WireArticle) -> Self {
        Self {
            id: wire.id,
            title: wire.title,
            description: wire.description,
            url: wire.url,
            slug: wire.slug,
            cover_image: wire.cover_image,
            social_image: wire.social_image,
            published_at: wire.published_at,
            reading_time_minutes: wire.reading_time_minutes,
            reactions: wire.positive_reactions_count,
            comments: wire.comments_count,
            views: wire.page_views_count,
            tags: wire.tag_list.into_tags(),
            author: wire.user.map(|u| ArticleAuthor {
                name: u.name,
                username: u.username,
                profile_image: u.profile_image,
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DevtoClient {
    http: reqwest::Client,
    base_url: String,
    authenticated: bool,
}

impl DevtoClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<&str>) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = api_key {
            let mut value = HeaderValue::from_str(key)
                .map_err(|_| FetchError::MissingCredential("dev.to (invalid api key)"))?;
            value.set_sensitive(true);
            headers.insert("api-key", value);
        }

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            authenticated: api_key.is_some(),
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    // Liste publique : pas de vues, donc `views` vaut toujours 0.
    pub async fn public_articles(
        &self,
        username: &str,
        timeout: Duration,
    ) -> Result<Vec<Article>, FetchError> {
        let url = endpoint(&self.base_url, &["articles"])?;
        let request = self
            .http
            .get(url.clone())
            .query(&[("username", username), ("per_page", "100")])
            .timeout(timeout);

        let articles: Vec<WireArticle> = send_json(request, &url).await?;
        Ok(articles
            .into_iter()
            .map(|wire| Article {
                views: 0,
                ..Article::from(wire)
            })
            .collect())
    }

    // Tous les articles du compte (brouillons compris), avec les vues.
    pub async fn my_articles(&self, timeout: Duration) -> Result<Vec<Article>, FetchError> {
        if !self.authenticated {
            return Err(FetchError::MissingCredential("dev.to"));
        }

        let url = endpoint(&self.base_url, &["articles", "me", "all"])?;
        let request = self
            .http
            .get(url.clone())
            .query(&[("per_page", "100")])
            .timeout(timeout);

        let articles: Vec<WireArticle> = send_json(request, &url).await?;
        Ok(articles.into_iter().map(Article::from).collect())
    }

    // L'API n'expose pas de compteur : on compte les éléments de la liste.
    pub async fn follower_count(&self, timeout: Duration) -> Result<u64, FetchError> {
        if !self.authenticated {
            return Err(FetchError::MissingCredential("dev.to"));
        }

        let url = endpoint(&self.base_url, &["followers", "users"])?;
        let request = self
            .http
            .get(url.clone())
            .query(&[("per_page", "1000")])
            .timeout(timeout);

        let followers: Vec<IgnoredAny> = send_json(request, &url).await?;
        Ok(followers.len() as u64)
    }
}
