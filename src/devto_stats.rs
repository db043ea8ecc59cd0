use crate::cache::{CacheStore, CacheTier};
use crate::clients::{DevtoClient, REST_TIMEOUT};
use crate::config::DEVTO_USERNAME;
use crate::error::FetchError;
use crate::fallback;
use crate::models::{
    Article, ArticleRank, ArticlesResponse, DevtoCombined, DevtoCombinedStats, DevtoStats,
    HomepageDevto, SourceTag,
};
use std::sync::Arc;
use tracing::{error, info, warn};

const ARTICLES_KEY: &str = "devto:articles";
const STATS_KEY: &str = "devto:stats";
const LAST_GOOD_KEY: &str = "devto:stats:last-good";
const COMBINED_KEY: &str = "devto:combined";

const TOP_ARTICLES: usize = 5;

// Garde les articles publiés, du plus récent au plus ancien.
pub fn published_newest_first(articles: Vec<Article>) -> Vec<Article> {
    let mut published: Vec<Article> = articles
        .into_iter()
        .filter(|article| article.published_at.is_some())
        .collect();
    published.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    published
}

pub fn summarize_articles(
    articles: &[Article],
    followers: u64,
    authenticated: bool,
    source: SourceTag,
) -> DevtoStats {
    let mut ranked: Vec<&Article> = articles.iter().collect();
    ranked.sort_by(|a, b| {
        b.views
            .cmp(&a.views)
            .then_with(|| b.reactions.cmp(&a.reactions))
    });

    DevtoStats {
        followers,
        total_views: articles.iter().map(|a| a.views).sum(),
        article_count: articles.len() as u64,
        total_reactions: articles.iter().map(|a| a.reactions).sum(),
        total_comments: articles.iter().map(|a| a.comments).sum(),
        total_reading_minutes: articles.iter().map(|a| a.reading_time_minutes).sum(),
        top_articles: ranked
            .into_iter()
            .take(TOP_ARTICLES)
            .map(|a| ArticleRank {
                title: a.title.clone(),
                url: a.url.clone(),
                views: a.views,
                reactions: a.reactions,
            })
            .collect(),
        authenticated,
        source,
    }
}

pub struct DevtoStatsService {
    client: DevtoClient,
    cache: Arc<CacheStore>,
}

impl DevtoStatsService {
    pub fn new(client: DevtoClient, cache: Arc<CacheStore>) -> Self {
        Self { client, cache }
    }

    pub async fn articles(&self) -> ArticlesResponse {
        if let Some(mut cached) = self.cache.get::<ArticlesResponse>(ARTICLES_KEY).await {
            cached.source = SourceTag::Cache;
            return cached;
        }

        if !self.client.is_authenticated() {
            warn!("No dev.to API key configured, using public article list");
            return match self.public_articles().await {
                Ok(articles) => {
                    let response = ArticlesResponse {
                        articles,
                        authenticated: false,
                        source: SourceTag::Api,
                    };
                    self.cache
                        .set(ARTICLES_KEY, response.clone(), CacheTier::Fresh)
                        .await;
                    response
                }
                Err(e) => {
                    error!("Failed to fetch public dev.to articles: {}", e);
                    empty_articles()
                }
            };
        }

        match self.client.my_articles(REST_TIMEOUT).await {
            Ok(articles) => {
                let articles = published_newest_first(articles);
                info!("Fetched {} dev.to articles with views", articles.len());
                let response = ArticlesResponse {
                    articles,
                    authenticated: true,
                    source: SourceTag::Api,
                };
                self.cache
                    .set(ARTICLES_KEY, response.clone(), CacheTier::Fresh)
                    .await;
                response
            }
            Err(e) => {
                error!("Failed to fetch dev.to articles: {}", e);
                match self.public_articles().await {
                    Ok(articles) => ArticlesResponse {
                        articles,
                        authenticated: false,
                        source: SourceTag::Fallback,
                    },
                    Err(_) => empty_articles(),
                }
            }
        }
    }

    pub async fn stats(&self) -> DevtoStats {
        match self.cached_or_live().await {
            Ok(stats) => stats,
            Err(e) => {
                error!("Failed to fetch dev.to stats: {}", e);
                if let Some(mut last_good) = self.cache.get::<DevtoStats>(LAST_GOOD_KEY).await {
                    warn!("Serving last known dev.to stats");
                    last_good.source = SourceTag::Cache;
                    return last_good;
                }
                fallback::devto_stats()
            }
        }
    }

    pub async fn homepage_summary(&self) -> Result<HomepageDevto, FetchError> {
        self.cached_or_live().await.map(HomepageDevto::from)
    }

    pub async fn combined(&self) -> DevtoCombined {
        if let Some(mut cached) = self.cache.get::<DevtoCombined>(COMBINED_KEY).await {
            cached.source = SourceTag::Cache;
            return cached;
        }

        if self.client.is_authenticated() {
            match self.fetch_authenticated().await {
                Ok((articles, followers)) => {
                    let combined = DevtoCombined {
                        stats: DevtoCombinedStats {
                            followers,
                            total_views: articles.iter().map(|a| a.views).sum(),
                        },
                        articles,
                        source: SourceTag::Api,
                    };
                    info!(
                        "Fetched {} dev.to articles, views={}, followers={}",
                        combined.articles.len(),
                        combined.stats.total_views,
                        combined.stats.followers
                    );
                    self.cache
                        .set(COMBINED_KEY, combined.clone(), CacheTier::Fresh)
                        .await;
                    return combined;
                }
                Err(e) => error!("Failed to fetch dev.to articles and followers: {}", e),
            }
        } else {
            warn!("No dev.to API key configured, using public article list");
        }

        // Liste publique sans vues, compteurs figés. Seule une liste réellement obtenue
        // est mise en cache.
        match self.public_articles().await {
            Ok(articles) => {
                let combined = DevtoCombined {
                    articles,
                    ..fallback::devto_combined()
                };
                self.cache
                    .set(COMBINED_KEY, combined.clone(), CacheTier::Fresh)
                    .await;
                combined
            }
            Err(_) => fallback::devto_combined(),
        }
    }

    async fn cached_or_live(&self) -> Result<DevtoStats, FetchError> {
        if let Some(mut cached) = self.cache.get::<DevtoStats>(STATS_KEY).await {
            cached.source = SourceTag::Cache;
            return Ok(cached);
        }

        if !self.client.is_authenticated() {
            // Sans clé : compteurs d'articles réels, abonnés figés, aucune vue.
            let articles = self.public_articles().await?;
            let stats = summarize_articles(
                &articles,
                fallback::DEVTO_FOLLOWERS,
                false,
                SourceTag::Fallback,
            );
            self.cache
                .set(STATS_KEY, stats.clone(), CacheTier::Fresh)
                .await;
            return Ok(stats);
        }

        let (articles, followers) = self.fetch_authenticated().await?;
        let stats = summarize_articles(&articles, followers, true, SourceTag::Api);
        self.cache
            .set(STATS_KEY, stats.clone(), CacheTier::Fresh)
            .await;
        self.cache
            .set(LAST_GOOD_KEY, stats.clone(), CacheTier::Historical)
            .await;
        Ok(stats)
    }

    // Chemin commun aux stats et à la réponse combinée.
    async fn fetch_authenticated(&self) -> Result<(Vec<Article>, u64), FetchError> {
        let (articles, followers) = tokio::try_join!(
            self.client.my_articles(REST_TIMEOUT),
            self.client.follower_count(REST_TIMEOUT),
        )?;
        Ok((published_newest_first(articles), followers))
    }

    async fn public_articles(&self) -> Result<Vec<Article>, FetchError> {
        self.client
            .public_articles(DEVTO_USERNAME, REST_TIMEOUT)
            .await
    }
}

fn empty_articles() -> ArticlesResponse {
    ArticlesResponse {
        articles: Vec::new(),
        authenticated: false,
        source: SourceTag::Fallback,
    }
}
