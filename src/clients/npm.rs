use super::{endpoint, send_json, USER_AGENT};
use crate::error::FetchError;
use crate::models::DailyDownloads;
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    objects: Vec<SearchObject>,
}

#[derive(Deserialize)]
struct SearchObject {
    package: SearchPackage,
}

#[derive(Deserialize)]
struct SearchPackage {
    name: String,
}

#[derive(Deserialize)]
struct RangeResponse {
    #[serde(default)]
    downloads: Vec<DailyDownloads>,
}

#[derive(Debug, Clone)]
pub struct NpmClient {
    http: reqwest::Client,
    registry_url: String,
    downloads_url: String,
}

impl NpmClient {
    pub fn new(
        registry_url: impl Into<String>,
        downloads_url: impl Into<String>,
    ) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            http,
            registry_url: registry_url.into(),
            downloads_url: downloads_url.into(),
        })
    }

    // Paquets publiés par le mainteneur, via la recherche du registre.
    pub async fn maintainer_packages(
        &self,
        maintainer: &str,
        timeout: Duration,
    ) -> Result<Vec<String>, FetchError> {
        let url = endpoint(&self.registry_url, &["-", "v1", "search"])?;
        let request = self
            .http
            .get(url.clone())
            .query(&[("text", format!("maintainer:{maintainer}").as_str()), ("size", "100")])
            .timeout(timeout);

        let response: SearchResponse = send_json(request, &url).await?;
        Ok(response
            .objects
            .into_iter()
            .map(|object| object.package.name)
            .collect())
    }

    // Téléchargements quotidiens d'un paquet sur [start, end], bornes incluses.
    pub async fn download_range(
        &self,
        package: &str,
        start: NaiveDate,
        end: NaiveDate,
        timeout: Duration,
    ) -> Result<Vec<DailyDownloads>, FetchError> {
        let range = format!("{start}:{end}");
        let url = endpoint(&self.downloads_url, &["downloads", "range", &range, package])?;

        let response: RangeResponse =
            send_json(self.http.get(url.clone()).timeout(timeout), &url).await?;
        Ok(response.downloads)
    }
}
