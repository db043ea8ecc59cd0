use std::path::PathBuf;
use thiserror::Error;

// Toutes les erreurs possibles côté services en amont. Elles ne dépassent jamais la
// frontière d'un agrégateur : elles y sont remplacées par le cache ou le fallback.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("could not build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("invalid endpoint url {0}")]
    Url(String),

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} responded with {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("response carried no {0}")]
    MissingData(&'static str),

    #[error("no credential configured for {0}")]
    MissingCredential(&'static str),

    #[error("no packages found for maintainer {0}")]
    NoPackages(String),

    #[error("every tracked package reported zero downloads")]
    NoDownloads,
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("could not read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
