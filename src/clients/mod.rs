// Clients HTTP des trois plateformes. Chacun traduit le JSON de son service en types internes.
pub mod devto;
pub mod github;
pub mod npm;

pub use devto::DevtoClient;
pub use github::GithubClient;
pub use npm::NpmClient;

use crate::error::FetchError;
use reqwest::{RequestBuilder, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

// Appels REST et listes.
pub const REST_TIMEOUT: Duration = Duration::from_secs(10);
// Requête GraphQL groupée de la page d'accueil.
pub const BATCH_TIMEOUT: Duration = Duration::from_secs(8);
// Plages de téléchargements par paquet et chemin REST non authentifié de la page d'accueil.
pub const FAST_TIMEOUT: Duration = Duration::from_secs(5);

pub const USER_AGENT: &str = "portfolio-stats";

// Construit `base/seg1/seg2/...` ; chaque segment est encodé, donc `@scope/name` reste un seul segment.
pub(crate) fn endpoint(base: &str, segments: &[&str]) -> Result<Url, FetchError> {
    let mut url = Url::parse(base).map_err(|_| FetchError::Url(base.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| FetchError::Url(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

// Un seul essai : envoi, contrôle du statut, décodage. Le timeout est porté par `request`.
pub(crate) async fn send_json<T>(request: RequestBuilder, url: &Url) -> Result<T, FetchError>
where
    T: DeserializeOwned,
{
    let response = request.send().await.map_err(|source| FetchError::Request {
        url: url.to_string(),
        source,
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status,
        });
    }

    response.json::<T>().await.map_err(|source| FetchError::Decode {
        url: url.to_string(),
        source,
    })
}
