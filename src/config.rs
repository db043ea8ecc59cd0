use std::{env, net::SocketAddr, path::PathBuf};

// Identités suivies. Ce sont des constantes de compilation, pas des entrées utilisateur.
pub struct GithubIdentity {
    pub username: &'static str,
    // Seuls ces dépôts comptent pour les étoiles, forks, watchers, top repos et langages.
    pub targeted_repos: &'static [&'static str],
}

pub struct NpmIdentity {
    pub maintainer: &'static str,
    // Paquets expérimentaux ou dépréciés, exclus de tous les agrégats.
    pub excluded_packages: &'static [&'static str],
    pub excluded_prefixes: &'static [&'static str],
}

pub const GITHUB: GithubIdentity = GithubIdentity {
    username: "ofri-peretz",
    targeted_repos: &["ofriperetz-dev", "eslint"],
};

pub const NPM: NpmIdentity = NpmIdentity {
    maintainer: "ofriperetz",
    excluded_packages: &[
        "eslint-plugin-mcp",
        "eslint-plugin-llm-optimized",
        "eslint-plugin-llm",
        "eslint-plugin-mcp-optimized",
    ],
    excluded_prefixes: &["@forge-js/"],
};

pub const DEVTO_USERNAME: &str = "ofri-peretz";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

// Ce que renvoie le lecteur d'historique quand aucun snapshot n'existe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryFallback {
    Empty,
    Seed,
}

#[derive(Debug, Clone)]
pub struct Endpoints {
    pub github_api: String,
    pub npm_registry: String,
    pub npm_downloads: String,
    pub devto_api: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            github_api: "https://api.github.com".to_string(),
            npm_registry: "https://registry.npmjs.org".to_string(),
            npm_downloads: "https://api.npmjs.org".to_string(),
            devto_api: "https://dev.to/api".to_string(),
        }
    }
}

#[cfg(test)]
impl Endpoints {
    // Tous les services en amont derrière un même serveur de test.
    pub fn single(base_url: &str) -> Self {
        Self {
            github_api: base_url.to_string(),
            npm_registry: base_url.to_string(),
            npm_downloads: base_url.to_string(),
            devto_api: base_url.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub environment: Environment,
    pub github_token: Option<String>,
    pub devto_api_key: Option<String>,
    pub snapshots_dir: PathBuf,
    pub history_fallback: HistoryFallback,
    pub endpoints: Endpoints,
}

impl Config {
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(5000);

        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            _ => Environment::Development,
        };

        let history_fallback = match env::var("HISTORY_SEED").as_deref() {
            Ok("1") | Ok("true") => HistoryFallback::Seed,
            _ => HistoryFallback::Empty,
        };

        let defaults = Endpoints::default();
        let endpoints = Endpoints {
            github_api: env::var("GITHUB_API_URL").unwrap_or(defaults.github_api),
            npm_registry: env::var("NPM_REGISTRY_URL").unwrap_or(defaults.npm_registry),
            npm_downloads: env::var("NPM_DOWNLOADS_URL").unwrap_or(defaults.npm_downloads),
            devto_api: env::var("DEVTO_API_URL").unwrap_or(defaults.devto_api),
        };

        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], port)),
            environment,
            github_token: credential("GITHUB_TOKEN"),
            devto_api_key: credential("DEVTO_API_KEY"),
            snapshots_dir: env::var("SNAPSHOTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".data/snapshots")),
            history_fallback,
            endpoints,
        }
    }
}

// Une variable vide équivaut à une variable absente.
fn credential(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
