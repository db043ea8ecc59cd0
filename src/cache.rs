use serde::Serialize;
use std::{any::Any, collections::HashMap, future::Future, sync::Arc, time::Duration};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

// Les trois niveaux de fraîcheur. C'est l'appelant qui choisit le niveau selon la nature de la donnée.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTier {
    // Données qui bougent dans la journée (téléchargements du jour, vues).
    Fresh,
    // Réponses d'API générales.
    Standard,
    // Périodes entièrement écoulées, qui ne changeront plus.
    Historical,
}

impl CacheTier {
    pub const fn ttl(self) -> Duration {
        match self {
            CacheTier::Fresh => Duration::from_secs(60),
            CacheTier::Standard => Duration::from_secs(5 * 60),
            CacheTier::Historical => Duration::from_secs(24 * 60 * 60),
        }
    }
}

struct CacheEntry {
    key: String,
    value: Arc<dyn Any + Send + Sync>,
    created_at: Instant,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub keys: Vec<String>,
}

// Magasin clé/valeur unique du processus, injecté dans chaque service via `AppState`.
// L'expiration est paresseuse : une entrée périmée est supprimée lors de la lecture suivante.
#[derive(Default)]
pub struct CacheStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::with_capacity(64)),
        }
    }

    // Copie de la valeur si elle est encore vivante. Un type différent se lit comme absent.
    pub async fn get<T>(&self, key: &str) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let now = Instant::now();

        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return None,
                Some(entry) if entry.is_live(now) => {
                    return entry.value.downcast_ref::<T>().cloned();
                }
                Some(_) => {}
            }
        } // Verrou en lecture libéré avant de prendre le verrou en écriture.

        let mut entries = self.entries.write().await;
        // Une autre requête a pu réécrire la clé entre-temps.
        if entries.get(key).is_some_and(|entry| !entry.is_live(now)) {
            if let Some(evicted) = entries.remove(key) {
                debug!(
                    "Cache entry {} expired after {:?}",
                    evicted.key,
                    evicted.expires_at - evicted.created_at
                );
            }
        }
        None
    }

    pub async fn set<T>(&self, key: impl Into<String>, value: T, tier: CacheTier)
    where
        T: Send + Sync + 'static,
    {
        self.set_with_ttl(key, value, tier.ttl()).await;
    }

    pub async fn set_with_ttl<T>(&self, key: impl Into<String>, value: T, ttl: Duration)
    where
        T: Send + Sync + 'static,
    {
        // expires_at doit rester strictement après created_at.
        if ttl.is_zero() {
            return;
        }

        let key = key.into();
        let created_at = Instant::now();
        let entry = CacheEntry {
            key: key.clone(),
            value: Arc::new(value),
            created_at,
            expires_at: created_at + ttl,
        };

        self.entries.write().await.insert(key, entry);
    }

    // Cache-aside : lit la clé, sinon appelle `fetch` et ne mémorise que les succès.
    pub async fn get_or_fetch<T, E, F, Fut>(
        &self,
        key: &str,
        tier: CacheTier,
        fetch: F,
    ) -> Result<T, E>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.get::<T>(key).await {
            return Ok(hit);
        }

        let value = fetch().await?;
        self.set(key, value.clone(), tier).await;
        Ok(value)
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn stats(&self) -> CacheStats {
        let entries = self.entries.read().await;
        let mut keys: Vec<String> = entries.values().map(|entry| entry.key.clone()).collect();
        keys.sort();

        CacheStats {
            size: entries.len(),
            keys,
        }
    }
}
