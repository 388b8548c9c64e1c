use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CACHE_CONTROL;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::cache::{CacheError, CacheLookup, ResponseCache, CACHE_SIZE_BYTES};
use crate::connectivity::Connectivity;
use crate::state::{AbilitySlot, CatalogItem, CatalogItemDetail, SpriteUrls, StatValue};

pub const API_BASE: &str = "https://pokeapi.co/api/v2";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CatalogError {
    #[error("network unavailable: {0}")]
    Transport(String),
    #[error("server responded with HTTP {status}")]
    Http { status: u16 },
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("no pokemon with id {id}")]
    NotFound { id: u32 },
}

/// Failure to set up a [`PokeApiClient`].
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("failed to build http client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Read-only access to the remote catalog.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn fetch_page(&self, offset: usize, limit: usize)
        -> Result<Vec<CatalogItem>, CatalogError>;

    async fn fetch_detail(&self, id: u32) -> Result<CatalogItemDetail, CatalogError>;
}

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub base_url: String,
    pub cache_dir: PathBuf,
    pub cache_max_bytes: u64,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: API_BASE.to_string(),
            cache_dir: default_cache_dir(),
            cache_max_bytes: CACHE_SIZE_BYTES,
            timeout: REQUEST_TIMEOUT,
        }
    }
}

pub fn default_cache_dir() -> PathBuf {
    dirs_next::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pokedex")
        .join("http-cache")
}

#[derive(Clone, Debug, Deserialize)]
struct NamedResource {
    name: String,
    url: String,
}

#[derive(Clone, Debug, Deserialize)]
struct ListResponse {
    results: Vec<NamedResource>,
}

#[derive(Clone, Debug, Deserialize)]
struct PokemonResponse {
    id: u32,
    name: String,
    height: u32,
    weight: u32,
    sprites: SpritesResponse,
    abilities: Vec<PokemonAbilitySlot>,
    stats: Vec<PokemonStatSlot>,
}

#[derive(Clone, Debug, Deserialize)]
struct SpritesResponse {
    front_default: Option<String>,
    front_shiny: Option<String>,
    back_default: Option<String>,
    back_shiny: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
struct PokemonAbilitySlot {
    ability: NamedResource,
    is_hidden: bool,
    slot: u8,
}

#[derive(Clone, Debug, Deserialize)]
struct PokemonStatSlot {
    base_stat: u16,
    stat: StatName,
}

#[derive(Clone, Debug, Deserialize)]
struct StatName {
    name: String,
}

impl From<PokemonResponse> for CatalogItemDetail {
    fn from(response: PokemonResponse) -> Self {
        Self {
            id: response.id,
            name: response.name,
            weight: response.weight,
            height: response.height,
            sprites: SpriteUrls {
                front: response.sprites.front_default,
                front_shiny: response.sprites.front_shiny,
                back: response.sprites.back_default,
                back_shiny: response.sprites.back_shiny,
            },
            abilities: response
                .abilities
                .into_iter()
                .map(|slot| AbilitySlot {
                    name: slot.ability.name,
                    url: slot.ability.url,
                    is_hidden: slot.is_hidden,
                    slot: slot.slot,
                })
                .collect(),
            stats: response
                .stats
                .into_iter()
                .map(|slot| StatValue {
                    name: slot.stat.name,
                    base_value: slot.base_stat,
                })
                .collect(),
        }
    }
}

/// PokeAPI client. Every GET goes through the [`ResponseCache`].
pub struct PokeApiClient {
    client: reqwest::Client,
    base_url: String,
    cache: ResponseCache,
}

impl PokeApiClient {
    pub fn new(
        config: &ClientConfig,
        connectivity: Arc<dyn Connectivity>,
    ) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        let cache = ResponseCache::open(&config.cache_dir, config.cache_max_bytes, connectivity)?;
        Ok(Self::with_cache(client, &config.base_url, cache))
    }

    pub fn with_cache(client: reqwest::Client, base_url: &str, cache: ResponseCache) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache,
        }
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    async fn fetch_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, CatalogError> {
        let bytes = self.fetch_bytes(url).await?;
        match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(value),
            Err(err) => {
                self.cache.remove(url).await;
                Err(CatalogError::Decode(err.to_string()))
            }
        }
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, CatalogError> {
        let policy = self.cache.policy();
        match self.cache.lookup(url, policy).await {
            CacheLookup::Hit(bytes) => return Ok(bytes),
            CacheLookup::Miss if policy.allows_network() => {}
            CacheLookup::Miss | CacheLookup::Unsatisfiable => {
                tracing::info!(url, "offline and nothing cached");
                return Err(CatalogError::Http {
                    status: StatusCode::GATEWAY_TIMEOUT.as_u16(),
                });
            }
        }

        tracing::debug!(url, ?policy, "requesting");
        let response = self
            .client
            .get(url)
            .header(CACHE_CONTROL, policy.header_value())
            .send()
            .await
            .map_err(|err| CatalogError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::info!(url, status = status.as_u16(), "request failed");
            return Err(CatalogError::Http {
                status: status.as_u16(),
            });
        }

        let no_store = response
            .headers()
            .get(CACHE_CONTROL)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.to_ascii_lowercase().contains("no-store"));
        let bytes = response
            .bytes()
            .await
            .map_err(|err| CatalogError::Transport(err.to_string()))?
            .to_vec();
        if !no_store {
            self.cache.store(url, &bytes).await;
        }
        Ok(bytes)
    }
}

#[async_trait]
impl CatalogClient for PokeApiClient {
    async fn fetch_page(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<CatalogItem>, CatalogError> {
        let url = format!("{}/pokemon?offset={offset}&limit={limit}", self.base_url);
        let response: ListResponse = self.fetch_json(&url).await?;
        Ok(response
            .results
            .into_iter()
            .map(|entry| CatalogItem {
                name: entry.name,
                url: entry.url,
            })
            .collect())
    }

    async fn fetch_detail(&self, id: u32) -> Result<CatalogItemDetail, CatalogError> {
        let url = format!("{}/pokemon/{id}", self.base_url);
        match self.fetch_json::<PokemonResponse>(&url).await {
            Ok(response) => Ok(response.into()),
            Err(CatalogError::Http { status }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Err(CatalogError::NotFound { id })
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_detail_response_mapping() {
        let json = serde_json::json!({
            "id": 25,
            "name": "pikachu",
            "height": 4,
            "weight": 60,
            "sprites": {
                "front_default": "https://img/25.png",
                "front_shiny": "https://img/shiny/25.png",
                "back_default": null,
                "back_shiny": null,
                "other": {}
            },
            "abilities": [
                { "ability": { "name": "static", "url": "https://pokeapi.co/api/v2/ability/9/" }, "is_hidden": false, "slot": 1 },
                { "ability": { "name": "lightning-rod", "url": "https://pokeapi.co/api/v2/ability/31/" }, "is_hidden": true, "slot": 3 }
            ],
            "stats": [
                { "base_stat": 35, "effort": 0, "stat": { "name": "hp", "url": "https://pokeapi.co/api/v2/stat/1/" } },
                { "base_stat": 90, "effort": 2, "stat": { "name": "speed", "url": "https://pokeapi.co/api/v2/stat/6/" } }
            ],
            "moves": []
        });
        let response: PokemonResponse = serde_json::from_value(json).unwrap();
        let detail = CatalogItemDetail::from(response);

        assert_eq!(detail.id, 25);
        assert_eq!(detail.weight, 60);
        assert_eq!(detail.height, 4);
        assert_eq!(detail.sprites.front.as_deref(), Some("https://img/25.png"));
        assert_eq!(detail.sprites.back, None);
        assert_eq!(
            detail.abilities[1],
            AbilitySlot {
                name: "lightning-rod".into(),
                url: "https://pokeapi.co/api/v2/ability/31/".into(),
                is_hidden: true,
                slot: 3,
            }
        );
        assert_eq!(
            detail.stats,
            vec![
                StatValue { name: "hp".into(), base_value: 35 },
                StatValue { name: "speed".into(), base_value: 90 },
            ]
        );
    }

    #[test]
    fn test_error_messages_are_readable() {
        assert_eq!(
            CatalogError::Http { status: 503 }.to_string(),
            "server responded with HTTP 503"
        );
        assert_eq!(CatalogError::NotFound { id: 9999 }.to_string(), "no pokemon with id 9999");
    }
}
