use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::debug;

use crate::domain::{Pokemon, PokemonId, Species, Sprites};
use crate::error::DexError;

pub const DEFAULT_BASE_URL: &str = "https://pokeapi.co/api/v2";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Issues one outbound lookup per identifier and decodes the response.
/// Implementations never mutate shared state.
pub trait SearchService: Send + Sync {
    fn search(&self, id: PokemonId) -> Result<Pokemon, DexError>;
}

/// Transport behavior, injected at construction. The stub modes never touch
/// the network, which is what UI and auth-failure test runs rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    #[default]
    Normal,
    /// Immediate canned response for the requested identifier.
    Stubbed,
    /// Every request comes back as HTTP 401.
    AuthFailure,
    /// Normal transport with request/response tracing.
    Logging,
}

pub struct HttpSearchService {
    client: Client,
    base_url: String,
    transport: Transport,
}

impl HttpSearchService {
    pub fn new(transport: Transport) -> Result<Self, DexError> {
        Self::with_options(transport, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS)
    }

    pub fn with_options(
        transport: Transport,
        base_url: &str,
        timeout_secs: u64,
    ) -> Result<Self, DexError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("pokedex/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| DexError::Transport(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|err| DexError::Transport(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
        })
    }

    fn search_url(&self, id: PokemonId) -> String {
        format!("{}/pokemon/{}", self.base_url, id)
    }

    fn fetch(&self, id: PokemonId) -> Result<Pokemon, DexError> {
        let url = self.search_url(id);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|err| DexError::Transport(err.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|err| DexError::Transport(err.to_string()))?;
        Self::map_response(id, status, &body)
    }

    fn map_response(id: PokemonId, status: u16, body: &str) -> Result<Pokemon, DexError> {
        if status == 404 {
            return Err(DexError::NotFound(id.value()));
        }
        if !(200..300).contains(&status) {
            let message = if body.is_empty() {
                "pokemon search failed".to_string()
            } else {
                body.to_string()
            };
            return Err(DexError::RemoteStatus { status, message });
        }
        serde_json::from_str(body).map_err(|err| DexError::Decode(err.to_string()))
    }
}

impl SearchService for HttpSearchService {
    fn search(&self, id: PokemonId) -> Result<Pokemon, DexError> {
        match self.transport {
            Transport::Normal => self.fetch(id),
            Transport::Stubbed => Ok(sample_pokemon(id)),
            Transport::AuthFailure => Err(DexError::RemoteStatus {
                status: 401,
                message: "Not authorized".to_string(),
            }),
            Transport::Logging => {
                debug!(identifier = id.value(), url = %self.search_url(id), "pokemon search request");
                let result = self.fetch(id);
                match &result {
                    Ok(pokemon) => debug!(name = %pokemon.name, "pokemon search response"),
                    Err(err) => debug!("pokemon search failed: {err}"),
                }
                result
            }
        }
    }
}

/// Canned record used by the stubbed transport.
pub fn sample_pokemon(id: PokemonId) -> Pokemon {
    Pokemon {
        id: id.value(),
        name: format!("sample-{id}"),
        order: id.value() as i32,
        weight: 60,
        height: 4,
        sprites: Sprites {
            front_default: Some(format!("{DEFAULT_BASE_URL}/sprites/{id}.png")),
        },
        species: Species {
            name: format!("sample-{id}"),
            url: format!("{DEFAULT_BASE_URL}/pokemon-species/{id}/"),
        },
    }
}
