//! PokeAPI client
//!
//! Blocking GETs against `{base_url}/pokemon/{id}` and whatever species URL
//! that record links to. No authentication, transport-default timeouts.

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde_json::Value;

use super::{FetchError, SpeciesSource};
use crate::config::SourceConfig;

pub struct PokeApiClient {
    client: Client,
    base_url: String,
}

impl PokeApiClient {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn pokemon_url(&self, pokedex_id: i64) -> String {
        format!("{}/pokemon/{}", self.base_url, pokedex_id)
    }

    fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        tracing::debug!(url, "GET");

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })?;

        serde_json::from_str(&body).map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

impl SpeciesSource for PokeApiClient {
    fn fetch_pokemon(&self, pokedex_id: i64) -> Result<Value, FetchError> {
        self.get_json(&self.pokemon_url(pokedex_id))
    }

    fn fetch_url(&self, url: &str) -> Result<Value, FetchError> {
        self.get_json(url)
    }
}
