//! External species source
//!
//! The loader only ever talks to a [`SpeciesSource`]: the live PokeAPI client
//! in production, an in-memory fake in tests.

mod pokeapi;

pub use pokeapi::PokeApiClient;

use serde_json::Value;
use thiserror::Error;

/// Why a record could not be fetched
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("{url} returned invalid JSON: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Read-only access to species records
pub trait SpeciesSource {
    /// Primary record for one pokedex number
    fn fetch_pokemon(&self, pokedex_id: i64) -> Result<Value, FetchError>;

    /// Any record addressed by a URL handed out in a previous response
    /// (the species-line record)
    fn fetch_url(&self, url: &str) -> Result<Value, FetchError>;
}
