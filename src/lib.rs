pub mod cli;
pub mod config;
pub mod decimal;
pub mod ingest;
pub mod model;
pub mod source;
pub mod store;

pub use config::Config;
pub use ingest::{LoadOptions, LoadRequest, Loader};
pub use source::{PokeApiClient, SpeciesSource};
pub use store::PokedexStore;
