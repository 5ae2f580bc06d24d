//! Load command implementation

use anyhow::Result;

use crate::config::Config;
use crate::ingest::{LoadOptions, LoadRequest, Loader};
use crate::source::PokeApiClient;
use crate::store::PokedexStore;

pub fn run(store: &PokedexStore, config: &Config, request: LoadRequest) -> Result<()> {
    let client = PokeApiClient::new(&config.source)?;
    let options = LoadOptions {
        delay: config.request_delay(),
        derive_generation: config.ingest.derive_generation,
    };

    let loader = Loader::new(store, &client, options);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    loader.run(&request, &mut out)
}
