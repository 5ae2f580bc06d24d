//! Species loader
//!
//! Walks an inclusive range of pokedex numbers in order and, per id:
//! skip-check → fetch primary → fetch species line → normalize → upsert.
//! A failing id is reported and left as it was; the run always carries on
//! to the next one.

pub mod normalize;

use anyhow::{bail, Result};
use std::io::Write;
use std::time::Duration;

use crate::source::{FetchError, SpeciesSource};
use crate::store::{PokedexStore, UpsertOutcome};
use normalize::{decode_pokemon, decode_species, normalize, SpeciesPayload};

/// Which ids to load
#[derive(Debug, Clone, Copy)]
pub struct LoadRequest {
    pub start_id: i64,
    pub end_id: i64,
    /// Refetch ids that are already stored
    pub force_update: bool,
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Pause after each id that hit the network
    pub delay: Duration,
    pub derive_generation: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(100),
            derive_generation: false,
        }
    }
}

enum Outcome {
    Skipped,
    Unavailable(FetchError),
    Stored(UpsertOutcome, String),
}

#[derive(Debug, Default)]
struct Tally {
    created: usize,
    updated: usize,
    skipped: usize,
    failed: usize,
}

pub struct Loader<'a, S: SpeciesSource> {
    store: &'a PokedexStore,
    source: &'a S,
    options: LoadOptions,
}

impl<'a, S: SpeciesSource> Loader<'a, S> {
    pub fn new(store: &'a PokedexStore, source: &'a S, options: LoadOptions) -> Self {
        Self {
            store,
            source,
            options,
        }
    }

    /// Load every id in the request, writing one progress line per id and a
    /// closing summary to `out`.
    pub fn run(&self, request: &LoadRequest, out: &mut impl Write) -> Result<()> {
        if request.end_id < request.start_id {
            bail!(
                "End id {} is before start id {}",
                request.end_id,
                request.start_id
            );
        }

        writeln!(
            out,
            "Loading Pokemon {} to {}...",
            request.start_id, request.end_id
        )?;

        let mut tally = Tally::default();

        for pokedex_id in request.start_id..=request.end_id {
            let outcome = self.load_one(pokedex_id, request.force_update, &mut *out);

            let touched_network = match outcome {
                Ok(Outcome::Skipped) => {
                    tally.skipped += 1;
                    writeln!(out, "Pokemon #{} already exists, skipping...", pokedex_id)?;
                    false
                }
                Ok(Outcome::Unavailable(e)) => {
                    tally.failed += 1;
                    tracing::warn!(pokedex_id, error = %e, "fetch failed");
                    writeln!(out, "⚠️  Failed to fetch Pokemon #{}", pokedex_id)?;
                    true
                }
                Ok(Outcome::Stored(action, display)) => {
                    match action {
                        UpsertOutcome::Created => tally.created += 1,
                        UpsertOutcome::Updated => tally.updated += 1,
                    }
                    writeln!(out, "✅ {} {}", action.as_str(), display)?;
                    true
                }
                Err(e) => {
                    tally.failed += 1;
                    tracing::error!(pokedex_id, error = %format!("{:#}", e), "processing failed");
                    writeln!(out, "❌ Error processing Pokemon #{}: {:#}", pokedex_id, e)?;
                    true
                }
            };

            if touched_network && pokedex_id < request.end_id && !self.options.delay.is_zero() {
                std::thread::sleep(self.options.delay);
            }
        }

        writeln!(
            out,
            "Finished loading Pokemon {} to {}: {} created, {} updated, {} skipped, {} failed",
            request.start_id,
            request.end_id,
            tally.created,
            tally.updated,
            tally.skipped,
            tally.failed
        )?;
        Ok(())
    }

    fn load_one(&self, pokedex_id: i64, force_update: bool, out: &mut impl Write) -> Result<Outcome> {
        if !force_update && self.store.pokemon_exists(pokedex_id)? {
            return Ok(Outcome::Skipped);
        }

        writeln!(out, "Fetching Pokemon #{}...", pokedex_id)?;

        // A body that is not JSON is a bad payload, not a missing one
        let raw = match self.source.fetch_pokemon(pokedex_id) {
            Ok(raw) => raw,
            Err(e @ FetchError::Decode { .. }) => return Err(e.into()),
            Err(e) => return Ok(Outcome::Unavailable(e)),
        };
        let pokemon = decode_pokemon(raw)?;

        let species = match self.source.fetch_url(&pokemon.species.url) {
            Ok(raw) => decode_species(raw)?,
            Err(e @ FetchError::Decode { .. }) => return Err(e.into()),
            Err(e) => {
                tracing::info!(pokedex_id, error = %e, "species record unavailable, continuing without it");
                SpeciesPayload::default()
            }
        };

        let record = normalize(
            pokedex_id,
            &pokemon,
            &species,
            self.options.derive_generation,
        )?;
        let action = self.store.upsert_pokemon(&record)?;
        tracing::debug!(pokedex_id, action = action.as_str(), "stored");

        Ok(Outcome::Stored(action, record.to_string()))
    }
}
