//! Loader tests against an in-memory species source
//!
//! These cover the per-id contract of `pokedex load`: skipping, partial
//! failure, graceful species-record loss and idempotent reloads.

use pokedex::source::FetchError;
use pokedex::{LoadOptions, LoadRequest, Loader, PokedexStore, SpeciesSource};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

/// Serves canned payloads; unknown ids and URLs answer 404.
#[derive(Default)]
struct FakeSource {
    pokemon: HashMap<i64, Value>,
    species: HashMap<String, Value>,
    /// Ids and URLs whose record comes back as a non-JSON body
    garbled: HashSet<i64>,
    garbled_urls: HashSet<String>,
    requests: Cell<usize>,
}

impl FakeSource {
    fn with_range(ids: std::ops::RangeInclusive<i64>) -> Self {
        let mut source = Self::default();
        for id in ids {
            source.add(id, &format!("mon{}", id));
        }
        source
    }

    fn add(&mut self, id: i64, name: &str) {
        let url = species_url(id);
        self.pokemon.insert(id, pokemon_json(id, name));
        self.species.insert(url, species_json(name));
    }

    fn requests(&self) -> usize {
        self.requests.get()
    }
}

impl SpeciesSource for FakeSource {
    fn fetch_pokemon(&self, pokedex_id: i64) -> Result<Value, FetchError> {
        self.requests.set(self.requests.get() + 1);
        if self.garbled.contains(&pokedex_id) {
            return Err(not_json(&format!("fake://pokemon/{}", pokedex_id)));
        }
        self.pokemon
            .get(&pokedex_id)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: format!("fake://pokemon/{}", pokedex_id),
                status: 404,
            })
    }

    fn fetch_url(&self, url: &str) -> Result<Value, FetchError> {
        self.requests.set(self.requests.get() + 1);
        if self.garbled_urls.contains(url) {
            return Err(not_json(url));
        }
        self.species.get(url).cloned().ok_or_else(|| FetchError::Status {
            url: url.to_string(),
            status: 404,
        })
    }
}

fn not_json(url: &str) -> FetchError {
    FetchError::Decode {
        url: url.to_string(),
        source: serde_json::from_str::<Value>("<html>Bad Gateway</html>").unwrap_err(),
    }
}

fn species_url(id: i64) -> String {
    format!("fake://pokemon-species/{}/", id)
}

fn pokemon_json(id: i64, name: &str) -> Value {
    json!({
        "name": name,
        "height": 7,
        "weight": 69,
        "species": { "name": name, "url": species_url(id) },
        "types": [
            { "slot": 1, "type": { "name": "grass" } },
            { "slot": 2, "type": { "name": "poison" } }
        ],
        "stats": [
            { "base_stat": 35, "stat": { "name": "hp" } },
            { "base_stat": 55, "stat": { "name": "attack" } },
            { "base_stat": 40, "stat": { "name": "defense" } },
            { "base_stat": 50, "stat": { "name": "special-attack" } },
            { "base_stat": 50, "stat": { "name": "special-defense" } },
            { "base_stat": 90, "stat": { "name": "speed" } }
        ],
        "sprites": {
            "front_default": format!("https://img/{}.png", id),
            "back_default": null,
            "other": { "official-artwork": { "front_default": format!("https://img/art/{}.png", id) } }
        }
    })
}

fn species_json(name: &str) -> Value {
    json!({
        "flavor_text_entries": [
            { "flavor_text": format!("{} lives\nin\u{000C}tall grass.", name), "language": { "name": "en" } }
        ],
        "genera": [{ "genus": "Test Pokémon", "language": { "name": "en" } }],
        "generation": { "name": "generation-ii" }
    })
}

fn no_delay() -> LoadOptions {
    LoadOptions {
        delay: Duration::ZERO,
        derive_generation: false,
    }
}

fn request(start_id: i64, end_id: i64, force_update: bool) -> LoadRequest {
    LoadRequest {
        start_id,
        end_id,
        force_update,
    }
}

/// Run the loader and return its progress text
fn load(store: &PokedexStore, source: &FakeSource, req: LoadRequest) -> String {
    load_with(store, source, req, no_delay())
}

fn load_with(
    store: &PokedexStore,
    source: &FakeSource,
    req: LoadRequest,
    options: LoadOptions,
) -> String {
    let mut out = Vec::new();
    Loader::new(store, source, options)
        .run(&req, &mut out)
        .unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn test_load_creates_normalized_rows() {
    let store = PokedexStore::open_in_memory().unwrap();
    let source = FakeSource::with_range(1..=3);

    let output = load(&store, &source, request(1, 3, false));

    assert!(output.starts_with("Loading Pokemon 1 to 3..."));
    assert!(output.contains("Created #001 Mon1"));
    assert!(output.contains("Finished loading Pokemon 1 to 3: 3 created, 0 updated, 0 skipped, 0 failed"));
    assert_eq!(store.count_pokemon().unwrap(), 3);

    let mon = store.get_pokemon(2).unwrap().unwrap();
    assert_eq!(mon.record.name, "mon2");
    assert_eq!(mon.record.types, vec!["grass", "poison"]);
    assert_eq!(mon.record.total_stats(), 320);
    assert_eq!(mon.record.height.to_string(), "7.0");
    assert_eq!(mon.record.height_meters(), Decimal::new(7, 1));
    assert_eq!(mon.record.description, "mon2 lives in tall grass.");
    assert_eq!(mon.record.species, "Test Pokémon");
    assert_eq!(mon.record.sprite_back.as_deref(), Some(""));
    assert_eq!(mon.record.sprite_artwork.as_deref(), Some("https://img/art/2.png"));
    assert_eq!(mon.record.generation, 1);
    assert_eq!(mon.rarity, "common");
}

#[test]
fn test_failed_fetch_does_not_abort_batch() {
    let store = PokedexStore::open_in_memory().unwrap();
    let mut source = FakeSource::with_range(1..=5);
    source.pokemon.remove(&3);

    let output = load(&store, &source, request(1, 5, false));

    assert!(output.contains("Failed to fetch Pokemon #3"));
    assert!(output.contains("Finished loading Pokemon 1 to 5: 4 created, 0 updated, 0 skipped, 1 failed"));
    for id in [1, 2, 4, 5] {
        assert!(store.pokemon_exists(id).unwrap(), "#{} should be stored", id);
    }
    assert!(!store.pokemon_exists(3).unwrap());
}

#[test]
fn test_second_run_skips_existing_without_fetching() {
    let store = PokedexStore::open_in_memory().unwrap();
    let source = FakeSource::with_range(1..=4);

    load(&store, &source, request(1, 4, false));
    let requests_after_first = source.requests();
    let before: Vec<_> = (1..=4).map(|id| store.get_pokemon(id).unwrap()).collect();

    let output = load(&store, &source, request(1, 4, false));

    assert_eq!(source.requests(), requests_after_first);
    assert!(output.contains("Pokemon #1 already exists, skipping..."));
    assert!(output.contains("0 created, 0 updated, 4 skipped, 0 failed"));
    let after: Vec<_> = (1..=4).map(|id| store.get_pokemon(id).unwrap()).collect();
    assert_eq!(before, after);
}

#[test]
fn test_forced_reload_is_idempotent() {
    let store = PokedexStore::open_in_memory().unwrap();
    let source = FakeSource::with_range(1..=3);

    load(&store, &source, request(1, 3, true));
    let first: Vec<_> = (1..=3).map(|id| store.get_pokemon(id).unwrap()).collect();

    let output = load(&store, &source, request(1, 3, true));
    let second: Vec<_> = (1..=3).map(|id| store.get_pokemon(id).unwrap()).collect();

    assert!(output.contains("Updated #001 Mon1"));
    assert!(output.contains("0 created, 3 updated, 0 skipped, 0 failed"));
    assert_eq!(first, second);
}

#[test]
fn test_forced_reload_overwrites_but_keeps_rarity() {
    let store = PokedexStore::open_in_memory().unwrap();
    let mut source = FakeSource::with_range(1..=1);

    load(&store, &source, request(1, 1, false));
    store.set_rarity(1, "legendary").unwrap();

    source.pokemon.get_mut(&1).unwrap()["name"] = json!("renamed");
    load(&store, &source, request(1, 1, true));

    let mon = store.get_pokemon(1).unwrap().unwrap();
    assert_eq!(mon.record.name, "renamed");
    assert_eq!(mon.rarity, "legendary");
}

#[test]
fn test_missing_species_record_degrades_to_empty_metadata() {
    let store = PokedexStore::open_in_memory().unwrap();
    let mut source = FakeSource::with_range(1..=2);
    source.species.remove(&species_url(2));

    let output = load(&store, &source, request(1, 2, false));

    assert!(output.contains("2 created"));
    let mon = store.get_pokemon(2).unwrap().unwrap();
    assert_eq!(mon.record.description, "");
    assert_eq!(mon.record.species, "");
    assert_eq!(mon.record.total_stats(), 320);
}

#[test]
fn test_malformed_payload_is_reported_and_skipped() {
    let store = PokedexStore::open_in_memory().unwrap();
    let mut source = FakeSource::with_range(1..=3);
    source
        .pokemon
        .get_mut(&2)
        .unwrap()
        .as_object_mut()
        .unwrap()
        .remove("height");

    let output = load(&store, &source, request(1, 3, false));

    assert!(output.contains("Error processing Pokemon #2"));
    assert!(output.contains("2 created, 0 updated, 0 skipped, 1 failed"));
    assert!(!store.pokemon_exists(2).unwrap());
    assert!(store.pokemon_exists(3).unwrap());
}

#[test]
fn test_oversized_height_is_reported_and_skipped() {
    let store = PokedexStore::open_in_memory().unwrap();
    let mut source = FakeSource::with_range(1..=3);
    source.pokemon.get_mut(&2).unwrap()["height"] = json!(i64::MAX / 5);

    let output = load(&store, &source, request(1, 3, false));

    assert!(output.contains("Error processing Pokemon #2: height out of range"));
    assert!(output.contains("2 created, 0 updated, 0 skipped, 1 failed"));
    assert!(!store.pokemon_exists(2).unwrap());
    assert!(store.pokemon_exists(3).unwrap());
}

#[test]
fn test_non_json_body_is_a_processing_error() {
    let store = PokedexStore::open_in_memory().unwrap();
    let mut source = FakeSource::with_range(1..=3);
    source.garbled.insert(2);
    // A garbled species record is not degraded to empty metadata either
    source.garbled_urls.insert(species_url(3));

    let output = load(&store, &source, request(1, 3, false));

    assert!(output.contains("Error processing Pokemon #2"));
    assert!(output.contains("Error processing Pokemon #3"));
    assert!(output.contains("invalid JSON"));
    assert!(!output.contains("Failed to fetch"));
    assert!(output.contains("1 created, 0 updated, 0 skipped, 2 failed"));
    assert!(store.pokemon_exists(1).unwrap());
    assert!(!store.pokemon_exists(2).unwrap());
    assert!(!store.pokemon_exists(3).unwrap());
}

#[test]
fn test_store_rejection_is_isolated_to_one_id() {
    let store = PokedexStore::open_in_memory().unwrap();
    let mut source = FakeSource::with_range(1..=3);
    // Negative stats violate the table's CHECK constraints
    source.pokemon.get_mut(&1).unwrap()["stats"] =
        json!([{ "base_stat": -5, "stat": { "name": "hp" } }]);

    let output = load(&store, &source, request(1, 3, false));

    assert!(output.contains("Error processing Pokemon #1"));
    assert!(!store.pokemon_exists(1).unwrap());
    assert!(store.pokemon_exists(2).unwrap());
    assert!(store.pokemon_exists(3).unwrap());
}

#[test]
fn test_derived_generation_option() {
    let store = PokedexStore::open_in_memory().unwrap();
    let source = FakeSource::with_range(1..=1);
    let options = LoadOptions {
        delay: Duration::ZERO,
        derive_generation: true,
    };

    let mut out = Vec::new();
    Loader::new(&store, &source, options)
        .run(&request(1, 1, false), &mut out)
        .unwrap();

    assert_eq!(store.get_pokemon(1).unwrap().unwrap().record.generation, 2);
}

#[test]
fn test_reversed_range_is_rejected() {
    let store = PokedexStore::open_in_memory().unwrap();
    let source = FakeSource::with_range(1..=3);

    let mut out = Vec::new();
    let result = Loader::new(&store, &source, no_delay()).run(&request(3, 1, false), &mut out);

    assert!(result.is_err());
    assert_eq!(source.requests(), 0);
    assert_eq!(store.count_pokemon().unwrap(), 0);
}

#[test]
fn test_delay_between_fetched_ids() {
    let store = PokedexStore::open_in_memory().unwrap();
    let source = FakeSource::with_range(1..=3);
    let delay = Duration::from_millis(50);
    let options = LoadOptions {
        delay,
        derive_generation: false,
    };

    let started = Instant::now();
    load_with(&store, &source, request(1, 3, false), options.clone());
    // Pauses after ids 1 and 2, none after the last
    assert!(started.elapsed() >= delay * 2);

    let started = Instant::now();
    let output = load_with(&store, &source, request(1, 3, false), options);
    assert!(output.contains("3 skipped"));
    assert!(started.elapsed() < delay);
}
