//! Payload shapes and normalization into a [`PokemonRecord`]
//!
//! Payload formats:
//!   - `/pokemon/{id}`: name, height, weight, species link, types, stats, sprites
//!   - species-line record: flavor_text_entries, genera, generation
//!
//! Only `name`, `height`, `weight` and `species.url` are required; everything
//! else falls back to an empty value.

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

use crate::decimal::PrecisionError;
use crate::model::{
    BaseStats, PokemonRecord, DEFAULT_GENERATION, HEIGHT_PRECISION, WEIGHT_PRECISION,
};

const ENGLISH: &str = "en";

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("malformed {kind} payload: {source}")]
    Malformed {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{field} out of range: {source}")]
    Measurement {
        field: &'static str,
        #[source]
        source: PrecisionError,
    },
}

// PokeAPI data structures
#[derive(Debug, Deserialize)]
pub struct PokemonPayload {
    pub name: String,
    pub height: i64,
    pub weight: i64,
    pub species: ResourceLink,
    #[serde(default)]
    pub types: Vec<TypeSlot>,
    #[serde(default)]
    pub stats: Vec<StatEntry>,
    #[serde(default)]
    pub sprites: Option<Sprites>,
}

#[derive(Debug, Deserialize)]
pub struct ResourceLink {
    pub url: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct NamedRef {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct TypeSlot {
    #[serde(rename = "type")]
    pub kind: NamedRef,
}

#[derive(Debug, Deserialize)]
pub struct StatEntry {
    pub base_stat: i64,
    pub stat: NamedRef,
}

#[derive(Debug, Default, Deserialize)]
pub struct Sprites {
    pub front_default: Option<String>,
    pub back_default: Option<String>,
    #[serde(default)]
    pub other: Option<OtherSprites>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OtherSprites {
    #[serde(rename = "official-artwork", default)]
    pub official_artwork: Option<ArtworkSprites>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ArtworkSprites {
    pub front_default: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SpeciesPayload {
    #[serde(default)]
    pub flavor_text_entries: Vec<FlavorText>,
    #[serde(default)]
    pub genera: Vec<Genus>,
    #[serde(default)]
    pub generation: Option<NamedRef>,
}

#[derive(Debug, Deserialize)]
pub struct FlavorText {
    pub flavor_text: String,
    #[serde(default)]
    pub language: NamedRef,
}

#[derive(Debug, Deserialize)]
pub struct Genus {
    pub genus: String,
    #[serde(default)]
    pub language: NamedRef,
}

pub fn decode_pokemon(value: Value) -> Result<PokemonPayload, NormalizeError> {
    serde_json::from_value(value).map_err(|source| NormalizeError::Malformed {
        kind: "pokemon",
        source,
    })
}

pub fn decode_species(value: Value) -> Result<SpeciesPayload, NormalizeError> {
    serde_json::from_value(value).map_err(|source| NormalizeError::Malformed {
        kind: "species",
        source,
    })
}

/// Build the stored shape of a species from its two source records.
///
/// Fails when height or weight do not fit their column precision.
pub fn normalize(
    pokedex_id: i64,
    pokemon: &PokemonPayload,
    species: &SpeciesPayload,
    derive_generation: bool,
) -> Result<PokemonRecord, NormalizeError> {
    let height = HEIGHT_PRECISION
        .from_int(pokemon.height)
        .map_err(|source| NormalizeError::Measurement {
            field: "height",
            source,
        })?;
    let weight = WEIGHT_PRECISION
        .from_int(pokemon.weight)
        .map_err(|source| NormalizeError::Measurement {
            field: "weight",
            source,
        })?;

    let types = pokemon.types.iter().map(|t| t.kind.name.clone()).collect();

    let stats: HashMap<&str, i64> = pokemon
        .stats
        .iter()
        .map(|s| (s.stat.name.as_str(), s.base_stat))
        .collect();
    let stat = |name: &str| stats.get(name).copied().unwrap_or(0);

    let sprites = pokemon.sprites.as_ref();
    let front = sprites.and_then(|s| s.front_default.clone());
    let back = sprites.and_then(|s| s.back_default.clone());
    let artwork = sprites
        .and_then(|s| s.other.as_ref())
        .and_then(|o| o.official_artwork.as_ref())
        .and_then(|a| a.front_default.clone());

    let generation = if derive_generation {
        species
            .generation
            .as_ref()
            .and_then(|g| parse_generation(&g.name))
            .unwrap_or(DEFAULT_GENERATION)
    } else {
        DEFAULT_GENERATION
    };

    Ok(PokemonRecord {
        pokedex_id,
        name: pokemon.name.clone(),
        sprite_front: front.unwrap_or_default(),
        sprite_back: Some(back.unwrap_or_default()),
        sprite_artwork: Some(artwork.unwrap_or_default()),
        height,
        weight,
        species: english_genus(species),
        types,
        stats: BaseStats {
            hp: stat("hp"),
            attack: stat("attack"),
            defense: stat("defense"),
            special_attack: stat("special-attack"),
            special_defense: stat("special-defense"),
            speed: stat("speed"),
        },
        description: english_description(species),
        generation,
    })
}

fn english_description(species: &SpeciesPayload) -> String {
    species
        .flavor_text_entries
        .iter()
        .find(|entry| entry.language.name == ENGLISH)
        .map(|entry| {
            entry
                .flavor_text
                .replace(|c: char| c == '\u{000C}' || c == '\n', " ")
        })
        .unwrap_or_default()
}

fn english_genus(species: &SpeciesPayload) -> String {
    species
        .genera
        .iter()
        .find(|g| g.language.name == ENGLISH)
        .map(|g| g.genus.clone())
        .unwrap_or_default()
}

/// `generation-iv` -> 4
fn parse_generation(name: &str) -> Option<i64> {
    let numeral = name.strip_prefix("generation-")?;
    let mut total = 0;
    let mut prev = 0;
    for c in numeral.chars().rev() {
        let value = match c.to_ascii_lowercase() {
            'i' => 1,
            'v' => 5,
            'x' => 10,
            _ => return None,
        };
        if value < prev {
            total -= value;
        } else {
            total += value;
            prev = value;
        }
    }
    (total > 0).then_some(total)
}
