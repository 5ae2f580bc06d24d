//! Domain types for species, users, discoveries, sessions and profiles

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use rust_decimal::Decimal;

use crate::decimal::{percentage, Precision, PrecisionError};

pub const DEFAULT_GENERATION: i64 = 1;
pub const DEFAULT_SESSION_DURATION: i64 = 60;

// Column precisions (total digits, decimal places)
pub const HEIGHT_PRECISION: Precision = Precision::new(4, 1);
pub const WEIGHT_PRECISION: Precision = Precision::new(5, 1);
pub const PERCENTAGE_PRECISION: Precision = Precision::new(5, 2);
pub const GUESS_TIME_PRECISION: Precision = Precision::new(5, 2);

// ============================================
// SPECIES
// ============================================

/// The six base stats of a species
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseStats {
    pub hp: i64,
    pub attack: i64,
    pub defense: i64,
    pub special_attack: i64,
    pub special_defense: i64,
    pub speed: i64,
}

impl BaseStats {
    pub fn total(&self) -> i64 {
        self.hp
            + self.attack
            + self.defense
            + self.special_attack
            + self.special_defense
            + self.speed
    }
}

/// Fields of a species owned by the loader.
///
/// `height` is in decimeters and `weight` in hectograms, as delivered by the
/// source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PokemonRecord {
    pub pokedex_id: i64,
    pub name: String,
    pub sprite_front: String,
    pub sprite_back: Option<String>,
    pub sprite_artwork: Option<String>,
    pub height: Decimal,
    pub weight: Decimal,
    pub species: String,
    pub types: Vec<String>,
    pub stats: BaseStats,
    pub description: String,
    pub generation: i64,
}

impl PokemonRecord {
    pub fn total_stats(&self) -> i64 {
        self.stats.total()
    }

    pub fn height_meters(&self) -> Decimal {
        self.height / Decimal::TEN
    }

    pub fn weight_kg(&self) -> Decimal {
        self.weight / Decimal::TEN
    }

    /// Types joined for display, `None` when the list is empty
    pub fn types_display(&self) -> String {
        if self.types.is_empty() {
            "None".to_string()
        } else {
            self.types.join(", ")
        }
    }
}

impl fmt::Display for PokemonRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:03} {}", self.pokedex_id, title_case(&self.name))
    }
}

/// A stored species row
#[derive(Debug, Clone, PartialEq)]
pub struct Pokemon {
    pub record: PokemonRecord,
    pub rarity: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl fmt::Display for Pokemon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.record.fmt(f)
    }
}

/// Capitalize the first letter of every word; words split on whitespace and `-`.
fn title_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut at_word_start = true;
    for c in name.chars() {
        if at_word_start {
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
        at_word_start = !c.is_alphanumeric();
    }
    out
}

// ============================================
// USERS & PROFILES
// ============================================

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub date_joined: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub id: i64,
    pub user_id: i64,
    pub total_pokemon_discovered: i64,
    pub total_games_played: i64,
    pub highest_score: i64,
    pub total_playtime: i64,
    pub discovery_percentage: Decimal,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Percentage of all known species a user has discovered; zero when no
/// species exist.
pub fn discovery_percentage(
    discovered: i64,
    total_species: i64,
) -> Result<Decimal, PrecisionError> {
    percentage(discovered, total_species.max(0), PERCENTAGE_PRECISION)
}

// ============================================
// DISCOVERIES
// ============================================

#[derive(Debug, Clone, PartialEq)]
pub struct Discovery {
    pub id: i64,
    pub user_id: i64,
    pub pokedex_id: i64,
    pub first_seen: NaiveDateTime,
    pub times_seen: i64,
    pub times_guessed_correctly: i64,
    pub fastest_guess_time: Option<Decimal>,
}

// ============================================
// GAME SESSIONS
// ============================================

#[derive(Debug, Clone, PartialEq)]
pub struct GameSession {
    pub id: i64,
    pub user_id: Option<i64>,
    pub score: i64,
    pub total_questions: i64,
    pub session_duration: i64,
    pub pokemon_encountered: Vec<i64>,
    pub started_at: NaiveDateTime,
    pub ended_at: Option<NaiveDateTime>,
}

impl GameSession {
    /// Score as a percentage of questions asked; 0 when nothing was asked
    pub fn accuracy(&self) -> f64 {
        if self.total_questions == 0 {
            return 0.0;
        }
        self.score as f64 / self.total_questions as f64 * 100.0
    }

    pub fn accuracy_display(&self) -> String {
        format!("{:.1}%", self.accuracy())
    }
}

impl fmt::Display for GameSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Session {}: {}/{}",
            self.id, self.score, self.total_questions
        )
    }
}
