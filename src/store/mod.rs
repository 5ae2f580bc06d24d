//! Pokedex storage with SQLite
//!
//! Species rows are written by the loader through [`PokedexStore::upsert_pokemon`];
//! users, discoveries and sessions are written by gameplay code through the
//! remaining operations. Creating a user creates its profile in the same
//! transaction.

mod schema;

use anyhow::{bail, Context, Result};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::path::Path;
use crate::model::{
    discovery_percentage, BaseStats, Discovery, GameSession, Pokemon, PokemonRecord, User,
    UserProfile, DEFAULT_SESSION_DURATION, GUESS_TIME_PRECISION, HEIGHT_PRECISION,
    WEIGHT_PRECISION,
};

pub use schema::SCHEMA;

const POKEMON_COLUMNS: &str = "pokedex_id, name, sprite_front, sprite_back, sprite_artwork, \
     height, weight, species, types, hp, attack, defense, special_attack, special_defense, \
     speed, description, generation, rarity, created_at, updated_at";

const PROFILE_COLUMNS: &str = "id, user_id, total_pokemon_discovered, total_games_played, \
     highest_score, total_playtime, discovery_percentage, created_at, updated_at";

const DISCOVERY_COLUMNS: &str = "id, user_id, pokemon_id, first_seen, times_seen, \
     times_guessed_correctly, fastest_guess_time";

/// Result of writing a species row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

impl UpsertOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpsertOutcome::Created => "Created",
            UpsertOutcome::Updated => "Updated",
        }
    }
}

/// Filters for [`PokedexStore::list_pokemon`]
#[derive(Debug, Clone, Default)]
pub struct PokemonFilter {
    /// Matches a name substring or an exact pokedex number
    pub search: Option<String>,
    pub generation: Option<i64>,
    pub rarity: Option<String>,
}

pub struct PokedexStore {
    conn: Connection,
}

impl PokedexStore {
    pub fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    // ============================================
    // USERS & PROFILES
    // ============================================

    /// Create a user account together with its profile.
    pub fn create_user(&self, username: &str, email: Option<&str>) -> Result<User> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO users (username, email, date_joined) VALUES (?, ?, datetime('now'))",
            params![username, email],
        )
        .with_context(|| format!("Failed to create user '{}'", username))?;
        let user_id = tx.last_insert_rowid();
        tx.execute(
            "INSERT INTO user_profiles (user_id, created_at, updated_at)
             VALUES (?, datetime('now'), datetime('now'))",
            params![user_id],
        )?;
        tx.commit()?;

        tracing::debug!(user_id, username, "created user with profile");
        self.get_user(user_id)?
            .ok_or_else(|| anyhow::anyhow!("User {} vanished after insert", user_id))
    }

    /// Persist account changes; the profile is saved along with it.
    pub fn save_user(&self, user: &User) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute(
            "UPDATE users SET username = ?, email = ? WHERE id = ?",
            params![user.username, user.email, user.id],
        )?;
        if changed == 0 {
            bail!("User not found: {}", user.id);
        }
        tx.execute(
            "INSERT OR IGNORE INTO user_profiles (user_id, created_at, updated_at)
             VALUES (?, datetime('now'), datetime('now'))",
            params![user.id],
        )?;
        tx.execute(
            "UPDATE user_profiles SET updated_at = datetime('now') WHERE user_id = ?",
            params![user.id],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        self.conn
            .query_row(
                "SELECT id, username, email, date_joined FROM users WHERE id = ?",
                params![user_id],
                user_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.conn
            .query_row(
                "SELECT id, username, email, date_joined FROM users WHERE username = ?",
                params![username],
                user_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn get_profile(&self, user_id: i64) -> Result<Option<UserProfile>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM user_profiles WHERE user_id = ?", PROFILE_COLUMNS),
                params![user_id],
                profile_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn count_profiles(&self, user_id: i64) -> Result<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM user_profiles WHERE user_id = ?",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Recompute the share of known species the user has discovered and store
    /// it on the profile along with the discovery count.
    pub fn update_discovery_percentage(&self, user_id: i64) -> Result<Decimal> {
        let total = self.count_pokemon()?;
        let discovered: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT pokemon_id) FROM user_pokemon_discoveries WHERE user_id = ?",
            params![user_id],
            |row| row.get(0),
        )?;

        let percentage = discovery_percentage(discovered, total)
            .with_context(|| format!("discovery percentage of user {}", user_id))?;

        let changed = self.conn.execute(
            "UPDATE user_profiles
             SET discovery_percentage = ?, total_pokemon_discovered = ?, updated_at = datetime('now')
             WHERE user_id = ?",
            params![percentage.to_string(), discovered, user_id],
        )?;
        if changed == 0 {
            bail!("No profile for user {}", user_id);
        }
        Ok(percentage)
    }

    /// Fold a finished game into the user's profile counters
    pub fn record_game_result(&self, user_id: i64, score: i64, duration: i64) -> Result<()> {
        fold_game_result(&self.conn, user_id, score, duration)
    }

    // ============================================
    // SPECIES
    // ============================================

    pub fn pokemon_exists(&self, pokedex_id: i64) -> Result<bool> {
        let exists = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM pokemon WHERE pokedex_id = ?)",
            params![pokedex_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    pub fn count_pokemon(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM pokemon", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Insert a new species row. Fails if the pokedex number is taken.
    pub fn insert_pokemon(&self, record: &PokemonRecord) -> Result<()> {
        let (height, weight, types) = encode_measurements(record)?;
        self.conn.execute(
            r#"INSERT INTO pokemon
               (pokedex_id, name, sprite_front, sprite_back, sprite_artwork, height, weight,
                species, types, hp, attack, defense, special_attack, special_defense, speed,
                description, generation, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, datetime('now'), datetime('now'))"#,
            params![
                record.pokedex_id,
                record.name,
                record.sprite_front,
                record.sprite_back,
                record.sprite_artwork,
                height,
                weight,
                record.species,
                types,
                record.stats.hp,
                record.stats.attack,
                record.stats.defense,
                record.stats.special_attack,
                record.stats.special_defense,
                record.stats.speed,
                record.description,
                record.generation,
            ],
        )?;
        Ok(())
    }

    /// Create or overwrite the loader-managed fields of a species row.
    ///
    /// `rarity` and `created_at` survive an overwrite. When every managed field
    /// already matches, the row is left untouched, `updated_at` included.
    pub fn upsert_pokemon(&self, record: &PokemonRecord) -> Result<UpsertOutcome> {
        let existed = self.pokemon_exists(record.pokedex_id)?;
        let (height, weight, types) = encode_measurements(record)?;

        self.conn.execute(
            r#"INSERT INTO pokemon
               (pokedex_id, name, sprite_front, sprite_back, sprite_artwork, height, weight,
                species, types, hp, attack, defense, special_attack, special_defense, speed,
                description, generation, created_at, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17,
                       datetime('now'), datetime('now'))
               ON CONFLICT(pokedex_id) DO UPDATE SET
                   name = excluded.name,
                   sprite_front = excluded.sprite_front,
                   sprite_back = excluded.sprite_back,
                   sprite_artwork = excluded.sprite_artwork,
                   height = excluded.height,
                   weight = excluded.weight,
                   species = excluded.species,
                   types = excluded.types,
                   hp = excluded.hp,
                   attack = excluded.attack,
                   defense = excluded.defense,
                   special_attack = excluded.special_attack,
                   special_defense = excluded.special_defense,
                   speed = excluded.speed,
                   description = excluded.description,
                   generation = excluded.generation,
                   updated_at = datetime('now')
               WHERE name IS NOT excluded.name
                  OR sprite_front IS NOT excluded.sprite_front
                  OR sprite_back IS NOT excluded.sprite_back
                  OR sprite_artwork IS NOT excluded.sprite_artwork
                  OR height IS NOT excluded.height
                  OR weight IS NOT excluded.weight
                  OR species IS NOT excluded.species
                  OR types IS NOT excluded.types
                  OR hp IS NOT excluded.hp
                  OR attack IS NOT excluded.attack
                  OR defense IS NOT excluded.defense
                  OR special_attack IS NOT excluded.special_attack
                  OR special_defense IS NOT excluded.special_defense
                  OR speed IS NOT excluded.speed
                  OR description IS NOT excluded.description
                  OR generation IS NOT excluded.generation"#,
            params![
                record.pokedex_id,
                record.name,
                record.sprite_front,
                record.sprite_back,
                record.sprite_artwork,
                height,
                weight,
                record.species,
                types,
                record.stats.hp,
                record.stats.attack,
                record.stats.defense,
                record.stats.special_attack,
                record.stats.special_defense,
                record.stats.speed,
                record.description,
                record.generation,
            ],
        )?;

        Ok(if existed {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Created
        })
    }

    pub fn set_rarity(&self, pokedex_id: i64, rarity: &str) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE pokemon SET rarity = ?, updated_at = datetime('now') WHERE pokedex_id = ?",
            params![rarity, pokedex_id],
        )?;
        if changed == 0 {
            bail!("Pokemon not found: #{}", pokedex_id);
        }
        Ok(())
    }

    pub fn get_pokemon(&self, pokedex_id: i64) -> Result<Option<Pokemon>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM pokemon WHERE pokedex_id = ?", POKEMON_COLUMNS),
                params![pokedex_id],
                pokemon_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn list_pokemon(&self, filter: &PokemonFilter) -> Result<Vec<Pokemon>> {
        let mut conditions: Vec<&str> = vec![];
        let mut values: Vec<Value> = vec![];

        if let Some(ref search) = filter.search {
            conditions.push("(name LIKE ? OR CAST(pokedex_id AS TEXT) = ?)");
            values.push(Value::Text(format!("%{}%", search.to_lowercase())));
            values.push(Value::Text(search.trim_start_matches('#').to_string()));
        }
        if let Some(generation) = filter.generation {
            conditions.push("generation = ?");
            values.push(Value::Integer(generation));
        }
        if let Some(ref rarity) = filter.rarity {
            conditions.push("rarity = ?");
            values.push(Value::Text(rarity.clone()));
        }

        let mut query = format!("SELECT {} FROM pokemon", POKEMON_COLUMNS);
        if !conditions.is_empty() {
            query.push_str(" WHERE ");
            query.push_str(&conditions.join(" AND "));
        }
        query.push_str(" ORDER BY pokedex_id");

        let mut stmt = self.conn.prepare(&query)?;
        let rows = stmt.query_map(params_from_iter(values), pokemon_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ============================================
    // DISCOVERIES
    // ============================================

    /// Insert a first-encounter record. Fails if the pair already exists.
    pub fn create_discovery(&self, user_id: i64, pokedex_id: i64) -> Result<Discovery> {
        self.conn.execute(
            "INSERT INTO user_pokemon_discoveries (user_id, pokemon_id, first_seen)
             VALUES (?, ?, datetime('now'))",
            params![user_id, pokedex_id],
        )?;
        self.get_discovery(user_id, pokedex_id)?
            .ok_or_else(|| anyhow::anyhow!("Discovery vanished after insert"))
    }

    /// Count one encounter of a species by a user, creating the discovery on
    /// first sight. The fastest guess time only ever decreases.
    pub fn record_encounter(
        &self,
        user_id: i64,
        pokedex_id: i64,
        guessed_correctly: bool,
        guess_time: Option<Decimal>,
    ) -> Result<Discovery> {
        let guess_time = guess_time
            .filter(|_| guessed_correctly)
            .map(|t| GUESS_TIME_PRECISION.quantize(t))
            .transpose()
            .context("guess time")?
            .map(|t| t.to_string());

        self.conn.execute(
            r#"INSERT INTO user_pokemon_discoveries
               (user_id, pokemon_id, first_seen, times_seen, times_guessed_correctly, fastest_guess_time)
               VALUES (?1, ?2, datetime('now'), 1, ?3, ?4)
               ON CONFLICT(user_id, pokemon_id) DO UPDATE SET
                   times_seen = times_seen + 1,
                   times_guessed_correctly = times_guessed_correctly + excluded.times_guessed_correctly,
                   fastest_guess_time = CASE
                       WHEN excluded.fastest_guess_time IS NULL THEN fastest_guess_time
                       WHEN fastest_guess_time IS NULL THEN excluded.fastest_guess_time
                       WHEN CAST(excluded.fastest_guess_time AS REAL) < CAST(fastest_guess_time AS REAL)
                           THEN excluded.fastest_guess_time
                       ELSE fastest_guess_time
                   END"#,
            params![user_id, pokedex_id, guessed_correctly as i64, guess_time],
        )?;

        self.get_discovery(user_id, pokedex_id)?
            .ok_or_else(|| anyhow::anyhow!("Discovery vanished after upsert"))
    }

    pub fn get_discovery(&self, user_id: i64, pokedex_id: i64) -> Result<Option<Discovery>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {} FROM user_pokemon_discoveries WHERE user_id = ? AND pokemon_id = ?",
                    DISCOVERY_COLUMNS
                ),
                params![user_id, pokedex_id],
                discovery_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn list_discoveries(&self, user_id: i64) -> Result<Vec<Discovery>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM user_pokemon_discoveries WHERE user_id = ? ORDER BY pokemon_id",
            DISCOVERY_COLUMNS
        ))?;
        let rows = stmt.query_map(params![user_id], discovery_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ============================================
    // GAME SESSIONS
    // ============================================

    /// Start a session; `user_id` of `None` makes it anonymous
    pub fn create_game_session(
        &self,
        user_id: Option<i64>,
        session_duration: Option<i64>,
    ) -> Result<GameSession> {
        self.conn.execute(
            "INSERT INTO game_sessions (user_id, session_duration, started_at)
             VALUES (?, ?, datetime('now'))",
            params![user_id, session_duration.unwrap_or(DEFAULT_SESSION_DURATION)],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_game_session(id)?
            .ok_or_else(|| anyhow::anyhow!("Session {} vanished after insert", id))
    }

    pub fn add_session_encounter(&self, session_id: i64, pokedex_id: i64) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO game_session_pokemon (session_id, pokemon_id) VALUES (?, ?)",
            params![session_id, pokedex_id],
        )?;
        Ok(())
    }

    /// Close a session with its final score and, for a signed-in player, fold
    /// the result into their profile.
    pub fn end_game_session(
        &self,
        session_id: i64,
        score: i64,
        total_questions: i64,
    ) -> Result<GameSession> {
        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute(
            "UPDATE game_sessions SET score = ?, total_questions = ?, ended_at = datetime('now')
             WHERE id = ? AND ended_at IS NULL",
            params![score, total_questions, session_id],
        )?;
        if changed == 0 {
            bail!("Session {} not found or already ended", session_id);
        }

        let (user_id, duration): (Option<i64>, i64) = tx.query_row(
            "SELECT user_id, session_duration FROM game_sessions WHERE id = ?",
            params![session_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        if let Some(user_id) = user_id {
            fold_game_result(&tx, user_id, score, duration)?;
        }
        tx.commit()?;

        self.get_game_session(session_id)?
            .ok_or_else(|| anyhow::anyhow!("Session {} vanished after update", session_id))
    }

    pub fn get_game_session(&self, session_id: i64) -> Result<Option<GameSession>> {
        let session = self
            .conn
            .query_row(
                "SELECT id, user_id, score, total_questions, session_duration, started_at, ended_at
                 FROM game_sessions WHERE id = ?",
                params![session_id],
                session_from_row,
            )
            .optional()?;

        match session {
            Some(mut s) => {
                s.pokemon_encountered = self.session_encounters(s.id)?;
                Ok(Some(s))
            }
            None => Ok(None),
        }
    }

    /// Sessions in start order, optionally restricted to one username
    pub fn list_game_sessions(&self, username: Option<&str>) -> Result<Vec<GameSessionRow>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT gs.id, gs.user_id, gs.score, gs.total_questions, gs.session_duration,
                      gs.started_at, gs.ended_at, u.username
               FROM game_sessions gs
               LEFT JOIN users u ON gs.user_id = u.id
               WHERE ?1 IS NULL OR u.username = ?1
               ORDER BY gs.started_at, gs.id"#,
        )?;

        let rows = stmt.query_map(params![username], |row| {
            Ok(GameSessionRow {
                session: session_from_row(row)?,
                username: row.get(7)?,
            })
        })?;

        let mut sessions = rows.collect::<Result<Vec<_>, _>>()?;
        for row in &mut sessions {
            row.session.pokemon_encountered = self.session_encounters(row.session.id)?;
        }
        Ok(sessions)
    }

    fn session_encounters(&self, session_id: i64) -> Result<Vec<i64>> {
        let mut stmt = self.conn.prepare(
            "SELECT pokemon_id FROM game_session_pokemon WHERE session_id = ? ORDER BY pokemon_id",
        )?;
        let rows = stmt.query_map(params![session_id], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

// ============================================
// ROW TYPES
// ============================================

#[derive(Debug)]
pub struct GameSessionRow {
    pub session: GameSession,
    pub username: Option<String>,
}

fn fold_game_result(conn: &Connection, user_id: i64, score: i64, duration: i64) -> Result<()> {
    let changed = conn.execute(
        "UPDATE user_profiles
         SET total_games_played = total_games_played + 1,
             total_playtime = total_playtime + ?2,
             highest_score = MAX(highest_score, ?1),
             updated_at = datetime('now')
         WHERE user_id = ?3",
        params![score, duration, user_id],
    )?;
    if changed == 0 {
        bail!("No profile for user {}", user_id);
    }
    Ok(())
}

// ============================================
// ROW MAPPING
// ============================================

/// Height, weight and types in their stored TEXT form
fn encode_measurements(record: &PokemonRecord) -> Result<(String, String, String)> {
    let height = HEIGHT_PRECISION
        .quantize(record.height)
        .with_context(|| format!("height of #{}", record.pokedex_id))?;
    let weight = WEIGHT_PRECISION
        .quantize(record.weight)
        .with_context(|| format!("weight of #{}", record.pokedex_id))?;
    let types = serde_json::to_string(&record.types)?;
    Ok((height.to_string(), weight.to_string(), types))
}

fn decimal_column(row: &Row, idx: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(idx)?;
    text.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn optional_decimal_column(row: &Row, idx: usize) -> rusqlite::Result<Option<Decimal>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|t| {
        t.parse()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn pokemon_from_row(row: &Row) -> rusqlite::Result<Pokemon> {
    let types_json: String = row.get(8)?;
    let types: Vec<String> = serde_json::from_str(&types_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(8, Type::Text, Box::new(e)))?;

    Ok(Pokemon {
        record: PokemonRecord {
            pokedex_id: row.get(0)?,
            name: row.get(1)?,
            sprite_front: row.get(2)?,
            sprite_back: row.get(3)?,
            sprite_artwork: row.get(4)?,
            height: decimal_column(row, 5)?,
            weight: decimal_column(row, 6)?,
            species: row.get(7)?,
            types,
            stats: BaseStats {
                hp: row.get(9)?,
                attack: row.get(10)?,
                defense: row.get(11)?,
                special_attack: row.get(12)?,
                special_defense: row.get(13)?,
                speed: row.get(14)?,
            },
            description: row.get(15)?,
            generation: row.get(16)?,
        },
        rarity: row.get(17)?,
        created_at: row.get(18)?,
        updated_at: row.get(19)?,
    })
}

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        date_joined: row.get(3)?,
    })
}

fn profile_from_row(row: &Row) -> rusqlite::Result<UserProfile> {
    Ok(UserProfile {
        id: row.get(0)?,
        user_id: row.get(1)?,
        total_pokemon_discovered: row.get(2)?,
        total_games_played: row.get(3)?,
        highest_score: row.get(4)?,
        total_playtime: row.get(5)?,
        discovery_percentage: decimal_column(row, 6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn discovery_from_row(row: &Row) -> rusqlite::Result<Discovery> {
    Ok(Discovery {
        id: row.get(0)?,
        user_id: row.get(1)?,
        pokedex_id: row.get(2)?,
        first_seen: row.get(3)?,
        times_seen: row.get(4)?,
        times_guessed_correctly: row.get(5)?,
        fastest_guess_time: optional_decimal_column(row, 6)?,
    })
}

fn session_from_row(row: &Row) -> rusqlite::Result<GameSession> {
    Ok(GameSession {
        id: row.get(0)?,
        user_id: row.get(1)?,
        score: row.get(2)?,
        total_questions: row.get(3)?,
        session_duration: row.get(4)?,
        pokemon_encountered: vec![],
        started_at: row.get(5)?,
        ended_at: row.get(6)?,
    })
}
