//! SQLite schema definition
//!
//! - `pokemon` is keyed by its pokedex number, the natural key of the source
//! - fixed-point columns hold decimal TEXT, checked for precision on write
//! - every user owns exactly one `user_profiles` row, created with the user

pub const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

-- ============================================
-- USERS & PROFILES
-- ============================================

CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    email TEXT,
    date_joined DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS user_profiles (
    id INTEGER PRIMARY KEY,
    user_id INTEGER NOT NULL UNIQUE,
    total_pokemon_discovered INTEGER NOT NULL DEFAULT 0,
    total_games_played INTEGER NOT NULL DEFAULT 0,
    highest_score INTEGER NOT NULL DEFAULT 0,
    total_playtime INTEGER NOT NULL DEFAULT 0,     -- seconds
    discovery_percentage TEXT NOT NULL DEFAULT '0.00',  -- 5 digits, 2 places
    created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
);

-- ============================================
-- SPECIES
-- ============================================

CREATE TABLE IF NOT EXISTS pokemon (
    pokedex_id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    sprite_front TEXT NOT NULL,
    sprite_back TEXT,
    sprite_artwork TEXT,
    height TEXT NOT NULL,                  -- decimeters, 4 digits, 1 place
    weight TEXT NOT NULL,                  -- hectograms, 5 digits, 1 place
    species TEXT NOT NULL DEFAULT '',      -- genus, e.g. 'Seed Pokémon'
    types TEXT NOT NULL DEFAULT '[]',      -- JSON array of type names
    hp INTEGER NOT NULL CHECK (hp >= 0),
    attack INTEGER NOT NULL CHECK (attack >= 0),
    defense INTEGER NOT NULL CHECK (defense >= 0),
    special_attack INTEGER NOT NULL CHECK (special_attack >= 0),
    special_defense INTEGER NOT NULL CHECK (special_defense >= 0),
    speed INTEGER NOT NULL CHECK (speed >= 0),
    description TEXT NOT NULL DEFAULT '',
    generation INTEGER NOT NULL DEFAULT 1,
    rarity TEXT NOT NULL DEFAULT 'common',
    created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
);

-- ============================================
-- DISCOVERIES
-- ============================================

CREATE TABLE IF NOT EXISTS user_pokemon_discoveries (
    id INTEGER PRIMARY KEY,
    user_id INTEGER NOT NULL,
    pokemon_id INTEGER NOT NULL,
    first_seen DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
    times_seen INTEGER NOT NULL DEFAULT 1 CHECK (times_seen >= 1),
    times_guessed_correctly INTEGER NOT NULL DEFAULT 0
        CHECK (times_guessed_correctly >= 0 AND times_guessed_correctly <= times_seen),
    fastest_guess_time TEXT,               -- seconds, 5 digits, 2 places
    UNIQUE(user_id, pokemon_id),
    FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE,
    FOREIGN KEY(pokemon_id) REFERENCES pokemon(pokedex_id) ON DELETE CASCADE
);

-- ============================================
-- GAME SESSIONS
-- ============================================

-- user_id NULL = anonymous session
CREATE TABLE IF NOT EXISTS game_sessions (
    id INTEGER PRIMARY KEY,
    user_id INTEGER,
    score INTEGER NOT NULL DEFAULT 0,
    total_questions INTEGER NOT NULL DEFAULT 0,
    session_duration INTEGER NOT NULL DEFAULT 60,  -- seconds
    started_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
    ended_at DATETIME,
    FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS game_session_pokemon (
    session_id INTEGER NOT NULL,
    pokemon_id INTEGER NOT NULL,
    PRIMARY KEY(session_id, pokemon_id),
    FOREIGN KEY(session_id) REFERENCES game_sessions(id) ON DELETE CASCADE,
    FOREIGN KEY(pokemon_id) REFERENCES pokemon(pokedex_id) ON DELETE CASCADE
);

-- ============================================
-- INDEXES
-- ============================================

CREATE INDEX IF NOT EXISTS idx_pokemon_name ON pokemon(name);
CREATE INDEX IF NOT EXISTS idx_pokemon_generation ON pokemon(generation);
CREATE INDEX IF NOT EXISTS idx_pokemon_rarity ON pokemon(rarity);

CREATE INDEX IF NOT EXISTS idx_discoveries_user ON user_pokemon_discoveries(user_id);
CREATE INDEX IF NOT EXISTS idx_discoveries_first_seen ON user_pokemon_discoveries(first_seen);

CREATE INDEX IF NOT EXISTS idx_sessions_user ON game_sessions(user_id);
CREATE INDEX IF NOT EXISTS idx_sessions_started ON game_sessions(started_at);
"#;
