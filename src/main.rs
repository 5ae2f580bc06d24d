use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use pokedex::cli::{list, load, sessions, user};
use pokedex::config::Config;
use pokedex::ingest::LoadRequest;
use pokedex::store::{PokedexStore, PokemonFilter};

#[derive(Parser)]
#[command(name = "pokedex")]
#[command(about = "Pokemon species loader and player statistics store")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "pokedex.yaml")]
    config: String,

    /// Database path (overrides the config file)
    #[arg(short, long)]
    database: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load Pokemon data from PokeAPI
    Load {
        /// Starting Pokemon ID
        #[arg(long, default_value_t = 1)]
        start: i64,

        /// Ending Pokemon ID (151 covers Gen 1)
        #[arg(long, default_value_t = 151)]
        end: i64,

        /// Force update existing Pokemon
        #[arg(long)]
        force: bool,
    },

    /// List stored Pokemon
    List {
        /// Search by name or pokedex number
        #[arg(short, long)]
        search: Option<String>,

        /// Filter by generation
        #[arg(short, long)]
        generation: Option<i64>,

        /// Filter by rarity
        #[arg(short, long)]
        rarity: Option<String>,
    },

    /// User management
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// List game sessions
    Sessions {
        /// Only sessions played by this username
        #[arg(short, long)]
        user: Option<String>,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Create a user account and its profile
    Create {
        username: String,
        #[arg(long)]
        email: Option<String>,
    },
    /// Show a user's profile
    Show { username: String },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = Config::load(&cli.config)?;
    let db_path = cli.database.unwrap_or_else(|| config.database_path());
    let store = PokedexStore::open(&db_path)?;

    match cli.command {
        Commands::Load { start, end, force } => {
            let request = LoadRequest {
                start_id: start,
                end_id: end,
                force_update: force,
            };
            load::run(&store, &config, request)?;
        }
        Commands::List {
            search,
            generation,
            rarity,
        } => {
            list::run(
                &store,
                PokemonFilter {
                    search,
                    generation,
                    rarity,
                },
            )?;
        }
        Commands::User { command } => match command {
            UserCommands::Create { username, email } => {
                user::create(&store, username, email)?;
            }
            UserCommands::Show { username } => {
                user::show(&store, username)?;
            }
        },
        Commands::Sessions { user } => {
            sessions::run(&store, user)?;
        }
    }

    Ok(())
}
