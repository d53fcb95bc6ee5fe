use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use gateward::{
    AccountStatus, AuthConfig, BcryptHasher, MemoryIdentityStore, NewUser, PasswordHasher,
    build_state, load_seed_users, resolve_seed_path, server,
};
use tracing::{Level, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gateward")]
#[command(about = "Bearer-token authentication core")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the authentication HTTP server
    Serve {
        /// Bind address, e.g. 0.0.0.0:8080
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind: String,
        /// Shared token signing secret
        #[arg(long, env = "GATEWARD_SECRET", hide_env_values = true)]
        secret: String,
        /// Token time-to-live in seconds
        #[arg(long, env = "GATEWARD_TOKEN_TTL", default_value_t = 3600)]
        token_ttl_secs: u64,
        /// Deadline in seconds for per-request identity lookups
        #[arg(long, default_value_t = 5)]
        lookup_timeout_secs: u64,
        /// Path to the user seed file (defaults to GATEWARD_USERS /
        /// $XDG_CONFIG_HOME/gateward/users.json / ./users.json)
        #[arg(long)]
        users_file: Option<PathBuf>,
    },
    /// Hash a password for a seed file entry (reads plaintext from stdin)
    HashPassword {
        /// bcrypt cost factor
        #[arg(long)]
        cost: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("gateward=info".parse()?),
        )
        .with_max_level(Level::INFO)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            bind,
            secret,
            token_ttl_secs,
            lookup_timeout_secs,
            users_file,
        } => {
            let config = AuthConfig::new(secret)
                .with_token_ttl(Duration::from_secs(token_ttl_secs))
                .with_lookup_timeout(Duration::from_secs(lookup_timeout_secs));

            info!(
                secret_fingerprint = %config.secret_fingerprint(),
                token_ttl_secs,
                "starting gateward"
            );

            let store = Arc::new(MemoryIdentityStore::new());
            seed_users(&store, users_file).await?;

            let hasher = Arc::new(BcryptHasher::new());
            let state = build_state(&config, store, hasher);
            server::start_http(state, &bind).await?;
        }
        Commands::HashPassword { cost } => {
            let hasher = match cost {
                Some(cost) => BcryptHasher::with_cost(cost),
                None => BcryptHasher::new(),
            };

            let mut plaintext = String::new();
            io::stdin().lock().read_line(&mut plaintext)?;
            let plaintext = plaintext.trim_end_matches(['\r', '\n']);

            let hash = hasher.hash(plaintext)?;
            println!("{}", hash.as_str());
        }
    }

    Ok(())
}

/// Load seed users into the store. A missing seed file is not fatal; the
/// server starts empty and users can be registered over the API.
async fn seed_users(
    store: &Arc<MemoryIdentityStore>,
    users_file: Option<PathBuf>,
) -> Result<()> {
    use gateward::IdentityStore;

    let path = match users_file {
        Some(path) => path,
        None => match resolve_seed_path() {
            Ok(path) => path,
            Err(e) => {
                warn!("no user seed file: {}", e);
                return Ok(());
            }
        },
    };

    let users = load_seed_users(&path)?;
    let count = users.len();

    for seed in users {
        let status = AccountStatus {
            enabled: seed.enabled,
            ..AccountStatus::active()
        };
        store
            .insert(NewUser {
                username: seed.username,
                password_hash: seed.password_hash,
                authorities: seed.authorities,
                status,
            })
            .await?;
    }

    info!(count, path = %path.display(), "seeded users");
    Ok(())
}
