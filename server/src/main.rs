//! DanceParty tracking server
//!
//! Serves the console tracking protocol over HTTP and provisions products
//! and unlock keys in the same database.
//!
//! Usage:
//!   danceparty-server --port 3000 --database tracking.db
//!   danceparty-server mint-keys --env prod --prefix JD5 --privileges 12 --count 50
//!
//! Token secrets come from `TOKEN_KEY`, `TOKEN_IV` and `TOKEN_MAGIC` (hex).

use std::{net::SocketAddr, path::Path, path::PathBuf, sync::Arc};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use danceparty_crypto::{TokenCipher, TokenSecrets};
use danceparty_keys::{mint_keys, ActivationRecord, ActivationStore, KeyCode};
use danceparty_server::build_router;
use danceparty_store::{Product, SqliteStore, TrackingStore};
use danceparty_tracking::TrackingService;
use danceparty_types::Environment;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "danceparty-server")]
#[command(about = "Tracking and key activation server for legacy console clients")]
#[command(version)]
struct Args {
    /// SQLite database path (`:memory:` for a throwaway store)
    #[arg(long, env = "DATABASE_PATH", default_value = "tracking.db", global = true)]
    database: PathBuf,

    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    serve: ServeArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(clap::Args, Debug)]
struct ServeArgs {
    /// HTTP port to listen on
    #[arg(short, long, env = "PORT", default_value = "3000", global = true)]
    port: u16,

    /// AES-256 token key (hex)
    #[arg(long, env = "TOKEN_KEY", hide_env_values = true, global = true)]
    token_key: Option<String>,

    /// Token IV (hex)
    #[arg(long, env = "TOKEN_IV", hide_env_values = true, global = true)]
    token_iv: Option<String>,

    /// Magic trailing every genuine token (hex)
    #[arg(long, env = "TOKEN_MAGIC", hide_env_values = true, global = true)]
    token_magic: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve,

    /// Generate unlock keys and print them, one per line
    MintKeys {
        #[arg(long)]
        env: Environment,

        /// Three-character key prefix
        #[arg(long)]
        prefix: String,

        #[arg(long, default_value = "1")]
        count: usize,

        /// Privilege bitfield granted on activation
        #[arg(long)]
        privileges: u32,

        #[arg(long, default_value = "")]
        privilege_name: String,

        #[arg(long, default_value = "1")]
        max_activations: u32,

        #[arg(long, default_value = "")]
        description: String,

        #[arg(long, default_value = "")]
        game_code: String,
    },

    /// Register a product and print its client credentials
    AddProduct {
        #[arg(long)]
        name: String,

        /// Game code the product handle is derived from
        #[arg(long)]
        code: String,

        #[arg(long)]
        env: Environment,

        /// Client product code (generated when omitted)
        #[arg(long, requires = "product_password")]
        product_code: Option<String>,

        /// Client product password (generated when omitted)
        #[arg(long, requires = "product_code")]
        product_password: Option<String>,
    },

    /// Return a key to its unused state
    ResetKey {
        #[arg(long)]
        env: Environment,

        key: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .compact()
        .init();

    let store = open_store(&args.database)?;

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(args.serve, store).await,
        Command::MintKeys {
            env,
            prefix,
            count,
            privileges,
            privilege_name,
            max_activations,
            description,
            game_code,
        } => {
            let template = ActivationRecord::new(KeyCode::generate(&prefix)?, env, privileges)
                .with_privilege_name(privilege_name)
                .with_description(description)
                .with_game_code(game_code)
                .with_max_activations(max_activations);
            let codes = mint_keys(&store, &prefix, count, &template).context("minting keys")?;
            info!("Minted {} keys for {}", codes.len(), env);
            for code in codes {
                println!("{code}");
            }
            Ok(())
        }
        Command::AddProduct {
            name,
            code,
            env,
            product_code,
            product_password,
        } => {
            let product = match (product_code, product_password) {
                (Some(product_code), Some(product_password)) => {
                    Product::with_credentials(name, &code, env, product_code, product_password)
                }
                _ => Product::provision(name, &code, env),
            };
            store
                .insert_product(product.clone())
                .context("inserting product")?;
            info!("Registered product {} ({})", product.name, env);
            println!("product_id={}", product.product_handle);
            println!("product_code={}", product.code);
            println!("product_password={}", product.password);
            Ok(())
        }
        Command::ResetKey { env, key } => {
            let code = KeyCode::parse(&key)?;
            store
                .reset_key(&code, env)
                .with_context(|| format!("resetting {code}"))?;
            info!("Reset key {} in {}", code, env);
            Ok(())
        }
    }
}

fn open_store(path: &Path) -> Result<SqliteStore> {
    if path == Path::new(":memory:") {
        warn!("Using an in-memory database; nothing will be persisted");
        return SqliteStore::open_in_memory().context("opening in-memory database");
    }
    SqliteStore::open(path).with_context(|| format!("opening database {}", path.display()))
}

fn secret(value: Option<String>, name: &str) -> Result<String> {
    value
        .filter(|v| !v.is_empty())
        .with_context(|| format!("{name} must be set to serve requests"))
}

async fn serve(args: ServeArgs, store: SqliteStore) -> Result<()> {
    let secrets = TokenSecrets::from_hex(
        &secret(args.token_key, "TOKEN_KEY")?,
        &secret(args.token_iv, "TOKEN_IV")?,
        &secret(args.token_magic, "TOKEN_MAGIC")?,
    )
    .context("invalid token secrets")?;

    let service = Arc::new(TrackingService::new(TokenCipher::new(secrets), store));
    let app = build_router(service);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("Tracking server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("HTTP server failed")?;

    info!("Tracking server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown requested"),
        Err(e) => {
            warn!("Cannot listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
