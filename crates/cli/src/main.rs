//! Boutique CLI - Catalog, vote and cart tools.
//!
//! # Usage
//!
//! ```bash
//! # List products, optionally filtered by tag
//! boutique products --tag Summer
//!
//! # Print the tag universe
//! boutique tags
//!
//! # Upvote a product (use --delta -1 to take a vote back)
//! boutique vote Xq3v9dPz
//!
//! # Follow the catalog live until Ctrl+C
//! boutique watch
//!
//! # Price a cart
//! boutique quote --item sku-1:Red:M --item sku-1:Red:M --item sku-2
//! ```
//!
//! # Environment Variables
//!
//! - `FIREBASE_PROJECT_ID` - Firebase project (required)
//! - `FIREBASE_API_KEY` - Web API key
//! - `SENTRY_DSN` - Enables error tracking
//! - `RUST_LOG` - Log filter (defaults to info for the boutique crates)

#![cfg_attr(not(test), forbid(unsafe_code))]

use boutique_catalog::{CatalogConfig, CatalogState};
use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::CliError;

#[derive(Parser)]
#[command(name = "boutique")]
#[command(author, version, about = "Boutique catalog tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch and list products
    Products {
        /// Only show products with this tag
        #[arg(short, long)]
        tag: Option<String>,
    },
    /// Print every product tag, "All" first
    Tags,
    /// Add votes to a product
    Vote {
        /// Product document id
        id: String,

        /// Votes to add (negative to remove)
        #[arg(short, long, default_value_t = 1, allow_hyphen_values = true)]
        delta: i64,
    },
    /// Follow the catalog and print every update
    Watch {
        /// Only show products with this tag
        #[arg(short, long)]
        tag: Option<String>,
    },
    /// Build a cart and print its item count and total
    Quote {
        /// Cart item as productID[:color[:size]]; repeat to add more
        #[arg(short, long = "item", required = true)]
        items: Vec<String>,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &CatalogConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing() {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "boutique_catalog=info,boutique_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match CatalogConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing();
            tracing::error!("{}", CliError::from(e));
            std::process::exit(1);
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let sentry_guard = init_sentry(&config);
    init_tracing();

    let state = CatalogState::new(config);

    if let Err(e) = run(cli, &state).await {
        tracing::error!("Command failed: {e}");
        drop(sentry_guard);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, state: &CatalogState) -> Result<(), CliError> {
    match cli.command {
        Commands::Products { tag } => commands::products::run(state, tag.as_deref()).await,
        Commands::Tags => commands::tags::run(state).await,
        Commands::Vote { id, delta } => commands::vote::run(state, &id, delta).await,
        Commands::Watch { tag } => commands::watch::run(state, tag.as_deref()).await,
        Commands::Quote { items } => commands::quote::run(state, &items).await,
    }
}
