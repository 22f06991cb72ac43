//! Pocket Cart CLI - Inspect and edit a persisted cart.
//!
//! # Usage
//!
//! ```bash
//! # Show the cart
//! pocket-cart show
//!
//! # Add a product
//! pocket-cart add --id 1 --title "Cadeira Rivatti" --image-url https://img/1.jpg --price 400
//!
//! # Adjust quantities
//! pocket-cart increment 1
//! pocket-cart decrement 1
//!
//! # Use a different data directory
//! pocket-cart --data-dir /tmp/cart show
//! ```
//!
//! # Commands
//!
//! - `show` - Print the cart and its totals
//! - `add` - Add a product or bump its quantity
//! - `increment` / `decrement` - Adjust the quantity of a cart line

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pocket_cart_core::{ItemId, NewItem};
use pocket_cart_store::CartConfig;
use rust_decimal::Decimal;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::cart::CartAction;

#[derive(Parser)]
#[command(name = "pocket-cart")]
#[command(author, version, about = "Pocket Cart command-line client")]
struct Cli {
    /// Directory holding the persisted cart (overrides `CART_DATA_DIR`)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the cart and its totals
    Show,
    /// Add a product, or bump its quantity if it is already in the cart
    Add {
        /// Product id
        #[arg(long)]
        id: String,

        /// Product title
        #[arg(long)]
        title: String,

        /// Product image URL
        #[arg(long, default_value = "")]
        image_url: String,

        /// Unit price (e.g. 19.90)
        #[arg(long)]
        price: Decimal,
    },
    /// Increase the quantity of a cart line by one
    Increment {
        /// Product id
        id: String,
    },
    /// Decrease the quantity of a cart line by one, removing it at zero
    Decrement {
        /// Product id
        id: String,
    },
}

impl From<Commands> for CartAction {
    fn from(command: Commands) -> Self {
        match command {
            Commands::Show => Self::Show,
            Commands::Add {
                id,
                title,
                image_url,
                price,
            } => Self::Add(NewItem::new(id, title, image_url, price)),
            Commands::Increment { id } => Self::Increment(ItemId::new(id)),
            Commands::Decrement { id } => Self::Decrement(ItemId::new(id)),
        }
    }
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &CartConfig) -> Option<sentry::ClientInitGuard> {
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

/// Initialize tracing with `EnvFilter` and the Sentry layer.
///
/// Logs go to stderr so the rendered cart on stdout stays clean.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "pocket_cart_store=warn,pocket_cart_cli=warn".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
#[allow(clippy::print_stdout)]
async fn main() {
    let cli = Cli::parse();

    let config = CartConfig::from_env().expect("Failed to load configuration");
    let config = match cli.data_dir {
        Some(dir) => config.with_data_dir(dir),
        None => config,
    };

    // Sentry must be initialized before the tracing subscriber
    let sentry_guard = init_sentry(&config);
    init_tracing();

    match commands::cart::run(&config, cli.command.into()).await {
        Ok(output) => print!("{output}"),
        Err(e) => {
            let event_id = sentry::capture_error(&e);
            tracing::error!(error = %e, sentry_event_id = %event_id, "Command failed");
            // Flush pending Sentry events before exiting
            drop(sentry_guard);
            std::process::exit(1);
        }
    }
}
