//! Hamlet CLI - village business directory from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Prepare the local cache database
//! hamlet migrate
//!
//! # Reconcile the cache against the remote and show what happened
//! hamlet sync
//!
//! # List businesses (optionally one category)
//! hamlet list
//! hamlet list -c cat-grocery
//!
//! # Ask in plain language
//! hamlet search "who delivers vegetables at home?"
//!
//! # Curate listings (requires HAMLET_ADMIN_EMAIL / HAMLET_ADMIN_PASSWORD)
//! hamlet business add -c cat-grocery -n "Lakshmi Stores" -o Lakshmi -p 9876543210
//! hamlet business delete <id>
//!
//! # Aggregated usage views
//! hamlet stats
//! ```
//!
//! # Commands
//!
//! - `migrate` - Open the cache database and run pending migrations
//! - `sync` - Run the staleness check / full refresh
//! - `list` - Show cached businesses
//! - `search` - AI-assisted natural-language search
//! - `business` - Admin mutations (add/update/delete)
//! - `stats` - Popular searches/businesses, conversion rate, live count
//! - `clear-cache` - Drop every cached record and the version descriptor

#![cfg_attr(not(test), forbid(unsafe_code))]
// Terminal output is this binary's product
#![allow(clippy::print_stdout)]

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::Context;

#[derive(Parser)]
#[command(name = "hamlet")]
#[command(author, version, about = "Hamlet village directory CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the cache database and run pending migrations
    Migrate,
    /// Reconcile the local cache against the remote
    Sync,
    /// List cached businesses
    List {
        /// Only businesses in this category
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Ask the directory a question in plain language
    Search {
        /// The question
        query: String,
    },
    /// Curate business listings (admin)
    Business {
        #[command(subcommand)]
        action: commands::business::BusinessAction,
    },
    /// Show aggregated usage views
    Stats,
    /// Drop every cached record and the version descriptor
    ClearCache,
}

#[tokio::main]
async fn main() {
    // Initialize tracing with EnvFilter; default to info for our crates
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "hamlet=info,hamlet_directory=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> hamlet_directory::Result<()> {
    let ctx = Context::init().await?;

    match cli.command {
        Commands::Migrate => {
            // Opening the store already ran pending migrations
            println!("cache database ready at {}", ctx.config.database_path().display());
            println!("device {}", ctx.identity.device_id);
        }
        Commands::Sync => commands::sync::run(&ctx).await,
        Commands::List { category } => commands::sync::list(&ctx, category.as_deref()).await,
        Commands::Search { query } => commands::search::run(&ctx, &query).await,
        Commands::Business { action } => commands::business::run(&ctx, action).await?,
        Commands::Stats => commands::stats::run(&ctx).await?,
        Commands::ClearCache => {
            ctx.sync.store().clear().await?;
            println!("cache cleared");
        }
    }

    // Best-effort final drain of anything still queued
    ctx.tracker.batcher().shutdown().await;
    Ok(())
}
