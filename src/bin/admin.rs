//! CLI administration tool for shortlink.
//!
//! Runs the same services as the HTTP server against the configured database
//! and Redis instance, without going through the HTTP API.
//!
//! # Usage
//!
//! ```bash
//! # Run one reconciliation sweep now
//! cargo run --bin admin -- reconcile
//!
//! # List links (optionally only disabled ones)
//! cargo run --bin admin -- links list --disabled true
//!
//! # Toggle a link
//! cargo run --bin admin -- links disable promo
//! cargo run --bin admin -- links enable promo
//!
//! # Delete a link with its statistics
//! cargo run --bin admin -- links delete promo -y
//!
//! # Check database connection
//! cargo run --bin admin -- db check
//! ```
//!
//! # Environment Variables
//!
//! Same as the server: `DATABASE_URL` (or `DB_*`), `REDIS_URL` (or `REDIS_*`).
//! `reconcile`, `links enable`, `links disable` and `links delete` read or clear
//! the shared counters and refuse to run unless Redis is configured and reachable.

use shortlink::config::{self, Config};
use shortlink::domain::entities::LinkFilter;
use shortlink::infrastructure::persistence::{PgLinkRepository, PgStatsRepository};
use shortlink::server::{Stores, build_stores, connect_database, connect_redis_stores};
use shortlink::state::{AppState, StateParts};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Confirm;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::mpsc;

/// CLI tool for managing shortlink.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level command groups.
#[derive(Subcommand)]
enum Commands {
    /// Run one reconciliation sweep
    Reconcile,

    /// Manage short links
    Links {
        #[command(subcommand)]
        action: LinkAction,
    },

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

#[derive(Subcommand)]
enum LinkAction {
    /// List links, newest first
    List {
        #[arg(short, long, default_value_t = 1)]
        page: i64,

        #[arg(short, long, default_value_t = 20)]
        size: i64,

        /// Only links with this disabled flag
        #[arg(short, long)]
        disabled: Option<bool>,
    },

    /// Enable a link and restore its counters
    Enable { code: String },

    /// Disable a link after flushing its counters
    Disable { code: String },

    /// Delete a link with its statistics
    Delete {
        code: String,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

/// Database operation subcommands.
#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,

    /// Show database info
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = config::load_from_env().context("Failed to load configuration")?;
    let pool = connect_database(&config).await?;

    match cli.command {
        Commands::Reconcile => reconcile(&build_state(&config, &pool, true).await?).await?,
        Commands::Links { action } => {
            let needs_counters = !matches!(action, LinkAction::List { .. });
            let state = build_state(&config, &pool, needs_counters).await?;
            handle_link_action(action, &state).await?
        }
        Commands::Db { action } => handle_db_action(action, &pool).await?,
    }

    Ok(())
}

/// Wires the services without starting the visit worker or scheduler.
///
/// With `needs_counters` only the Redis stores are accepted.
async fn build_state(config: &Config, pool: &PgPool, needs_counters: bool) -> Result<AppState> {
    let pool = Arc::new(pool.clone());
    let Stores { cache, counters, .. } = if needs_counters {
        connect_redis_stores(config.redis_url.as_deref(), config.counter_ttl_seconds)
            .await
            .context("This command needs the shared Redis counters")?
    } else {
        build_stores(config).await
    };
    let (visit_sender, _) = mpsc::channel(1);

    Ok(AppState::new(StateParts {
        link_repository: Arc::new(PgLinkRepository::new(pool.clone())),
        stats_repository: Arc::new(PgStatsRepository::new(pool)),
        cache,
        counters,
        visit_sender,
        resolver: config.resolver_settings(),
        reconcile: config.reconcile_settings(),
        behind_proxy: config.behind_proxy,
    }))
}

async fn reconcile(state: &AppState) -> Result<()> {
    println!("{}", "Running reconciliation sweep...".bright_blue().bold());

    let report = state
        .reconcile_service
        .sweep()
        .await
        .map_err(|e| anyhow::anyhow!("Reconciliation failed: {}", e))?;

    println!();
    println!("  Synced:  {}", report.synced.to_string().bright_green().bold());
    println!("  Skipped: {}", report.skipped.to_string().bright_black());
    if report.failed > 0 {
        println!("  Failed:  {}", report.failed.to_string().red().bold());
    } else {
        println!("  Failed:  {}", "0".bright_black());
    }
    println!();

    Ok(())
}

async fn handle_link_action(action: LinkAction, state: &AppState) -> Result<()> {
    match action {
        LinkAction::List {
            page,
            size,
            disabled,
        } => list_links(state, page, size, disabled).await?,
        LinkAction::Enable { code } => set_disabled(state, &code, false).await?,
        LinkAction::Disable { code } => set_disabled(state, &code, true).await?,
        LinkAction::Delete { code, yes } => delete_link(state, &code, yes).await?,
    }

    Ok(())
}

/// Lists links in a table.
///
/// ```text
///   ID    Code                 HTTP  Status     PV         UV         Target
///   ───────────────────────────────────────────────────────────────────────────
///   7     promo                302   ENABLED    10         3          https://example.com/a
/// ```
async fn list_links(state: &AppState, page: i64, size: i64, disabled: Option<bool>) -> Result<()> {
    let filter = LinkFilter {
        disabled,
        ..LinkFilter::default()
    };

    let result = state
        .link_service
        .list(filter, page, size)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to list links: {}", e))?;

    if result.items.is_empty() {
        println!("{}", "  No links found".yellow());
        return Ok(());
    }

    println!(
        "  {:<5} {:<20} {:<5} {:<10} {:<10} {:<10} {}",
        "ID".bright_white().bold(),
        "Code".bright_white().bold(),
        "HTTP".bright_white().bold(),
        "Status".bright_white().bold(),
        "PV".bright_white().bold(),
        "UV".bright_white().bold(),
        "Target".bright_white().bold()
    );
    println!("  {}", "─".repeat(90).bright_black());

    for link in &result.items {
        let status = if link.disabled {
            "DISABLED".red()
        } else {
            "ENABLED".green()
        };

        println!(
            "  {:<5} {:<20} {:<5} {:<10} {:<10} {:<10} {}",
            link.id.to_string().bright_black(),
            link.short_code.cyan(),
            link.redirect_code,
            status,
            link.total_pv,
            link.total_uv,
            link.target_url
        );
    }

    println!();
    println!(
        "  Page {} of {} ({} links)",
        result.page,
        result.total_pages(),
        result.total.to_string().bright_white().bold()
    );
    println!();

    Ok(())
}

async fn set_disabled(state: &AppState, code: &str, disabled: bool) -> Result<()> {
    let link = state
        .link_service
        .get_by_code(code)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    let link = state
        .sync_service
        .set_disabled(link.id, disabled)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to update link: {}", e))?;

    let verb = if disabled { "disabled" } else { "enabled" };
    println!(
        "{} (PV {}, UV {})",
        format!("Link {} {}", link.short_code, verb).green().bold(),
        link.total_pv,
        link.total_uv
    );

    Ok(())
}

async fn delete_link(state: &AppState, code: &str, skip_confirm: bool) -> Result<()> {
    let link = state
        .link_service
        .get_by_code(code)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    println!("  Code:   {}", link.short_code.cyan());
    println!("  Target: {}", link.target_url);
    println!("  PV/UV:  {}/{}", link.total_pv, link.total_uv);
    println!();

    if !skip_confirm {
        let confirmed = Confirm::new()
            .with_prompt("Delete this link and all of its statistics?")
            .default(false)
            .interact()?;

        if !confirmed {
            println!("{}", "Cancelled".red());
            return Ok(());
        }
    }

    state
        .sync_service
        .delete_link(link.id)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to delete link: {}", e))?;

    println!("{}", "Link deleted".green().bold());

    Ok(())
}

/// Handles database diagnostic commands.
async fn handle_db_action(action: DbAction, pool: &PgPool) -> Result<()> {
    match action {
        DbAction::Check => {
            println!("{}", "Checking database connection...".bright_blue());

            sqlx::query("SELECT 1").fetch_one(pool).await?;

            println!("{}", "Database connection OK".green().bold());
        }
        DbAction::Info => {
            let version: String = sqlx::query_scalar("SELECT version()")
                .fetch_one(pool)
                .await?;
            let links: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM short_links")
                .fetch_one(pool)
                .await?;
            let daily_rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM daily_stats")
                .fetch_one(pool)
                .await?;

            println!("  PostgreSQL:  {}", version.bright_white());
            println!("  Links:       {}", links.to_string().bright_green().bold());
            println!("  Daily rows:  {}", daily_rows.to_string().bright_green().bold());
            println!();
        }
    }

    Ok(())
}
