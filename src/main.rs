//! Parlay quote service entry point.

use std::net::SocketAddr;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use parlay_quotes::api::{create_router, AppState};
use parlay_quotes::config::{Config, VERBOSE_LOG_FILTER};
use parlay_quotes::market::{fetch_orderbook, IdKind};
use parlay_quotes::metrics;
use parlay_quotes::parlay::{compute_fair_value, FairValueRequest};
use parlay_quotes::utils::shutdown_signal;

/// Polymarket quote aggregation and parlay pricing service.
#[derive(Parser, Debug)]
#[command(name = "parlay-quotes")]
#[command(about = "Quote aggregation, order-book id resolution and parlay fair value for Polymarket")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API (default).
    Serve {
        /// HTTP server port; overrides PORT.
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Resolve a URL, raw id, market id or event slug to a CLOB book id.
    Resolve {
        /// Event URL or raw id.
        input: Option<String>,

        /// Aggregator or platform market id.
        #[arg(long, conflicts_with_all = ["input", "event_slug"])]
        market_id: Option<String>,

        /// Event slug.
        #[arg(long, conflicts_with = "input")]
        event_slug: Option<String>,
    },

    /// Print the normalized order book for an id.
    Book {
        /// Token or asset id.
        id: String,

        /// Id namespace; tries every known path when omitted.
        #[arg(long)]
        kind: Option<IdKind>,
    },

    /// Price a parlay.
    FairValue {
        /// YES/NO per leg, e.g. `true,false`.
        #[arg(long, value_delimiter = ',', required = true)]
        outcomes: Vec<bool>,

        /// YES probability per leg.
        #[arg(long, value_delimiter = ',')]
        probs: Option<Vec<f64>>,

        /// Correlation adjustment in [-0.5, 0.5].
        #[arg(long, allow_negative_numbers = true)]
        covariance: Option<f64>,

        /// Market ids per leg.
        #[arg(long, value_delimiter = ',')]
        base_markets: Vec<String>,
    },

    /// Check configuration validity.
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging; RUST_LOG / VERBOSE come from the environment or .env
    let filter = match Config::load() {
        _ if args.verbose => EnvFilter::new(VERBOSE_LOG_FILTER),
        Ok(config) => EnvFilter::try_new(config.log_filter()).unwrap_or_else(|_| EnvFilter::new("info")),
        Err(_) => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let registry = tracing_subscriber::registry().with(filter);
    if args.json_logs {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }

    // Handle subcommands
    match args.command {
        Some(Command::Serve { port }) => cmd_serve(port).await,
        Some(Command::Resolve {
            input,
            market_id,
            event_slug,
        }) => cmd_resolve(input, market_id, event_slug).await,
        Some(Command::Book { id, kind }) => cmd_book(&id, kind).await,
        Some(Command::FairValue {
            outcomes,
            probs,
            covariance,
            base_markets,
        }) => cmd_fair_value(FairValueRequest {
            base_markets,
            outcomes,
            probs,
            covariance,
        }),
        Some(Command::CheckConfig) => cmd_check_config(),
        None => cmd_serve(None).await,
    }
}

/// Load and validate configuration.
fn load_config() -> anyhow::Result<Config> {
    let config = Config::load().context("Configuration load failed")?;

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(anyhow::anyhow!("Configuration validation failed: {}", e));
    }

    Ok(config)
}

/// Run the HTTP API until Ctrl-C / SIGTERM.
async fn cmd_serve(port_override: Option<u16>) -> anyhow::Result<()> {
    let config = load_config()?;
    let port = port_override.unwrap_or(config.port);

    info!("Configuration loaded successfully");
    info!("CLOB: {} ({}/min)", config.polymarket_api, config.clob_rate_limit);
    info!("Polyrouter: {} ({}/min)", config.polyrouter_base, config.polyrouter_rate_limit);

    let mut state = AppState::from_config(&config)?;
    match metrics::install_prometheus() {
        Ok(handle) => state = state.with_prometheus(handle),
        Err(e) => warn!("Prometheus recorder not installed: {}", e),
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

/// Resolve one reference and print the result as JSON.
async fn cmd_resolve(
    input: Option<String>,
    market_id: Option<String>,
    event_slug: Option<String>,
) -> anyhow::Result<()> {
    let config = load_config()?;
    metrics::init_metrics();
    let state = AppState::from_config(&config)?;

    let result = match (market_id, event_slug, input) {
        (Some(market_id), _, _) => state.resolver.resolve_by_market_id(&market_id).await?,
        (None, Some(slug), _) => state.resolver.resolve_by_event_slug(&slug).await?,
        (None, None, Some(input)) => state.resolver.resolve(&input).await,
        (None, None, None) => anyhow::bail!("provide an input, --market-id or --event-slug"),
    };

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

/// Fetch one book and print it as JSON.
async fn cmd_book(id: &str, kind: Option<IdKind>) -> anyhow::Result<()> {
    let config = load_config()?;
    metrics::init_metrics();
    let state = AppState::from_config(&config)?;

    let book = fetch_orderbook(state.exchange.as_ref(), id, kind).await?;
    println!("{}", serde_json::to_string_pretty(&book)?);
    Ok(())
}

/// Price a parlay and print the result as JSON.
fn cmd_fair_value(request: FairValueRequest) -> anyhow::Result<()> {
    let result = compute_fair_value(&request);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

/// Check configuration validity.
fn cmd_check_config() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("PARLAY QUOTES - CONFIGURATION CHECK");
    println!("======================================================================");

    // Load configuration
    print!("Loading configuration... ");
    let config = match Config::load() {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    // Validate configuration
    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    // Show configuration summary
    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Port: {}", config.port);
    println!("  CLOB API: {}", config.polymarket_api);
    println!("  CLOB Rate Limit: {}/min", config.clob_rate_limit);
    println!("  Polyrouter: {}", config.polyrouter_base);
    println!("  Polyrouter Rate Limit: {}/min", config.polyrouter_rate_limit);
    println!(
        "  Polyrouter API Key: {}",
        if config.has_polyrouter_key() { "Set" } else { "MISSING" }
    );
    println!("  HTTP Timeout: {}ms", config.http_timeout_ms);
    println!("  Quote Cache TTL: {}ms", config.quote_cache_ttl_ms);
    println!("  Resolve Cache TTL: {}ms", config.resolve_cache_ttl_ms);
    println!("  Log Filter: {}", config.log_filter());
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}
