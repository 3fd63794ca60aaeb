//! api-fetcher main entry point
//!
//! Command-line host that runs the fetcher as a background task until Ctrl-C.

use api_fetcher::config::{load_config_with_hash, Config};
use api_fetcher::fetcher::build_fetcher;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// api-fetcher: periodic multi-source HTTP fetcher
///
/// Polls every configured source on its own interval and hands each
/// response to its handler, one at a time.
#[derive(Parser, Debug)]
#[command(name = "api-fetcher")]
#[command(version)]
#[command(about = "Periodic multi-source HTTP fetcher", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be polled without fetching
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_run(config).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("api_fetcher=info,warn"),
            1 => EnvFilter::new("api_fetcher=debug,info"),
            2 => EnvFilter::new("api_fetcher=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the validated configuration
fn handle_dry_run(config: &Config) {
    println!("=== api-fetcher Dry Run ===\n");

    println!("Fetcher:");
    println!("  Queue capacity: {}", config.fetcher.queue_capacity);
    println!("  Fetch timeout: {}s", config.fetcher.fetch_timeout_secs);

    println!("\nHTTP:");
    println!("  User agent: {}", config.http.user_agent);
    println!("  Request timeout: {}s", config.http.request_timeout_secs);
    println!("  Connect timeout: {}s", config.http.connect_timeout_secs);
    println!(
        "  Retries: {} ({}ms apart)",
        config.http.max_retries, config.http.retry_delay_ms
    );

    println!("\nHandlers ({}):", config.handlers.len());
    for entry in &config.handlers {
        println!(
            "  - {} every {}s: {}",
            entry.name, entry.refresh_secs, entry.url
        );
    }

    println!("\n✓ Configuration is valid");
}

/// Runs the fetcher until Ctrl-C, then drains and exits
async fn handle_run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let fetcher = build_fetcher(&config)?;

    if fetcher.handler_count() == 0 {
        tracing::warn!("No handlers configured, nothing will be fetched");
    }

    let fetcher = Arc::new(fetcher);
    let mut worker = tokio::spawn({
        let fetcher = fetcher.clone();
        async move { fetcher.run().await }
    });

    tracing::info!("Started");

    let exited_early = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => tracing::info!("Got signal, shutting down"),
                Err(e) => tracing::error!("Failed to listen for shutdown signal: {}", e),
            }
            None
        }
        result = &mut worker => {
            tracing::warn!("Fetcher exited before shutdown was requested");
            Some(result)
        }
    };

    // A second Ctrl-C abandons the drain
    match fetcher.close_or_interrupt(second_signal()).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!("Got second signal, aborting in-flight work");
            worker.abort();
        }
        Err(e) => tracing::error!("Shutdown error: {}", e),
    }

    let result = match exited_early {
        Some(result) => result,
        None => worker.await,
    };

    match result {
        Ok(Ok(())) => {
            tracing::info!("Exited");
            Ok(())
        }
        Err(e) if e.is_cancelled() => {
            tracing::info!("Exited without draining");
            Ok(())
        }
        Ok(Err(e)) => {
            tracing::error!("Fetcher failed: {}", e);
            Err(e.into())
        }
        Err(e) => {
            tracing::error!("Fetcher task failed: {}", e);
            Err(e.into())
        }
    }
}

/// Resolves on the next Ctrl-C, or never if the signal cannot be watched
async fn second_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
