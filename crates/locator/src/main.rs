// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;
use tracing::error;

use locus_locator::config::LocatorConfig;

/// Reference locator for the locus control plane.
#[derive(Debug, Parser)]
#[command(name = "locus-locator", version, about)]
struct Cli {
    #[command(flatten)]
    config: LocatorConfig,

    /// Log format (json or text).
    #[arg(long, env = "LOCUS_LOCATOR_LOG_FORMAT", default_value = "json")]
    log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "LOCUS_LOCATOR_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = cli.config.validate() {
        eprintln!("error: {e}");
        std::process::exit(2);
    }

    init_tracing(&cli);

    if let Err(e) = locus_locator::run(cli.config).await {
        error!("fatal: {e:#}");
        std::process::exit(1);
    }
}

fn init_tracing(cli: &Cli) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    match cli.log_format.as_str() {
        "json" => {
            fmt::fmt().with_env_filter(filter).json().init();
        }
        _ => {
            fmt::fmt().with_env_filter(filter).init();
        }
    }
}
