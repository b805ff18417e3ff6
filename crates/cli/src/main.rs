// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::io::IsTerminal;
use std::sync::Arc;

use clap::Parser;
use tracing::{debug, error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

use locus::client::Client;
use locus::config::{Cli, Command};
use locus::connect::SettleHook;
use locus::error::CandidateFailure;
use locus::prompt::{NonInteractive, Prompter, TerminalPrompter};

/// Targets that go quiet once a connect attempt settles.
const TRANSPORT_TARGETS: &[&str] = &["hyper", "reqwest", "rustls", "h2"];

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = cli.validate() {
        eprintln!("error: {e}");
        std::process::exit(2);
    }

    let settle = init_tracing(&cli);

    match run(cli, settle).await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            error!("fatal: {e:#}");
            std::process::exit(1);
        }
    }
}

/// Install the subscriber behind a reload handle and return the hook that
/// narrows transport logging.
fn init_tracing(cli: &Cli) -> SettleHook {
    let level = cli.log_level.clone();
    let filter = EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter, handle) = reload::Layer::new(filter);

    let registry = tracing_subscriber::registry().with(filter);
    match cli.log_format.as_str() {
        "json" => registry.with(fmt::layer().json().with_writer(std::io::stderr)).init(),
        _ => registry.with(fmt::layer().with_writer(std::io::stderr)).init(),
    }

    Arc::new(move || narrow_transport_logging(&handle, &level))
}

fn narrow_transport_logging(handle: &reload::Handle<EnvFilter, Registry>, level: &str) {
    let directives = TRANSPORT_TARGETS.iter().fold(level.to_owned(), |mut acc, target| {
        acc.push_str(&format!(",{target}=warn"));
        acc
    });
    match EnvFilter::try_new(&directives) {
        Ok(narrowed) => {
            if let Err(e) = handle.reload(narrowed) {
                debug!(err = %e, "could not narrow transport logging");
            }
        }
        Err(e) => debug!(err = %e, "could not build narrowed filter"),
    }
}

async fn run(cli: Cli, settle: SettleHook) -> anyhow::Result<()> {
    let args = cli.connect_args().clone();
    let prompter: Arc<dyn Prompter> =
        if std::io::stdin().is_terminal() { Arc::new(TerminalPrompter) } else { Arc::new(NonInteractive) };

    let client = Client::over_http(prompter, args.settings()?, args.fanout_timeout())
        .with_settle_hook(settle);
    let json = cli.log_format == "json";

    let (description, report) = client.connect(&args.request()?).await?;
    if report.auth_retries > 0 {
        debug!(retries = report.auth_retries, "connected after re-prompting credentials");
    }

    match cli.command {
        Command::Connect(_) => {
            if json {
                println!("{}", serde_json::to_string(&description)?);
            } else {
                println!("{description}");
            }
        }
        Command::ExportSharedConfig(cmd) => {
            let retrieved = client
                .shared_config()?
                .export(&cmd.file, Some(cmd.dir.as_path()), cmd.group.as_deref())
                .await?;
            report_failures(&retrieved.failures);
            match retrieved.saved_to {
                Some(path) => println!("{} exported to {}", retrieved.artifact.name, path.display()),
                None => println!(
                    "{} exported from {} ({} bytes)",
                    retrieved.artifact.name,
                    retrieved.locator,
                    retrieved.artifact.payload.len()
                ),
            }
        }
        Command::ImportSharedConfig(cmd) => {
            let imported = client.shared_config()?.import(&cmd.zip).await?;
            report_failures(&imported.failures);
            println!("{}", imported.message);
        }
        Command::FetchBundle(cmd) => {
            let retrieved = client
                .shared_config()?
                .fetch_bundle(&cmd.group, &cmd.name, Some(cmd.dir.as_path()))
                .await?;
            report_failures(&retrieved.failures);
            match retrieved.saved_to {
                Some(path) => println!("{} saved to {}", cmd.name, path.display()),
                None => println!("{} fetched from {}", cmd.name, retrieved.locator),
            }
        }
    }

    if let Some(previous) = client.disconnect() {
        info!(session = %previous.id, "disconnected");
    }
    Ok(())
}

fn report_failures(failures: &[CandidateFailure]) {
    for failure in failures {
        debug!(%failure, "locator did not answer first");
    }
}
