//! Binary entrypoint: load configuration, install logging and metrics, then poll the
//! feed on a fixed interval until Ctrl-C or SIGTERM.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio::sync::watch;

use news_relay::config::{Config, RelaySettings, Secrets};
use news_relay::pipeline::Pipeline;
use news_relay::{logging, scheduler, telemetry};

#[derive(Debug, Parser)]
#[command(name = "news-relay", version, about = "Relay new feed articles to Telegram")]
struct Cli {
    /// TOML file with relay settings (defaults to $RELAY_CONFIG_PATH or config/relay.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run the pipeline once and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load .env in local/dev; no-op when the file is absent.
    let dotenv = dotenvy::dotenv();

    let settings = match RelaySettings::load(cli.config.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("news-relay: invalid settings: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init_tracing(settings.log_file.as_deref()) {
        eprintln!("news-relay: failed to set up logging: {e:#}");
        return ExitCode::FAILURE;
    }
    if let Err(e) = dotenv {
        tracing::debug!(error = %e, "no .env file loaded");
    }

    let secrets = match Secrets::from_env() {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "required environment variable not set");
            return ExitCode::FAILURE;
        }
    };
    let config = Config { secrets, settings };

    if let Some(addr) = config.settings.metrics_addr.as_deref() {
        if let Err(e) = telemetry::install_prometheus(addr) {
            tracing::warn!(error = %e, "metrics exporter disabled");
        }
    }

    let client = match config.http_client() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "failed to build http client");
            return ExitCode::FAILURE;
        }
    };

    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        scheduler::shutdown_signal().await;
        let _ = tx.send(true);
    });

    let pipeline = Pipeline::from_config(&config, client, rx.clone());

    tracing::info!(
        feed = %config.settings.feed_url,
        checkpoint = %config.settings.checkpoint_path.display(),
        max_articles = config.settings.max_articles,
        "starting news relay"
    );

    if cli.once {
        return match pipeline.run_once_with_shutdown(&rx).await {
            Ok(report) => {
                tracing::info!(
                    delivered = report.delivered(),
                    stop = report.stop.as_str(),
                    "single run complete"
                );
                ExitCode::SUCCESS
            }
            Err(e) => {
                tracing::error!(error = %e, "run failed");
                pipeline.notify_failure(&e).await;
                ExitCode::FAILURE
            }
        };
    }

    scheduler::run_scheduler(&pipeline, config.settings.check_interval(), rx).await;
    ExitCode::SUCCESS
}
