use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use venice_consumer::models::{Config, PollMode};
use venice_consumer::poller::Poller;

#[derive(Debug, Parser)]
#[command(name = "venice-consumer")]
#[command(about = "Poll the Venice AI API for models or generated images")]
struct CliArgs {
    /// Request to issue on every iteration.
    #[arg(long, value_enum)]
    mode: Option<PollMode>,

    /// Seconds to wait between requests.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    interval_secs: Option<u64>,

    /// Base URL of the API.
    #[arg(long)]
    base_url: Option<String>,

    /// Directory generated images are written to.
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Image model to request.
    #[arg(long)]
    model: Option<String>,

    /// Prompt for image generation.
    #[arg(long)]
    prompt: Option<String>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,
}

impl CliArgs {
    fn apply(self, config: &mut Config) {
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(secs) = self.interval_secs {
            config.poll_interval = Duration::from_secs(secs);
        }
        if let Some(base_url) = self.base_url {
            config.base_url = base_url;
        }
        if let Some(output_dir) = self.output_dir {
            config.output_dir = output_dir;
        }
        if let Some(model) = self.model {
            config.image.model = model;
        }
        if let Some(prompt) = self.prompt {
            config.image.prompt = prompt;
        }
        if self.width.is_some() {
            config.image.width = self.width;
        }
        if self.height.is_some() {
            config.image.height = self.height;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "venice_consumer=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting venice-consumer");

    let args = CliArgs::parse();

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    args.apply(&mut config);

    let poller = match Poller::new(&config) {
        Ok(poller) => poller,
        Err(e) => {
            error!("Failed to initialize poller: {}", e);
            std::process::exit(1);
        }
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl-C, shutting down");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    match poller.run(shutdown_rx).await {
        Ok(_) => {
            info!("Poller shut down cleanly");
            Ok(())
        }
        Err(e) => {
            error!("Poller stopped: {}", e);
            std::process::exit(1);
        }
    }
}
