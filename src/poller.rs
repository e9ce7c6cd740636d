//! The poll loop: one Venice request per interval until cancelled.

use crate::ai::{AiService, VeniceClient};
use crate::image::{DiskImageStore, ImageStore};
use crate::models::{Config, Credential, ImageRequest, PollMode};
use crate::Result;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info};

/// Repeatedly calls the AI service and handles each response.
pub struct Poller {
    api: Box<dyn AiService>,
    store: Box<dyn ImageStore>,
    settings: PollSettings,
}

/// Injectable service bundle used to construct [`Poller`] in tests/harnesses.
pub struct PollerServices {
    pub api: Box<dyn AiService>,
    pub store: Box<dyn ImageStore>,
}

/// Loop parameters taken from [`Config`].
#[derive(Debug, Clone)]
pub struct PollSettings {
    pub api_key: Option<String>,
    pub mode: PollMode,
    pub interval: Duration,
    pub image_request: ImageRequest,
}

impl From<&Config> for PollSettings {
    fn from(config: &Config) -> Self {
        Self {
            api_key: config.api_key.clone(),
            mode: config.mode,
            interval: config.poll_interval,
            image_request: config.image.clone(),
        }
    }
}

/// Counters reported when the loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    pub requests: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Result of one successful iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    ModelsListed(String),
    ImageSaved(PathBuf),
}

enum Fetched {
    Models(String),
    Image(Vec<u8>),
}

impl Poller {
    /// Build a poller from concrete service dependencies.
    pub fn with_services(services: PollerServices, settings: PollSettings) -> Self {
        Self {
            api: services.api,
            store: services.store,
            settings,
        }
    }

    /// Construct a poller talking to the real service, writing to disk.
    pub fn new(config: &Config) -> Result<Self> {
        let api = VeniceClient::new(config.request_timeout)?.with_base_url(&config.base_url);
        let store = DiskImageStore::new(&config.output_dir)
            .with_extension(config.image.file_extension());

        Ok(Self::with_services(
            PollerServices {
                api: Box::new(api),
                store: Box::new(store),
            },
            PollSettings::from(config),
        ))
    }

    /// Poll until `shutdown` becomes `true`.
    ///
    /// Returns an error only when the loop cannot start (no credential);
    /// failures inside an iteration are logged and the loop carries on.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<PollStats> {
        let credential = Credential::from_optional(self.settings.api_key.as_deref())
            .inspect_err(|e| error!("{}", e))?;

        info!(
            "Polling Venice every {:?} (mode: {:?})",
            self.settings.interval, self.settings.mode
        );

        let mut stats = PollStats::default();

        loop {
            if *shutdown.borrow() {
                break;
            }

            stats.requests += 1;
            let fetched = tokio::select! {
                biased;
                _ = shutdown_requested(&mut shutdown) => {
                    info!("Shutdown requested while waiting on Venice, abandoning request");
                    break;
                }
                fetched = self.fetch(&credential) => fetched,
            };

            // Not a cancellation point: a fetched image is always written out in full.
            let result = match fetched {
                Ok(fetched) => self.handle(fetched).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(_) => stats.succeeded += 1,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    stats.failed += 1;
                    error!("Error calling Venice API: {}", e);
                }
            }

            tokio::select! {
                biased;
                _ = shutdown_requested(&mut shutdown) => break,
                _ = tokio::time::sleep(self.settings.interval) => {}
            }
        }

        info!(
            "Poller stopped after {} requests ({} succeeded, {} failed)",
            stats.requests, stats.succeeded, stats.failed
        );
        Ok(stats)
    }

    /// Run a single iteration without the surrounding sleep.
    pub async fn poll_once(&self, credential: &Credential) -> Result<Outcome> {
        let fetched = self.fetch(credential).await?;
        self.handle(fetched).await
    }

    async fn fetch(&self, credential: &Credential) -> Result<Fetched> {
        match self.settings.mode {
            PollMode::Models => {
                debug!("Requesting model list");
                Ok(Fetched::Models(self.api.list_models(credential).await?))
            }
            PollMode::Image => {
                debug!("Requesting image for prompt: {}", self.settings.image_request.prompt);
                Ok(Fetched::Image(
                    self.api
                        .generate_image(credential, &self.settings.image_request)
                        .await?,
                ))
            }
        }
    }

    async fn handle(&self, fetched: Fetched) -> Result<Outcome> {
        match fetched {
            Fetched::Models(body) => {
                info!("Available Models: {}", body);
                Ok(Outcome::ModelsListed(body))
            }
            Fetched::Image(bytes) => {
                let path = self.store.save_image(&bytes).await?;
                info!("Saved generated image ({} bytes) to {}", bytes.len(), path.display());
                Ok(Outcome::ImageSaved(path))
            }
        }
    }
}

/// Resolves once shutdown is signalled. If the sender is gone nobody can
/// signal any more, so this never resolves.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}
