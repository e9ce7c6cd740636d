//! Data models and structures
//!
//! Defines the credential, the image generation payloads exchanged with the
//! Venice API, and the worker configuration.

use crate::{Error, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.venice.ai";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_OUTPUT_DIR: &str = "Images";
pub const DEFAULT_IMAGE_MODEL: &str = "fluently-xl";
pub const DEFAULT_IMAGE_PROMPT: &str = "A lighthouse on a cliff at dusk, waves crashing below";

/// Bearer token used to authenticate against the AI service.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(Error::MissingCredential);
        }
        Ok(Self(token))
    }

    /// Resolve an optional configured token, treating absence as fatal.
    pub fn from_optional(token: Option<&str>) -> Result<Self> {
        token.map_or(Err(Error::MissingCredential), Self::new)
    }

    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

// Keep the token out of logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Which request the poller issues on every iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum PollMode {
    /// List available models and log the response.
    #[default]
    Models,
    /// Generate an image and write it to disk.
    Image,
}

impl FromStr for PollMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "models" => Ok(PollMode::Models),
            "image" => Ok(PollMode::Image),
            other => Err(Error::Config(format!(
                "Invalid poll mode '{}'. Expected 'models' or 'image'",
                other
            ))),
        }
    }
}

/// Request body for `POST /api/v1/image/generate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRequest {
    pub model: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub safe_mode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hide_watermark: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style_preset: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cfg_scale: Option<f32>,
    pub return_binary: bool,
}

impl ImageRequest {
    /// A request for the raw image bytes with every optional left to the
    /// service defaults.
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            width: None,
            height: None,
            safe_mode: None,
            hide_watermark: None,
            style_preset: None,
            negative_prompt: None,
            format: None,
            cfg_scale: None,
            return_binary: true,
        }
    }

    /// File extension for images produced by this request.
    pub fn file_extension(&self) -> &str {
        match self.format.as_deref() {
            Some("jpeg") | Some("jpg") => "jpg",
            Some("webp") => "webp",
            _ => "png",
        }
    }
}

impl Default for ImageRequest {
    fn default() -> Self {
        Self::new(DEFAULT_IMAGE_MODEL, DEFAULT_IMAGE_PROMPT)
    }
}

/// JSON response returned when `return_binary` is false.
#[derive(Debug, Deserialize)]
pub struct ImageGenerationResponse {
    #[serde(default)]
    pub images: Vec<String>,
}

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub base_url: String,
    pub mode: PollMode,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub output_dir: PathBuf,
    pub image: ImageRequest,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            mode: PollMode::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            image: ImageRequest::default(),
        }
    }
}

impl Config {
    /// Load configuration from the environment (and `.env` when present).
    ///
    /// A missing `AI_AUTH_KEY` is not an error here; the poller reports it
    /// when it starts so that no request is ever issued without one.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let mut image = ImageRequest::new(
            var("IMAGE_MODEL").unwrap_or(defaults.image.model),
            var("IMAGE_PROMPT").unwrap_or(defaults.image.prompt),
        );
        image.width = var("IMAGE_WIDTH")
            .map(|v| parse_number("IMAGE_WIDTH", &v))
            .transpose()?;
        image.height = var("IMAGE_HEIGHT")
            .map(|v| parse_number("IMAGE_HEIGHT", &v))
            .transpose()?;
        image.format = var("IMAGE_FORMAT");

        Ok(Self {
            api_key: var("AI_AUTH_KEY"),
            base_url: var("AI_BASE_URL").unwrap_or(defaults.base_url),
            mode: var("POLL_MODE")
                .map(|v| v.parse::<PollMode>())
                .transpose()?
                .unwrap_or(defaults.mode),
            poll_interval: var("POLL_INTERVAL_SECS")
                .map(|v| parse_secs("POLL_INTERVAL_SECS", &v))
                .transpose()?
                .unwrap_or(defaults.poll_interval),
            request_timeout: var("REQUEST_TIMEOUT_SECS")
                .map(|v| parse_secs("REQUEST_TIMEOUT_SECS", &v))
                .transpose()?
                .unwrap_or(defaults.request_timeout),
            output_dir: var("IMAGE_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            image,
        })
    }
}

fn parse_number(key: &str, value: &str) -> Result<u32> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{} must be a positive integer, got '{}'", key, value)))
}

fn parse_secs(key: &str, value: &str) -> Result<Duration> {
    match parse_number(key, value)? {
        0 => Err(Error::Config(format!("{} must be greater than zero", key))),
        secs => Ok(Duration::from_secs(u64::from(secs))),
    }
}
