//! AI service integration for model listing and image generation
//!
//! Provides the interface to the Venice API used by the poller, plus a mock
//! for tests and harnesses.

pub mod client;
pub mod mock;

pub use client::VeniceClient;
pub use mock::MockAiClient;

use crate::models::{Credential, ImageRequest};
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait AiService: Send + Sync {
    /// Fetch the model listing, returned as the raw response body.
    async fn list_models(&self, credential: &Credential) -> Result<String>;

    /// Run one image generation job and return the image bytes.
    async fn generate_image(
        &self,
        credential: &Credential,
        request: &ImageRequest,
    ) -> Result<Vec<u8>>;
}
