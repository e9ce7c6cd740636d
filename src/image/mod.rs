//! Local persistence for generated images
//!
//! Writes image bytes returned by the AI service to uniquely named files
//! under the configured output directory.

pub mod mock;
pub mod store;

pub use mock::MockImageStore;
pub use store::DiskImageStore;

use crate::Result;
use async_trait::async_trait;
use std::path::PathBuf;

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Persist `image_data` verbatim and return the path it was written to.
    async fn save_image(&self, image_data: &[u8]) -> Result<PathBuf>;
}
