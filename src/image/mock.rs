use super::ImageStore;
use crate::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// In-memory [`ImageStore`] that records every payload it is handed.
#[derive(Clone)]
pub struct MockImageStore {
    saved: Arc<Mutex<Vec<Vec<u8>>>>,
    base_path: String,
    should_fail: Arc<Mutex<bool>>,
}

impl MockImageStore {
    pub fn new() -> Self {
        Self {
            saved: Arc::new(Mutex::new(Vec::new())),
            base_path: "/tmp".to_string(),
            should_fail: Arc::new(Mutex::new(false)),
        }
    }

    pub fn with_failure(self, should_fail: bool) -> Self {
        *self.should_fail.lock().unwrap() = should_fail;
        self
    }

    pub fn get_save_count(&self) -> usize {
        self.saved.lock().unwrap().len()
    }

    pub fn get_saved(&self) -> Vec<Vec<u8>> {
        self.saved.lock().unwrap().clone()
    }
}

impl Default for MockImageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageStore for MockImageStore {
    async fn save_image(&self, image_data: &[u8]) -> Result<PathBuf> {
        if *self.should_fail.lock().unwrap() {
            return Err(crate::Error::Io(std::io::Error::other("Mock failure")));
        }

        let mut saved = self.saved.lock().unwrap();
        saved.push(image_data.to_vec());

        Ok(PathBuf::from(&self.base_path).join(format!("generated_image_{}.png", saved.len())))
    }
}
