use super::AiService;
use crate::models::{Credential, ImageRequest};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Scripted [`AiService`] for tests. Clones share their counters, so a clone
/// kept outside the poller works as a probe.
#[derive(Clone)]
pub struct MockAiClient {
    models_responses: Arc<Mutex<Vec<String>>>,
    image_responses: Arc<Mutex<Vec<Vec<u8>>>>,
    error_status: Arc<Mutex<Option<u16>>>,
    delay: Option<Duration>,
    call_count: Arc<Mutex<usize>>,
    credentials_seen: Arc<Mutex<Vec<String>>>,
    requests_seen: Arc<Mutex<Vec<ImageRequest>>>,
}

impl MockAiClient {
    pub fn new() -> Self {
        Self {
            models_responses: Arc::new(Mutex::new(Vec::new())),
            image_responses: Arc::new(Mutex::new(Vec::new())),
            error_status: Arc::new(Mutex::new(None)),
            delay: None,
            call_count: Arc::new(Mutex::new(0)),
            credentials_seen: Arc::new(Mutex::new(Vec::new())),
            requests_seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_models_response(self, response: String) -> Self {
        self.models_responses.lock().unwrap().push(response);
        self
    }

    pub fn with_image_response(self, response: Vec<u8>) -> Self {
        self.image_responses.lock().unwrap().push(response);
        self
    }

    /// Make every call fail as if the service answered with `status`.
    pub fn with_error_status(self, status: u16) -> Self {
        *self.error_status.lock().unwrap() = Some(status);
        self
    }

    /// Hold every call open for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    /// Bearer headers observed, one per call.
    pub fn get_credentials_seen(&self) -> Vec<String> {
        self.credentials_seen.lock().unwrap().clone()
    }

    pub fn get_requests_seen(&self) -> Vec<ImageRequest> {
        self.requests_seen.lock().unwrap().clone()
    }

    /// Record the call and return its 1-based index.
    fn record(&self, credential: &Credential) -> usize {
        self.credentials_seen
            .lock()
            .unwrap()
            .push(credential.bearer_header());
        let mut count = self.call_count.lock().unwrap();
        *count += 1;
        *count
    }

    async fn respond<T: Clone>(
        &self,
        call: usize,
        responses: &Mutex<Vec<T>>,
        fallback: T,
    ) -> Result<T> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(status) = *self.error_status.lock().unwrap() {
            return Err(Error::Api {
                status,
                body: "mock failure".to_string(),
            });
        }

        let responses = responses.lock().unwrap();
        if responses.is_empty() {
            Ok(fallback)
        } else {
            Ok(responses[(call - 1) % responses.len()].clone())
        }
    }
}

impl Default for MockAiClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AiService for MockAiClient {
    async fn list_models(&self, credential: &Credential) -> Result<String> {
        let call = self.record(credential);
        self.respond(
            call,
            &self.models_responses,
            r#"{"object":"list","data":[]}"#.to_string(),
        )
        .await
    }

    async fn generate_image(
        &self,
        credential: &Credential,
        request: &ImageRequest,
    ) -> Result<Vec<u8>> {
        let call = self.record(credential);
        self.requests_seen.lock().unwrap().push(request.clone());
        self.respond(
            call,
            &self.image_responses,
            // PNG signature
            vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A],
        )
        .await
    }
}
