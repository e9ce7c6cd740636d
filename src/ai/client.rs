use super::AiService;
use crate::models::{Credential, ImageGenerationResponse, ImageRequest, DEFAULT_BASE_URL};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;

const MODELS_PATH: &str = "/api/v1/models";
const IMAGE_GENERATE_PATH: &str = "/api/v1/image/generate";

/// HTTP client for the Venice REST API.
pub struct VeniceClient {
    client: Client,
    base_url: String,
}

impl VeniceClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::new_with_client(client))
    }

    pub fn new_with_client(client: Client) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder, credential: &Credential) -> Result<Response> {
        let response = request
            .header("Authorization", credential.bearer_header())
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send request to Venice: {}", e);
                e
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            tracing::error!("Venice API error (status {}): {}", status, error_text);
            return Err(Error::Api {
                status: status.as_u16(),
                body: error_text,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl AiService for VeniceClient {
    async fn list_models(&self, credential: &Credential) -> Result<String> {
        tracing::debug!("Requesting model list from Venice");

        let response = self
            .send(self.client.get(self.url(MODELS_PATH)), credential)
            .await?;

        Ok(response.text().await?)
    }

    async fn generate_image(
        &self,
        credential: &Credential,
        request: &ImageRequest,
    ) -> Result<Vec<u8>> {
        tracing::debug!("Sending image generation request to Venice");

        let response = self
            .send(
                self.client.post(self.url(IMAGE_GENERATE_PATH)).json(request),
                credential,
            )
            .await?;

        if request.return_binary {
            return Ok(response.bytes().await?.to_vec());
        }

        let body = response.text().await?;
        let parsed: ImageGenerationResponse = serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse Venice image response: {}\nBody: {}", e, body);
            e
        })?;

        let encoded = parsed
            .images
            .first()
            .ok_or_else(|| Error::Payload("No image data in Venice response".to_string()))?;

        use base64::Engine as _;
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| Error::Payload(format!("Failed to decode base64 image: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> VeniceClient {
        VeniceClient::new(Duration::from_secs(5))
            .unwrap()
            .with_base_url(server.uri())
    }

    fn credential() -> Credential {
        Credential::new("test-key").unwrap()
    }

    #[tokio::test]
    async fn test_list_models_returns_body_verbatim() {
        let server = MockServer::start().await;
        let body = r#"{"object":"list","data":[{"id":"fluently-xl","type":"image"}]}"#;

        Mock::given(method("GET"))
            .and(path("/api/v1/models"))
            .and(header("Authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(1)
            .mount(&server)
            .await;

        let models = client_for(&server).list_models(&credential()).await.unwrap();
        assert_eq!(models, body);
    }

    #[tokio::test]
    async fn test_list_models_non_success_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/models"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .list_models(&credential())
            .await
            .unwrap_err();
        match err {
            Error::Api { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "invalid key");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_generate_image_posts_request_and_returns_binary_body() {
        let server = MockServer::start().await;
        let fake_image = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0xFF];

        let mut request = ImageRequest::new("fluently-xl", "a lighthouse");
        request.width = Some(512);
        request.height = Some(512);

        Mock::given(method("POST"))
            .and(path("/api/v1/image/generate"))
            .and(header("Authorization", "Bearer test-key"))
            .and(body_json(serde_json::json!({
                "model": "fluently-xl",
                "prompt": "a lighthouse",
                "width": 512,
                "height": 512,
                "return_binary": true
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(fake_image.clone(), "image/png"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let bytes = client_for(&server)
            .generate_image(&credential(), &request)
            .await
            .unwrap();
        assert_eq!(bytes, fake_image);
    }

    #[tokio::test]
    async fn test_generate_image_decodes_json_response() {
        let server = MockServer::start().await;

        use base64::Engine as _;
        let fake_image = vec![1, 2, 3, 4, 5];
        let b64 = base64::engine::general_purpose::STANDARD.encode(&fake_image);

        Mock::given(method("POST"))
            .and(path("/api/v1/image/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "generate-123",
                "images": [b64]
            })))
            .mount(&server)
            .await;

        let mut request = ImageRequest::default();
        request.return_binary = false;

        let bytes = client_for(&server)
            .generate_image(&credential(), &request)
            .await
            .unwrap();
        assert_eq!(bytes, fake_image);
    }

    #[tokio::test]
    async fn test_generate_image_json_response_without_images() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/image/generate"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "images": [] })),
            )
            .mount(&server)
            .await;

        let mut request = ImageRequest::default();
        request.return_binary = false;

        let err = client_for(&server)
            .generate_image(&credential(), &request)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Payload(_)));
    }

    #[tokio::test]
    async fn test_generate_image_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/image/generate"))
            .respond_with(ResponseTemplate::new(500).set_body_string("server error"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .generate_image(&credential(), &ImageRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Api { status: 500, .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = VeniceClient::new_with_client(Client::new())
            .with_base_url("http://localhost:8080/");
        assert_eq!(
            client.url(MODELS_PATH),
            "http://localhost:8080/api/v1/models"
        );
    }
}
