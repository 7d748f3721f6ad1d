use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::asr::error::{AsrError, AsrResult};
use crate::config_manager::asr::InferenceServiceConfig;

/// One chunk of audio for a model hosted on the model server
#[derive(Debug, Serialize)]
pub struct InferenceRequest<'a> {
    pub model: &'a str,
    /// Runtime the server should use ("tensorrt" or "onnxruntime")
    pub runtime: &'a str,
    /// Lets the server keep per-stream context between chunks
    pub session_id: &'a str,
    pub sample_rate: u32,
    pub samples: &'a [f32],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceResponse {
    /// One row per output frame
    #[serde(default)]
    pub logits: Vec<Vec<f32>>,
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Runs acoustic models on behalf of the streaming engines
pub trait InferenceClient: Send + Sync {
    fn infer(&self, request: &InferenceRequest<'_>) -> AsrResult<Vec<Vec<f32>>>;

    fn health_check(&self) -> AsrResult<bool>;
}

#[derive(Debug, Clone)]
pub struct HttpInferenceClient {
    client: Client,
    base_url: String,
}

impl HttpInferenceClient {
    pub fn new(config: &InferenceServiceConfig) -> AsrResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl InferenceClient for HttpInferenceClient {
    fn infer(&self, request: &InferenceRequest<'_>) -> AsrResult<Vec<Vec<f32>>> {
        let url = format!("{}/asr/infer", self.base_url);
        trace!("POST {} ({} samples)", url, request.samples.len());

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()?
            .error_for_status()?;
        let result: InferenceResponse = response.json()?;

        if !result.success {
            return Err(AsrError::Inference(
                result
                    .error
                    .unwrap_or_else(|| format!("model server rejected {}", request.model)),
            ));
        }
        Ok(result.logits)
    }

    fn health_check(&self) -> AsrResult<bool> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send()?;
        Ok(response.status().is_success())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // The blocking client must be built and dropped off the async runtime
    fn client_for(uri: &str) -> HttpInferenceClient {
        HttpInferenceClient::new(&InferenceServiceConfig {
            base_url: format!("{}/", uri),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn infer_posts_chunk_and_returns_logits() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/asr/infer"))
            .and(body_partial_json(serde_json::json!({
                "model": "vad_marblenet",
                "runtime": "tensorrt",
                "sample_rate": 16000
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "logits": [[0.2, 0.8]],
                "success": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let uri = server.uri();
        let logits = tokio::task::spawn_blocking(move || {
            client_for(&uri).infer(&InferenceRequest {
                model: "vad_marblenet",
                runtime: "tensorrt",
                session_id: "s1",
                sample_rate: 16000,
                samples: &[0.0; 4],
            })
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(logits, vec![vec![0.2, 0.8]]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unsuccessful_response_is_an_inference_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/asr/infer"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": false,
                "error": "engine not loaded"
            })))
            .mount(&server)
            .await;

        let uri = server.uri();
        let result = tokio::task::spawn_blocking(move || {
            client_for(&uri).infer(&InferenceRequest {
                model: "quartznet",
                runtime: "onnxruntime",
                session_id: "s1",
                sample_rate: 16000,
                samples: &[0.0; 4],
            })
        })
        .await
        .unwrap();

        match result {
            Err(AsrError::Inference(message)) => assert_eq!(message, "engine not loaded"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn health_check_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let uri = server.uri();
        let healthy = tokio::task::spawn_blocking(move || client_for(&uri).health_check())
            .await
            .unwrap()
            .unwrap();
        assert!(!healthy);
    }
}
