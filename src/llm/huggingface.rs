//! HuggingFace Inference API clients.
//!
//! Embeddings go through the `feature-extraction` pipeline, generation through
//! the plain model endpoint (`text2text-generation` / `text-generation`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};

use super::provider::{Embedder, LanguageModel, LlmError};
use super::types::GenerationParams;
use crate::core::config::RagSettings;

#[derive(Clone)]
struct InferenceClient {
    base_url: String,
    token: Option<String>,
    client: Client,
}

impl InferenceClient {
    fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
            client,
        })
    }

    fn post(&self, path: &str) -> RequestBuilder {
        let request = self.client.post(format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, LlmError> {
        let res = self.post(path).json(body).send().await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(res.json::<Value>().await?)
    }
}

#[derive(Clone)]
pub struct HuggingFaceEmbedder {
    http: InferenceClient,
    model: String,
}

impl HuggingFaceEmbedder {
    pub fn new(
        base_url: &str,
        model: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            http: InferenceClient::new(base_url, token, timeout)?,
            model: model.to_string(),
        })
    }

    pub fn from_settings(settings: &RagSettings) -> Result<Self, LlmError> {
        Self::new(
            &settings.api_base,
            &settings.embedding_model,
            settings.hf_token.clone(),
            Duration::from_secs(settings.request_timeout_secs),
        )
    }
}

#[async_trait]
impl Embedder for HuggingFaceEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let path = format!("/pipeline/feature-extraction/{}", self.model);
        let payload = self
            .http
            .post_json(&path, &json!({ "inputs": inputs }))
            .await?;

        parse_embeddings(&payload, inputs.len())
    }
}

#[derive(Clone)]
pub struct HuggingFaceLlm {
    http: InferenceClient,
    model: String,
    params: GenerationParams,
}

impl HuggingFaceLlm {
    pub fn new(
        base_url: &str,
        model: &str,
        token: Option<String>,
        timeout: Duration,
        params: GenerationParams,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            http: InferenceClient::new(base_url, token, timeout)?,
            model: model.to_string(),
            params,
        })
    }

    pub fn from_settings(settings: &RagSettings) -> Result<Self, LlmError> {
        Self::new(
            &settings.api_base,
            &settings.llm_model,
            settings.hf_token.clone(),
            Duration::from_secs(settings.request_timeout_secs),
            GenerationParams {
                temperature: settings.temperature,
                max_length: settings.max_length,
            },
        )
    }
}

#[async_trait]
impl LanguageModel for HuggingFaceLlm {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let path = format!("/models/{}", self.model);
        let body = json!({
            "inputs": prompt,
            "parameters": {
                "temperature": self.params.temperature,
                "max_length": self.params.max_length,
            },
            "options": { "wait_for_model": true },
        });

        let payload = self.http.post_json(&path, &body).await?;
        parse_generation(&payload)
    }
}

fn number_row(value: &Value) -> Option<Vec<f32>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_f64().map(|f| f as f32))
        .collect()
}

/// Mean-pools token-level vectors into one sentence vector.
fn mean_pool(tokens: &[Value]) -> Option<Vec<f32>> {
    let rows: Vec<Vec<f32>> = tokens.iter().map(number_row).collect::<Option<_>>()?;
    let width = rows.first()?.len();
    if rows.iter().any(|row| row.len() != width) {
        return None;
    }

    let mut pooled = vec![0.0f32; width];
    for row in &rows {
        for (acc, value) in pooled.iter_mut().zip(row) {
            *acc += value;
        }
    }
    let count = rows.len() as f32;
    pooled.iter_mut().for_each(|v| *v /= count);
    Some(pooled)
}

fn parse_embeddings(payload: &Value, expected: usize) -> Result<Vec<Vec<f32>>, LlmError> {
    if let Some(message) = payload.get("error").and_then(Value::as_str) {
        return Err(LlmError::InvalidResponse(message.to_string()));
    }

    let items = payload
        .as_array()
        .ok_or_else(|| LlmError::InvalidResponse("embedding payload is not an array".to_string()))?;

    // A single input may come back as a bare vector.
    if expected == 1 {
        if let Some(vector) = number_row(payload) {
            return Ok(vec![vector]);
        }
    }

    let embeddings = items
        .iter()
        .map(|item| {
            number_row(item).or_else(|| item.as_array().and_then(|tokens| mean_pool(tokens)))
        })
        .collect::<Option<Vec<Vec<f32>>>>()
        .ok_or_else(|| LlmError::InvalidResponse("embedding rows are not numeric".to_string()))?;

    if embeddings.len() != expected {
        return Err(LlmError::InvalidResponse(format!(
            "expected {} embeddings, got {}",
            expected,
            embeddings.len()
        )));
    }

    Ok(embeddings)
}

fn parse_generation(payload: &Value) -> Result<String, LlmError> {
    if let Some(message) = payload.get("error").and_then(Value::as_str) {
        return Err(LlmError::InvalidResponse(message.to_string()));
    }

    let first = match payload {
        Value::Array(items) => items.first(),
        Value::Object(_) => Some(payload),
        _ => None,
    };

    first
        .and_then(|item| item.get("generated_text"))
        .and_then(Value::as_str)
        .map(|text| text.trim().to_string())
        .ok_or_else(|| LlmError::InvalidResponse("missing generated_text".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Json as JsonBody;
    use axum::http::HeaderMap;
    use axum::routing::post;
    use axum::{Json, Router};
    use tokio::net::TcpListener;

    async fn serve(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn parses_sentence_level_embeddings() {
        let payload = json!([[1.0, 0.0], [0.5, 0.5]]);

        let parsed = parse_embeddings(&payload, 2).unwrap();

        assert_eq!(parsed, vec![vec![1.0, 0.0], vec![0.5, 0.5]]);
    }

    #[test]
    fn mean_pools_token_level_embeddings() {
        let payload = json!([[[1.0, 0.0], [3.0, 2.0]]]);

        let parsed = parse_embeddings(&payload, 1).unwrap();

        assert_eq!(parsed, vec![vec![2.0, 1.0]]);
    }

    #[test]
    fn rejects_count_mismatch_and_error_payloads() {
        assert!(parse_embeddings(&json!([[1.0]]), 2).is_err());
        assert!(parse_embeddings(&json!({ "error": "Model is loading" }), 1).is_err());
        assert!(parse_embeddings(&json!([["a"]]), 1).is_err());
    }

    #[test]
    fn parses_generation_shapes() {
        assert_eq!(
            parse_generation(&json!([{ "generated_text": " Paris " }])).unwrap(),
            "Paris"
        );
        assert_eq!(
            parse_generation(&json!({ "generated_text": "Rome" })).unwrap(),
            "Rome"
        );
        assert!(parse_generation(&json!([])).is_err());
        assert!(parse_generation(&json!({ "error": "rate limited" })).is_err());
    }

    #[tokio::test]
    async fn clients_send_token_and_parameters() {
        let router = Router::new()
            .route(
                "/pipeline/feature-extraction/*model",
                post(|headers: HeaderMap, JsonBody(body): JsonBody<Value>| async move {
                    assert_eq!(
                        headers.get("authorization").and_then(|v| v.to_str().ok()),
                        Some("Bearer hf_test")
                    );
                    let count = body["inputs"].as_array().map(Vec::len).unwrap_or(0);
                    Json(json!(vec![vec![0.25, 0.75]; count]))
                }),
            )
            .route(
                "/models/*model",
                post(|JsonBody(body): JsonBody<Value>| async move {
                    assert_eq!(body["parameters"]["max_length"], 256);
                    assert_eq!(body["parameters"]["temperature"], 0.5);
                    Json(json!([{ "generated_text": format!("echo: {}", body["inputs"].as_str().unwrap_or("")) }]))
                }),
            );
        let base = serve(router).await;
        let settings = RagSettings {
            api_base: base,
            hf_token: Some("hf_test".to_string()),
            ..RagSettings::default()
        };

        let embedder = HuggingFaceEmbedder::from_settings(&settings).unwrap();
        let vectors = embedder
            .embed(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![0.25, 0.75], vec![0.25, 0.75]]);

        let llm = HuggingFaceLlm::from_settings(&settings).unwrap();
        assert_eq!(llm.generate("hi").await.unwrap(), "echo: hi");
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let router = Router::new().route(
            "/models/*model",
            post(|| async { (axum::http::StatusCode::SERVICE_UNAVAILABLE, "loading") }),
        );
        let base = serve(router).await;
        let llm = HuggingFaceLlm::new(
            &base,
            "google/flan-t5-base",
            None,
            Duration::from_secs(5),
            GenerationParams::default(),
        )
        .unwrap();

        let result = llm.generate("hi").await;

        assert!(matches!(result, Err(LlmError::Status { status: 503, .. })));
    }
}
