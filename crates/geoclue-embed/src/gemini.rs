//! Gemini `batchEmbedContents` client.
//!
//! Rate limiting, timeouts, connection failures and 5xx responses are reported
//! as `EmbedError::Transient`; rejected requests and unreadable bodies as
//! `EmbedError::Permanent`.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use geoclue_core::config::ServiceConfig;
use geoclue_core::error::EmbedError;
use geoclue_core::traits::{EmbedMode, Embedder};

pub(crate) const API_KEY_HEADER: &str = "x-goog-api-key";

pub struct GeminiEmbedder {
    client: Client,
    api_base: String,
    api_key: String,
    model: String,
    id: String,
}

impl GeminiEmbedder {
    pub fn new(service: &ServiceConfig, model: &str) -> Result<Self> {
        let api_key = service
            .resolved_api_key()
            .ok_or_else(|| anyhow!("no API key: set service.api_key, APP_SERVICE__API_KEY or GOOGLE_API_KEY"))?;
        let model = model_path(model);
        Ok(Self {
            client: http_client(service)?,
            api_base: service.api_base.trim_end_matches('/').to_string(),
            api_key,
            id: format!("gemini:{}", model),
            model,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:batchEmbedContents", self.api_base, self.model)
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    fn embedder_id(&self) -> &str {
        &self.id
    }

    async fn embed_batch(&self, texts: &[String], mode: EmbedMode) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let body = build_request(&self.model, texts, mode);
        debug!(model = %self.model, count = texts.len(), ?mode, "embedding request");
        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;
        let status = response.status();
        let text = response.text().await.map_err(from_reqwest)?;
        if !status.is_success() {
            return Err(classify_status(status, &text));
        }
        parse_response(&text, texts.len())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: TextContent<'a>,
    task_type: &'static str,
}

#[derive(Debug, Serialize)]
struct TextContent<'a> {
    parts: Vec<TextPart<'a>>,
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

fn task_type(mode: EmbedMode) -> &'static str {
    match mode {
        EmbedMode::Document => "RETRIEVAL_DOCUMENT",
        EmbedMode::Query => "RETRIEVAL_QUERY",
    }
}

pub(crate) fn build_request<'a>(model: &'a str, texts: &'a [String], mode: EmbedMode) -> BatchEmbedRequest<'a> {
    BatchEmbedRequest {
        requests: texts
            .iter()
            .map(|text| EmbedContentRequest {
                model,
                content: TextContent { parts: vec![TextPart { text }] },
                task_type: task_type(mode),
            })
            .collect(),
    }
}

pub(crate) fn parse_response(body: &str, expected: usize) -> Result<Vec<Vec<f32>>, EmbedError> {
    let parsed: BatchEmbedResponse = serde_json::from_str(body)
        .map_err(|e| EmbedError::Permanent(format!("unreadable embedding response: {}", e)))?;
    if parsed.embeddings.len() != expected {
        return Err(EmbedError::Permanent(format!(
            "embedding service returned {} vectors for {} inputs",
            parsed.embeddings.len(),
            expected
        )));
    }
    Ok(parsed.embeddings.into_iter().map(|e| e.values).collect())
}

pub(crate) fn classify_status(status: StatusCode, body: &str) -> EmbedError {
    let snippet: String = body.chars().take(200).collect();
    let msg = format!("HTTP {}: {}", status.as_u16(), snippet);
    if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::REQUEST_TIMEOUT || status.is_server_error() {
        EmbedError::Transient(msg)
    } else {
        EmbedError::Permanent(msg)
    }
}

pub(crate) fn from_reqwest(e: reqwest::Error) -> EmbedError {
    if e.is_decode() || e.is_builder() {
        EmbedError::Permanent(e.to_string())
    } else {
        EmbedError::Transient(e.to_string())
    }
}

pub(crate) fn http_client(service: &ServiceConfig) -> Result<Client> {
    Ok(Client::builder().timeout(service.request_timeout()).build()?)
}

/// Model ids are addressed as `models/<name>`; accept the bare name too.
pub(crate) fn model_path(model: &str) -> String {
    let model = model.trim();
    if model.starts_with("models/") { model.to_string() } else { format!("models/{}", model) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_carries_one_entry_per_text_with_task_type() {
        let texts = vec!["wooden pole".to_string(), "yellow plate".to_string()];
        let req = build_request("models/text-embedding-004", &texts, EmbedMode::Document);
        let json = serde_json::to_value(&req).unwrap();
        let requests = json["requests"].as_array().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0]["model"], "models/text-embedding-004");
        assert_eq!(requests[0]["taskType"], "RETRIEVAL_DOCUMENT");
        assert_eq!(requests[1]["content"]["parts"][0]["text"], "yellow plate");

        let req = build_request("models/text-embedding-004", &texts[..1], EmbedMode::Query);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["requests"][0]["taskType"], "RETRIEVAL_QUERY");
    }

    #[test]
    fn response_vectors_keep_input_order() {
        let body = r#"{"embeddings": [{"values": [0.1, 0.2]}, {"values": [0.3, -0.4]}]}"#;
        let out = parse_response(body, 2).unwrap();
        assert_eq!(out, vec![vec![0.1f32, 0.2], vec![0.3f32, -0.4]]);
    }

    #[test]
    fn wrong_vector_count_is_permanent() {
        let body = r#"{"embeddings": [{"values": [0.1, 0.2]}]}"#;
        let err = parse_response(body, 2).unwrap_err();
        assert!(!err.is_transient());
    }

    #[test]
    fn garbage_body_is_permanent() {
        let err = parse_response("<html>oops</html>", 1).unwrap_err();
        assert!(matches!(err, EmbedError::Permanent(_)));
    }

    #[test]
    fn status_classification() {
        assert!(classify_status(StatusCode::TOO_MANY_REQUESTS, "quota").is_transient());
        assert!(classify_status(StatusCode::SERVICE_UNAVAILABLE, "").is_transient());
        assert!(!classify_status(StatusCode::BAD_REQUEST, "bad").is_transient());
        assert!(!classify_status(StatusCode::FORBIDDEN, "key").is_transient());
    }

    #[test]
    fn bare_model_names_get_prefixed() {
        assert_eq!(model_path("text-embedding-004"), "models/text-embedding-004");
        assert_eq!(model_path("models/text-embedding-004"), "models/text-embedding-004");
    }
}
