use anyhow::{anyhow, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use geoclue_core::config::ServiceConfig;
use geoclue_core::error::Error;
use geoclue_core::traits::ClueExtractor;
use geoclue_core::types::{has_evidence, ClueHints, ExtractedClues, ImageInput};

use crate::gemini::{http_client, model_path, API_KEY_HEADER};

const VISIBLE_TEXT: &str = "visible_text";
const LANGUAGE_GUESS: &str = "language_guess";
const CITY_NAMES: &str = "city_names";

/// Screenshot-to-clues extractor backed by Gemini `generateContent`.
pub struct GeminiClueExtractor {
    client: Client,
    api_base: String,
    api_key: String,
    model: String,
    prompt: String,
}

impl GeminiClueExtractor {
    pub fn new(service: &ServiceConfig, categories: &[String]) -> Result<Self> {
        let api_key = service
            .resolved_api_key()
            .ok_or_else(|| anyhow!("no API key: set service.api_key, APP_SERVICE__API_KEY or GOOGLE_API_KEY"))?;
        Ok(Self {
            client: http_client(service)?,
            api_base: service.api_base.trim_end_matches('/').to_string(),
            api_key,
            model: model_path(&service.vision_model),
            prompt: build_prompt(categories),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", self.api_base, self.model)
    }
}

#[async_trait]
impl ClueExtractor for GeminiClueExtractor {
    async fn extract(&self, image: &ImageInput) -> Result<ExtractedClues, Error> {
        let body = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![
                    RequestPart::Text { text: &self.prompt },
                    RequestPart::InlineData {
                        inline_data: InlineData { mime_type: &image.mime_type, data: BASE64.encode(&image.bytes) },
                    },
                ],
            }],
            generation_config: GenerationConfig { response_mime_type: "application/json" },
        };
        debug!(model = %self.model, bytes = image.bytes.len(), "clue extraction request");
        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::ExtractionUnavailable(e.to_string()))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| Error::ExtractionUnavailable(e.to_string()))?;
        if !status.is_success() {
            let snippet: String = text.chars().take(200).collect();
            return Err(Error::ExtractionUnavailable(format!("HTTP {}: {}", status.as_u16(), snippet)));
        }
        parse_clues(&response_text(&text)?)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text {
        text: &'a str,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Concatenated text parts of the first candidate.
fn response_text(body: &str) -> Result<String, Error> {
    let parsed: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| Error::ExtractionUnavailable(format!("unreadable response: {}", e)))?;
    let text: String = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(Error::ExtractionUnavailable("response carried no text".into()));
    }
    Ok(text)
}

/// Parse the model's JSON answer. Markdown fences are tolerated and
/// non-string values are treated as absent.
pub(crate) fn parse_clues(raw: &str) -> Result<ExtractedClues, Error> {
    let cleaned = strip_fences(raw);
    let map: Map<String, Value> = serde_json::from_str(cleaned)
        .map_err(|e| Error::ExtractionUnavailable(format!("clue JSON did not parse: {}", e)))?;

    let mut clues = ExtractedClues::default();
    for (key, value) in map {
        let Value::String(value) = value else { continue };
        match key.as_str() {
            VISIBLE_TEXT => clues.hints.visible_text = hint(value),
            LANGUAGE_GUESS => clues.hints.language_guess = hint(value),
            CITY_NAMES => clues.hints.city_names = hint(value),
            _ => {
                clues.descriptions.insert(key, value);
            }
        }
    }
    Ok(clues)
}

fn hint(value: String) -> Option<String> {
    has_evidence(&value).then(|| value.trim().to_string())
}

fn strip_fences(raw: &str) -> &str {
    let s = raw.trim();
    let s = s.strip_prefix("```json").or_else(|| s.strip_prefix("```")).unwrap_or(s);
    s.strip_suffix("```").unwrap_or(s).trim()
}

fn category_guidance(category: &str) -> String {
    match category {
        "pole_type" => "Utility poles (material, shape, insulators)".to_string(),
        "bollard_type" => "Bollards (shape, colors, reflector)".to_string(),
        "road_lines" => "Road lines (color, pattern)".to_string(),
        "plates" => "License plates (color, shape)".to_string(),
        other => other.replace('_', " "),
    }
}

pub(crate) fn build_prompt(categories: &[String]) -> String {
    let mut prompt = String::from("Analyze this street-level screenshot.\n\nPART 1: VISUAL META\n");
    prompt.push_str("Describe these features in technical detail if visible:\n");
    for category in categories {
        prompt.push_str(&format!("- {}\n", category_guidance(category)));
    }
    prompt.push_str(
        "\nPART 2: TEXT & LANGUAGE\n\
         - Transcribe any visible text (signs, billboards, shopfronts).\n\
         - Identify the language or script (e.g. \"Thai\", \"Cyrillic\", \"Polish\").\n\
         - Extract any potential city or region names found in the text.\n\n\
         Return a JSON object with these string fields, using \"None\" for anything not visible:\n{\n",
    );
    for category in categories {
        prompt.push_str(&format!("    \"{}\": \"description...\",\n", category));
    }
    prompt.push_str(&format!(
        "    \"{}\": \"transcribed text\",\n    \"{}\": \"language name\",\n    \"{}\": \"city names\"\n}}\n",
        VISIBLE_TEXT, LANGUAGE_GUESS, CITY_NAMES
    ));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fenced_json_is_parsed_and_hints_split_out() {
        let raw = "```json\n{\"pole_type\": \"wooden pole, two crossbars\", \"plates\": \"None\", \
                   \"visible_text\": \"ul. Długa\", \"language_guess\": \"Polish\", \"city_names\": \"none\", \
                   \"confidence\": 0.4}\n```";
        let clues = parse_clues(raw).unwrap();
        assert_eq!(clues.descriptions.get("pole_type").map(String::as_str), Some("wooden pole, two crossbars"));
        assert_eq!(clues.descriptions.get("plates").map(String::as_str), Some("None"));
        assert!(!clues.descriptions.contains_key("confidence"), "non-string values dropped");
        assert_eq!(clues.hints.visible_text.as_deref(), Some("ul. Długa"));
        assert_eq!(clues.hints.language_guess.as_deref(), Some("Polish"));
        assert_eq!(clues.hints.city_names, None);
    }

    #[test]
    fn non_json_answer_is_extraction_unavailable() {
        let err = parse_clues("I cannot see any poles here.").unwrap_err();
        assert!(matches!(err, Error::ExtractionUnavailable(_)));
    }

    #[test]
    fn response_text_joins_first_candidate_parts() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"{\"pole_type\":"},{"text":"\"x\"}"}]}}]}"#;
        assert_eq!(response_text(body).unwrap(), "{\"pole_type\":\"x\"}");
        assert!(response_text(r#"{"candidates":[]}"#).is_err());
    }

    #[test]
    fn prompt_lists_every_scored_category() {
        let cats = vec!["pole_type".to_string(), "sign_shape".to_string()];
        let prompt = build_prompt(&cats);
        assert!(prompt.contains("\"pole_type\""));
        assert!(prompt.contains("\"sign_shape\""));
        assert!(prompt.contains("- sign shape"));
        assert!(prompt.contains("\"visible_text\""));
    }
}
