//! Lists the models the configured key can use for a given generation method.

use anyhow::{anyhow, Context, Result};
use reqwest::Url;
use serde::Deserialize;
use tracing::debug;

use geoclue_core::config::ServiceConfig;

use crate::gemini::{http_client, API_KEY_HEADER};

pub const GENERATE_CONTENT: &str = "generateContent";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelPage {
    #[serde(default)]
    models: Vec<ModelInfo>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelInfo {
    name: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

/// Model names (`models/...`) supporting `method`, across every result page.
pub async fn list_models(service: &ServiceConfig, method: &str) -> Result<Vec<String>> {
    let api_key = service
        .resolved_api_key()
        .ok_or_else(|| anyhow!("no API key: set service.api_key, APP_SERVICE__API_KEY or GOOGLE_API_KEY"))?;
    let client = http_client(service)?;
    let base = format!("{}/models", service.api_base.trim_end_matches('/'));

    let mut names = Vec::new();
    let mut page_token: Option<String> = None;
    loop {
        let mut params = vec![("pageSize", "1000".to_string())];
        if let Some(token) = &page_token {
            params.push(("pageToken", token.clone()));
        }
        let url = Url::parse_with_params(&base, &params).with_context(|| format!("bad api_base '{}'", service.api_base))?;
        let response = client.get(url).header(API_KEY_HEADER, &api_key).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let snippet: String = body.chars().take(200).collect();
            return Err(anyhow!("model listing failed with HTTP {}: {}", status.as_u16(), snippet));
        }
        let (mut page, next) = parse_model_page(&body, method)?;
        debug!(count = page.len(), more = next.is_some(), "model page");
        names.append(&mut page);
        match next {
            Some(token) => page_token = Some(token),
            None => break,
        }
    }
    Ok(names)
}

pub(crate) fn parse_model_page(body: &str, method: &str) -> Result<(Vec<String>, Option<String>)> {
    let page: ModelPage = serde_json::from_str(body).context("unreadable model listing")?;
    let names = page
        .models
        .into_iter()
        .filter(|m| m.supported_generation_methods.iter().any(|g| g == method))
        .map(|m| m.name)
        .collect();
    Ok((names, page.next_page_token.filter(|t| !t.is_empty())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_models_supporting_the_method() {
        let body = r#"{
            "models": [
                {"name": "models/gemini-2.5-flash", "supportedGenerationMethods": ["generateContent", "countTokens"]},
                {"name": "models/text-embedding-004", "supportedGenerationMethods": ["embedContent"]},
                {"name": "models/aqa"}
            ],
            "nextPageToken": "abc"
        }"#;
        let (names, next) = parse_model_page(body, GENERATE_CONTENT).unwrap();
        assert_eq!(names, vec!["models/gemini-2.5-flash"]);
        assert_eq!(next.as_deref(), Some("abc"));

        let (names, _) = parse_model_page(body, "embedContent").unwrap();
        assert_eq!(names, vec!["models/text-embedding-004"]);
    }

    #[test]
    fn last_page_has_no_token() {
        let (names, next) = parse_model_page(r#"{"models": [], "nextPageToken": ""}"#, GENERATE_CONTENT).unwrap();
        assert!(names.is_empty());
        assert!(next.is_none());
        assert!(parse_model_page("{}", GENERATE_CONTENT).unwrap().1.is_none());
    }

    #[test]
    fn garbage_listing_is_an_error() {
        assert!(parse_model_page("<html/>", GENERATE_CONTENT).is_err());
    }
}
