use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

use crate::annotator::{Annotator, build_prompt};
use crate::error::AnnotateError;
use scheduler::AnnotationRequest;

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    /// Transport-level cap; the executor applies its own, usually tighter,
    /// per-job timeout.
    pub http_timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com".into(),
            model: "gemini-2.0-flash".into(),
            api_key: None,
            http_timeout: Duration::from_secs(10),
        }
    }
}

/// Annotator backed by the Gemini `generateContent` REST endpoint.
#[derive(Clone)]
pub struct GenerativeAnnotator {
    http: Client,
    url: String,
    api_key: String,
}

impl GenerativeAnnotator {
    pub fn new(cfg: GeminiConfig) -> Result<Self, AnnotateError> {
        let api_key = cfg
            .api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or(AnnotateError::MissingApiKey)?;

        let http = Client::builder()
            .timeout(cfg.http_timeout)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()?;

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            cfg.endpoint.trim_end_matches('/'),
            cfg.model
        );

        Ok(Self { http, url, api_key })
    }
}

#[async_trait]
impl Annotator for GenerativeAnnotator {
    #[instrument(
        skip(self, req),
        fields(signal_id = %req.signal_id, instrument = %req.instrument),
        level = "debug"
    )]
    async fn annotate(&self, req: &AnnotationRequest) -> Result<String, AnnotateError> {
        let body = json!({
            "contents": [{ "parts": [{ "text": build_prompt(req) }] }]
        });

        let resp = self
            .http
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let parsed: GenerateResponse = resp.json().await?;
        let text = parsed.first_text().ok_or(AnnotateError::EmptyResponse)?;

        debug!(chars = text.len(), "annotation received");
        Ok(text)
    }
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
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateResponse {
    /// Text of the first candidate, parts joined, trimmed. Blank counts as none.
    fn first_text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> GenerateResponse {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn takes_first_candidate_text() {
        let r = parse(
            r#"{"candidates":[
                {"content":{"parts":[{"text":"Momentum faded "},{"text":"into the close."}],"role":"model"}},
                {"content":{"parts":[{"text":"ignored"}]}}
            ]}"#,
        );
        assert_eq!(r.first_text().as_deref(), Some("Momentum faded into the close."));
    }

    #[test]
    fn blank_or_missing_text_is_none() {
        assert!(parse(r#"{"candidates":[]}"#).first_text().is_none());
        assert!(parse(r#"{}"#).first_text().is_none());
        assert!(parse(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).first_text().is_none());
        assert!(
            parse(r#"{"candidates":[{"content":{"parts":[{"text":"  "}]}}]}"#)
                .first_text()
                .is_none()
        );
    }

    #[test]
    fn missing_key_is_rejected() {
        let err = GenerativeAnnotator::new(GeminiConfig::default()).err().unwrap();
        assert!(matches!(err, AnnotateError::MissingApiKey));

        let blank = GeminiConfig {
            api_key: Some("   ".into()),
            ..Default::default()
        };
        assert!(matches!(
            GenerativeAnnotator::new(blank),
            Err(AnnotateError::MissingApiKey)
        ));
    }

    #[test]
    fn url_targets_model() {
        let a = GenerativeAnnotator::new(GeminiConfig {
            endpoint: "http://localhost:9/".into(),
            api_key: Some("k".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            a.url,
            "http://localhost:9/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }
}
