//! Gemini `generateContent` client.
//!
//! A blocking client: every call runs on a blocking worker thread under the
//! stage runner, which owns retries and key rotation. This module only maps
//! one HTTP exchange onto a text result or a classified error.
//!
//! Status mapping:
//! - 401, 403, 429: the key was refused ([`Error::CredentialRejected`]).
//! - everything else that is not a 2xx, timeouts, connection failures,
//!   unparsable bodies and empty answers: [`Error::TransientRemote`].

use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use base64::Engine;
use reqwest::StatusCode;
use scribeflow_common::{Credential, Error, Result};
use serde::Deserialize;
use serde_json::json;

use crate::config::InferenceConfig;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const API_KEY_HEADER: &str = "x-goog-api-key";
const MAX_ERROR_BODY: usize = 300;

// ---------------------------------------------------------------------------
// Wire types (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Audio sent inline with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineAudio {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl InlineAudio {
    /// Read an audio file, guessing the mime type from its extension.
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Ok(Self {
            mime_type: audio_mime_type(path).to_string(),
            data,
        })
    }
}

/// Mime type for an audio file extension.
pub fn audio_mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "m4a" | "mp4" => "audio/mp4",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "aac" => "audio/aac",
        "ogg" | "oga" => "audio/ogg",
        "flac" => "audio/flac",
        _ => "application/octet-stream",
    }
}

/// Blocking client for the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    config: InferenceConfig,
    http: OnceLock<reqwest::blocking::Client>,
}

impl GeminiClient {
    pub fn new(config: InferenceConfig) -> Self {
        Self {
            config,
            http: OnceLock::new(),
        }
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// Endpoint URL for the configured model.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    // The blocking client owns a runtime, so it is built on first use from a
    // blocking thread rather than in the constructor.
    fn http(&self) -> Result<&reqwest::blocking::Client> {
        if let Some(client) = self.http.get() {
            return Ok(client);
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .build()
            .map_err(|e| Error::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(self.http.get_or_init(|| client))
    }

    /// Send one prompt, optionally with inline audio, and return the text.
    ///
    /// Must not be called from an async context.
    pub fn generate(
        &self,
        credential: &Credential,
        prompt: &str,
        audio: Option<&InlineAudio>,
    ) -> Result<String> {
        let mut parts = vec![json!({ "text": prompt })];
        if let Some(audio) = audio {
            parts.push(json!({
                "inline_data": {
                    "mime_type": audio.mime_type,
                    "data": base64::engine::general_purpose::STANDARD.encode(&audio.data),
                }
            }));
        }

        let body = json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": {
                "temperature": self.config.temperature,
                "maxOutputTokens": self.config.max_output_tokens,
            }
        });

        tracing::debug!(
            model = %self.config.model,
            key = %credential,
            audio = audio.is_some(),
            "Sending generateContent request"
        );

        let resp = self
            .http()?
            .post(self.endpoint())
            .header(API_KEY_HEADER, credential.expose())
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    Error::transient(format!("request timed out: {e}"))
                } else {
                    Error::transient(format!("request failed: {e}"))
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().unwrap_or_default();
            return Err(classify_status(status, credential, &text));
        }

        let parsed: GenerateResponse = resp
            .json()
            .map_err(|e| Error::transient(format!("unparsable response: {e}")))?;

        let text = response_text(&parsed);
        if text.trim().is_empty() {
            return Err(Error::transient("empty response"));
        }
        Ok(text)
    }
}

fn classify_status(status: StatusCode, credential: &Credential, body: &str) -> Error {
    let snippet: String = body.trim().chars().take(MAX_ERROR_BODY).collect();
    let message = format!("HTTP {status}: {snippet}");
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
            Error::rejected(credential.hint(), message)
        }
        _ => Error::transient(message),
    }
}

/// Concatenate the non-thought text parts of the first candidate.
fn response_text(resp: &GenerateResponse) -> String {
    resp.candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .filter(|p| !p.thought)
                .filter_map(|p| p.text.as_deref())
                .collect::<String>()
        })
        .unwrap_or_default()
}
