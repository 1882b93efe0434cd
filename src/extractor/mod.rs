//! ReadingExtractor - vision-inference adapter
//!
//! ## Responsibilities
//!
//! - Send the captured image plus the instruction prompt to an
//!   OpenAI-compatible chat-completions endpoint
//! - Parse the dial value (or the `ERROR` sentinel) from the reply
//!
//! The prompt is a configuration asset: the default below matches the
//! 4+4-digit dial convention, but `READER_PROMPT` swaps it out for other
//! meter models. No retries here; the next scheduled cycle is the retry.

use crate::error::{Error, Result};
use crate::models::{CaptureImage, MeterReading};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use std::str::FromStr;
use std::time::Duration;

/// Token the model is instructed to return when the dial is unreadable
pub const SENTINEL: &str = "ERROR";

/// Default instruction prompt for 4+4-digit analog water meters.
pub const DEFAULT_PROMPT: &str = "Look very carefully at the photo of the water meter, \
zooming in where needed. The four black digits on white wheels are the whole cubic \
meters (m³), the integer part before the decimal point. The four digits indicated by \
the red pointers are the decimal digits after the point. Count the digits you see \
carefully: the last digit can be partly hidden behind a pointer. Read all 8 digits \
exactly and answer with only the meter reading on a single line, no extra words or \
unit, using a point as decimal separator in the format XXXX.YYYY (for example \
0123.4567). If one or more digits are unreadable or the photo is of insufficient \
quality to determine all eight digits reliably, answer exactly ERROR (capital \
letters, explanation allowed) — unless only the last digit is in doubt; that one is \
the least important, so estimate it instead.";

/// How the model's reply is turned into a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsePolicy {
    /// The whole response body is the numeric literal.
    Strict,
    /// Scan for a `Reading:` label and strip non-numeric characters.
    Lenient,
}

impl FromStr for ParsePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(ParsePolicy::Strict),
            "lenient" => Ok(ParsePolicy::Lenient),
            other => Err(format!("unknown parse policy: {other}")),
        }
    }
}

/// A successfully extracted reading plus the raw model reply
/// (published alongside the value for diagnostics).
#[derive(Debug, Clone)]
pub struct ExtractedReading {
    pub value: MeterReading,
    pub raw_response: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// Vision-inference client
pub struct ReadingExtractor {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    prompt: String,
    policy: ParsePolicy,
}

impl ReadingExtractor {
    pub fn new(
        base_url: String,
        api_key: String,
        model: String,
        prompt: Option<String>,
        policy: ParsePolicy,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            prompt: prompt.unwrap_or_else(|| DEFAULT_PROMPT.to_string()),
            policy,
        })
    }

    /// Send the image to the model and parse the dial value from the reply.
    pub async fn extract(&self, image: &CaptureImage) -> Result<ExtractedReading> {
        let url = format!("{}/chat/completions", self.base_url);
        let data_url = format!("data:{};base64,{}", image.mime_type, BASE64.encode(&image.data));

        let body = json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": self.prompt },
                    { "type": "image_url", "image_url": { "url": data_url } }
                ]
            }]
        });

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Extraction(format!("inference call failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let detail = resp.text().await.unwrap_or_default();
            return Err(Error::Extraction(format!(
                "inference call returned {status}: {detail}"
            )));
        }

        let reply: ChatResponse = resp
            .json()
            .await
            .map_err(|e| Error::Extraction(format!("malformed inference response: {e}")))?;

        let content = reply
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| Error::Extraction("inference response has no choices".to_string()))?;

        tracing::debug!(response = %content, "model replied");

        let value = parse_response(self.policy, &content)?;
        Ok(ExtractedReading {
            value,
            raw_response: content,
        })
    }
}

/// Parse the model reply into a reading according to the configured policy.
pub fn parse_response(policy: ParsePolicy, text: &str) -> Result<MeterReading> {
    match policy {
        ParsePolicy::Strict => parse_strict(text),
        ParsePolicy::Lenient => parse_lenient(text),
    }
}

fn parse_strict(text: &str) -> Result<MeterReading> {
    let body = text.trim();
    if body.contains(SENTINEL) {
        return Err(Error::Extraction(format!("model reported unreadable dial: {body}")));
    }
    let value: f64 = body
        .parse()
        .map_err(|_| Error::Extraction(format!("response is not a number: {body}")))?;
    MeterReading::new(value)
}

fn parse_lenient(text: &str) -> Result<MeterReading> {
    for line in text.lines() {
        let Some((_, rest)) = line.split_once("Reading:") else {
            continue;
        };
        let Some(token) = rest.split_whitespace().next() else {
            break;
        };
        let residual: String = token
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        if residual.is_empty() {
            return Err(Error::Extraction(format!(
                "no digits in reading field: {token}"
            )));
        }
        let value: f64 = residual
            .parse()
            .map_err(|_| Error::Extraction(format!("unparseable reading field: {residual}")))?;
        return MeterReading::new(value);
    }
    Err(Error::Extraction("no Reading: field in response".to_string()))
}

impl crate::orchestrator::ExtractorPort for ReadingExtractor {
    async fn extract(&self, image: &CaptureImage) -> Result<ExtractedReading> {
        ReadingExtractor::extract(self, image).await
    }
}
