//! LLM analysis and reply generation
//!
//! Two collaborators sit behind traits so the orchestrator can be tested
//! without network access: the analysis engine scores a reel's relevance and
//! extracts topics, the reply engine drafts a candidate comment. Both are
//! backed by the same OpenAI-compatible chat-completions client in
//! production.
//!
//! Responses are parsed leniently: a missing score defaults to mid-scale,
//! out-of-range numbers are clamped. The only hard failure is getting no
//! parseable JSON at all.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

use reelscout_common::{Error, Result};

const LLM_TIMEOUT: Duration = Duration::from_secs(60);

/// Reel metadata passed to the engines, engagement counts already normalized
#[derive(Debug, Clone, Serialize)]
pub struct ReelSummary {
    pub title: String,
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
}

/// Structured judgment from the analysis engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Relevance score in [1, 10]
    pub relevance_score: u8,
    pub reasoning: String,
    pub topics: Vec<String>,
    /// Engagement sub-score in [1, 10]
    pub engagement_potential: u8,
}

/// Generated reply from the reply engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyResult {
    pub text: String,
    /// Confidence in [0, 1]
    pub confidence: f64,
}

/// Scores a reel against the active analysis prompt
#[async_trait]
pub trait AnalysisEngine: Send + Sync {
    async fn analyze(
        &self,
        summary: &ReelSummary,
        sampled_comments: &[String],
        prompt: &str,
    ) -> Result<AnalysisResult>;
}

/// Drafts a candidate reply against the active comment prompt
#[async_trait]
pub trait ReplyEngine: Send + Sync {
    async fn generate(
        &self,
        summary: &ReelSummary,
        topics: &[String],
        sampled_comments: &[String],
        prompt: &str,
    ) -> Result<ReplyResult>;
}

/// Chat-completions client for an OpenAI-compatible API
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(base_url: String, api_key: String, model: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(LLM_TIMEOUT)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build LLM client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            api_key,
            model,
        })
    }

    /// One chat completion in JSON mode. Returns the parsed content object.
    async fn complete_json(&self, system_prompt: &str, user_payload: Value) -> Result<Value> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_payload.to_string() },
            ],
            "response_format": { "type": "json_object" },
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Analysis(format!("LLM request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Analysis(format!(
                "LLM returned {}",
                response.status()
            )));
        }

        let completion: Value = response
            .json()
            .await
            .map_err(|e| Error::Analysis(format!("Malformed LLM response: {}", e)))?;

        let content = completion["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| Error::Analysis("LLM response has no content".to_string()))?;

        serde_json::from_str(content)
            .map_err(|e| Error::Analysis(format!("LLM content is not valid JSON: {}", e)))
    }
}

#[async_trait]
impl AnalysisEngine for OpenAiClient {
    async fn analyze(
        &self,
        summary: &ReelSummary,
        sampled_comments: &[String],
        prompt: &str,
    ) -> Result<AnalysisResult> {
        let payload = json!({
            "title": summary.title,
            "likes": summary.likes,
            "comments": summary.comments,
            "shares": summary.shares,
            "sampleComments": sampled_comments,
        });

        let response = self.complete_json(prompt, payload).await?;

        Ok(AnalysisResult {
            relevance_score: clamp_score(response.get("relevanceScore")),
            reasoning: response
                .get("reasoning")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string(),
            topics: response
                .get("topics")
                .and_then(Value::as_array)
                .map(|arr| {
                    arr.iter()
                        .filter_map(Value::as_str)
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
            engagement_potential: clamp_score(response.get("engagementPotential")),
        })
    }
}

#[async_trait]
impl ReplyEngine for OpenAiClient {
    async fn generate(
        &self,
        summary: &ReelSummary,
        topics: &[String],
        sampled_comments: &[String],
        prompt: &str,
    ) -> Result<ReplyResult> {
        let payload = json!({
            "title": summary.title,
            "topics": topics,
            "sampleComments": sampled_comments,
        });

        let response = self.complete_json(prompt, payload).await?;

        Ok(ReplyResult {
            text: response
                .get("comment")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string(),
            confidence: clamp_confidence(response.get("confidence")),
        })
    }
}

/// Clamp a score field to [1, 10]; missing or non-numeric defaults to
/// mid-scale 5
pub(crate) fn clamp_score(value: Option<&Value>) -> u8 {
    let raw = value.and_then(as_number).unwrap_or(5.0);
    raw.round().clamp(1.0, 10.0) as u8
}

/// Clamp a confidence field to [0, 1]; missing defaults to 0.8
pub(crate) fn clamp_confidence(value: Option<&Value>) -> f64 {
    let raw = value.and_then(as_number).unwrap_or(0.8);
    raw.clamp(0.0, 1.0)
}

/// A JSON number, or a numeric string (LLMs produce both)
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
