//! Model-call collaborator: column selection (call A) and rule inference
//! (call B).
//!
//! Both calls demand strict JSON from the model. The trait keeps the
//! collaborator injectable so the pipeline can run against a deterministic
//! fake in tests; the production client speaks to any OpenAI-compatible
//! chat-completions endpoint. Callers map every failure to the documented
//! fallback value, so a model outage degrades a rewrite instead of failing it.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Hard cap on sample values forwarded as rule-inference evidence.
pub const MAX_FORWARDED_SAMPLES: usize = 50;

/// Call-A response: which columns the instruction targets.
///
/// Fields default individually so a partially-shaped response still parses;
/// a payload that is not a JSON object at all falls back wholesale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnSelection {
    #[serde(default)]
    pub target_columns: Vec<String>,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub rationale: String,
}

impl ColumnSelection {
    pub fn fallback() -> Self {
        Self {
            target_columns: Vec::new(),
            confidence: 0.0,
            rationale: "fallback".to_string(),
        }
    }
}

/// Call-B response: the pattern/flags/replacement triple for one column.
/// `error` is never produced by the model; the transform engine sets it when
/// compilation fails, and the rule is then inert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransformRule {
    #[serde(default)]
    pub pattern: String,
    #[serde(default)]
    pub flags: String,
    #[serde(default)]
    pub replacement: String,
    #[serde(default)]
    pub rationale: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TransformRule {
    pub fn fallback() -> Self {
        Self {
            pattern: String::new(),
            flags: String::new(),
            replacement: String::new(),
            rationale: "fallback".to_string(),
            error: None,
        }
    }
}

pub trait ModelClient {
    fn select_columns(&self, instruction: &str, columns: &[String]) -> Result<ColumnSelection>;
    fn infer_rule(
        &self,
        instruction: &str,
        column: &str,
        samples: &[String],
    ) -> Result<TransformRule>;
}

#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub model: String,
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

pub struct OpenAiClient {
    config: ModelConfig,
    http: reqwest::blocking::Client,
}

const SELECT_SYSTEM: &str = "You map a user's natural-language instruction to EXACT column names \
                             from a provided list. Respond with STRICT JSON only, no prose.";
const RULE_SYSTEM: &str = "You generate valid regular expressions for Rust's regex crate: \
                           linear-time, no backreferences or lookaround, $1-style capture \
                           references in replacements. Respond with STRICT JSON only.";

impl OpenAiClient {
    pub fn new(config: ModelConfig) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Building HTTP client")?;
        Ok(Self { config, http })
    }

    fn chat(&self, system: &str, user: serde_json::Value) -> Result<String> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let body = json!({
            "model": self.config.model,
            "temperature": 0,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user.to_string() },
            ],
        });
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .with_context(|| format!("Sending chat request to {url}"))?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().unwrap_or_default();
            return Err(anyhow!("Chat endpoint returned {status}: {detail}"));
        }
        let payload: ChatResponse = response.json().context("Decoding chat response body")?;
        let content = payload
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("Chat response contained no choices"))?;
        Ok(content.trim().to_string())
    }
}

impl ModelClient for OpenAiClient {
    fn select_columns(&self, instruction: &str, columns: &[String]) -> Result<ColumnSelection> {
        let user = json!({
            "task": "select_target_columns",
            "instruction": instruction,
            "columns": columns,
        });
        debug!("Column-selection request: {user}");
        let content = self.chat(SELECT_SYSTEM, user)?;
        debug!("Column-selection response: {content}");
        parse_structured(&content).context("Parsing column-selection response")
    }

    fn infer_rule(
        &self,
        instruction: &str,
        column: &str,
        samples: &[String],
    ) -> Result<TransformRule> {
        let forwarded = samples
            .iter()
            .take(MAX_FORWARDED_SAMPLES)
            .collect::<Vec<_>>();
        let user = json!({
            "task": "infer_rule",
            "instruction": instruction,
            "column": column,
            "positive_examples": forwarded,
            "requirements": {
                "language_flavor": "rust-regex",
                "output_schema": ["pattern", "flags", "replacement", "rationale"],
            },
        });
        debug!("Rule-inference request for '{column}': {user}");
        let content = self.chat(RULE_SYSTEM, user)?;
        debug!("Rule-inference response for '{column}': {content}");
        parse_structured(&content)
            .with_context(|| format!("Parsing rule-inference response for column '{column}'"))
    }
}

fn parse_structured<T>(content: &str) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_str(content).map_err(|err| anyhow!("Model output was not valid JSON: {err}"))
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: String,
}
