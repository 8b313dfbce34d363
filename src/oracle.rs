//! Pattern oracle adapter.
//!
//! The oracle is any text generator behind [`TextOracle`]. The adapter builds
//! one prompt, makes exactly one call and turns the reply into an
//! [`AnalysisCandidate`]. Every failure (transport, timeout, non-JSON reply,
//! missing or mistyped fields) is logged and reported as "no usable result".

use std::time::Duration;

use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::{columns::ColumnSamples, error::OracleError};

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 512;
pub const DEFAULT_TEMPERATURE: f32 = 0.1;

/// Keys tried, in order, when the `regex` field arrives as an object.
const NESTED_PATTERN_KEYS: &[&str] = &["pattern", "regex", "value", "expression"];

/// "Given a prompt, return text."
pub trait TextOracle {
    fn generate(&self, prompt: &str) -> Result<String, OracleError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct OracleSettings {
    pub endpoint: String,
    pub model: String,
    pub timeout: Duration,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

/// Blocking client for a `generateContent`-style HTTP endpoint. Holds only
/// per-invocation configuration.
pub struct GenerativeClient {
    settings: OracleSettings,
    credential: String,
    agent: ureq::Agent,
}

impl GenerativeClient {
    pub fn new(settings: OracleSettings, credential: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(settings.timeout)
            .build();
        Self {
            settings,
            credential: credential.to_string(),
            agent,
        }
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.settings.endpoint.trim_end_matches('/'),
            self.settings.model
        )
    }
}

#[derive(Debug, Deserialize)]
struct GenerateReply {
    #[serde(default)]
    candidates: Vec<GeneratedCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeneratedCandidate {
    content: Option<GeneratedContent>,
}

#[derive(Debug, Deserialize)]
struct GeneratedContent {
    #[serde(default)]
    parts: Vec<GeneratedPart>,
}

#[derive(Debug, Deserialize)]
struct GeneratedPart {
    text: Option<String>,
}

impl TextOracle for GenerativeClient {
    fn generate(&self, prompt: &str) -> Result<String, OracleError> {
        let payload = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "candidateCount": 1,
                "maxOutputTokens": self.settings.max_output_tokens,
                "temperature": self.settings.temperature,
            }
        });
        debug!("Calling pattern oracle model '{}'", self.settings.model);
        let response = self
            .agent
            .post(&self.url())
            .set("Content-Type", "application/json")
            .set("x-goog-api-key", &self.credential)
            .send_json(payload)
            .map_err(|err| match err {
                ureq::Error::Status(code, _) => {
                    OracleError::Unavailable(format!("endpoint answered HTTP {code}"))
                }
                ureq::Error::Transport(transport) => OracleError::Unavailable(transport.to_string()),
            })?;
        let reply: GenerateReply = response
            .into_json()
            .map_err(|err| OracleError::Malformed(format!("unreadable response body: {err}")))?;
        let text = reply
            .candidates
            .into_iter()
            .filter_map(|candidate| candidate.content)
            .flat_map(|content| content.parts)
            .filter_map(|part| part.text)
            .collect::<String>();
        if text.trim().is_empty() {
            return Err(OracleError::Malformed("response carries no text".into()));
        }
        Ok(text)
    }
}

/// Oracle proposal normalised to one shape. The pattern is as received and
/// may be in either escaping form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisCandidate {
    pub target_columns: Vec<String>,
    pub pattern: String,
    pub explanation: String,
}

#[derive(Debug, Deserialize)]
struct OracleReply {
    target_columns: Vec<String>,
    regex: PatternField,
    #[serde(default)]
    explanation: Option<String>,
}

/// The `regex` field as it may arrive on the wire.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PatternField {
    Text(String),
    Nested(Map<String, Value>),
    Other(Value),
}

impl PatternField {
    fn into_pattern(self) -> Result<String, OracleError> {
        match self {
            PatternField::Text(pattern) => Ok(pattern),
            PatternField::Nested(map) => NESTED_PATTERN_KEYS
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_str))
                .map(str::to_string)
                .ok_or_else(|| {
                    OracleError::Malformed("regex object carries no pattern string".into())
                }),
            PatternField::Other(value) => Err(OracleError::Malformed(format!(
                "regex field is not a string: {value}"
            ))),
        }
    }
}

pub fn build_prompt(description: &str, columns: &[String], samples: &ColumnSamples) -> String {
    let column_list = serde_json::to_string(columns).unwrap_or_else(|_| "[]".into());
    let sample_block = serde_json::to_string_pretty(samples).unwrap_or_else(|_| "{}".into());
    format!(
        r#"You help redact sensitive data in a table.

Request: "{description}"

Available text columns: {column_list}

Sample values per column:
{sample_block}

Rules:
1. Return ONLY a JSON object with the fields "target_columns", "regex" and "explanation".
2. "target_columns" lists the columns (from the available list, spelled exactly) that hold the requested data.
3. "regex" is a single pattern string. When the request names several kinds of data, cover EVERY kind using top-level alternation, e.g. "pattern_a|pattern_b".
4. Escape backslashes by doubling them (write \\\\b, \\\\d, \\\\w, \\\\s).
5. Do not use look-around or back-references.

Example response:
{{"target_columns": ["contact_email"], "regex": "\\\\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\\\\.[A-Za-z]{{2,7}}\\\\b", "explanation": "Matches email addresses"}}

Your response:"#
    )
}

/// Removes a surrounding Markdown code fence, with or without a language tag.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
    body.trim_end().trim_end_matches("```").trim()
}

pub fn parse_reply(text: &str) -> Result<AnalysisCandidate, OracleError> {
    let body = strip_code_fence(text);
    let reply: OracleReply = match serde_json::from_str(body) {
        Ok(reply) => reply,
        Err(first_err) => {
            let object = body
                .find('{')
                .zip(body.rfind('}'))
                .filter(|(start, end)| start < end)
                .map(|(start, end)| &body[start..=end])
                .ok_or_else(|| OracleError::Malformed(format!("not JSON: {first_err}")))?;
            serde_json::from_str(object)
                .map_err(|err| OracleError::Malformed(format!("unexpected structure: {err}")))?
        }
    };
    Ok(AnalysisCandidate {
        target_columns: reply.target_columns,
        pattern: reply.regex.into_pattern()?,
        explanation: reply.explanation.unwrap_or_default(),
    })
}

/// One oracle round trip. `None` means no usable result.
pub fn analyze(
    oracle: &dyn TextOracle,
    description: &str,
    columns: &[String],
    samples: &ColumnSamples,
) -> Option<AnalysisCandidate> {
    let prompt = build_prompt(description, columns, samples);
    info!("Requesting pattern suggestion for '{description}'");
    let outcome = oracle
        .generate(&prompt)
        .and_then(|text| {
            debug!("Oracle reply: {text}");
            parse_reply(&text)
        });
    match outcome {
        Ok(candidate) => {
            debug!(
                "Oracle proposed columns {:?} with pattern {:?}",
                candidate.target_columns, candidate.pattern
            );
            Some(candidate)
        }
        Err(err) => {
            warn!("{err}; continuing without oracle suggestion");
            None
        }
    }
}
