//! Wire types of the validation backend contract
//!
//! The progress endpoint is batch-addressed: tokens concatenate into a
//! single fixed-width string and the response arrays match token order.
//! Outcome records are an optional-field shape - which fields are present
//! depends on the check category that produced the record - so every
//! payload field is `Option` and display code decides the fallbacks.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::status::{CategoryStatus, Severity};

/// Fixed width of one submission token
pub const TOKEN_LEN: usize = 32;

/// Opaque fixed-width identifier for one submitted file within a batch
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    /// Validate and wrap a raw token string
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        if raw.len() != TOKEN_LEN || !raw.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(Error::InvalidInput(format!(
                "token must be {} alphanumeric characters, got {:?}",
                TOKEN_LEN, raw
            )));
        }
        Ok(Token(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Concatenate a batch of tokens into the single path segment the
    /// progress endpoint accepts.
    pub fn concat(tokens: &[Token]) -> String {
        let mut out = String::with_capacity(tokens.len() * TOKEN_LEN);
        for token in tokens {
            out.push_str(&token.0);
        }
        out
    }

    /// Split a concatenated batch string back into fixed-width tokens.
    pub fn split_concat(concat: &str) -> Result<Vec<Token>> {
        if concat.len() % TOKEN_LEN != 0 {
            return Err(Error::InvalidInput(format!(
                "concatenated token string length {} is not a multiple of {}",
                concat.len(),
                TOKEN_LEN
            )));
        }
        concat
            .as_bytes()
            .chunks(TOKEN_LEN)
            .map(|chunk| {
                let s = std::str::from_utf8(chunk)
                    .map_err(|_| Error::InvalidInput("token is not ASCII".to_string()))?;
                Token::new(s)
            })
            .collect()
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Best-effort per-file metrics reported while validation runs
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FileMetrics {
    #[serde(default)]
    pub number_of_geometries: Option<u64>,
    #[serde(default)]
    pub number_of_properties: Option<u64>,
}

/// Response of `GET /valprog/<concat>`
///
/// `progress[i]` and `file_info[i]` belong to the i-th token of the
/// concatenated request. Progress is 0-100, or -1 (queued) or -2 (failed).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgressResponse {
    pub progress: Vec<i32>,
    #[serde(default)]
    pub file_info: Vec<FileMetrics>,
}

/// Response of `GET /reslogs/<token>`: the terminal summary of one file,
/// fetched once when its progress reaches 100.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelSummary {
    #[serde(default)]
    pub status_syntax: CategoryStatus,
    #[serde(default)]
    pub status_schema: CategoryStatus,
    #[serde(default)]
    pub status_rules: CategoryStatus,
    #[serde(default)]
    pub status_ind: CategoryStatus,
    #[serde(default)]
    pub status_bsdd: CategoryStatus,
    /// Completion time
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    /// Permanent report link
    #[serde(default)]
    pub report_url: Option<String>,
    /// Permanent download link
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub number_of_geometries: Option<u64>,
    #[serde(default)]
    pub number_of_properties: Option<u64>,
}

/// One rule-check outcome row
///
/// `title`/`feature` is the grouping key; `expected`, `observed` and
/// `message` are display-only payloads and never drive grouping or sorting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutcomeRecord {
    /// Model element this outcome refers to; absent for file-level checks
    #[serde(default)]
    pub instance_id: Option<i64>,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub feature: Option<String>,
    #[serde(default)]
    pub expected: Option<Value>,
    #[serde(default)]
    pub observed: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Model element referenced by an outcome record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInstance {
    pub guid: String,
    #[serde(rename = "type")]
    pub entity_type: String,
}

/// Instance lookup table shipped alongside the outcome list
pub type InstanceMap = HashMap<i64, ModelInstance>;

/// Response of `GET /outcomes/<token>?category=<c>`
///
/// `counts` maps a rule title to the total occurrence count on the backend,
/// which may exceed the number of rows actually delivered (the backend caps
/// rows per rule to bound payload size). All fields default so a sparse or
/// partially malformed payload still renders.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutcomesResponse {
    #[serde(default)]
    pub results: Vec<OutcomeRecord>,
    #[serde(default)]
    pub counts: HashMap<String, u64>,
    #[serde(default)]
    pub instances: InstanceMap,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(fill: char) -> Token {
        Token::new(fill.to_string().repeat(TOKEN_LEN)).unwrap()
    }

    #[test]
    fn test_token_validation() {
        assert!(Token::new("a".repeat(TOKEN_LEN)).is_ok());
        assert!(Token::new("short").is_err());
        assert!(Token::new("!".repeat(TOKEN_LEN)).is_err());
    }

    #[test]
    fn test_token_concat_split() {
        let tokens = vec![token('a'), token('b'), token('c')];
        let concat = Token::concat(&tokens);
        assert_eq!(concat.len(), 3 * TOKEN_LEN);
        assert_eq!(Token::split_concat(&concat).unwrap(), tokens);
        assert!(Token::split_concat(&concat[1..]).is_err());
    }

    #[test]
    fn test_outcome_record_sparse_payload() {
        // File-level record: no instance, no expected/observed
        let rec: OutcomeRecord =
            serde_json::from_str(r#"{"severity": 3, "title": "Alignment"}"#).unwrap();
        assert_eq!(rec.severity, Severity::Warning);
        assert_eq!(rec.title.as_deref(), Some("Alignment"));
        assert!(rec.instance_id.is_none());
        assert!(rec.expected.is_none());
    }

    #[test]
    fn test_outcomes_response_defaults() {
        let resp: OutcomesResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.results.is_empty());
        assert!(resp.counts.is_empty());
    }

    #[test]
    fn test_instance_map_integer_keys() {
        let resp: OutcomesResponse = serde_json::from_str(
            r#"{"instances": {"42": {"guid": "2O2Fr$t4X7Zf8NOew3FLOH", "type": "IfcWall"}}}"#,
        )
        .unwrap();
        assert_eq!(resp.instances[&42].entity_type, "IfcWall");
    }
}
