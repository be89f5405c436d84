//! Validation backend HTTP client
//!
//! One combined progress request covers a whole batch: the tokens
//! concatenate into a single path segment and the response arrays come
//! back in token order.

use std::time::Duration;

use async_trait::async_trait;

use vfp_common::api::{ModelSummary, OutcomesResponse, ProgressResponse, Token};
use vfp_common::{CheckCategory, Error, Result};

const USER_AGENT: &str = concat!("vfp-ui/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// The three backend operations the portal consumes.
///
/// The trait is the seam between the tracker/report code and the network;
/// tests substitute a scripted in-memory implementation.
#[async_trait]
pub trait ValidationBackend: Send + Sync {
    /// Combined progress for a whole batch, array order matching `tokens`
    async fn progress(&self, tokens: &[Token]) -> Result<ProgressResponse>;

    /// Terminal summary of one finished file
    async fn summary(&self, token: &Token) -> Result<ModelSummary>;

    /// Full outcome list plus occurrence counts for one file and category
    async fn outcomes(&self, token: &Token, category: CheckCategory)
        -> Result<OutcomesResponse>;
}

/// reqwest-backed implementation of [`ValidationBackend`]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Internal(e.to_string()))?;

        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Ok(Self { http, base_url })
    }

    async fn get_json<T>(&self, url: String) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        tracing::debug!(url = %url, "Querying validation backend");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Backend(e.to_string()))?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFound(url));
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        response.json().await.map_err(|e| Error::Decode(e.to_string()))
    }
}

#[async_trait]
impl ValidationBackend for BackendClient {
    async fn progress(&self, tokens: &[Token]) -> Result<ProgressResponse> {
        let url = format!("{}/valprog/{}", self.base_url, Token::concat(tokens));
        self.get_json(url).await
    }

    async fn summary(&self, token: &Token) -> Result<ModelSummary> {
        let url = format!("{}/reslogs/{}", self.base_url, token);
        self.get_json(url).await
    }

    async fn outcomes(
        &self,
        token: &Token,
        category: CheckCategory,
    ) -> Result<OutcomesResponse> {
        let url = format!(
            "{}/outcomes/{}?category={}",
            self.base_url, token, category
        );
        self.get_json(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = BackendClient::new("http://localhost:8000");
        assert!(client.is_ok());
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = BackendClient::new("http://localhost:8000///").unwrap();
        assert_eq!(client.base_url, "http://localhost:8000");
    }
}
