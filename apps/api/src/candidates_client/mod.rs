//! Candidate search client, the only place that talks to the candidate search backend.
//!
//! The backend takes `{"prompt": ...}` or `{"filters": {...}}` at
//! `POST /getcandidate/search/` and answers with `{"profiles": [...]}`.
//! Ranking and match percentages come from the backend and are not touched here.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::search::query::SearchQuery;
use crate::search::results::Candidate;

const SEARCH_PATH: &str = "getcandidate/search/";
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum CandidateApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Backend unavailable after {retries} retries")]
    Unavailable { retries: u32 },
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    profiles: Option<Vec<Candidate>>,
}

#[derive(Clone)]
pub struct CandidateClient {
    client: Client,
    base_url: String,
    api_token: Option<String>,
    backoff: Duration,
}

impl CandidateClient {
    pub fn new(
        base_url: &str,
        api_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, CandidateApiError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
            backoff: Duration::from_millis(500),
        })
    }

    #[cfg(test)]
    fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    fn search_url(&self) -> String {
        format!("{}/{SEARCH_PATH}", self.base_url)
    }

    /// Submits a search and returns the backend's profiles in backend order.
    /// A per-request bearer token takes precedence over the configured one.
    /// Retries on 429 and 5xx with exponential backoff.
    pub async fn search(
        &self,
        query: &SearchQuery,
        bearer: Option<&str>,
    ) -> Result<Vec<Candidate>, CandidateApiError> {
        let token = usable_token(bearer).or_else(|| usable_token(self.api_token.as_deref()));
        let url = self.search_url();

        let mut last_error: Option<CandidateApiError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = self.backoff * (1 << (attempt - 1));
                warn!(
                    "Candidate search attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let mut request = self.client.post(&url).json(query);
            if let Some(token) = token {
                request = request.bearer_auth(token);
            }

            let response = match request.send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(CandidateApiError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("Candidate API returned {}: {}", status, body);
                last_error = Some(CandidateApiError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(CandidateApiError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let body: SearchResponse = response.json().await?;
            let profiles = body.profiles.unwrap_or_default();
            debug!("Candidate search returned {} profiles", profiles.len());
            return Ok(profiles);
        }

        Err(last_error.unwrap_or(CandidateApiError::Unavailable {
            retries: MAX_RETRIES,
        }))
    }
}

/// Blank tokens and the literal "undefined" are never sent.
fn usable_token(token: Option<&str>) -> Option<&str> {
    token
        .map(str::trim)
        .filter(|t| !t.is_empty() && *t != "undefined")
}
