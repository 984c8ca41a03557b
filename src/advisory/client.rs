use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{RawSuggestion, SuggestionService, TurnContext};
use crate::intent::Utterance;

const CLIENT_TIMEOUT: Duration = Duration::from_secs(2);

/// HTTP adapter for the external AI suggestion service. The network-level
/// timeout here backstops the Advisor's own bound.
#[derive(Clone)]
pub struct HttpSuggester {
    client: Client,
    endpoint: String,
}

#[derive(Serialize)]
struct SuggestRequest<'a> {
    utterance: &'a str,
    context: &'a TurnContext,
}

#[derive(Deserialize)]
struct SuggestResponse {
    #[serde(default)]
    suggestions: Vec<RawSuggestion>,
}

impl HttpSuggester {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(CLIENT_TIMEOUT)
                .build()
                .unwrap_or_else(|_| Client::new()),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl SuggestionService for HttpSuggester {
    async fn suggest(
        &self,
        utterance: &Utterance,
        context: &TurnContext,
    ) -> Result<Vec<RawSuggestion>> {
        let body = SuggestRequest {
            utterance: &utterance.text,
            context,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("suggestion service error: {}", response.status()));
        }

        let parsed: SuggestResponse = response.json().await?;
        Ok(parsed.suggestions)
    }
}
