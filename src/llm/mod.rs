//! Answering questions with retrieved context and an OpenAI-compatible chat API

mod prompt;

pub use prompt::{build_user_message, select_context};

use crate::config::{LlmConfig, SearchConfig};
use crate::error::{CredentialsError, LlmError};
use crate::index::Retriever;
use crate::types::SearchResult;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// An answer plus the chunks that were sent as context
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<SearchResult>,
}

/// Answers a question against an index handle
#[async_trait]
pub trait QueryEngine<H: Send + Sync>: Send + Sync {
    /// Checked before any network or disk work so a run fails fast
    fn check_credentials(&self) -> Result<(), CredentialsError> {
        Ok(())
    }

    async fn answer(&self, handle: &H, question: &str) -> Result<Answer, LlmError>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// [`QueryEngine`] that retrieves chunks and asks a chat completion endpoint
pub struct ChatQueryEngine {
    client: Client,
    api_base: String,
    api_key: Option<String>,
    api_key_var: String,
    model: String,
    temperature: f32,
    max_context_chars: usize,
    limit: usize,
    min_score: f32,
}

impl std::fmt::Debug for ChatQueryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatQueryEngine")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("has_api_key", &self.api_key.is_some())
            .finish_non_exhaustive()
    }
}

impl ChatQueryEngine {
    /// Create an engine; a missing key is reported by [`QueryEngine::check_credentials`]
    pub fn new(
        llm: &LlmConfig,
        search: &SearchConfig,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base: llm.api_base.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            api_key_var: llm.api_key_var.clone(),
            model: llm.model.clone(),
            temperature: llm.temperature,
            max_context_chars: llm.max_context_chars,
            limit: search.limit,
            min_score: search.min_score,
        })
    }

    /// Build from configuration, reading the key from the configured variable
    pub fn from_config(config: &crate::config::Config) -> Result<Self, LlmError> {
        let api_key = std::env::var(&config.llm.api_key_var).ok();
        Self::new(
            &config.llm,
            &config.search,
            api_key,
            Duration::from_secs(config.http.timeout_secs),
        )
    }

    /// Send one chat completion and return the first choice's text
    pub async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::Unauthorized)?;

        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.temperature,
        };

        let url = format!("{}/chat/completions", self.api_base);
        tracing::debug!("POST {} (model {})", url, self.model);

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(LlmError::Unauthorized);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .map(|body| body.error.message)
                .unwrap_or(text);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Decode(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)
    }
}

#[async_trait]
impl<H: Retriever> QueryEngine<H> for ChatQueryEngine {
    fn check_credentials(&self) -> Result<(), CredentialsError> {
        match self.api_key {
            Some(_) => Ok(()),
            None => Err(CredentialsError::Missing {
                var: self.api_key_var.clone(),
            }),
        }
    }

    async fn answer(&self, handle: &H, question: &str) -> Result<Answer, LlmError> {
        let results = handle
            .retrieve(question, self.limit, self.min_score)
            .await
            .map_err(|e| LlmError::Retrieval(e.to_string()))?;

        let sources = select_context(&results, self.max_context_chars);
        if sources.len() < results.len() {
            tracing::debug!(
                "Context limited to {} of {} retrieved chunks",
                sources.len(),
                results.len()
            );
        }

        let user = build_user_message(&sources, question);
        let text = self.complete(prompt::SYSTEM_PROMPT, &user).await?;

        Ok(Answer { text, sources })
    }
}

#[cfg(test)]
mod tests;
