// Language model
// Single-shot text completion against the chat model served by Ollama

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::http::HttpClient;
use crate::{BotError, Result};

/// Turns a fully rendered prompt into a completion
pub trait LanguageModel: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String>;
}

/// Non-streaming client for Ollama's `/api/generate`
#[derive(Debug, Clone)]
pub struct OllamaLlm {
    base_url: Url,
    model: String,
    max_new_tokens: u32,
    temperature: f32,
    http: HttpClient,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    num_predict: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
    #[serde(default)]
    eval_count: Option<u64>,
}

impl OllamaLlm {
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            base_url: config.ollama_url()?,
            model: config.llm.model.clone(),
            max_new_tokens: config.llm.max_new_tokens,
            temperature: config.llm.temperature,
            http: HttpClient::new(Duration::from_secs(config.llm.timeout_secs)),
        })
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl LanguageModel for OllamaLlm {
    fn generate(&self, prompt: &str) -> Result<String> {
        debug!(
            "Generating with {} (prompt length: {})",
            self.model,
            prompt.len()
        );

        let url = self
            .base_url
            .join("/api/generate")
            .map_err(|e| BotError::Config(format!("Failed to build generate URL: {}", e)))?;
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                num_predict: self.max_new_tokens,
                temperature: self.temperature,
            },
        };

        let text = self
            .http
            .post(&url, &[], &request)
            .map_err(|e| BotError::Llm(format!("Generation failed: {}", e)))?;

        let response: GenerateResponse = HttpClient::parse(&text)
            .map_err(|e| BotError::Llm(format!("Failed to parse generate response: {}", e)))?;

        if let Some(tokens) = response.eval_count {
            debug!("Model produced {} tokens", tokens);
        }
        Ok(response.response)
    }
}
