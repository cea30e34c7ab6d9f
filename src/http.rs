// Blocking JSON-over-HTTP helper shared by the Ollama and Pinecone clients

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: ureq::Error,
    },
    #[error("{url} returned HTTP {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Thin wrapper around a `ureq` agent. Non-2xx responses are reported with their body.
#[derive(Debug, Clone)]
pub struct HttpClient {
    agent: ureq::Agent,
}

impl HttpClient {
    #[inline]
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();
        Self { agent }
    }

    #[inline]
    pub fn get(&self, url: &Url, headers: &[(&str, &str)]) -> Result<String, HttpError> {
        debug!("GET {}", url);

        let mut request = self.agent.get(url.as_str());
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.call().map_err(|source| HttpError::Transport {
            url: url.to_string(),
            source,
        })?;
        read_response(url, response)
    }

    #[inline]
    pub fn post<B: Serialize>(
        &self,
        url: &Url,
        headers: &[(&str, &str)],
        body: &B,
    ) -> Result<String, HttpError> {
        debug!("POST {}", url);

        let payload = serde_json::to_string(body)?;
        let mut request = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/json");
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request
            .send(&payload)
            .map_err(|source| HttpError::Transport {
                url: url.to_string(),
                source,
            })?;
        read_response(url, response)
    }

    #[inline]
    pub fn parse<T: DeserializeOwned>(text: &str) -> Result<T, HttpError> {
        Ok(serde_json::from_str(text)?)
    }
}

fn read_response(
    url: &Url,
    mut response: ureq::http::Response<ureq::Body>,
) -> Result<String, HttpError> {
    let status = response.status().as_u16();
    let body = response
        .body_mut()
        .read_to_string()
        .map_err(|source| HttpError::Transport {
            url: url.to_string(),
            source,
        })?;

    if (200..300).contains(&status) {
        Ok(body)
    } else {
        Err(HttpError::Status {
            url: url.to_string(),
            status,
            body,
        })
    }
}
