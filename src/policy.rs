//! Client for the external policy-retrieval service.
//!
//! The vector-search policy chatbot lives elsewhere; we only check its
//! health and forward questions. When it is down or erroring, the policy
//! handler substitutes general LLM advice instead.

use std::time::Duration;

use anyhow::{bail, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct PolicyHealth {
    #[serde(default)]
    pub loaded: bool,
    pub documents: Option<u64>,
}

#[derive(Debug, Serialize)]
struct AskRequest<'a> {
    question: &'a str,
}

#[derive(Debug, Deserialize)]
struct AskResponse {
    answer: String,
    #[serde(default)]
    #[allow(dead_code)]
    sources: Vec<String>,
}

pub struct PolicyClient {
    http: Client,
    base_url: String,
}

impl PolicyClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("reqwest client"),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> Result<PolicyHealth> {
        let resp = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        if !resp.status().is_success() {
            bail!("policy service HTTP {}", resp.status());
        }
        Ok(resp.json().await?)
    }

    /// True only when the service answers and reports its index loaded.
    pub async fn is_loaded(&self) -> bool {
        self.health().await.map(|h| h.loaded).unwrap_or(false)
    }

    pub async fn ask(&self, question: &str) -> Result<String> {
        let resp = self
            .http
            .post(format!("{}/ask", self.base_url))
            .json(&AskRequest { question })
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body: String = resp
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(200)
                .collect();
            bail!("policy service HTTP {}: {}", status, body);
        }

        let answer: AskResponse = resp.json().await?;
        Ok(answer.answer)
    }
}
