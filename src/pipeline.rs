//! Client for the external NLP pipeline sidecar.
//!
//! The heavier statistical classifier (transformer + zero-shot stack) runs
//! as a separate service; we only consume its `/classify` endpoint. Any
//! failure here surfaces to the caller, which falls back to keyword scoring.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{bail, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct ClassifyRequest<'a> {
    text: &'a str,
}

/// Classification result as reported by the pipeline service.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineResult {
    pub primary_intent: String,
    #[serde(default)]
    pub confidence: f64,
    /// "en", "hi", or "mixed" for code-mixed queries.
    pub language: Option<String>,
    pub scores: Option<HashMap<String, f64>>,
}

pub struct PipelineClient {
    http: Client,
    base_url: String,
}

impl PipelineClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("reqwest client"),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn classify(&self, text: &str) -> Result<PipelineResult> {
        let resp = self
            .http
            .post(format!("{}/classify", self.base_url))
            .json(&ClassifyRequest { text })
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
            bail!("pipeline HTTP {}: {}", status, body);
        }

        Ok(resp.json().await?)
    }
}
