//! LLM chat-completion client.
//!
//! Primary provider is Groq (OpenAI-API-compatible /v1/chat/completions).
//! A local OpenAI-compatible server (Ollama, llama.cpp) can be selected via
//! config instead — provider choice is config-time only, there is no
//! failover chain. Failures surface to the handlers, which substitute a
//! simpler answer.

use anyhow::{anyhow, bail, Result};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

const GROQ_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

// ─── Provider config ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum LlmProvider {
    /// Groq hosted inference — https://groq.com
    Groq {
        api_key: String,
        model: String, // e.g. "llama3-8b-8192"
    },
    /// Any local OpenAI-compatible server (Ollama, llama.cpp, LM Studio)
    Local {
        base_url: String, // e.g. "http://localhost:11434/v1"
        model: String,    // e.g. "llama3:8b"
    },
}

impl LlmProvider {
    pub fn label(&self) -> String {
        match self {
            LlmProvider::Groq { model, .. } => format!("Groq/{}", model),
            LlmProvider::Local { model, .. } => format!("Local/{}", model),
        }
    }
}

// ─── Request types (OpenAI-compatible) ───────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

// ─── Client ──────────────────────────────────────────────────────────────────

pub struct LlmClient {
    http: Client,
    provider: Option<LlmProvider>,
    max_sql_tokens: u32,
}

impl LlmClient {
    /// Build client from config. Groq wins when a key is set, otherwise a
    /// configured local server, otherwise no provider (handlers will show
    /// the missing-key message).
    pub fn from_config(cfg: &crate::config::LlmConfig) -> Self {
        let provider = cfg
            .groq_api_key
            .as_ref()
            .filter(|k| !k.is_empty())
            .map(|key| LlmProvider::Groq {
                api_key: key.clone(),
                model: cfg.model.clone(),
            })
            .or_else(|| {
                cfg.local_base_url
                    .as_ref()
                    .filter(|u| !u.is_empty())
                    .map(|url| LlmProvider::Local {
                        base_url: url.clone(),
                        model: cfg.local_model.clone(),
                    })
            });

        match &provider {
            Some(p) => info!("LLM provider: {}", p.label()),
            None => warn!("No LLM provider configured — set GROQ_API_KEY for advice generation"),
        }

        Self {
            http: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("reqwest client"),
            provider,
            max_sql_tokens: cfg.max_sql_tokens,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    pub fn provider_label(&self) -> String {
        self.provider
            .as_ref()
            .map(|p| p.label())
            .unwrap_or_else(|| "none".into())
    }

    /// Single-shot chat completion. Returns the assistant text.
    pub async fn chat(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String> {
        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| anyhow!("no LLM provider configured"))?;

        let (url, model, auth) = match provider {
            LlmProvider::Groq { api_key, model } => (
                GROQ_URL.to_string(),
                model.clone(),
                format!("Bearer {}", api_key),
            ),
            LlmProvider::Local { base_url, model } => (
                format!("{}/chat/completions", base_url.trim_end_matches('/')),
                model.clone(),
                "Bearer local".to_string(), // Ollama ignores auth
            ),
        };

        let req_body = ChatRequest {
            model,
            messages: vec![
                Message { role: "system".into(), content: system.to_string() },
                Message { role: "user".into(), content: user.to_string() },
            ],
            max_tokens,
            temperature,
        };

        debug!("LLM call → {}", url);

        let resp = self
            .http
            .post(&url)
            .header("Authorization", auth)
            .header("Content-Type", "application/json")
            .json(&req_body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body: String = resp
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(300)
                .collect();
            bail!("LLM HTTP {}: {}", status, body);
        }

        let json: Value = resp.json().await?;
        extract_content(&json)
    }

    /// Text-to-SQL: convert a natural language question into a single SELECT
    /// against the given schema prompt. Deterministic (temperature 0.0),
    /// markdown fences stripped from the reply.
    pub async fn text_to_sql(&self, question: &str, schema_prompt: &str) -> Result<String> {
        let raw = self.chat(schema_prompt, question, self.max_sql_tokens, 0.0).await?;
        let sql = strip_code_fences(&raw);
        if sql.is_empty() {
            bail!("LLM returned empty SQL");
        }
        Ok(sql)
    }
}

/// Pull the assistant text out of an OpenAI-compatible chat response.
fn extract_content(json: &Value) -> Result<String> {
    json["choices"][0]["message"]["content"]
        .as_str()
        .map(|s| s.trim().to_string())
        .ok_or_else(|| anyhow!("unexpected LLM response: {}", json))
}

/// Strip markdown code fences the model sometimes wraps SQL in.
pub fn strip_code_fences(text: &str) -> String {
    text.trim()
        .trim_start_matches("```sql")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_sql_fence() {
        let raw = "```sql\nSELECT * FROM mandi_prices LIMIT 5\n```";
        assert_eq!(strip_code_fences(raw), "SELECT * FROM mandi_prices LIMIT 5");
    }

    #[test]
    fn strips_bare_fence() {
        let raw = "```\nSELECT 1\n```";
        assert_eq!(strip_code_fences(raw), "SELECT 1");
    }

    #[test]
    fn plain_sql_untouched() {
        assert_eq!(strip_code_fences("  SELECT 1  "), "SELECT 1");
    }

    #[test]
    fn extracts_and_trims_chat_content() {
        let json = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "  Sow wheat in November.\n"}}]
        });
        assert_eq!(extract_content(&json).unwrap(), "Sow wheat in November.");
    }

    #[test]
    fn malformed_chat_response_is_an_error() {
        let err_body = serde_json::json!({"error": {"message": "rate limited"}});
        assert!(extract_content(&err_body).is_err());

        let empty_choices = serde_json::json!({"choices": []});
        assert!(extract_content(&empty_choices).is_err());

        let non_string = serde_json::json!({"choices": [{"message": {"content": 42}}]});
        assert!(extract_content(&non_string).is_err());
    }

    #[test]
    fn provider_labels() {
        let groq = LlmProvider::Groq { api_key: "k".into(), model: "llama3-8b-8192".into() };
        assert_eq!(groq.label(), "Groq/llama3-8b-8192");
        let local = LlmProvider::Local {
            base_url: "http://localhost:11434/v1".into(),
            model: "llama3:8b".into(),
        };
        assert_eq!(local.label(), "Local/llama3:8b");
    }
}
