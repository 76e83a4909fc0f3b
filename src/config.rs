//! Configuration: optional `agri-advisor.toml` file layered with
//! `AGRI`-prefixed environment variables (`__` separator, e.g.
//! `AGRI__LLM__MODEL`). A `.env` file is loaded first via dotenvy.

use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    /// Groq API key — prefer env GROQ_API_KEY
    pub groq_api_key: Option<String>,
    /// Groq model
    pub model: String,
    /// Local OpenAI-compatible server base URL (e.g. "http://localhost:11434/v1")
    pub local_base_url: Option<String>,
    /// Local model name
    pub local_model: String,
    /// Max tokens for advice generation
    pub max_advice_tokens: u32,
    /// Max tokens for SQL generation
    pub max_sql_tokens: u32,
}
impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            groq_api_key: None,
            model: "llama3-8b-8192".into(),
            local_base_url: None,
            local_model: "llama3:8b".into(),
            max_advice_tokens: 600,
            max_sql_tokens: 300,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub path: String,
}
impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: "agri_data.db".into() }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WeatherConfig {
    pub base_url: String,
}
impl Default for WeatherConfig {
    fn default() -> Self {
        Self { base_url: "http://127.0.0.1:8902".into() }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PolicyConfig {
    pub base_url: String,
}
impl Default for PolicyConfig {
    fn default() -> Self {
        Self { base_url: "http://127.0.0.1:8903".into() }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    /// Unset or empty disables the pipeline path entirely (keyword fallback
    /// without an HTTP call).
    pub base_url: Option<String>,
}
impl Default for PipelineConfig {
    fn default() -> Self {
        Self { base_url: Some("http://127.0.0.1:8901".into()) }
    }
}

pub fn load_config() -> Result<AppConfig> {
    dotenvy::dotenv().ok();

    let cfg = config::Config::builder()
        .add_source(config::File::with_name("agri-advisor").required(false))
        .add_source(config::Environment::with_prefix("AGRI").separator("__"))
        .build()?;
    let mut app: AppConfig = cfg.try_deserialize()?;

    // Convenience: GROQ_API_KEY env var (without AGRI__ prefix)
    if app.llm.groq_api_key.is_none() {
        if let Ok(key) = std::env::var("GROQ_API_KEY") {
            app.llm.groq_api_key = Some(key);
        }
    }

    Ok(app)
}

pub fn default_config() -> AppConfig {
    let mut app = AppConfig::default();
    if let Ok(key) = std::env::var("GROQ_API_KEY") {
        app.llm.groq_api_key = Some(key);
    }
    app
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_bake_in_sidecar_ports() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.llm.model, "llama3-8b-8192");
        assert_eq!(cfg.database.path, "agri_data.db");
        assert_eq!(cfg.pipeline.base_url.as_deref(), Some("http://127.0.0.1:8901"));
        assert_eq!(cfg.weather.base_url, "http://127.0.0.1:8902");
        assert_eq!(cfg.policy.base_url, "http://127.0.0.1:8903");
        assert_eq!(cfg.llm.max_advice_tokens, 600);
    }
}
