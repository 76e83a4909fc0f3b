//! Dispatcher and per-intent handlers.
//!
//! `process_query` classifies the question and routes it to one handler.
//! Every handler returns a user-facing string: external failures are logged
//! and flattened to a ❌-prefixed message or replaced by a simpler fallback
//! answer, never propagated.

use anyhow::Result;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::intent::{Intent, QueryClassifier};
use crate::llm::LlmClient;
use crate::pipeline::PipelineClient;
use crate::policy::PolicyClient;
use crate::session::Session;
use crate::store::{build_text_to_sql_prompt, Database, MANDI_SCHEMA};
use crate::weather::{
    self, WeatherClient,
};

/// Weather advice gets a larger budget than the other handlers.
const WEATHER_ADVICE_MAX_TOKENS: u32 = 800;
const ADVICE_TEMPERATURE: f32 = 0.4;
/// Rows forwarded to the LLM for answer phrasing.
const MAX_ROWS_FOR_PHRASING: usize = 20;

const GENERAL_SYSTEM: &str = "You are a knowledgeable and caring agricultural advisor \
with expertise in Indian farming practices. Provide practical, science-based advice \
that helps farmers improve their agricultural practices.";

const WEATHER_SYSTEM: &str = "You are a knowledgeable and caring agricultural advisor \
with expertise in weather-based farming recommendations. Provide practical, \
science-based advice that helps farmers make informed decisions.";

const TECHNICAL_SYSTEM: &str = "You are an agricultural equipment and technology \
specialist. Help farmers with machinery, tools, and digital farming questions using \
practical, simple language.";

pub struct AdvisorBot {
    classifier: QueryClassifier,
    llm: LlmClient,
    weather: WeatherClient,
    policy: PolicyClient,
    db: Database,
    pub session: Session,
    max_advice_tokens: u32,
}

impl AdvisorBot {
    pub fn new(cfg: &AppConfig) -> Result<Self> {
        let pipeline = cfg
            .pipeline
            .base_url
            .as_ref()
            .filter(|u| !u.is_empty())
            .map(|u| PipelineClient::new(u));

        Ok(Self {
            classifier: QueryClassifier::new(pipeline),
            llm: LlmClient::from_config(&cfg.llm),
            weather: WeatherClient::new(&cfg.weather.base_url),
            policy: PolicyClient::new(&cfg.policy.base_url),
            db: Database::open(&cfg.database.path)?,
            session: Session::default(),
            max_advice_tokens: cfg.llm.max_advice_tokens,
        })
    }

    pub fn classifier(&self) -> &QueryClassifier {
        &self.classifier
    }

    /// Classify and dispatch. Always returns a user-facing string.
    pub async fn process_query(&self, query: &str) -> String {
        let intent = self.classifier.classify(query).await;
        info!(intent = %intent, "query classified");

        match intent {
            Intent::Weather => self.handle_weather(query).await,
            Intent::Policy => self.handle_policy(query).await,
            Intent::Price => self.handle_price(query).await,
            Intent::Technical => self.handle_technical(query).await,
            Intent::Agriculture => self.handle_agriculture(query).await,
            Intent::General => self.general_advice(query, GENERAL_SYSTEM).await,
        }
    }

    // ─── Weather ────────────────────────────────────────────────────────────

    async fn handle_weather(&self, query: &str) -> String {
        let Some(city) = self.session.city.as_deref() else {
            return "🌤️ I can help you with weather-based agricultural advice! \
                    Please tell me your city name first using the 'city' command \
                    (e.g., 'city Mumbai').\n\n💡 Example: 'city Mumbai' then ask \
                    'will it rain tomorrow?'"
                .to_string();
        };

        let report = match self.weather.get_report(city).await {
            Ok(report) => report,
            Err(e) => {
                warn!("weather report fetch failed: {}", e);
                return format!(
                    "❌ Sorry, I couldn't fetch weather data for {}. Error: {}",
                    city, e
                );
            }
        };

        if let Some(error_msg) = report.error.as_deref() {
            warn!("weather service error for '{}': {}", city, error_msg);
            if error_msg.contains("Could not find location") {
                return format!(
                    "❌ Sorry, I couldn't find weather data for '{}'. Please check the \
                     city name and try again.\n\n💡 Try using a major city name like \
                     'Mumbai', 'Delhi', 'Bangalore', etc.",
                    city
                );
            }
            return format!(
                "❌ Sorry, I couldn't fetch weather data for {}. Error: {}",
                city, error_msg
            );
        }

        let advice = self.weather_advice(query, &report).await;

        let mut response = format!(
            "🌤️ **Weather-Based Agricultural Advice for {}**\n\n",
            report.location.name
        );
        if let Some(current) = report.current_weather() {
            response.push_str("📊 **Current Weather:**\n");
            response.push_str(&weather::format_current_weather(current));
            response.push('\n');
        }
        if !report.forecast_data.is_empty() {
            response.push_str("📅 **7-Day Forecast Summary:**\n");
            response.push_str(&weather::format_forecast_summary(&report.forecast_data));
            response.push('\n');
        }
        let insights = weather::format_insights(&report.agricultural_insights);
        if !insights.is_empty() {
            response.push_str("🌾 **Agricultural Insights:**\n");
            response.push_str(&insights);
            response.push('\n');
        }
        response.push_str(&format!("🤖 **AI Agricultural Advice:**\n{}", advice));
        response
    }

    /// Builds the comprehensive weather prompt and asks the LLM for advice.
    async fn weather_advice(&self, query: &str, report: &crate::weather::WeatherReport) -> String {
        if !self.llm.is_configured() {
            return "❌ Groq API key not found.".to_string();
        }

        let location = &report.location;
        let location_str = format!(
            "Location: {}, {}, {}",
            location.name,
            location.state.as_deref().unwrap_or("India"),
            location.country.as_deref().unwrap_or("India"),
        );

        let current_str = report
            .current_weather()
            .map(|c| format!("Current Weather:\n{}", weather::format_current_weather(c)))
            .unwrap_or_default();

        let forecast_str = if report.forecast_data.is_empty() {
            "Forecast: Not available".to_string()
        } else {
            format!(
                "7-Day Weather Forecast:\n{}",
                weather::forecast_prompt_lines(&report.forecast_data, 3)
            )
        };

        let insights_str = {
            let body = weather::format_insights(&report.agricultural_insights);
            let mut s = if body.is_empty() {
                String::new()
            } else {
                format!("Agricultural Insights:\n{}", body)
            };
            for rec in report.agricultural_insights.recommendations.iter().take(3) {
                s.push_str(&format!("• Recommendation: {}\n", rec));
            }
            s
        };

        let prompt = format!(
            "You are an expert agricultural advisor. Based on the comprehensive weather \
             data and agricultural insights, provide specific agricultural advice to the farmer.\n\n\
             {location_str}\n\n{current_str}\n{forecast_str}\n\n{insights_str}\n\
             Farmer's Question: {query}\n\n\
             Instructions:\n\
             1. Analyze the current weather conditions and their impact on agriculture\n\
             2. Consider the weather forecast for planning agricultural activities\n\
             3. Use the agricultural insights to provide targeted advice\n\
             4. Provide specific, actionable advice for the farmer\n\
             5. Consider crop-specific recommendations if mentioned\n\
             6. Include timing suggestions for agricultural activities\n\
             7. Mention any precautions or warnings based on weather\n\
             8. Address soil moisture and irrigation needs\n\
             9. Be encouraging and supportive\n\
             10. Use simple, understandable language\n\
             11. Structure your response with clear sections\n\
             12. Focus on practical farming decisions\n\n\
             Agricultural Advice:{lang}",
            lang = self.language_instruction(),
        );

        match self
            .llm
            .chat(WEATHER_SYSTEM, &prompt, WEATHER_ADVICE_MAX_TOKENS, ADVICE_TEMPERATURE)
            .await
        {
            Ok(advice) => advice,
            Err(e) => {
                warn!("weather advice generation failed: {}", e);
                format!("❌ Error generating advice: {}", e)
            }
        }
    }

    // ─── Policy ─────────────────────────────────────────────────────────────

    async fn handle_policy(&self, query: &str) -> String {
        if self.policy.is_loaded().await {
            match self.policy.ask(query).await {
                Ok(answer) => return answer,
                Err(e) => warn!("policy service query failed: {}", e),
            }
        } else {
            warn!("policy service not loaded, falling back to general advice");
        }

        let wrapped = format!(
            "Government policy question: {}. Please provide general information about \
             government agricultural policies and schemes in India.",
            query
        );
        self.general_advice(&wrapped, GENERAL_SYSTEM).await
    }

    // ─── Price ──────────────────────────────────────────────────────────────

    async fn handle_price(&self, query: &str) -> String {
        match self.price_lookup(query).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!("price lookup failed: {}", e);
                let wrapped = format!(
                    "Market price question: {}. The local mandi price database is \
                     unavailable; give general guidance on where and how a farmer can \
                     check current market prices in India.",
                    query
                );
                self.general_advice(&wrapped, GENERAL_SYSTEM).await
            }
        }
    }

    /// Text-to-SQL over mandi_prices → guarded execute → phrase the rows.
    async fn price_lookup(&self, query: &str) -> Result<String> {
        let schema_prompt = build_text_to_sql_prompt(MANDI_SCHEMA);
        let sql = self.llm.text_to_sql(query, &schema_prompt).await?;
        info!("generated SQL: {}", sql);

        let (columns, rows) = self.db.execute_query(&sql)?;

        if rows.is_empty() {
            return Ok(
                "📉 No matching price data found. If the price database is empty, \
                 load a mandi price CSV first with the 'import-data' command."
                    .to_string(),
            );
        }

        let mut table = columns.join(" | ");
        table.push('\n');
        for row in rows.iter().take(MAX_ROWS_FOR_PHRASING) {
            table.push_str(&row.join(" | "));
            table.push('\n');
        }

        let prompt = format!(
            "Market price data from the mandi_prices table (prices in Rs per quintal; \
             Modal_Price is the most frequently observed trade price and the \
             representative market price):\n\n{table}\n\
             Farmer's Question: {query}\n\n\
             Answer the question using only this data. Quote the modal price as the \
             representative market price and mention the market and date it was \
             observed.{lang}",
            lang = self.language_instruction(),
        );

        let answer = self
            .llm
            .chat(GENERAL_SYSTEM, &prompt, self.max_advice_tokens, ADVICE_TEMPERATURE)
            .await?;
        Ok(format!("💰 **Mandi Price Information**\n\n{}", answer))
    }

    // ─── Technical / Agriculture / General ──────────────────────────────────

    async fn handle_technical(&self, query: &str) -> String {
        self.general_advice(query, TECHNICAL_SYSTEM).await
    }

    async fn handle_agriculture(&self, query: &str) -> String {
        // Soil reference data for the user's district, when we have it.
        let soil_context = self
            .session
            .city
            .as_deref()
            .and_then(|city| self.db.soil_for_district(city).ok().flatten())
            .map(|rec| format!("\n\nContext — {}", rec.summary()))
            .unwrap_or_default();

        let question = format!("{}{}", query, soil_context);
        self.general_advice(&question, GENERAL_SYSTEM).await
    }

    async fn general_advice(&self, query: &str, system: &str) -> String {
        if !self.llm.is_configured() {
            return "❌ Groq API key not found.".to_string();
        }

        let prompt = format!(
            "You are an expert agricultural advisor. Provide helpful advice to the \
             farmer's question.\n\n\
             Farmer's Question: {query}\n\n\
             Instructions:\n\
             1. Provide practical, science-based agricultural advice\n\
             2. Consider Indian farming context and conditions\n\
             3. Include specific recommendations when possible\n\
             4. Be encouraging and supportive\n\
             5. Use simple, understandable language\n\
             6. Structure your response clearly\n\
             7. If the question is about crops, mention suitable varieties and practices\n\
             8. If about soil, mention testing and improvement methods\n\
             9. If about pests/diseases, mention prevention and treatment\n\n\
             Agricultural Advice:{lang}",
            lang = self.language_instruction(),
        );

        match self
            .llm
            .chat(system, &prompt, self.max_advice_tokens, ADVICE_TEMPERATURE)
            .await
        {
            Ok(advice) => advice,
            Err(e) => {
                warn!("advice generation failed: {}", e);
                format!("❌ Error generating advice: {}", e)
            }
        }
    }

    fn language_instruction(&self) -> String {
        if self.session.language.eq_ignore_ascii_case("english") {
            String::new()
        } else {
            format!("\n\nRespond in {}.", self.session.language)
        }
    }

    // ─── Stats ──────────────────────────────────────────────────────────────

    /// Session preferences plus component availability, for the `stats`
    /// chat command.
    pub async fn stats(&self) -> String {
        let mut out = String::new();
        out.push_str("📊 **System Statistics**\n");
        out.push_str(&format!("🏙️ City: {}\n", self.session.city_display()));
        out.push_str(&format!("🌱 Crop: {}\n", self.session.crop_display()));
        out.push_str(&format!("🗣️ Language: {}\n", self.session.language));

        match self.policy.health().await {
            Ok(h) if h.loaded => {
                out.push_str("📚 Policy Database: ✅ Loaded");
                if let Some(docs) = h.documents {
                    out.push_str(&format!(" ({} documents)", docs));
                }
                out.push('\n');
            }
            _ => {
                out.push_str("📚 Policy Database: ❌ Not loaded\n");
                out.push_str("   💡 Policy queries will use general AI advice\n");
            }
        }

        out.push_str(&format!("🌤️ Weather Service: {}\n", self.weather.base_url()));
        out.push_str(&format!(
            "🤖 AI Advisor: {}\n",
            if self.llm.is_configured() {
                self.llm.provider_label()
            } else {
                "API key needed".to_string()
            }
        ));
        out.push_str(&format!(
            "🧠 NLP Pipeline: {}\n",
            self.classifier
                .pipeline()
                .map(|p| p.base_url().to_string())
                .unwrap_or_else(|| "disabled (keyword fallback)".into())
        ));

        let prices = self.db.count_rows("mandi_prices").unwrap_or(0);
        let soil = self.db.count_rows("soil_health").unwrap_or(0);
        out.push_str(&format!(
            "🗄️ Local Store: {} price rows, {} soil districts",
            prices, soil
        ));
        out
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}
