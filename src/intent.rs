//! Layered query classification.
//!
//! Primary path: ask the external NLP pipeline service and map its intent
//! label onto our six categories by substring containment. Any transport
//! error, unknown label, or missing service falls back to keyword scoring —
//! a pure function of lower-cased substring membership.

use std::fmt;

use tracing::debug;

use crate::pipeline::PipelineClient;

/// The coarse category a free-text query is routed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Weather,
    Policy,
    Price,
    Technical,
    Agriculture,
    General,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Weather => "weather",
            Intent::Policy => "policy",
            Intent::Price => "price",
            Intent::Technical => "technical",
            Intent::Agriculture => "agriculture",
            Intent::General => "general",
        }
    }

    /// Human heading used in CLI output.
    pub fn label(&self) -> &'static str {
        match self {
            Intent::Weather => "Weather & Climate",
            Intent::Policy => "Government Schemes & Policy",
            Intent::Price => "Mandi Prices",
            Intent::Technical => "Equipment & Technology",
            Intent::Agriculture => "Crops & Agronomy",
            Intent::General => "General Inquiry",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed priority order for fallback scoring. The first category with a
/// nonzero keyword count wins; General is also the all-zero default.
pub const PRIORITY: [Intent; 6] = [
    Intent::Weather,
    Intent::Policy,
    Intent::Price,
    Intent::Technical,
    Intent::General,
    Intent::Agriculture,
];

const WEATHER_KEYWORDS: &[&str] = &[
    "weather", "temperature", "rain", "rainfall", "drought", "flood",
    "humidity", "wind", "climate", "forecast", "seasonal", "monsoon",
    "hot", "cold", "dry", "wet", "storm", "cyclone", "heat wave",
    "frost", "hail", "snow", "sunny", "cloudy", "overcast",
];

const POLICY_KEYWORDS: &[&str] = &[
    "policy", "scheme", "subsidy", "loan", "insurance", "support",
    "government", "pm kisan", "pmksy", "soil health", "mandi",
    "procurement", "msp", "fertilizer", "seed", "equipment",
    "guidelines", "procedure", "application", "eligibility",
    "benefit", "assistance", "fund", "grant", "certificate",
];

const PRICE_KEYWORDS: &[&str] = &[
    "price", "prices", "rate", "rates", "cost", "bhav", "modal",
    "quintal", "sell", "selling", "buyer", "wholesale",
];

const TECHNICAL_KEYWORDS: &[&str] = &[
    "tractor", "machine", "machinery", "drone", "sensor", "pump",
    "sprayer", "app", "mobile", "digital", "internet", "software",
];

const GENERAL_KEYWORDS: &[&str] = &[
    "help", "information", "explain", "guide", "detail",
];

const AGRICULTURE_KEYWORDS: &[&str] = &[
    "crop", "farming", "agriculture", "soil", "fertilizer", "pesticide",
    "irrigation", "harvest", "planting", "seeding", "pest", "disease",
    "yield", "production", "market", "storage", "transport",
    "organic", "traditional", "variety", "sowing",
];

fn keywords_for(intent: Intent) -> &'static [&'static str] {
    match intent {
        Intent::Weather => WEATHER_KEYWORDS,
        Intent::Policy => POLICY_KEYWORDS,
        Intent::Price => PRICE_KEYWORDS,
        Intent::Technical => TECHNICAL_KEYWORDS,
        Intent::General => GENERAL_KEYWORDS,
        Intent::Agriculture => AGRICULTURE_KEYWORDS,
    }
}

/// Pipeline intent labels that map onto each category. Matching is by
/// substring containment against the lower-cased label.
fn pipeline_labels_for(intent: Intent) -> &'static [&'static str] {
    match intent {
        Intent::Weather => &[
            "weather_query", "weather_inquiry", "climate_question",
            "temperature_question", "rainfall_question",
        ],
        Intent::Policy => &[
            "policy_query", "policy_inquiry", "scheme_question",
            "subsidy_question", "government_help",
        ],
        Intent::Price => &["price_query", "market_rate"],
        Intent::Technical => &["technical_support", "equipment_question"],
        Intent::General => &["general_inquiry"],
        Intent::Agriculture => &[
            "crop_advice", "crop_question", "farming_advice",
            "soil_question", "pest_question", "irrigation_question",
        ],
    }
}

/// Map a pipeline intent label onto a category, or None if unknown.
pub fn map_pipeline_label(label: &str) -> Option<Intent> {
    let label = label.to_lowercase();
    for intent in PRIORITY {
        if pipeline_labels_for(intent).iter().any(|l| label.contains(l)) {
            return Some(intent);
        }
    }
    None
}

/// Per-category keyword counts for a query, in priority order.
pub fn keyword_scores(query: &str) -> Vec<(Intent, usize)> {
    let q = query.to_lowercase();
    PRIORITY
        .iter()
        .map(|&intent| {
            let score = keywords_for(intent)
                .iter()
                .filter(|kw| q.contains(*kw))
                .count();
            (intent, score)
        })
        .collect()
}

/// Keyword fallback: first category with a nonzero score in priority order,
/// General when everything scores zero.
pub fn fallback_classification(query: &str) -> Intent {
    keyword_scores(query)
        .into_iter()
        .find(|(_, score)| *score > 0)
        .map(|(intent, _)| intent)
        .unwrap_or(Intent::General)
}

/// Layered classifier: pipeline service first, keyword scoring fallback.
pub struct QueryClassifier {
    pipeline: Option<PipelineClient>,
}

impl QueryClassifier {
    pub fn new(pipeline: Option<PipelineClient>) -> Self {
        Self { pipeline }
    }

    pub fn has_pipeline(&self) -> bool {
        self.pipeline.is_some()
    }

    pub fn pipeline(&self) -> Option<&PipelineClient> {
        self.pipeline.as_ref()
    }

    pub async fn classify(&self, query: &str) -> Intent {
        if let Some(pipeline) = &self.pipeline {
            match pipeline.classify(query).await {
                Ok(result) => {
                    if let Some(intent) = map_pipeline_label(&result.primary_intent) {
                        debug!(
                            label = %result.primary_intent,
                            confidence = result.confidence,
                            "pipeline classification: {}", intent
                        );
                        return intent;
                    }
                    debug!(
                        label = %result.primary_intent,
                        "unknown pipeline label, using keyword fallback"
                    );
                }
                Err(e) => {
                    debug!("pipeline classification failed ({}), using keyword fallback", e);
                }
            }
        }
        fallback_classification(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weather_keywords_win() {
        assert_eq!(fallback_classification("Will it rain tomorrow?"), Intent::Weather);
        assert_eq!(fallback_classification("heat wave protection for crops"), Intent::Weather);
    }

    #[test]
    fn policy_keywords() {
        assert_eq!(fallback_classification("How to apply for PM Kisan scheme?"), Intent::Policy);
        assert_eq!(fallback_classification("crop insurance eligibility"), Intent::Policy);
    }

    #[test]
    fn mandi_routes_to_policy_without_weather_words() {
        // "mandi" sits in the policy keyword list and policy outranks price.
        assert_eq!(fallback_classification("nearest mandi for tomatoes"), Intent::Policy);
    }

    #[test]
    fn price_keywords() {
        assert_eq!(fallback_classification("what is the wheat bhav today"), Intent::Price);
        assert_eq!(fallback_classification("onion rates in Nashik"), Intent::Price);
    }

    #[test]
    fn technical_keywords() {
        assert_eq!(fallback_classification("my tractor engine is overheating"), Intent::Technical);
    }

    #[test]
    fn agriculture_keywords_alone() {
        assert_eq!(fallback_classification("best sowing time for wheat"), Intent::Agriculture);
        assert_eq!(fallback_classification("pesticide dose for bollworm"), Intent::Agriculture);
    }

    #[test]
    fn empty_and_unmatched_default_to_general() {
        assert_eq!(fallback_classification(""), Intent::General);
        assert_eq!(fallback_classification("hello there"), Intent::General);
    }

    #[test]
    fn priority_weather_over_price() {
        // Contains both "rain" and "price"; weather outranks.
        assert_eq!(
            fallback_classification("will rain affect the onion price"),
            Intent::Weather
        );
    }

    #[test]
    fn pipeline_label_mapping() {
        assert_eq!(map_pipeline_label("price_query"), Some(Intent::Price));
        assert_eq!(map_pipeline_label("Weather_Query (0.91)"), Some(Intent::Weather));
        assert_eq!(map_pipeline_label("crop_advice"), Some(Intent::Agriculture));
        assert_eq!(map_pipeline_label("technical_support"), Some(Intent::Technical));
        assert_eq!(map_pipeline_label("chitchat"), None);
    }

    #[test]
    fn scores_are_in_priority_order() {
        let scores = keyword_scores("rain and subsidy");
        let order: Vec<Intent> = scores.iter().map(|(i, _)| *i).collect();
        assert_eq!(order, PRIORITY.to_vec());
        assert_eq!(scores[0], (Intent::Weather, 1));
        assert_eq!(scores[1], (Intent::Policy, 1));
    }
}
