//! Client for the external weather service and formatting helpers.
//!
//! The service does the heavy lifting (geocoding, 20-day history, 7-day
//! forecast, agricultural-insight computation); we fetch its comprehensive
//! report and format sections for display and for the LLM prompt. Every
//! nested field is optional-tolerant — the report format may vary.

use std::time::Duration;

use anyhow::{bail, Result};
use reqwest::Client;
use serde::Deserialize;

// ─── Report contract ─────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct WeatherReport {
    /// Application-level failure, delivered on HTTP 200.
    pub error: Option<String>,
    #[serde(default)]
    pub location: LocationInfo,
    /// 20 days of history; the last element is the current weather.
    #[serde(default)]
    pub historical_data: Vec<DayWeather>,
    /// 7-day forecast.
    #[serde(default)]
    pub forecast_data: Vec<ForecastDay>,
    #[serde(default)]
    pub agricultural_insights: Insights,
}

impl WeatherReport {
    pub fn current_weather(&self) -> Option<&DayWeather> {
        self.historical_data.last()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LocationInfo {
    #[serde(default)]
    pub name: String,
    pub state: Option<String>,
    pub country: Option<String>,
    pub timezone: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DayWeather {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub temperature: Temperature,
    pub humidity: Option<f64>,
    pub condition: Option<String>,
    pub wind: Option<Wind>,
    pub precipitation: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ForecastDay {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub temperature: Temperature,
    pub condition: Option<String>,
    pub precipitation: Option<Precipitation>,
    pub wind: Option<Wind>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Temperature {
    #[serde(default)]
    pub avg: f64,
    pub max: Option<f64>,
    pub min: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Precipitation {
    pub amount: Option<f64>,
    pub probability: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Wind {
    pub speed: Option<f64>,
    pub direction: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Insights {
    pub soil_moisture: Option<SoilMoisture>,
    pub crop_health: Option<CropHealth>,
    pub irrigation_needs: Option<IrrigationNeeds>,
    pub pest_risk: Option<PestRisk>,
    pub harvest_timing: Option<HarvestTiming>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SoilMoisture {
    pub status: Option<String>,
    pub risk: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CropHealth {
    pub temperature_stress: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IrrigationNeeds {
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PestRisk {
    pub risk_level: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HarvestTiming {
    pub timing: Option<String>,
}

// ─── Client ──────────────────────────────────────────────────────────────────

pub struct WeatherClient {
    http: Client,
    base_url: String,
}

impl WeatherClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: Client::builder()
                .timeout(Duration::from_secs(20))
                .build()
                .expect("reqwest client"),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the comprehensive report for a city. Application failures
    /// arrive as `report.error` on HTTP 200.
    pub async fn get_report(&self, city: &str) -> Result<WeatherReport> {
        let resp = self
            .http
            .get(format!("{}/report", self.base_url))
            .query(&[("location", city)])
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
            bail!("weather HTTP {}: {}", status, body);
        }

        Ok(resp.json().await?)
    }
}

// ─── Formatting helpers (pure) ───────────────────────────────────────────────

/// Bulleted current-weather block for the chat response.
pub fn format_current_weather(day: &DayWeather) -> String {
    let mut out = String::new();
    out.push_str(&format!("• Temperature: {:.1}°C", day.temperature.avg));
    if let (Some(max), Some(min)) = (day.temperature.max, day.temperature.min) {
        out.push_str(&format!(" (Max: {:.1}°C, Min: {:.1}°C)", max, min));
    }
    out.push('\n');
    out.push_str(&format!("• Humidity: {:.1}%\n", day.humidity.unwrap_or(0.0)));
    out.push_str(&format!(
        "• Weather: {}\n",
        day.condition.as_deref().unwrap_or("Unknown")
    ));
    let wind_speed = day.wind.as_ref().and_then(|w| w.speed).unwrap_or(0.0);
    out.push_str(&format!("• Wind Speed: {:.1} km/h\n", wind_speed));
    out.push_str(&format!(
        "• Precipitation: {:.1} mm\n",
        day.precipitation.unwrap_or(0.0)
    ));
    out
}

/// Averaged temperature and total precipitation across the forecast window.
pub fn format_forecast_summary(forecast: &[ForecastDay]) -> String {
    if forecast.is_empty() {
        return String::new();
    }
    let avg_temp =
        forecast.iter().map(|f| f.temperature.avg).sum::<f64>() / forecast.len() as f64;
    let total_precip: f64 = forecast
        .iter()
        .map(|f| f.precipitation.as_ref().and_then(|p| p.amount).unwrap_or(0.0))
        .sum();

    let mut out = String::new();
    out.push_str(&format!("• Average Temperature: {:.1}°C\n", avg_temp));
    out.push_str(&format!("• Total Precipitation: {:.1} mm\n", total_precip));
    if let Some(wind) = forecast[0].wind.as_ref() {
        out.push_str(&format!(
            "• Wind Conditions: {} at {:.1} km/h\n",
            wind.direction.as_deref().unwrap_or("Unknown"),
            wind.speed.unwrap_or(0.0)
        ));
    }
    out
}

/// Only the insight fields that are actually present get a line.
pub fn format_insights(insights: &Insights) -> String {
    let mut out = String::new();
    if let Some(sm) = insights.soil_moisture.as_ref() {
        if let Some(status) = sm.status.as_deref() {
            out.push_str(&format!("• Soil Moisture: {}", status));
            if let Some(risk) = sm.risk.as_deref() {
                out.push_str(&format!(" ({})", risk));
            }
            out.push('\n');
        }
    }
    if let Some(stress) = insights
        .crop_health
        .as_ref()
        .and_then(|c| c.temperature_stress.as_deref())
    {
        out.push_str(&format!("• Crop Health: {} temperature stress\n", stress));
    }
    if let Some(status) = insights
        .irrigation_needs
        .as_ref()
        .and_then(|i| i.status.as_deref())
    {
        out.push_str(&format!("• Irrigation Needs: {}\n", status));
    }
    if let Some(level) = insights.pest_risk.as_ref().and_then(|p| p.risk_level.as_deref()) {
        out.push_str(&format!("• Pest Risk: {}\n", level));
    }
    if let Some(timing) = insights
        .harvest_timing
        .as_ref()
        .and_then(|h| h.timing.as_deref())
    {
        out.push_str(&format!("• Harvest Timing: {}\n", timing));
    }
    out
}

/// Compact forecast lines for the LLM prompt (next `days` days).
pub fn forecast_prompt_lines(forecast: &[ForecastDay], days: usize) -> String {
    forecast
        .iter()
        .take(days)
        .enumerate()
        .map(|(i, day)| {
            format!(
                "Day {}: {} - {:.1}°C, {}, {:.1}mm rain",
                i + 1,
                day.date,
                day.temperature.avg,
                day.condition.as_deref().unwrap_or("unknown"),
                day.precipitation.as_ref().and_then(|p| p.amount).unwrap_or(0.0)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_weather_tolerates_missing_fields() {
        let day = DayWeather::default();
        let s = format_current_weather(&day);
        assert!(s.contains("• Temperature: 0.0°C"));
        assert!(s.contains("• Weather: Unknown"));
        assert!(!s.contains("Max:"));
    }

    #[test]
    fn forecast_summary_averages() {
        let forecast = vec![
            ForecastDay {
                temperature: Temperature { avg: 30.0, max: None, min: None },
                precipitation: Some(Precipitation { amount: Some(4.0), probability: None }),
                ..Default::default()
            },
            ForecastDay {
                temperature: Temperature { avg: 20.0, max: None, min: None },
                ..Default::default()
            },
        ];
        let s = format_forecast_summary(&forecast);
        assert!(s.contains("Average Temperature: 25.0°C"));
        assert!(s.contains("Total Precipitation: 4.0 mm"));
    }

    #[test]
    fn empty_forecast_gives_empty_summary() {
        assert_eq!(format_forecast_summary(&[]), "");
    }

    #[test]
    fn insights_skip_absent_sections() {
        let insights = Insights {
            soil_moisture: Some(SoilMoisture {
                status: Some("Adequate".into()),
                risk: None,
            }),
            ..Default::default()
        };
        let s = format_insights(&insights);
        assert_eq!(s, "• Soil Moisture: Adequate\n");
    }

    #[test]
    fn prompt_lines_cap_days() {
        let forecast: Vec<ForecastDay> = (0..7)
            .map(|i| ForecastDay {
                date: format!("2026-09-0{}", i + 1),
                ..Default::default()
            })
            .collect();
        let s = forecast_prompt_lines(&forecast, 3);
        assert_eq!(s.lines().count(), 3);
        assert!(s.starts_with("Day 1: 2026-09-01"));
    }

    #[test]
    fn report_error_and_current_weather() {
        let report: WeatherReport = serde_json::from_str(r#"{"error": "Could not find location 'Xyz'"}"#).unwrap();
        assert!(report.error.is_some());
        assert!(report.current_weather().is_none());

        let report: WeatherReport = serde_json::from_str(
            r#"{"location": {"name": "Nashik"},
                "historical_data": [
                    {"date": "2026-08-27", "temperature": {"avg": 24.0}},
                    {"date": "2026-08-28", "temperature": {"avg": 26.5}}
                ]}"#,
        )
        .unwrap();
        assert_eq!(report.location.name, "Nashik");
        assert_eq!(report.current_weather().unwrap().date, "2026-08-28");
    }
}
