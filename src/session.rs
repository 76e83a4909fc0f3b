//! In-memory session state and chat-command parsing.
//!
//! Lives for the process lifetime, no persistence. Setters return the
//! confirmation string shown to the user.

/// User preferences for the current chat session.
#[derive(Debug, Clone)]
pub struct Session {
    pub city: Option<String>,
    pub crop: Option<String>,
    pub language: String,
    /// Set the first time any preference is explicitly given; the chat loop
    /// stops showing the first-run city hint once true.
    pub initialized: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            city: None,
            crop: None,
            language: "English".to_string(),
            initialized: false,
        }
    }
}

impl Session {
    pub fn set_city(&mut self, city: &str) -> String {
        let city = city.trim().to_string();
        self.initialized = true;
        let msg = format!(
            "✅ City set to: {}\n🌤️ Now I can provide weather-based agricultural advice for your area!",
            city
        );
        self.city = Some(city);
        msg
    }

    pub fn set_crop(&mut self, crop: &str) -> String {
        let crop = crop.trim().to_string();
        self.initialized = true;
        let msg = format!("✅ Primary crop set to: {}", crop);
        self.crop = Some(crop);
        msg
    }

    pub fn set_language(&mut self, language: &str) -> String {
        self.language = language.trim().to_string();
        self.initialized = true;
        format!("✅ Language set to: {}", self.language)
    }

    pub fn city_display(&self) -> &str {
        self.city.as_deref().unwrap_or("Not set")
    }

    pub fn crop_display(&self) -> &str {
        self.crop.as_deref().unwrap_or("Not set")
    }
}

/// A recognized chat command mutating session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    SetCity(String),
    /// Bare `city` reports the current one.
    ShowCity,
    SetCrop(String),
    SetLanguage(String),
}

/// Parse `city …` / `crop …` / `language …` commands. Anything else is a
/// query and returns None.
pub fn parse_command(input: &str) -> Option<SessionCommand> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    if lower == "city" {
        return Some(SessionCommand::ShowCity);
    }
    if let Some(rest) = strip_keyword(trimmed, &lower, "city") {
        return Some(SessionCommand::SetCity(rest.to_string()));
    }
    if let Some(rest) = strip_keyword(trimmed, &lower, "crop") {
        return Some(SessionCommand::SetCrop(rest.to_string()));
    }
    if let Some(rest) = strip_keyword(trimmed, &lower, "language") {
        return Some(SessionCommand::SetLanguage(rest.to_string()));
    }
    None
}

fn strip_keyword<'a>(original: &'a str, lower: &str, keyword: &str) -> Option<&'a str> {
    if lower.starts_with(keyword) && lower[keyword.len()..].starts_with(' ') {
        let rest = original[keyword.len()..].trim();
        if !rest.is_empty() {
            return Some(rest);
        }
    }
    None
}

/// Words that mark a bare input as a weather question rather than a city
/// name. Used only while no city is set.
const WEATHER_WORDS: &[&str] = &[
    "weather", "rain", "temperature", "forecast", "hot", "cold",
    "sunny", "cloudy", "wind", "humidity",
];

/// Heuristic for treating a bare input as a city name: at most two words
/// and no weather word anywhere in it.
pub fn looks_like_city(input: &str) -> bool {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed.split_whitespace().count() > 2 {
        return false;
    }
    let lower = trimmed.to_lowercase();
    !WEATHER_WORDS.iter().any(|w| lower.contains(w))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setters_confirm_and_flag_initialized() {
        let mut s = Session::default();
        assert!(!s.initialized);
        let msg = s.set_city("Mumbai");
        assert!(msg.starts_with("✅ City set to: Mumbai"));
        assert_eq!(s.city.as_deref(), Some("Mumbai"));
        assert!(s.initialized);

        assert_eq!(s.set_crop("wheat"), "✅ Primary crop set to: wheat");
        assert_eq!(s.set_language("Hindi"), "✅ Language set to: Hindi");
        assert_eq!(s.language, "Hindi");
    }

    #[test]
    fn parse_city_commands() {
        assert_eq!(parse_command("city"), Some(SessionCommand::ShowCity));
        assert_eq!(
            parse_command("city Mumbai"),
            Some(SessionCommand::SetCity("Mumbai".into()))
        );
        assert_eq!(
            parse_command("City New Delhi"),
            Some(SessionCommand::SetCity("New Delhi".into()))
        );
    }

    #[test]
    fn parse_crop_and_language() {
        assert_eq!(
            parse_command("crop onion"),
            Some(SessionCommand::SetCrop("onion".into()))
        );
        assert_eq!(
            parse_command("language Marathi"),
            Some(SessionCommand::SetLanguage("Marathi".into()))
        );
    }

    #[test]
    fn queries_are_not_commands() {
        assert_eq!(parse_command("which crop suits my soil"), None);
        assert_eq!(parse_command("crop"), None);
        assert_eq!(parse_command("language"), None);
        assert_eq!(parse_command(""), None);
    }

    #[test]
    fn city_heuristic() {
        assert!(looks_like_city("Mumbai"));
        assert!(looks_like_city("New Delhi"));
        assert!(!looks_like_city("will it rain"));
        assert!(!looks_like_city("hot today"));
        assert!(!looks_like_city(""));
        assert!(!looks_like_city("what is the weather like"));
    }
}
