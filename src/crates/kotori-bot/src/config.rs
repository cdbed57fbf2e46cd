//! Per-session tutor configuration.

use serde::{Deserialize, Serialize};

/// Languages the tutor can teach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
    Japanese,
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Language::English => write!(f, "english"),
            Language::Japanese => write!(f, "japanese"),
        }
    }
}

/// Immutable-per-session tutor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TutorConfig {
    /// Language being learned.
    #[serde(default)]
    pub language: Language,

    /// Deck study rounds read from. New notes always land in "Kotori".
    #[serde(default = "default_deck")]
    pub deck_name: String,

    /// Sampling temperature for model responses.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_deck() -> String {
    "Kotori".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            language: Language::English,
            deck_name: default_deck(),
            temperature: default_temperature(),
        }
    }
}

impl TutorConfig {
    /// Validate field ranges.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err("Temperature must be between 0 and 2".to_string());
        }
        if self.deck_name.is_empty() {
            return Err("Deck name must not be empty".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = TutorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.deck_name, "Kotori");
        assert_eq!(config.language, Language::English);
    }

    #[test]
    fn temperature_range_is_enforced() {
        let mut config = TutorConfig::default();
        config.temperature = 2.5;
        assert!(config.validate().is_err());
        config.temperature = -0.1;
        assert!(config.validate().is_err());
        config.temperature = 0.0;
        assert!(config.validate().is_ok());
        config.temperature = 2.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn language_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Language::Japanese).unwrap(), "\"japanese\"");
        let parsed: Language = serde_json::from_str("\"english\"").unwrap();
        assert_eq!(parsed, Language::English);
    }
}
