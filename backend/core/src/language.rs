//! Heuristic script detection used to route turns between providers.
//!
//! This is character-class membership, not language identification: short
//! ambiguous inputs such as pure digits fall through to `English`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static CYRILLIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)[а-яёіїєґ]").unwrap());

static ENGLISH_ONLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^[a-zA-Z\s.,!?'"()-]+$"#).unwrap());

static LATIN_DIACRITICS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)[áéíóúñüäößąćęłńśźżàâèêëïîôùûÿç]").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Cyrillic,
    English,
    Other,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Cyrillic => "cyrillic",
            Language::English => "english",
            Language::Other => "other",
        }
    }
}

pub fn detect_language(text: &str) -> Language {
    if CYRILLIC.is_match(text) {
        Language::Cyrillic
    } else if ENGLISH_ONLY.is_match(text) {
        Language::English
    } else if LATIN_DIACRITICS.is_match(text) {
        Language::Other
    } else {
        Language::English
    }
}
