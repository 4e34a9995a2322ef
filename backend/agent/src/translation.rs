//! English-to-native translation help for the chat screen.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use storytalk_core::{LlmProvider, LlmRequest, PromptSegment};
use storytalk_providers::RetryPolicy;

use crate::usage::{UsageKind, UsageLog};

const TRANSLATION_MAX_TOKENS: u32 = 200;
const TRANSLATION_TEMPERATURE: f32 = 0.3;
/// Usage entries for translations carry this topic and the target language
/// in the level slot.
const TRANSLATION_TOPIC: &str = "translation";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationLanguage {
    #[default]
    Ukrainian,
    German,
    Polish,
    French,
    Spanish,
}

impl TranslationLanguage {
    pub const ALL: [TranslationLanguage; 5] = [
        TranslationLanguage::Ukrainian,
        TranslationLanguage::German,
        TranslationLanguage::Polish,
        TranslationLanguage::French,
        TranslationLanguage::Spanish,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TranslationLanguage::Ukrainian => "ukrainian",
            TranslationLanguage::German => "german",
            TranslationLanguage::Polish => "polish",
            TranslationLanguage::French => "french",
            TranslationLanguage::Spanish => "spanish",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            TranslationLanguage::Ukrainian => "Ukrainian",
            TranslationLanguage::German => "German",
            TranslationLanguage::Polish => "Polish",
            TranslationLanguage::French => "French",
            TranslationLanguage::Spanish => "Spanish",
        }
    }

    fn examples(&self) -> &'static str {
        match self {
            TranslationLanguage::Ukrainian => {
                r#""Hello" → "Привіт", "Thank you" → "Дякую", "How are you?" → "Як справи?""#
            }
            TranslationLanguage::German => {
                r#""Hello" → "Hallo", "Thank you" → "Danke", "How are you?" → "Wie geht es dir?""#
            }
            TranslationLanguage::Polish => {
                r#""Hello" → "Cześć", "Thank you" → "Dziękuję", "How are you?" → "Jak się masz?""#
            }
            TranslationLanguage::French => {
                r#""Hello" → "Bonjour", "Thank you" → "Merci", "How are you?" → "Comment allez-vous?""#
            }
            TranslationLanguage::Spanish => {
                r#""Hello" → "Hola", "Thank you" → "Gracias", "How are you?" → "¿Cómo estás?""#
            }
        }
    }

    /// Shown in place of a translation that came back unchanged.
    pub fn not_found_message(&self) -> &'static str {
        match self {
            TranslationLanguage::Ukrainian => "Переклад не знайдено",
            TranslationLanguage::German => "Übersetzung nicht gefunden",
            TranslationLanguage::Polish => "Tłumaczenie nie znalezione",
            TranslationLanguage::French => "Traduction non trouvée",
            TranslationLanguage::Spanish => "Traducción no encontrada",
        }
    }
}

impl fmt::Display for TranslationLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TranslationLanguage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|lang| lang.as_str() == wanted)
            .ok_or_else(|| format!("unknown translation language: {s}"))
    }
}

static UKRAINIAN_WORDS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("hello", "привіт"),
        ("hi", "привіт"),
        ("thank you", "дякую"),
        ("thanks", "дякую"),
        ("please", "будь ласка"),
        ("yes", "так"),
        ("no", "ні"),
        ("good", "хороший"),
        ("bad", "поганий"),
        ("big", "великий"),
        ("small", "малий"),
        ("house", "будинок"),
        ("food", "їжа"),
        ("water", "вода"),
        ("friend", "друг"),
        ("family", "сім'я"),
        ("work", "робота"),
        ("home", "дім"),
        ("school", "школа"),
        ("book", "книга"),
        ("phone", "телефон"),
        ("time", "час"),
        ("day", "день"),
        ("night", "ніч"),
        ("red", "червоний"),
        ("blue", "синій"),
        ("green", "зелений"),
        ("yellow", "жовтий"),
        ("black", "чорний"),
        ("white", "білий"),
        ("one", "один"),
        ("two", "два"),
        ("three", "три"),
        ("four", "чотири"),
        ("five", "п'ять"),
    ])
});

/// Offline lookup used when the provider is unavailable.
pub fn dictionary_translation(text: &str, lang: TranslationLanguage) -> Option<&'static str> {
    match lang {
        TranslationLanguage::Ukrainian => UKRAINIAN_WORDS
            .get(text.trim().to_lowercase().as_str())
            .copied(),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Translation {
    pub original: String,
    pub translation: String,
}

pub struct Translator {
    provider: Arc<dyn LlmProvider>,
    retry: RetryPolicy,
    usage: Arc<UsageLog>,
}

impl Translator {
    pub fn new(provider: Arc<dyn LlmProvider>, retry: RetryPolicy, usage: Arc<UsageLog>) -> Self {
        Self {
            provider,
            retry,
            usage,
        }
    }

    /// Translate `text`; on provider failure fall back to the dictionary,
    /// then to the input itself.
    pub async fn translate(&self, text: &str, lang: TranslationLanguage) -> String {
        let request = LlmRequest::new(vec![PromptSegment::plain(translator_prompt(lang))])
            .with_user_message(text)
            .with_max_tokens(TRANSLATION_MAX_TOKENS)
            .with_temperature(TRANSLATION_TEMPERATURE);

        let provider = &self.provider;
        let request = &request;
        match self.retry.run(move || provider.complete(request)).await {
            Ok(response) => {
                self.usage.record_call(
                    "translation",
                    UsageKind::Translation,
                    TRANSLATION_TOPIC,
                    lang.as_str(),
                    &response,
                );
                let translated = response.content.trim();
                if !translated.is_empty() {
                    info!(language = %lang, chars = text.chars().count(), "Translated text");
                    return translated.to_string();
                }
                warn!(language = %lang, "Empty translation, using fallback");
            }
            Err(e) => {
                self.usage.record_failure(
                    "translation",
                    UsageKind::Translation,
                    TRANSLATION_TOPIC,
                    lang.as_str(),
                    &e,
                );
                warn!(language = %lang, error = %e, "Translation failed, using fallback");
            }
        }

        dictionary_translation(text, lang)
            .map(str::to_string)
            .unwrap_or_else(|| text.to_string())
    }

    pub async fn get_translation(&self, text: &str, lang: TranslationLanguage) -> Translation {
        let translated = self.translate(text, lang).await;
        let translation = if translated == text {
            lang.not_found_message().to_string()
        } else {
            translated
        };
        Translation {
            original: text.to_string(),
            translation,
        }
    }
}

fn translator_prompt(lang: TranslationLanguage) -> String {
    let target = lang.display_name();
    format!(
        "You are a professional English to {target} translator.\n\
         \n\
         TASK: Translate the given English text to {target}.\n\
         REQUIREMENTS:\n\
         - Provide ONLY the {target} translation\n\
         - Keep the same tone and formality level\n\
         - Preserve formatting if present\n\
         \n\
         EXAMPLES: {examples}\n\
         \n\
         Translate to {target}:",
        examples = lang.examples()
    )
}
