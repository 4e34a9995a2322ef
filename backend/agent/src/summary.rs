//! Structured digest of the turns that fell out of the live window.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

pub const MAX_KEY_TOPICS: usize = 8;
pub const MAX_USER_PREFERENCES: usize = 6;
pub const MAX_CORRECTIONS: usize = 10;
pub const MAX_VOCABULARY: usize = 15;
pub const MAX_GRAMMAR_POINTS: usize = 8;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub key_topics: Vec<String>,
    pub user_preferences: Vec<String>,
    pub corrections: Vec<String>,
    pub vocabulary: Vec<String>,
    pub grammar_points: Vec<String>,
    pub context: String,
    pub last_updated: DateTime<Utc>,
}

impl Default for ConversationSummary {
    fn default() -> Self {
        Self::empty()
    }
}

impl ConversationSummary {
    pub fn empty() -> Self {
        Self {
            key_topics: Vec::new(),
            user_preferences: Vec::new(),
            corrections: Vec::new(),
            vocabulary: Vec::new(),
            grammar_points: Vec::new(),
            context: String::new(),
            last_updated: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.key_topics.is_empty()
            && self.user_preferences.is_empty()
            && self.corrections.is_empty()
            && self.vocabulary.is_empty()
            && self.grammar_points.is_empty()
            && self.context.is_empty()
    }

    /// Fold `newer` into `self`: ordered set union per field, capped, with
    /// the context appended unless it is already present.
    pub fn merge(&self, newer: &ConversationSummary) -> ConversationSummary {
        ConversationSummary {
            key_topics: union_capped(&self.key_topics, &newer.key_topics, MAX_KEY_TOPICS),
            user_preferences: union_capped(
                &self.user_preferences,
                &newer.user_preferences,
                MAX_USER_PREFERENCES,
            ),
            corrections: union_capped(&self.corrections, &newer.corrections, MAX_CORRECTIONS),
            vocabulary: union_capped(&self.vocabulary, &newer.vocabulary, MAX_VOCABULARY),
            grammar_points: union_capped(
                &self.grammar_points,
                &newer.grammar_points,
                MAX_GRAMMAR_POINTS,
            ),
            context: merge_context(&self.context, &newer.context),
            last_updated: Utc::now(),
        }
    }

    /// Render the block placed ahead of the transcript. Empty summaries render
    /// as an empty string.
    pub fn format_for_prompt(&self) -> String {
        if self.is_empty() {
            return String::new();
        }

        let mut text = String::from("CONVERSATION SUMMARY:\n");
        let sections: [(&str, &[String]); 5] = [
            ("Key topics", &self.key_topics),
            ("User interests", &self.user_preferences),
            ("Previous corrections", &self.corrections),
            ("Introduced vocabulary", &self.vocabulary),
            ("Grammar points", &self.grammar_points),
        ];
        for (label, items) in sections {
            if !items.is_empty() {
                text.push_str(&format!("{label}: {}\n", items.join(", ")));
            }
        }
        if !self.context.is_empty() {
            text.push_str(&format!("Context: {}\n", self.context));
        }
        text
    }
}

fn union_capped(existing: &[String], incoming: &[String], cap: usize) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(cap);
    for item in existing.iter().chain(incoming) {
        if merged.len() == cap {
            break;
        }
        if !merged.contains(item) {
            merged.push(item.clone());
        }
    }
    merged
}

fn merge_context(existing: &str, incoming: &str) -> String {
    let incoming = incoming.trim();
    if incoming.is_empty() || existing.contains(incoming) {
        existing.to_string()
    } else if existing.is_empty() {
        incoming.to_string()
    } else {
        format!("{existing} {incoming}")
    }
}

/// Wire shape of the extraction reply. Every field falls back to empty when
/// missing or of the wrong JSON type.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSummary {
    #[serde(default, deserialize_with = "string_list_or_empty")]
    key_topics: Vec<String>,
    #[serde(default, deserialize_with = "string_list_or_empty")]
    user_preferences: Vec<String>,
    #[serde(default, deserialize_with = "string_list_or_empty")]
    corrections: Vec<String>,
    #[serde(default, deserialize_with = "string_list_or_empty")]
    vocabulary: Vec<String>,
    #[serde(default, deserialize_with = "string_list_or_empty")]
    grammar_points: Vec<String>,
    #[serde(default, deserialize_with = "string_or_empty")]
    context: String,
}

fn string_list_or_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

fn string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s.trim().to_string(),
        _ => String::new(),
    })
}

impl From<RawSummary> for ConversationSummary {
    fn from(raw: RawSummary) -> Self {
        Self {
            key_topics: raw.key_topics,
            user_preferences: raw.user_preferences,
            corrections: raw.corrections,
            vocabulary: raw.vocabulary,
            grammar_points: raw.grammar_points,
            context: raw.context,
            last_updated: Utc::now(),
        }
    }
}

/// Parse the model's reply, degrading to keyword extraction when no JSON
/// object can be read from it.
pub fn parse_summary(raw: &str, topic: &str) -> ConversationSummary {
    match parse_json_object(raw) {
        Some(summary) => summary,
        None => {
            warn!(raw_len = raw.len(), "Summary reply was not valid JSON, using keyword fallback");
            keyword_fallback(raw, topic)
        }
    }
}

fn parse_json_object(raw: &str) -> Option<ConversationSummary> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str::<RawSummary>(&raw[start..=end])
        .ok()
        .map(ConversationSummary::from)
}

/// Coarse extraction from free text. Only reached when the model ignored the
/// JSON instruction.
pub fn keyword_fallback(raw: &str, topic: &str) -> ConversationSummary {
    let text = raw.to_lowercase();
    let mentions = |words: &[&str]| words.iter().any(|w| text.contains(w));

    let mut summary = ConversationSummary::empty();
    for (words, label) in [
        (&["travel", "trip", "visit"][..], "travel"),
        (&["hotel", "accommodation"][..], "accommodation"),
        (&["food", "restaurant"][..], "food"),
        (&["museum", "culture"][..], "culture"),
    ] {
        if mentions(words) {
            summary.key_topics.push(label.to_string());
        }
    }
    if mentions(&["like", "prefer"]) {
        summary.user_preferences.push("preferences mentioned".to_string());
    }
    if mentions(&["correction", "grammar"]) {
        summary.corrections.push("grammar corrections".to_string());
    }
    if mentions(&["vocabulary", "words"]) {
        summary.vocabulary.push("new vocabulary".to_string());
    }
    summary.context = format!("Fallback summary for {topic} conversation");
    summary
}
