//! Storytalk configuration schema.
//!
//! Every field is optional on disk; `apply_all_defaults` fills the gaps after
//! loading so callers can read the typed accessors without guessing.

use serde::{Deserialize, Serialize};

/// Root configuration, stored as camelCase YAML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorytalkConfig {
    /// LLM provider credentials and request tuning
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub providers: Option<ProvidersConfig>,

    /// Context window and summary store tuning
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation: Option<ConversationConfig>,

    /// Backoff for provider calls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryConfig>,

    /// Logging configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvidersConfig {
    /// Primary messaging API (prompt caching)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anthropic: Option<ProviderConfig>,

    /// Chat completion API used for Cyrillic input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai: Option<ProviderConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl ProviderConfig {
    /// The API key, treating an empty string as unset.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConversationConfig {
    /// Turns kept verbatim in each prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_turns: Option<usize>,
    /// Eligible-turn multiple that triggers a new summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_batch: Option<usize>,
    /// Idle seconds before a conversation's summary is evicted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_ttl_secs: Option<u64>,
    /// Cap on conversations with a live summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_conversations: Option<u64>,
    /// Recent usage entries kept in memory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_log_capacity: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RetryConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// "trace" | "debug" | "info" | "warn" | "error"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Directory for the rolling JSON log; console only when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
    /// Mask keys and phone numbers in event logs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redact_sensitive: Option<bool>,
}

impl StorytalkConfig {
    pub fn anthropic(&self) -> ProviderConfig {
        self.providers
            .as_ref()
            .and_then(|p| p.anthropic.clone())
            .unwrap_or_default()
    }

    pub fn openai(&self) -> ProviderConfig {
        self.providers
            .as_ref()
            .and_then(|p| p.openai.clone())
            .unwrap_or_default()
    }

    pub fn conversation(&self) -> ConversationConfig {
        self.conversation.clone().unwrap_or_default()
    }

    pub fn retry(&self) -> RetryConfig {
        self.retry.clone().unwrap_or_default()
    }

    pub fn logging(&self) -> LoggingConfig {
        self.logging.clone().unwrap_or_default()
    }
}
