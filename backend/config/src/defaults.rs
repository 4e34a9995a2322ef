//! Config defaults: fills every unset field after loading.

use crate::schema::{
    ConversationConfig, LoggingConfig, ProviderConfig, ProvidersConfig, RetryConfig,
    StorytalkConfig,
};

pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-haiku-20241022";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Reply budget for conversation turns.
pub const DEFAULT_MAX_TOKENS: u32 = 200;
pub const DEFAULT_TEMPERATURE: f32 = 0.3;

pub const DEFAULT_WINDOW_TURNS: usize = 10;
pub const DEFAULT_SUMMARY_BATCH: usize = 5;
pub const DEFAULT_SUMMARY_TTL_SECS: u64 = 60 * 60;
pub const DEFAULT_MAX_CONVERSATIONS: u64 = 1_000;
pub const DEFAULT_USAGE_LOG_CAPACITY: usize = 1_000;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BASE_DELAY_MS: u64 = 1_000;

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: StorytalkConfig) -> StorytalkConfig {
    let config = apply_provider_defaults(config);
    let config = apply_conversation_defaults(config);
    let config = apply_retry_defaults(config);
    apply_logging_defaults(config)
}

fn fill_provider(provider: &mut ProviderConfig, model: &str) {
    provider.model.get_or_insert_with(|| model.to_string());
    provider.max_tokens.get_or_insert(DEFAULT_MAX_TOKENS);
    provider.temperature.get_or_insert(DEFAULT_TEMPERATURE);
}

fn apply_provider_defaults(mut config: StorytalkConfig) -> StorytalkConfig {
    let providers = config.providers.get_or_insert_with(ProvidersConfig::default);
    fill_provider(
        providers.anthropic.get_or_insert_with(ProviderConfig::default),
        DEFAULT_ANTHROPIC_MODEL,
    );
    fill_provider(
        providers.openai.get_or_insert_with(ProviderConfig::default),
        DEFAULT_OPENAI_MODEL,
    );
    config
}

fn apply_conversation_defaults(mut config: StorytalkConfig) -> StorytalkConfig {
    let conversation = config
        .conversation
        .get_or_insert_with(ConversationConfig::default);
    conversation.window_turns.get_or_insert(DEFAULT_WINDOW_TURNS);
    conversation.summary_batch.get_or_insert(DEFAULT_SUMMARY_BATCH);
    conversation
        .summary_ttl_secs
        .get_or_insert(DEFAULT_SUMMARY_TTL_SECS);
    conversation
        .max_conversations
        .get_or_insert(DEFAULT_MAX_CONVERSATIONS);
    conversation
        .usage_log_capacity
        .get_or_insert(DEFAULT_USAGE_LOG_CAPACITY);
    config
}

fn apply_retry_defaults(mut config: StorytalkConfig) -> StorytalkConfig {
    let retry = config.retry.get_or_insert_with(RetryConfig::default);
    retry.max_retries.get_or_insert(DEFAULT_MAX_RETRIES);
    retry.base_delay_ms.get_or_insert(DEFAULT_BASE_DELAY_MS);
    config
}

fn apply_logging_defaults(mut config: StorytalkConfig) -> StorytalkConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    logging
        .level
        .get_or_insert_with(|| DEFAULT_LOG_LEVEL.to_string());
    logging.redact_sensitive.get_or_insert(true);
    config
}
