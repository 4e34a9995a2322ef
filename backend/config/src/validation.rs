//! Config validation: errors block startup, warnings are logged.

use thiserror::Error;

use crate::schema::{ProviderConfig, StorytalkConfig};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Retry counts above this stall a turn for minutes at the default delay.
const MAX_SENSIBLE_RETRIES: u32 = 6;

#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

pub fn validate(config: &StorytalkConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_provider(
        "providers.anthropic",
        &config.anthropic(),
        1.0,
        "conversation turns will fail",
        &mut report,
    );
    validate_provider(
        "providers.openai",
        &config.openai(),
        2.0,
        "Cyrillic messages will fail",
        &mut report,
    );
    validate_conversation(config, &mut report);
    validate_retry(config, &mut report);
    validate_logging(config, &mut report);
    report
}

fn validate_provider(
    path: &str,
    provider: &ProviderConfig,
    max_temperature: f32,
    impact: &str,
    report: &mut ValidationReport,
) {
    if provider.api_key().is_none() {
        report.warn(format!("{path}.apiKey"), format!("No API key configured; {impact}"));
    }
    if let Some(url) = &provider.base_url {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            report.error(format!("{path}.baseUrl"), "baseUrl must start with http:// or https://");
        }
    }
    if let Some(model) = &provider.model {
        if model.trim().is_empty() {
            report.error(format!("{path}.model"), "model cannot be empty");
        }
    }
    if provider.max_tokens == Some(0) {
        report.error(format!("{path}.maxTokens"), "maxTokens must be > 0");
    }
    if let Some(t) = provider.temperature {
        if !(0.0..=max_temperature).contains(&t) {
            report.error(
                format!("{path}.temperature"),
                format!("temperature must be between 0 and {max_temperature}"),
            );
        }
    }
}

fn validate_conversation(config: &StorytalkConfig, report: &mut ValidationReport) {
    let conversation = config.conversation();
    if conversation.window_turns == Some(0) {
        report.error("conversation.windowTurns", "windowTurns must be >= 1");
    }
    if conversation.summary_batch == Some(0) {
        report.error("conversation.summaryBatch", "summaryBatch must be >= 1");
    }
    if conversation.summary_ttl_secs == Some(0) {
        report.error("conversation.summaryTtlSecs", "summaryTtlSecs must be > 0");
    }
    if conversation.max_conversations == Some(0) {
        report.error("conversation.maxConversations", "maxConversations must be >= 1");
    }
    if conversation.usage_log_capacity == Some(0) {
        report.warn(
            "conversation.usageLogCapacity",
            "usageLogCapacity is 0; only usage totals will be kept",
        );
    }
}

fn validate_retry(config: &StorytalkConfig, report: &mut ValidationReport) {
    if let Some(retries) = config.retry().max_retries {
        if retries > MAX_SENSIBLE_RETRIES {
            report.warn(
                "retry.maxRetries",
                format!("{retries} retries with exponential backoff can stall a turn for minutes"),
            );
        }
    }
}

fn validate_logging(config: &StorytalkConfig, report: &mut ValidationReport) {
    if let Some(level) = &config.logging().level {
        if !LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
            report.error(
                "logging.level",
                format!("Unknown log level '{level}'. Use one of: {}", LOG_LEVELS.join(", ")),
            );
        }
    }
}
