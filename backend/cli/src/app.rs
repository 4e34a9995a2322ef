//! Wires providers, summarizer and services from a prepared config.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use storytalk_agent::{ConversationSettings, ScenarioGenerator, Summarizer, Translator, TutorService, UsageLog};
use storytalk_config::{ProviderConfig, StorytalkConfig};
use storytalk_core::LlmProvider;
use storytalk_providers::{AnthropicProvider, OpenAiProvider, ProviderRegistry, RetryPolicy};

pub const PRIMARY_PROVIDER: &str = "anthropic";
pub const CYRILLIC_PROVIDER: &str = "openai";

pub struct App {
    pub registry: ProviderRegistry,
    pub tutor: TutorService,
    pub scenarios: ScenarioGenerator,
    pub translator: Translator,
}

impl App {
    pub fn from_config(config: &StorytalkConfig) -> Result<Self> {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(anthropic_provider(&config.anthropic())));
        registry.register(Arc::new(openai_provider(&config.openai())));

        let primary = registry
            .get(PRIMARY_PROVIDER)
            .context("primary provider not registered")?;
        let cyrillic = registry
            .get(CYRILLIC_PROVIDER)
            .context("cyrillic provider not registered")?;

        let settings = conversation_settings(config);
        let retry = retry_policy(config);
        let usage = Arc::new(UsageLog::new(settings.usage_log_capacity));

        let summarizer = Arc::new(Summarizer::new(
            Arc::clone(&primary),
            retry.clone(),
            settings.clone(),
        ));
        let tutor = TutorService::new(
            Arc::clone(&primary),
            cyrillic,
            summarizer,
            retry.clone(),
            Arc::clone(&usage),
            settings,
        );
        let scenarios =
            ScenarioGenerator::new(Arc::clone(&primary), retry.clone(), Arc::clone(&usage));
        let translator = Translator::new(primary, retry, usage);

        info!(providers = ?registry.list(), "Tutor services ready");
        Ok(Self {
            registry,
            tutor,
            scenarios,
            translator,
        })
    }

    pub fn provider(&self, name: &str) -> Option<Arc<dyn LlmProvider>> {
        self.registry.get(name)
    }
}

fn anthropic_provider(cfg: &ProviderConfig) -> AnthropicProvider {
    let mut provider = AnthropicProvider::new(cfg.api_key().unwrap_or_default());
    if let Some(url) = &cfg.base_url {
        provider = provider.with_base_url(url);
    }
    if let Some(model) = &cfg.model {
        provider = provider.with_model(model);
    }
    if let Some(max_tokens) = cfg.max_tokens {
        provider = provider.with_max_tokens(max_tokens);
    }
    if let Some(temperature) = cfg.temperature {
        provider = provider.with_temperature(temperature);
    }
    provider
}

fn openai_provider(cfg: &ProviderConfig) -> OpenAiProvider {
    let mut provider = OpenAiProvider::new(cfg.api_key().unwrap_or_default());
    if let Some(url) = &cfg.base_url {
        provider = provider.with_base_url(url);
    }
    if let Some(model) = &cfg.model {
        provider = provider.with_model(model);
    }
    if let Some(max_tokens) = cfg.max_tokens {
        provider = provider.with_max_tokens(max_tokens);
    }
    if let Some(temperature) = cfg.temperature {
        provider = provider.with_temperature(temperature);
    }
    provider
}

pub fn conversation_settings(config: &StorytalkConfig) -> ConversationSettings {
    let conversation = config.conversation();
    let defaults = ConversationSettings::default();
    ConversationSettings {
        window_turns: conversation.window_turns.unwrap_or(defaults.window_turns),
        summary_batch: conversation.summary_batch.unwrap_or(defaults.summary_batch),
        summary_ttl: conversation
            .summary_ttl_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.summary_ttl),
        max_conversations: conversation
            .max_conversations
            .unwrap_or(defaults.max_conversations),
        usage_log_capacity: conversation
            .usage_log_capacity
            .unwrap_or(defaults.usage_log_capacity),
    }
}

pub fn retry_policy(config: &StorytalkConfig) -> RetryPolicy {
    let retry = config.retry();
    let defaults = RetryPolicy::default();
    RetryPolicy::new(
        retry.max_retries.unwrap_or(defaults.max_retries),
        retry.base_delay_ms.unwrap_or(defaults.base_delay_ms),
    )
}
