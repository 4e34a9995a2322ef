//! Progressive summarization of turns that leave the live window.
//!
//! Summaries are per conversation and live in a bounded, idle-expiring store.
//! Generation is best-effort: any provider failure yields an empty digest and
//! the turn carries on without it.

use std::sync::Arc;

use moka::sync::Cache;
use tracing::{debug, info, warn};

use storytalk_core::{ConversationContext, LlmProvider, LlmRequest, PromptSegment, Role, Turn};
use storytalk_providers::RetryPolicy;

use crate::context_window::ContextWindow;
use crate::settings::ConversationSettings;
use crate::summary::{parse_summary, ConversationSummary};

const SUMMARY_MAX_TOKENS: u32 = 300;
const SUMMARY_TEMPERATURE: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryStats {
    pub active_conversations: u64,
}

pub struct Summarizer {
    provider: Arc<dyn LlmProvider>,
    retry: RetryPolicy,
    settings: ConversationSettings,
    /// Merged digest per conversation id.
    summaries: Cache<String, ConversationSummary>,
    /// Digest produced for a given (conversation id, eligible turn count).
    batches: Cache<(String, usize), ConversationSummary>,
}

impl Summarizer {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        retry: RetryPolicy,
        settings: ConversationSettings,
    ) -> Self {
        let summaries = Cache::builder()
            .max_capacity(settings.max_conversations)
            .time_to_idle(settings.summary_ttl)
            .build();
        let batches = Cache::builder()
            .max_capacity(settings.max_conversations)
            .time_to_idle(settings.summary_ttl)
            .build();
        Self {
            provider,
            retry,
            settings,
            summaries,
            batches,
        }
    }

    /// Digest of the turns outside the window, or empty when the window
    /// still holds everything or the eligible count is off a batch boundary.
    pub async fn generate_summary(&self, ctx: &ConversationContext) -> ConversationSummary {
        let window = ContextWindow::build(&ctx.history, self.settings.window_turns);
        if window.eligible_count() == 0 {
            return ConversationSummary::empty();
        }
        if !window.should_summarize(self.settings.summary_batch) {
            debug!(
                conversation_id = %ctx.conversation_id,
                eligible = window.eligible_count(),
                batch = self.settings.summary_batch,
                "Skipping summary until next batch boundary"
            );
            return ConversationSummary::empty();
        }

        let key = (ctx.conversation_id.clone(), window.eligible_count());
        if let Some(cached) = self.batches.get(&key) {
            debug!(
                conversation_id = %ctx.conversation_id,
                eligible = key.1,
                "Using cached summary batch"
            );
            return cached;
        }

        let request = LlmRequest::new(vec![PromptSegment::plain(extraction_prompt(ctx))])
            .with_user_message(render_eligible(window.eligible))
            .with_max_tokens(SUMMARY_MAX_TOKENS)
            .with_temperature(SUMMARY_TEMPERATURE);

        let provider = &self.provider;
        let request = &request;
        match self.retry.run(move || provider.complete(request)).await {
            Ok(response) => {
                let summary = parse_summary(&response.content, &ctx.topic);
                info!(
                    conversation_id = %ctx.conversation_id,
                    eligible = key.1,
                    topics = summary.key_topics.len(),
                    vocabulary = summary.vocabulary.len(),
                    "Generated conversation summary"
                );
                self.batches.insert(key, summary.clone());
                summary
            }
            Err(e) => {
                warn!(
                    conversation_id = %ctx.conversation_id,
                    error = %e,
                    "Summary generation failed, continuing without it"
                );
                ConversationSummary::empty()
            }
        }
    }

    /// Generate (when due) and merge into the stored digest.
    pub async fn update_summary(&self, ctx: &ConversationContext) -> ConversationSummary {
        let existing = self
            .summaries
            .get(&ctx.conversation_id)
            .unwrap_or_default();
        let fresh = self.generate_summary(ctx).await;
        let merged = existing.merge(&fresh);
        self.summaries
            .insert(ctx.conversation_id.clone(), merged.clone());
        merged
    }

    pub fn get_summary(&self, conversation_id: &str) -> Option<ConversationSummary> {
        self.summaries.get(conversation_id)
    }

    pub fn clear_summary(&self, conversation_id: &str) {
        self.summaries.invalidate(conversation_id);
    }

    pub fn stats(&self) -> SummaryStats {
        self.summaries.run_pending_tasks();
        SummaryStats {
            active_conversations: self.summaries.entry_count(),
        }
    }
}

fn extraction_prompt(ctx: &ConversationContext) -> String {
    format!(
        r#"Analyze this English learning conversation and produce a concise summary.

TOPIC: {topic}
LEVEL: {level}

EXTRACT:
1. Key topics discussed (3-5 main points)
2. Preferences or interests the student mentioned
3. Grammar corrections that were made
4. New vocabulary introduced
5. Grammar points practised
6. Important context or details

Respond ONLY with a valid JSON object, nothing before or after it:
{{
  "keyTopics": ["topic1", "topic2", "topic3"],
  "userPreferences": ["preference1"],
  "corrections": ["correction1"],
  "vocabulary": ["word1", "word2"],
  "grammarPoints": ["grammar1"],
  "context": "Brief context summary"
}}

Keep each array item short (1-3 words). Focus on what matters for continuing the conversation."#,
        topic = ctx.topic,
        level = ctx.level,
    )
}

fn render_eligible(turns: &[Turn]) -> String {
    turns
        .iter()
        .map(|turn| {
            let speaker = match turn.role {
                Role::User => "Student",
                Role::Assistant => "Assistant",
            };
            format!("{speaker}: {}", turn.text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
