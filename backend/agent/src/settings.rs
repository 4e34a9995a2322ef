//! Tuning knobs for the conversation window and summary store.

use std::time::Duration;

/// Turns kept verbatim in every prompt.
pub const DEFAULT_WINDOW_TURNS: usize = 10;

/// Summaries are recomputed only when the eligible turn count is a multiple of this.
pub const DEFAULT_SUMMARY_BATCH: usize = 5;

/// Idle time after which a conversation's summary is evicted.
pub const DEFAULT_SUMMARY_TTL: Duration = Duration::from_secs(60 * 60);

/// Upper bound on conversations with a live summary.
pub const DEFAULT_MAX_CONVERSATIONS: u64 = 1_000;

/// Usage entries retained for inspection; totals are kept regardless.
pub const DEFAULT_USAGE_LOG_CAPACITY: usize = 1_000;

#[derive(Debug, Clone)]
pub struct ConversationSettings {
    pub window_turns: usize,
    pub summary_batch: usize,
    pub summary_ttl: Duration,
    pub max_conversations: u64,
    pub usage_log_capacity: usize,
}

impl Default for ConversationSettings {
    fn default() -> Self {
        Self {
            window_turns: DEFAULT_WINDOW_TURNS,
            summary_batch: DEFAULT_SUMMARY_BATCH,
            summary_ttl: DEFAULT_SUMMARY_TTL,
            max_conversations: DEFAULT_MAX_CONVERSATIONS,
            usage_log_capacity: DEFAULT_USAGE_LOG_CAPACITY,
        }
    }
}
