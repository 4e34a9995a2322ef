//! Token and cost accounting for provider calls.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use storytalk_core::{LlmResponse, ProviderError};
use storytalk_logging::{EventLogger, TutorEvent};
use storytalk_providers::cost_for;

/// An aggregate line is logged every this many requests.
const REPORT_EVERY: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageKind {
    Conversation,
    Scenario,
    Translation,
}

#[derive(Debug, Clone, Serialize)]
pub struct UsageStat {
    pub timestamp: DateTime<Utc>,
    pub kind: UsageKind,
    pub topic: String,
    pub level: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct UsageTotals {
    pub requests: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost: f64,
}

impl UsageTotals {
    pub fn average_cost(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            self.cost / self.requests as f64
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UsageReport {
    pub stats: Vec<UsageStat>,
    pub totals: UsageTotals,
}

#[derive(Default)]
struct UsageState {
    stats: VecDeque<UsageStat>,
    totals: UsageTotals,
}

/// Bounded log of recent calls plus all-time totals.
pub struct UsageLog {
    capacity: usize,
    state: Mutex<UsageState>,
}

impl UsageLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(UsageState::default()),
        }
    }

    pub fn record(&self, stat: UsageStat) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.totals.requests += 1;
        state.totals.input_tokens += stat.input_tokens;
        state.totals.output_tokens += stat.output_tokens;
        state.totals.cost += stat.cost;

        state.stats.push_back(stat);
        while state.stats.len() > self.capacity {
            state.stats.pop_front();
        }

        let totals = state.totals;
        if totals.requests % REPORT_EVERY == 0 {
            info!(
                requests = totals.requests,
                total_cost = %format!("{:.4}", totals.cost),
                total_tokens = totals.input_tokens + totals.output_tokens,
                average_cost = %format!("{:.6}", totals.average_cost()),
                "Total usage"
            );
        }
    }

    /// Price and record a completed call. Responses without usage are skipped.
    pub fn record_call(
        &self,
        conversation_id: &str,
        kind: UsageKind,
        topic: &str,
        level: &str,
        response: &LlmResponse,
    ) -> Option<f64> {
        let usage = response.usage?;
        let cost = cost_for(&response.model, usage);

        info!(
            provider = %response.provider,
            model = %response.model,
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            cost = %format!("{cost:.6}"),
            latency_ms = response.latency_ms,
            "Provider call completed"
        );
        EventLogger::log_event(
            conversation_id,
            TutorEvent::ProviderCall {
                provider: response.provider.clone(),
                model: response.model.clone(),
                input_tokens: usage.input_tokens,
                output_tokens: usage.output_tokens,
                cost,
            },
        );

        self.record(UsageStat {
            timestamp: Utc::now(),
            kind,
            topic: topic.to_string(),
            level: level.to_string(),
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            cost,
        });
        Some(cost)
    }

    /// Record a failed call that was still billed. Only `EmptyResponse`
    /// carries a response; every other failure is skipped.
    pub fn record_failure(
        &self,
        conversation_id: &str,
        kind: UsageKind,
        topic: &str,
        level: &str,
        error: &ProviderError,
    ) -> Option<f64> {
        match error {
            ProviderError::EmptyResponse { response } => {
                self.record_call(conversation_id, kind, topic, level, response)
            }
            _ => None,
        }
    }

    pub fn report(&self) -> UsageReport {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        UsageReport {
            stats: state.stats.iter().cloned().collect(),
            totals: state.totals,
        }
    }

    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *state = UsageState::default();
        info!("Usage statistics cleared");
    }
}
