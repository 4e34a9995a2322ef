//! Tutor Event Logger
//!
//! Structured events (turns, provider calls, failures) emitted through
//! `tracing` under the `tutor_events` target.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::redact::redact_sensitive_data;

static REDACT_EVENTS: AtomicBool = AtomicBool::new(true);

/// Toggle masking of keys and phone numbers in event payloads (on by default).
pub fn set_event_redaction(enabled: bool) {
    REDACT_EVENTS.store(enabled, Ordering::Relaxed);
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TutorEvent {
    Turn {
        role: String,
        content: String,
    },
    ProviderCall {
        provider: String,
        model: String,
        input_tokens: u64,
        output_tokens: u64,
        cost: f64,
    },
    Error {
        error_msg: String,
    },
}

#[derive(Debug, Serialize)]
pub struct EventLogEntry {
    pub conversation_id: String,
    pub timestamp: DateTime<Utc>,
    pub event: TutorEvent,
}

impl EventLogEntry {
    pub fn new(conversation_id: &str, event: TutorEvent) -> Self {
        Self::with_redaction(conversation_id, event, REDACT_EVENTS.load(Ordering::Relaxed))
    }

    pub fn with_redaction(conversation_id: &str, mut event: TutorEvent, redact: bool) -> Self {
        match &mut event {
            _ if !redact => {}
            TutorEvent::Turn { content, .. } => {
                *content = redact_sensitive_data(content);
            }
            TutorEvent::Error { error_msg } => {
                *error_msg = redact_sensitive_data(error_msg);
            }
            TutorEvent::ProviderCall { .. } => {}
        }

        Self {
            conversation_id: conversation_id.into(),
            timestamp: Utc::now(),
            event,
        }
    }
}

pub struct EventLogger;

impl EventLogger {
    /// Redact and emit one event.
    pub fn log_event(conversation_id: &str, event: TutorEvent) {
        let entry = EventLogEntry::new(conversation_id, event);
        let json = serde_json::to_string(&entry).unwrap_or_default();
        info!(target: "tutor_events", event = %json, "Tutor event");
    }
}
