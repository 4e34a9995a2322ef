//! Telemetry and structured logging for storytalk.
//!
//! Handles log redaction, JSON file output with daily rotation, and structured
//! tutor events (turns, provider calls, failures).

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{set_event_redaction, EventLogEntry, EventLogger, TutorEvent};
pub use logger::{init_console_logger, init_logger};
pub use redact::redact_sensitive_data;
