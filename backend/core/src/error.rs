use thiserror::Error;

use crate::traits::LlmResponse;

/// Failure of a single provider call.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("authentication failed ({status}): {message}")]
    Auth { status: u16, message: String },

    #[error("provider overloaded ({status}): {message}")]
    Overloaded { status: u16, message: String },

    #[error("rate_limit exceeded: {message}")]
    RateLimited { message: String },

    #[error("provider returned {status}: {message}")]
    Http { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to decode provider response: {0}")]
    Decode(String),

    /// The call succeeded and was billed, but carried no usable text.
    /// `response` keeps the usage so callers can still account for it.
    #[error("{} returned no text content", response.provider)]
    EmptyResponse { response: Box<LlmResponse> },

    #[error("provider not configured: {0}")]
    NotConfigured(String),
}

impl ProviderError {
    /// Classify a non-success HTTP status and its body.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let message = body.into();
        let lower = message.to_ascii_lowercase();
        match status {
            401 | 403 => ProviderError::Auth { status, message },
            429 => ProviderError::RateLimited { message },
            503 | 529 => ProviderError::Overloaded { status, message },
            _ if lower.contains("rate_limit") => ProviderError::RateLimited { message },
            _ if lower.contains("overloaded") => ProviderError::Overloaded { status, message },
            _ => ProviderError::Http { status, message },
        }
    }

    /// Errors that no amount of retrying will fix. An empty reply is
    /// final too: each repeat is billed and the model answers the same way.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ProviderError::Auth { .. }
                | ProviderError::NotConfigured(_)
                | ProviderError::EmptyResponse { .. }
        )
    }
}

/// User-facing failure of a conversation turn.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TutorError {
    #[error("AI servers are currently busy. Please try again in a moment.")]
    Busy,

    #[error("Too many requests. Please wait a moment before trying again.")]
    RateLimited,

    #[error("Authentication error. Please check your API key configuration.")]
    Configuration,

    #[error("Failed to generate AI response. Please check your internet connection and try again.")]
    Connectivity,
}

impl From<ProviderError> for TutorError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Overloaded { .. } => TutorError::Busy,
            ProviderError::RateLimited { .. } => TutorError::RateLimited,
            ProviderError::Auth { .. } | ProviderError::NotConfigured(_) => {
                TutorError::Configuration
            }
            _ => TutorError::Connectivity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_statuses() {
        assert!(matches!(ProviderError::from_status(401, ""), ProviderError::Auth { .. }));
        assert!(matches!(ProviderError::from_status(403, ""), ProviderError::Auth { .. }));
        assert!(matches!(
            ProviderError::from_status(429, ""),
            ProviderError::RateLimited { .. }
        ));
        assert!(matches!(
            ProviderError::from_status(529, ""),
            ProviderError::Overloaded { .. }
        ));
        assert!(matches!(
            ProviderError::from_status(500, r#"{"type":"overloaded_error"}"#),
            ProviderError::Overloaded { .. }
        ));
        assert!(matches!(
            ProviderError::from_status(400, r#"{"error":{"type":"rate_limit_error"}}"#),
            ProviderError::RateLimited { .. }
        ));
        assert!(matches!(ProviderError::from_status(500, "boom"), ProviderError::Http { .. }));
    }

    #[test]
    fn auth_config_and_empty_replies_are_fatal() {
        assert!(ProviderError::from_status(401, "").is_fatal());
        assert!(ProviderError::NotConfigured("anthropic".into()).is_fatal());
        let empty = ProviderError::EmptyResponse {
            response: Box::new(LlmResponse {
                content: String::new(),
                provider: "anthropic".into(),
                model: "claude-3-5-sonnet-20241022".into(),
                usage: None,
                latency_ms: 0,
            }),
        };
        assert!(empty.is_fatal());
        assert_eq!(empty.to_string(), "anthropic returned no text content");
        assert!(!ProviderError::from_status(529, "").is_fatal());
        assert!(!ProviderError::Transport("reset".into()).is_fatal());
    }

    #[test]
    fn translates_to_user_facing_categories() {
        assert_eq!(TutorError::from(ProviderError::from_status(529, "")), TutorError::Busy);
        assert_eq!(
            TutorError::from(ProviderError::from_status(429, "")),
            TutorError::RateLimited
        );
        assert_eq!(
            TutorError::from(ProviderError::from_status(403, "")),
            TutorError::Configuration
        );
        assert_eq!(
            TutorError::from(ProviderError::Decode("eof".into())),
            TutorError::Connectivity
        );
    }
}
