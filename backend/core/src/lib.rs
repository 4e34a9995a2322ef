pub mod error;
pub mod language;
pub mod traits;
pub mod types;

pub use error::{ProviderError, TutorError};
pub use language::{detect_language, Language};
pub use traits::{LlmProvider, LlmRequest, LlmResponse, PromptSegment, TokenUsage};
pub use types::{ConversationContext, Level, Role, Scenario, Turn};
