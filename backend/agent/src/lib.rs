//! Storytalk conversation orchestration
//!
//! Context windowing, progressive summarization, prompt assembly, provider
//! routing, scenario generation, translation help and usage accounting.

pub mod context_window;
pub mod router;
pub mod scenario;
pub mod settings;
pub mod summarizer;
pub mod summary;
pub mod system_prompt;
pub mod themes;
pub mod translation;
pub mod usage;

pub use context_window::ContextWindow;
pub use router::{Route, TutorService};
pub use scenario::{fallback_scenario, parse_scenario, ScenarioGenerator};
pub use settings::ConversationSettings;
pub use summarizer::{Summarizer, SummaryStats};
pub use summary::{parse_summary, ConversationSummary};
pub use system_prompt::PromptBuilder;
pub use themes::pick_theme;
pub use translation::{Translation, TranslationLanguage, Translator};
pub use usage::{UsageKind, UsageLog, UsageReport, UsageStat, UsageTotals};
