//! Role-play prompt assembly.
//!
//! The system prompt is stable for a whole session, so it goes out as its own
//! cacheable segment; the summary and recent transcript form the second one.

use storytalk_core::{ConversationContext, Level, PromptSegment, Role, Turn};

use crate::summary::ConversationSummary;

pub struct PromptBuilder;

impl PromptBuilder {
    pub fn level_guidance(level: Level) -> &'static str {
        match level {
            Level::Beginner => "A1-A2 vocabulary, simple sentences, basic tenses",
            Level::Intermediate => "common vocabulary, normal sentences, simple connectors",
            Level::Advanced => "sophisticated vocabulary, complex structures, idioms",
        }
    }

    pub fn system_prompt(ctx: &ConversationContext) -> String {
        format!(
            "English conversation partner in a learning role-play.\n\
             \n\
             CONTEXT: {topic} | {level} | {scenario}\n\
             \n\
             RULES:\n\
             1. Stay in your role (guide, shopkeeper, assistant) for the whole scene\n\
             2. Keep replies short: one or two sentences\n\
             3. Correct gently: \"You mean [correct]. [why]\"\n\
             4. Always end with a follow-up question\n\
             5. Emojis and **bold** are welcome\n\
             6. You open the conversation and keep it moving\n\
             7. The student is the visitor, you are the helper\n\
             8. Speak only, no descriptions of actions\n\
             9. Never narrate what your character does\n\
             \n\
             LANGUAGE: {guidance}\n\
             \n\
             RESPONSES:\n\
             - Short input (\"ok\", \"yes\") -> continue with a question\n\
             - Mistakes -> correct, explain, then ask a question\n\
             - Empty input -> ask a relevant question\n\
             \n\
             Example: \"I go store\" -> \"You mean 'I went to the store'. Use 'went' for the past. What did you buy?\"\n\
             \n\
             Stay helpful, in character, and engaging.",
            topic = ctx.topic,
            level = ctx.level,
            scenario = ctx.scenario,
            guidance = Self::level_guidance(ctx.level),
        )
    }

    /// Summary block (if any) followed by `Student:` / `You:` lines.
    pub fn transcript(summary: Option<&ConversationSummary>, window: &[Turn]) -> String {
        let mut history = String::new();

        if let Some(summary) = summary {
            let block = summary.format_for_prompt();
            if !block.is_empty() {
                history.push_str(&block);
                history.push('\n');
            }
        }

        for turn in window {
            let speaker = match turn.role {
                Role::User => "Student",
                Role::Assistant => "You",
            };
            history.push_str(&format!("{speaker}: {}\n", turn.text));
        }
        history
    }

    /// Segments for providers with prompt caching. The history segment is
    /// omitted on the first turn.
    pub fn cached_segments(system: &str, transcript: &str) -> Vec<PromptSegment> {
        let mut segments = vec![PromptSegment::cached(system)];
        if !transcript.trim().is_empty() {
            segments.push(PromptSegment::cached(format!(
                "Previous conversation:\n{transcript}"
            )));
        }
        segments
    }

    /// Single-message prompt for chat APIs that take everything as one system turn.
    pub fn inline_prompt(system: &str, transcript: &str, user_message: &str) -> String {
        let mut prompt = system.to_string();
        if !transcript.trim().is_empty() {
            prompt.push_str(&format!("\n\nPrevious conversation:\n{transcript}"));
        }
        prompt.push_str(&format!("\n\nUser: {user_message}\nAssistant:"));
        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(level: Level) -> ConversationContext {
        ConversationContext::new("travel", level, "You need help finding your hotel.")
    }

    #[test]
    fn system_prompt_carries_context_and_level_rules() {
        let prompt = PromptBuilder::system_prompt(&context(Level::Beginner));
        assert!(prompt.contains("CONTEXT: travel | beginner | You need help finding your hotel."));
        assert!(prompt.contains("LANGUAGE: A1-A2 vocabulary"));
        assert!(prompt.contains("9. Never narrate"));

        let advanced = PromptBuilder::system_prompt(&context(Level::Advanced));
        assert!(advanced.contains("idioms"));
    }

    #[test]
    fn transcript_alternates_speakers() {
        let turns = vec![Turn::assistant("Hello! Need help?"), Turn::user("Yes please")];
        let transcript = PromptBuilder::transcript(None, &turns);
        assert_eq!(transcript, "You: Hello! Need help?\nStudent: Yes please\n");
    }

    #[test]
    fn transcript_puts_summary_first() {
        let mut summary = ConversationSummary::empty();
        summary.vocabulary = vec!["check-in".into()];
        let turns = vec![Turn::user("hi")];
        let transcript = PromptBuilder::transcript(Some(&summary), &turns);
        assert_eq!(
            transcript,
            "CONVERSATION SUMMARY:\nIntroduced vocabulary: check-in\n\nStudent: hi\n"
        );
    }

    #[test]
    fn empty_summary_adds_nothing() {
        let transcript =
            PromptBuilder::transcript(Some(&ConversationSummary::empty()), &[Turn::user("hi")]);
        assert_eq!(transcript, "Student: hi\n");
    }

    #[test]
    fn first_turn_has_single_segment() {
        let segments = PromptBuilder::cached_segments("system", "  \n");
        assert_eq!(segments, vec![PromptSegment::cached("system")]);

        let segments = PromptBuilder::cached_segments("system", "Student: hi\n");
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].text, "Previous conversation:\nStudent: hi\n");
        assert!(segments.iter().all(|s| s.cacheable));
    }

    #[test]
    fn inline_prompt_ends_with_assistant_cue() {
        let prompt = PromptBuilder::inline_prompt("system", "Student: hi\n", "Привіт");
        assert_eq!(
            prompt,
            "system\n\nPrevious conversation:\nStudent: hi\n\n\nUser: Привіт\nAssistant:"
        );
        let first = PromptBuilder::inline_prompt("system", "", "hello");
        assert_eq!(first, "system\n\nUser: hello\nAssistant:");
    }
}
