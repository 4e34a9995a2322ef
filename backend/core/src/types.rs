use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Learner proficiency for a story session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl Level {
    pub const ALL: [Level; 3] = [Level::Beginner, Level::Intermediate, Level::Advanced];

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Beginner => "beginner",
            Level::Intermediate => "intermediate",
            Level::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Ok(Level::Beginner),
            "intermediate" => Ok(Level::Intermediate),
            "advanced" => Ok(Level::Advanced),
            other => Err(format!("unknown level: {other}")),
        }
    }
}

/// Who produced a turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// A single entry of the conversation history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// State of one story session, owned by the caller for the session's lifetime.
///
/// Turns are appended after each exchange; nothing here is persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationContext {
    pub conversation_id: String,
    pub topic: String,
    pub level: Level,
    pub scenario: String,
    pub history: Vec<Turn>,
}

impl ConversationContext {
    pub fn new(topic: impl Into<String>, level: Level, scenario: impl Into<String>) -> Self {
        let topic = topic.into();
        Self {
            conversation_id: format!("{}-{}-{}", topic, level, Uuid::new_v4()),
            topic,
            level,
            scenario: scenario.into(),
            history: Vec::new(),
        }
    }

    pub fn with_conversation_id(mut self, id: impl Into<String>) -> Self {
        self.conversation_id = id.into();
        self
    }

    pub fn push_turn(&mut self, turn: Turn) {
        self.history.push(turn);
    }

    /// Append a completed user/assistant exchange.
    pub fn record_exchange(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        self.history.push(Turn::user(user));
        self.history.push(Turn::assistant(assistant));
    }
}

/// Role-play premise plus the assistant's opening line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub intro: String,
    pub first_message: String,
}

impl Scenario {
    pub fn new(intro: impl Into<String>, first_message: impl Into<String>) -> Self {
        Self {
            intro: intro.into(),
            first_message: first_message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_parses_case_insensitively() {
        assert_eq!("Beginner".parse::<Level>().unwrap(), Level::Beginner);
        assert_eq!(" advanced ".parse::<Level>().unwrap(), Level::Advanced);
        assert!("expert".parse::<Level>().is_err());
    }

    #[test]
    fn conversation_id_embeds_topic_and_level() {
        let ctx = ConversationContext::new("travel", Level::Intermediate, "At the airport");
        assert!(ctx.conversation_id.starts_with("travel-intermediate-"));
        assert!(ctx.history.is_empty());
    }

    #[test]
    fn record_exchange_appends_in_order() {
        let mut ctx = ConversationContext::new("travel", Level::Beginner, "")
            .with_conversation_id("c1");
        ctx.record_exchange("hi", "hello!");
        assert_eq!(ctx.conversation_id, "c1");
        assert_eq!(ctx.history, vec![Turn::user("hi"), Turn::assistant("hello!")]);
    }
}
