//! Role-play premise generation with a static fallback table.
//!
//! Generation never fails: provider errors fall back to a per-topic/per-level
//! scenario, and unknown topics to a generic one built from the topic name.

use std::sync::Arc;

use tracing::{info, warn};

use storytalk_core::{Level, LlmProvider, LlmRequest, PromptSegment, ProviderError, Scenario};
use storytalk_providers::RetryPolicy;

use crate::themes::pick_theme;
use crate::usage::{UsageKind, UsageLog};

const SCENARIO_MAX_TOKENS: u32 = 120;
const SCENARIO_TEMPERATURE: f32 = 0.3;

const SCENARIO_PREFIX: &str = "SCENARIO:";
const FIRST_MESSAGE_PREFIX: &str = "FIRST_MESSAGE:";

pub struct ScenarioGenerator {
    provider: Arc<dyn LlmProvider>,
    retry: RetryPolicy,
    usage: Arc<UsageLog>,
}

impl ScenarioGenerator {
    pub fn new(provider: Arc<dyn LlmProvider>, retry: RetryPolicy, usage: Arc<UsageLog>) -> Self {
        Self {
            provider,
            retry,
            usage,
        }
    }

    pub async fn generate_scenario(&self, topic: &str, level: Level) -> Scenario {
        let theme = pick_theme(&mut rand::thread_rng());
        self.generate_with_theme(topic, level, theme).await
    }

    pub async fn generate_with_theme(&self, topic: &str, level: Level, theme: &str) -> Scenario {
        let request = LlmRequest::new(vec![PromptSegment::cached(scenario_prompt(
            topic, level, theme,
        ))])
        .with_user_message(format!(
            "Create a unique {level} level English conversation scenario about {topic}, \
             inspired by the theme \"{theme}\". Keep the situation realistic and engaging. \
             SCENARIO must be one sentence of at most 15 words. FIRST_MESSAGE must be one short sentence. \
             Make clear who the AI plays (supporting character) and who the student plays (main character)."
        ))
        .with_max_tokens(SCENARIO_MAX_TOKENS)
        .with_temperature(SCENARIO_TEMPERATURE);

        let provider = &self.provider;
        let request = &request;
        match self.retry.run(move || provider.complete(request)).await {
            Ok(response) => {
                self.usage.record_call(
                    "scenario",
                    UsageKind::Scenario,
                    topic,
                    level.as_str(),
                    &response,
                );
                let scenario = parse_scenario(&response.content);
                info!(topic = %topic, level = %level, theme = %theme, "Generated scenario");
                scenario
            }
            Err(e) => {
                self.usage.record_failure(
                    "scenario",
                    UsageKind::Scenario,
                    topic,
                    level.as_str(),
                    &e,
                );
                let reason = match &e {
                    ProviderError::Overloaded { .. } => "servers busy",
                    ProviderError::Auth { .. } | ProviderError::NotConfigured(_) => {
                        "authentication error"
                    }
                    _ => "api error",
                };
                warn!(topic = %topic, level = %level, reason, error = %e, "Using fallback scenario");
                fallback_scenario(topic, level)
            }
        }
    }
}

fn scenario_prompt(topic: &str, level: Level, theme: &str) -> String {
    let is_travel = topic.eq_ignore_ascii_case("travel");
    let mut prompt = format!(
        "Create a short English learning scenario.\n\
         \n\
         TOPIC: {topic}\n\
         LEVEL: {level}\n\
         THEME: {theme}\n\
         \n\
         REQUIREMENTS:\n\
         - SCENARIO: 1 sentence, max 12 words, clear situation\n\
         - FIRST_MESSAGE: 1 short sentence that starts the conversation\n\
         - The student is the visitor or customer, you are the guide, shopkeeper or assistant\n\
         - You ALWAYS start the conversation\n\
         - Keep it simple and logical\n"
    );
    if level == Level::Beginner {
        prompt.push_str("- Use ONLY A1-A2 vocabulary (basic words, simple sentences)\n");
    }
    if is_travel {
        prompt.push_str("- No magical agencies, supernatural elements, or fantasy travel\n");
    }
    prompt.push_str(
        "\nFORMAT:\n\
         SCENARIO: [clear situation in 1 sentence]\n\
         FIRST_MESSAGE: [1 sentence to start the conversation]\n\
         \n\
         EXAMPLES:\n\
         SCENARIO: You need help finding your hotel in a new city.\n\
         FIRST_MESSAGE: Hello! Can I help you find something?\n\
         \n\
         SCENARIO: You want to order food at a restaurant.\n\
         FIRST_MESSAGE: Welcome! What would you like to eat today?\n\
         \n\
         WRONG: \"You want to buy a laptop but think the price is too high\"\n\
         RIGHT: \"You're looking at laptops in a computer store\"\n\
         \n\
         AMBIGUOUS: \"You're at a train station helping a confused traveler\"\n\
         CLEAR: \"You're a station worker helping a lost tourist\"\n",
    );
    if is_travel {
        prompt.push_str(
            "\nWRONG: \"You visit a magical travel agency that grants wishes\"\n\
             RIGHT: \"You need help booking a flight at a travel agency\"\n",
        );
    }
    prompt.push_str(&format!(
        "\nCreate a scenario about {topic} using the theme \"{theme}\". Make it realistic and engaging."
    ));
    prompt
}

/// Read the two prefixed lines; a missing prefix leaves its field empty.
pub fn parse_scenario(text: &str) -> Scenario {
    let mut scenario = Scenario::default();
    for line in text.lines().map(str::trim) {
        if let Some(rest) = line.strip_prefix(SCENARIO_PREFIX) {
            scenario.intro = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix(FIRST_MESSAGE_PREFIX) {
            scenario.first_message = rest.trim().to_string();
        }
    }
    scenario
}

pub fn fallback_scenario(topic: &str, level: Level) -> Scenario {
    let (intro, first_message) = match (topic.trim().to_lowercase().as_str(), level) {
        ("travel", Level::Beginner) => (
            "You need help finding your hotel in a new city.",
            "Hello! Can I help you find something?",
        ),
        ("travel", Level::Intermediate) => (
            "You're lost and need directions to your destination.",
            "Hi! Do you need help finding your way?",
        ),
        ("travel", Level::Advanced) => (
            "You want to book a tour of the city.",
            "Welcome! What kind of tour interests you?",
        ),
        ("business", Level::Beginner) => (
            "You need help with your business meeting.",
            "Hello! How can I help you today?",
        ),
        ("business", Level::Intermediate) => (
            "You want to discuss a business proposal.",
            "Hi! What brings you to our office?",
        ),
        ("business", Level::Advanced) => (
            "You're presenting to potential investors.",
            "Good morning! What's your business idea?",
        ),
        ("daily life", Level::Beginner) => (
            "You want to buy something at the store.",
            "Hello! What can I help you find?",
        ),
        ("daily life", Level::Intermediate) => (
            "You need help choosing a gift for a friend.",
            "Hi! What kind of gift are you looking for?",
        ),
        ("daily life", Level::Advanced) => (
            "You want to join a local community event.",
            "Welcome! What interests you about our event?",
        ),
        ("mystery", Level::Beginner) => (
            "You found something strange and need help.",
            "Hello! What did you discover?",
        ),
        ("mystery", Level::Intermediate) => (
            "You're investigating a mysterious situation.",
            "Hi! What clues have you found?",
        ),
        ("mystery", Level::Advanced) => (
            "You're solving a complex puzzle.",
            "Interesting! What's your theory about this?",
        ),
        ("fantasy", Level::Beginner) => (
            "You want to learn magic from a wizard.",
            "Hello! Do you want to learn some spells?",
        ),
        ("fantasy", Level::Intermediate) => (
            "You discovered a magical object.",
            "Welcome! What magical item did you find?",
        ),
        ("fantasy", Level::Advanced) => (
            "You're exploring an enchanted realm.",
            "Greetings! What brings you to this magical place?",
        ),
        ("romance", Level::Beginner) => (
            "You want to talk to someone at a cafe.",
            "Hi! Do you like this coffee?",
        ),
        ("romance", Level::Intermediate) => (
            "You're at a party and want to meet people.",
            "Hello! What brings you to this party?",
        ),
        ("romance", Level::Advanced) => (
            "You're attending a cultural event.",
            "Good evening! What interests you about this event?",
        ),
        _ => return generic_scenario(topic),
    };
    Scenario::new(intro, first_message)
}

fn generic_scenario(topic: &str) -> Scenario {
    let topic = match topic.trim() {
        "" => "something new",
        t => t,
    };
    Scenario::new(
        format!("You see {topic}. You like {topic}."),
        "Hello! You good?",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use storytalk_providers::MockProvider;

    const TABLE_TOPICS: [&str; 6] = [
        "travel",
        "business",
        "daily life",
        "mystery",
        "fantasy",
        "romance",
    ];

    fn generator(provider: Arc<MockProvider>) -> ScenarioGenerator {
        ScenarioGenerator::new(provider, RetryPolicy::new(1, 1), Arc::new(UsageLog::new(10)))
    }

    #[test]
    fn parses_prefixed_lines() {
        let scenario = parse_scenario(
            "Sure!\n  SCENARIO: You are buying train tickets.  \nFIRST_MESSAGE: Hi! Where to?\n",
        );
        assert_eq!(
            scenario,
            Scenario::new("You are buying train tickets.", "Hi! Where to?")
        );
    }

    #[test]
    fn missing_prefix_leaves_field_empty() {
        let scenario = parse_scenario("SCENARIO: You are at the bakery.");
        assert_eq!(scenario.intro, "You are at the bakery.");
        assert_eq!(scenario.first_message, "");
    }

    #[test]
    fn fallback_table_covers_every_pair() {
        for topic in TABLE_TOPICS {
            for level in Level::ALL {
                let scenario = fallback_scenario(topic, level);
                assert!(!scenario.intro.is_empty(), "{topic}/{level}");
                assert!(!scenario.first_message.is_empty(), "{topic}/{level}");
                assert!(!scenario.intro.starts_with("You see"), "{topic}/{level}");
            }
        }
    }

    #[test]
    fn unknown_topic_gets_generic_scenario() {
        let scenario = fallback_scenario("cooking", Level::Advanced);
        assert_eq!(scenario.intro, "You see cooking. You like cooking.");
        assert_eq!(scenario.first_message, "Hello! You good?");

        let blank = fallback_scenario("  ", Level::Beginner);
        assert!(!blank.intro.is_empty());
    }

    #[test]
    fn travel_prompt_forbids_fantasy() {
        let prompt = scenario_prompt("travel", Level::Beginner, "hidden gems");
        assert!(prompt.contains("THEME: hidden gems"));
        assert!(prompt.contains("A1-A2"));
        assert!(prompt.contains("No magical agencies"));

        let prompt = scenario_prompt("fantasy", Level::Advanced, "time travel");
        assert!(!prompt.contains("A1-A2"));
        assert!(!prompt.contains("No magical agencies"));
    }

    #[tokio::test]
    async fn uses_provider_output() {
        let provider = Arc::new(
            MockProvider::new("anthropic")
                .with_response("SCENARIO: You want a window seat.\nFIRST_MESSAGE: Hello! May I see your ticket?")
                .with_usage(200, 30),
        );
        let usage = Arc::new(UsageLog::new(10));
        let generator = ScenarioGenerator::new(provider.clone(), RetryPolicy::new(0, 1), usage.clone());

        let scenario = generator
            .generate_with_theme("travel", Level::Intermediate, "budget travel")
            .await;
        assert_eq!(scenario.intro, "You want a window seat.");
        assert_eq!(scenario.first_message, "Hello! May I see your ticket?");

        let request = provider.last_request().unwrap();
        assert!(request.system[0].cacheable);
        assert_eq!(request.max_tokens, Some(120));
        assert_eq!(usage.report().totals.requests, 1);
        assert_eq!(usage.report().stats[0].kind, UsageKind::Scenario);
    }

    #[tokio::test]
    async fn provider_failure_falls_back_for_every_table_entry() {
        let provider = Arc::new(
            MockProvider::new("anthropic").failing(ProviderError::from_status(529, "overloaded")),
        );
        let generator = generator(provider.clone());

        for topic in TABLE_TOPICS {
            for level in Level::ALL {
                let scenario = generator.generate_scenario(topic, level).await;
                assert_eq!(scenario, fallback_scenario(topic, level));
            }
        }
        // One retry per call.
        assert_eq!(provider.call_count(), TABLE_TOPICS.len() * Level::ALL.len() * 2);
    }

    #[tokio::test]
    async fn auth_failure_falls_back_without_retry() {
        let provider = Arc::new(
            MockProvider::new("anthropic").failing(ProviderError::from_status(401, "bad key")),
        );
        let generator = generator(provider.clone());

        let scenario = generator.generate_scenario("space", Level::Beginner).await;
        assert_eq!(scenario.intro, "You see space. You like space.");
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn empty_reply_falls_back_and_is_billed_once() {
        let provider = Arc::new(
            MockProvider::new("anthropic")
                .push_result(Ok(String::new()))
                .with_usage(150, 0),
        );
        let usage = Arc::new(UsageLog::new(10));
        let generator = ScenarioGenerator::new(provider.clone(), RetryPolicy::new(3, 1), usage.clone());

        let scenario = generator
            .generate_with_theme("shopping", Level::Beginner, "local markets")
            .await;
        assert_eq!(scenario, fallback_scenario("shopping", Level::Beginner));
        assert_eq!(provider.call_count(), 1);
        assert_eq!(usage.report().totals.input_tokens, 150);
        assert_eq!(usage.report().stats[0].topic, "shopping");
    }
}
