//! Provider routing for conversation turns.
//!
//! Each turn is detected, prompted, sent through the retry policy to the
//! provider its language maps to, and priced into the usage log. Provider
//! failures surface as [`TutorError`]; summarization never fails a turn.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError};

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info};

use storytalk_core::{
    detect_language, ConversationContext, Language, LlmProvider, LlmRequest, PromptSegment,
    TutorError,
};
use storytalk_logging::{EventLogger, TutorEvent};
use storytalk_providers::RetryPolicy;

use crate::context_window::ContextWindow;
use crate::settings::ConversationSettings;
use crate::summarizer::Summarizer;
use crate::system_prompt::PromptBuilder;
use crate::usage::{UsageKind, UsageLog, UsageReport};

/// Which provider a turn goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Messaging API with prompt caching.
    Primary,
    /// Chat completion API, used for Cyrillic input.
    Cyrillic,
}

impl Route {
    pub fn for_language(language: Language) -> Self {
        match language {
            Language::Cyrillic => Route::Cyrillic,
            Language::English | Language::Other => Route::Primary,
        }
    }

    pub fn for_message(message: &str) -> Self {
        Self::for_language(detect_language(message))
    }
}

/// Per-conversation turn locks. An entry lives exactly as long as some turn
/// holds or waits on it, so it cannot expire under a slow turn.
#[derive(Default)]
struct TurnLocks {
    locks: std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TurnLocks {
    async fn acquire(&self, conversation_id: &str) -> TurnGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(conversation_id.to_string()).or_default())
        };
        let mut turn = TurnGuard {
            locks: self,
            conversation_id: conversation_id.to_string(),
            lock: Some(Arc::clone(&lock)),
            held: None,
        };
        turn.held = Some(lock.lock_owned().await);
        turn
    }

    #[cfg(test)]
    fn active(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Releases the turn and drops the map entry once nobody else needs it.
struct TurnGuard<'a> {
    locks: &'a TurnLocks,
    conversation_id: String,
    lock: Option<Arc<Mutex<()>>>,
    held: Option<OwnedMutexGuard<()>>,
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        self.held.take();
        let mut locks = self
            .locks
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Clones are only taken under the map lock, so a count of one here
        // means no other turn holds or awaits this conversation.
        self.lock.take();
        if locks
            .get(&self.conversation_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.conversation_id);
        }
    }
}

pub struct TutorService {
    primary: Arc<dyn LlmProvider>,
    cyrillic: Arc<dyn LlmProvider>,
    summarizer: Arc<Summarizer>,
    retry: RetryPolicy,
    usage: Arc<UsageLog>,
    settings: ConversationSettings,
    /// Serialises turns of the same conversation.
    turn_locks: TurnLocks,
}

impl TutorService {
    pub fn new(
        primary: Arc<dyn LlmProvider>,
        cyrillic: Arc<dyn LlmProvider>,
        summarizer: Arc<Summarizer>,
        retry: RetryPolicy,
        usage: Arc<UsageLog>,
        settings: ConversationSettings,
    ) -> Self {
        Self {
            primary,
            cyrillic,
            summarizer,
            retry,
            usage,
            settings,
            turn_locks: TurnLocks::default(),
        }
    }

    /// Produce the assistant reply for `user_message` given the prior turns
    /// in `ctx`. The caller appends both turns to the history afterwards.
    pub async fn generate_response(
        &self,
        ctx: &ConversationContext,
        user_message: &str,
    ) -> Result<String, TutorError> {
        let _turn = self.turn_locks.acquire(&ctx.conversation_id).await;

        EventLogger::log_event(
            &ctx.conversation_id,
            TutorEvent::Turn {
                role: "user".into(),
                content: user_message.to_string(),
            },
        );

        let summary = if ctx.history.len() > self.settings.window_turns {
            Some(self.summarizer.update_summary(ctx).await)
        } else {
            self.summarizer.get_summary(&ctx.conversation_id)
        };

        let window = ContextWindow::build(&ctx.history, self.settings.window_turns);
        let transcript = PromptBuilder::transcript(summary.as_ref(), window.recent);
        let system = PromptBuilder::system_prompt(ctx);

        let route = Route::for_message(user_message);
        let (provider, request) = match route {
            Route::Primary => (
                &self.primary,
                LlmRequest::new(PromptBuilder::cached_segments(&system, &transcript))
                    .with_user_message(user_message),
            ),
            Route::Cyrillic => (
                &self.cyrillic,
                LlmRequest::new(vec![PromptSegment::plain(PromptBuilder::inline_prompt(
                    &system,
                    &transcript,
                    user_message,
                ))]),
            ),
        };
        debug!(
            conversation_id = %ctx.conversation_id,
            provider = provider.name(),
            route = ?route,
            window_turns = window.recent.len(),
            "Routing turn"
        );

        let request = &request;
        match self.retry.run(move || provider.complete(request)).await {
            Ok(response) => {
                self.usage.record_call(
                    &ctx.conversation_id,
                    UsageKind::Conversation,
                    &ctx.topic,
                    ctx.level.as_str(),
                    &response,
                );
                info!(
                    conversation_id = %ctx.conversation_id,
                    provider = %response.provider,
                    latency_ms = response.latency_ms,
                    "Generated reply"
                );
                EventLogger::log_event(
                    &ctx.conversation_id,
                    TutorEvent::Turn {
                        role: "assistant".into(),
                        content: response.content.clone(),
                    },
                );
                Ok(response.content)
            }
            Err(e) => {
                self.usage.record_failure(
                    &ctx.conversation_id,
                    UsageKind::Conversation,
                    &ctx.topic,
                    ctx.level.as_str(),
                    &e,
                );
                error!(
                    conversation_id = %ctx.conversation_id,
                    provider = provider.name(),
                    error = %e,
                    "Turn failed"
                );
                EventLogger::log_event(
                    &ctx.conversation_id,
                    TutorEvent::Error {
                        error_msg: e.to_string(),
                    },
                );
                Err(TutorError::from(e))
            }
        }
    }

    pub fn summarizer(&self) -> &Arc<Summarizer> {
        &self.summarizer
    }

    pub fn usage_report(&self) -> UsageReport {
        self.usage.report()
    }

    pub fn clear_usage(&self) {
        self.usage.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use storytalk_core::{Level, LlmResponse, ProviderError};
    use storytalk_providers::MockProvider;

    struct Harness {
        primary: Arc<MockProvider>,
        cyrillic: Arc<MockProvider>,
        summary_model: Arc<MockProvider>,
        service: TutorService,
    }

    fn service_with(
        primary: Arc<dyn LlmProvider>,
        cyrillic: Arc<dyn LlmProvider>,
        summary_model: Arc<dyn LlmProvider>,
        settings: ConversationSettings,
    ) -> TutorService {
        let retry = RetryPolicy::new(2, 1);
        let summarizer = Arc::new(Summarizer::new(
            summary_model,
            retry.clone(),
            settings.clone(),
        ));
        TutorService::new(
            primary,
            cyrillic,
            summarizer,
            retry,
            Arc::new(UsageLog::new(100)),
            settings,
        )
    }

    fn harness(primary: MockProvider, cyrillic: MockProvider) -> Harness {
        let primary = Arc::new(primary);
        let cyrillic = Arc::new(cyrillic);
        let summary_model = Arc::new(
            MockProvider::new("summary").with_response(r#"{"keyTopics": ["hotels"]}"#),
        );
        let service = service_with(
            primary.clone(),
            cyrillic.clone(),
            summary_model.clone(),
            ConversationSettings::default(),
        );
        Harness {
            primary,
            cyrillic,
            summary_model,
            service,
        }
    }

    fn default_harness() -> Harness {
        harness(
            MockProvider::new("anthropic")
                .with_response("Great! Where do you want to go?")
                .with_usage(1_000, 50),
            MockProvider::new("openai")
                .with_response("Let's speak English! Where do you want to go?")
                .with_usage(900, 40),
        )
    }

    fn travel_context(turns: usize) -> ConversationContext {
        let mut ctx = ConversationContext::new(
            "travel",
            Level::Beginner,
            "You need help finding your hotel in a new city.",
        );
        for i in 1..=turns / 2 {
            ctx.record_exchange(format!("student-{:02}", i * 2 - 1), format!("tutor-{:02}", i * 2));
        }
        ctx
    }

    #[test]
    fn routes_by_detected_language() {
        assert_eq!(Route::for_message("Where is the hotel?"), Route::Primary);
        assert_eq!(Route::for_message("Où est l'hôtel?"), Route::Primary);
        assert_eq!(Route::for_message("Де готель?"), Route::Cyrillic);
        assert_eq!(Route::for_message("hotel де"), Route::Cyrillic);
    }

    #[tokio::test]
    async fn english_turn_uses_cached_segments() {
        let h = default_harness();
        let ctx = travel_context(2);

        let reply = h
            .service
            .generate_response(&ctx, "I want to see the museum.")
            .await
            .unwrap();
        assert_eq!(reply, "Great! Where do you want to go?");
        assert_eq!(h.primary.call_count(), 1);
        assert_eq!(h.cyrillic.call_count(), 0);

        let request = h.primary.last_request().unwrap();
        assert_eq!(request.system.len(), 2);
        assert!(request.system.iter().all(|s| s.cacheable));
        assert!(request.system[0].text.contains("CONTEXT: travel | beginner"));
        assert!(request.system[1].text.contains("Student: student-01"));
        assert!(request.system[1].text.contains("You: tutor-02"));
        assert_eq!(
            request.user_message.as_deref(),
            Some("I want to see the museum.")
        );
    }

    #[tokio::test]
    async fn cyrillic_turn_inlines_prompt() {
        let h = default_harness();
        let ctx = travel_context(2);

        let reply = h
            .service
            .generate_response(&ctx, "Я не розумію")
            .await
            .unwrap();
        assert_eq!(reply, "Let's speak English! Where do you want to go?");
        assert_eq!(h.primary.call_count(), 0);

        let request = h.cyrillic.last_request().unwrap();
        assert!(request.user_message.is_none());
        assert_eq!(request.system.len(), 1);
        let prompt = &request.system[0].text;
        assert!(prompt.contains("Student: student-01"));
        assert!(prompt.ends_with("User: Я не розумію\nAssistant:"));
    }

    #[tokio::test]
    async fn twelve_turns_keep_last_ten_without_summary() {
        let h = default_harness();
        let ctx = travel_context(12);
        assert_eq!(ctx.history.len(), 12);

        h.service
            .generate_response(&ctx, "Is it far?")
            .await
            .unwrap();

        assert_eq!(h.summary_model.call_count(), 0);
        let history = &h.primary.last_request().unwrap().system[1].text;
        assert!(!history.contains("CONVERSATION SUMMARY"));
        assert!(!history.contains("student-01"));
        assert!(!history.contains("tutor-02"));
        for i in 3..=12 {
            assert!(history.contains(&format!("-{i:02}")), "turn {i} missing");
        }
    }

    #[tokio::test]
    async fn fifteen_turns_fold_summary_into_history() {
        let h = default_harness();
        let mut ctx = travel_context(14);
        ctx.record_exchange("student-15", "tutor-16");
        ctx.history.pop();
        assert_eq!(ctx.history.len(), 15);

        h.service
            .generate_response(&ctx, "Thanks!")
            .await
            .unwrap();

        assert_eq!(h.summary_model.call_count(), 1);
        let history = &h.primary.last_request().unwrap().system[1].text;
        assert!(history.starts_with("Previous conversation:\nCONVERSATION SUMMARY:"));
        assert!(history.contains("hotels"));
        assert!(h
            .service
            .summarizer()
            .get_summary(&ctx.conversation_id)
            .is_some());
    }

    #[tokio::test]
    async fn auth_failure_is_not_retried() {
        let h = harness(
            MockProvider::new("anthropic").failing(ProviderError::from_status(401, "invalid x-api-key")),
            MockProvider::new("openai"),
        );
        let err = h
            .service
            .generate_response(&travel_context(0), "Hello")
            .await
            .unwrap_err();
        assert_eq!(err, TutorError::Configuration);
        assert_eq!(h.primary.call_count(), 1);
    }

    #[tokio::test]
    async fn overload_surfaces_after_retries() {
        let h = harness(
            MockProvider::new("anthropic"),
            MockProvider::new("openai").failing(ProviderError::from_status(529, "overloaded")),
        );
        let err = h
            .service
            .generate_response(&travel_context(0), "Привіт")
            .await
            .unwrap_err();
        assert_eq!(err, TutorError::Busy);
        assert_eq!(h.cyrillic.call_count(), 3);
    }

    #[tokio::test]
    async fn transient_failure_recovers() {
        let h = harness(
            MockProvider::new("anthropic")
                .push_result(Err(ProviderError::Transport("reset".into())))
                .with_response("Hello again!"),
            MockProvider::new("openai"),
        );
        let reply = h
            .service
            .generate_response(&travel_context(0), "Hello")
            .await
            .unwrap();
        assert_eq!(reply, "Hello again!");
        assert_eq!(h.primary.call_count(), 2);
    }

    #[tokio::test]
    async fn records_usage_per_turn() {
        let h = default_harness();
        let ctx = travel_context(0);

        h.service.generate_response(&ctx, "Hello").await.unwrap();
        h.service.generate_response(&ctx, "Привіт").await.unwrap();

        let report = h.service.usage_report();
        assert_eq!(report.totals.requests, 2);
        assert_eq!(report.totals.input_tokens, 1_900);
        assert_eq!(report.stats[0].kind, UsageKind::Conversation);
        assert_eq!(report.stats[0].topic, "travel");
        assert_eq!(report.stats[0].level, "beginner");

        h.service.clear_usage();
        assert!(h.service.usage_report().stats.is_empty());
    }

    #[tokio::test]
    async fn empty_reply_is_billed_once_and_not_retried() {
        let h = harness(
            MockProvider::new("anthropic")
                .push_result(Ok(String::new()))
                .with_usage(1_000, 0),
            MockProvider::new("openai"),
        );
        let err = h
            .service
            .generate_response(&travel_context(0), "Hello")
            .await
            .unwrap_err();
        assert_eq!(err, TutorError::Connectivity);
        assert_eq!(h.primary.call_count(), 1);

        let report = h.service.usage_report();
        assert_eq!(report.totals.requests, 1);
        assert_eq!(report.totals.input_tokens, 1_000);
        assert_eq!(report.stats[0].kind, UsageKind::Conversation);
        assert_eq!(report.stats[0].topic, "travel");
    }

    /// Sleeps on every call and remembers how many calls overlapped.
    struct SlowProvider {
        delay: Duration,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl SlowProvider {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }

        fn peak(&self) -> usize {
            self.peak.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LlmProvider for SlowProvider {
        fn name(&self) -> &str {
            "slow"
        }

        fn model(&self) -> &str {
            "mock"
        }

        async fn complete(&self, _request: &LlmRequest) -> Result<LlmResponse, ProviderError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(LlmResponse {
                content: "Sure, let's go.".into(),
                provider: "slow".into(),
                model: "mock".into(),
                usage: None,
                latency_ms: self.delay.as_millis() as u64,
            })
        }
    }

    fn slow_service(
        delay: Duration,
        settings: ConversationSettings,
    ) -> (Arc<SlowProvider>, TutorService) {
        let slow = Arc::new(SlowProvider::new(delay));
        let service = service_with(
            slow.clone(),
            Arc::new(MockProvider::new("openai")),
            Arc::new(MockProvider::new("summary")),
            settings,
        );
        (slow, service)
    }

    #[tokio::test]
    async fn turns_on_one_conversation_never_overlap() {
        let (slow, service) =
            slow_service(Duration::from_millis(50), ConversationSettings::default());
        let ctx = travel_context(2);

        let (a, b) = tokio::join!(
            service.generate_response(&ctx, "First"),
            service.generate_response(&ctx, "Second"),
        );
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(slow.peak(), 1);
        assert_eq!(service.turn_locks.active(), 0);
    }

    #[tokio::test]
    async fn slow_turn_keeps_its_lock_past_summary_ttl() {
        let settings = ConversationSettings {
            summary_ttl: Duration::from_millis(50),
            ..ConversationSettings::default()
        };
        let (slow, service) = slow_service(Duration::from_millis(300), settings);
        let ctx = travel_context(2);

        let (a, b) = tokio::join!(service.generate_response(&ctx, "First"), async {
            tokio::time::sleep(Duration::from_millis(150)).await;
            service.generate_response(&ctx, "Second").await
        });
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(slow.peak(), 1);
        assert_eq!(service.turn_locks.active(), 0);
    }

    #[tokio::test]
    async fn separate_conversations_run_side_by_side() {
        let (slow, service) =
            slow_service(Duration::from_millis(100), ConversationSettings::default());
        let first = travel_context(2);
        let second = travel_context(2);
        assert_ne!(first.conversation_id, second.conversation_id);

        let (a, b) = tokio::join!(
            service.generate_response(&first, "First"),
            service.generate_response(&second, "Second"),
        );
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(slow.peak(), 2);
    }
}
