use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use storytalk_core::{LlmProvider, LlmRequest, LlmResponse, ProviderError, TokenUsage};

/// A mock LLM provider that returns canned responses.
///
/// Scripted results are consumed in order; once the script is empty every
/// call gets the fixed response (or fails, if `always_fail` is set).
/// Empty content comes back as `EmptyResponse` carrying the usage, the way
/// the HTTP providers report it.
pub struct MockProvider {
    name: String,
    fixed_response: Option<String>,
    always_fail: Option<ProviderError>,
    usage: Option<TokenUsage>,
    script: Mutex<VecDeque<Result<String, ProviderError>>>,
    requests: Mutex<Vec<LlmRequest>>,
    calls: AtomicUsize,
}

impl MockProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fixed_response: None,
            always_fail: None,
            usage: None,
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.fixed_response = Some(response.into());
        self
    }

    pub fn with_usage(mut self, input_tokens: u64, output_tokens: u64) -> Self {
        self.usage = Some(TokenUsage {
            input_tokens,
            output_tokens,
        });
        self
    }

    pub fn failing(mut self, error: ProviderError) -> Self {
        self.always_fail = Some(error);
        self
    }

    pub fn push_result(self, result: Result<String, ProviderError>) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(result);
        }
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn last_request(&self) -> Option<LlmRequest> {
        self.requests.lock().ok().and_then(|r| r.last().cloned())
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        let scripted = self.script.lock().ok().and_then(|mut s| s.pop_front());
        let content = match scripted {
            Some(result) => result?,
            None => match &self.always_fail {
                Some(error) => return Err(error.clone()),
                None => self
                    .fixed_response
                    .clone()
                    .unwrap_or_else(|| "Mock response".to_string()),
            },
        };

        let response = LlmResponse {
            content,
            provider: self.name.clone(),
            model: request.model.clone().unwrap_or_else(|| "mock".to_string()),
            usage: self.usage,
            latency_ms: 0,
        };
        if response.content.is_empty() {
            return Err(ProviderError::EmptyResponse {
                response: Box::new(response),
            });
        }
        Ok(response)
    }
}
