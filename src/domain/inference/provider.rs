use std::fmt::Debug;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::message::{Message, TokenUsage};
use crate::domain::DomainError;

/// Provider-agnostic completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub system: String,
    pub messages: Vec<Message>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            system: system.into(),
            messages,
            temperature: 0.2,
            max_tokens: 1024,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Text produced by a single provider call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    pub model_id: String,
    pub usage: TokenUsage,
}

impl Completion {
    pub fn new(text: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model_id: model_id.into(),
            usage: TokenUsage::default(),
        }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = usage;
        self
    }
}

/// Capability shared by the cloud and local providers
#[async_trait]
pub trait InferenceProvider: Send + Sync + Debug {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, DomainError>;

    /// Short provider name used in logs and errors
    fn provider_name(&self) -> &'static str;

    /// Model this provider is configured to call
    fn model_id(&self) -> &str;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays queued outcomes, then falls back to a fixed reply
    #[derive(Debug)]
    pub struct MockInferenceProvider {
        name: &'static str,
        model: String,
        queue: Mutex<VecDeque<Result<String, String>>>,
        fallback: Option<String>,
        error: Option<String>,
        calls: AtomicUsize,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl MockInferenceProvider {
        pub fn new(name: &'static str, model: impl Into<String>) -> Self {
            Self {
                name,
                model: model.into(),
                queue: Mutex::new(VecDeque::new()),
                fallback: None,
                error: None,
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn with_response(self, text: impl Into<String>) -> Self {
            self.queue.lock().unwrap().push_back(Ok(text.into()));
            self
        }

        pub fn with_failure(self, error: impl Into<String>) -> Self {
            self.queue.lock().unwrap().push_back(Err(error.into()));
            self
        }

        pub fn with_fallback(mut self, text: impl Into<String>) -> Self {
            self.fallback = Some(text.into());
            self
        }

        /// Every call fails once the queue is drained
        pub fn with_error(mut self, error: impl Into<String>) -> Self {
            self.error = Some(error.into());
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl InferenceProvider for MockInferenceProvider {
        async fn complete(&self, request: &CompletionRequest) -> Result<Completion, DomainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.clone());

            let next = self.queue.lock().unwrap().pop_front();

            let outcome = match next {
                Some(outcome) => outcome,
                None => match (&self.error, &self.fallback) {
                    (Some(error), _) => Err(error.clone()),
                    (None, Some(text)) => Ok(text.clone()),
                    (None, None) => Err("No mock response configured".to_string()),
                },
            };

            outcome
                .map(|text| {
                    Completion::new(text, self.model.clone()).with_usage(TokenUsage::new(100, 20))
                })
                .map_err(|error| DomainError::provider(self.name, error))
        }

        fn provider_name(&self) -> &'static str {
            self.name
        }

        fn model_id(&self) -> &str {
            &self.model
        }
    }
}
