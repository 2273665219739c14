//! Asynchronous boundary between the ghost-text state machine and an AI
//! completion provider.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::CompletionConfig;
use crate::models::ContextCollectionResult;
use crate::services::retrieval::RetrievedPassage;
use crate::session::CompletionStateMachine;
use crate::ScrivoError;

/// Prompt material handed to a [`CompletionProvider`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionPrompt {
    /// Text immediately before the cursor.
    pub context: String,
    pub entities: Vec<String>,
    pub keywords: Vec<String>,
    pub summary: String,
    pub passages: Vec<RetrievedPassage>,
}

impl CompletionPrompt {
    pub fn from_collection(result: &ContextCollectionResult, passages: &[RetrievedPassage]) -> Self {
        Self {
            context: result.context.clone(),
            entities: result.detected_entities.clone(),
            keywords: result.primary_keywords.clone(),
            summary: result.summary.clone(),
            passages: passages.to_vec(),
        }
    }

    /// Plain-text rendering for providers that take a single string.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if !self.entities.is_empty() {
            out.push_str("Characters and places: ");
            out.push_str(&self.entities.join(", "));
            out.push('\n');
        }
        if !self.keywords.is_empty() {
            out.push_str("Keywords: ");
            out.push_str(&self.keywords.join(", "));
            out.push('\n');
        }
        if !self.passages.is_empty() {
            out.push_str("Reference material:\n");
            for p in &self.passages {
                out.push_str(&format!("- [{}] {}\n", p.source, p.text));
            }
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("Continue the text:\n");
        out.push_str(&self.context);
        out
    }
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, prompt: &CompletionPrompt) -> Result<String, ScrivoError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    Failed(String),
    TimedOut,
    Empty,
}

/// How a [`CompletionDriver::run`] call resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// Suggestion is now visible.
    Shown(String),
    /// The machine was returned to idle.
    Rejected(RejectReason),
    /// The request was superseded before the provider answered.
    Stale,
    /// A completion was already in flight.
    Busy,
}

pub struct CompletionDriver {
    machine: Arc<Mutex<CompletionStateMachine>>,
    provider: Arc<dyn CompletionProvider>,
    timeout: Duration,
}

impl CompletionDriver {
    pub fn new(
        machine: Arc<Mutex<CompletionStateMachine>>,
        provider: Arc<dyn CompletionProvider>,
        config: &CompletionConfig,
    ) -> Self {
        Self {
            machine,
            provider,
            timeout: Duration::from_millis(config.timeout_ms.max(1)),
        }
    }

    pub fn machine(&self) -> &Arc<Mutex<CompletionStateMachine>> {
        &self.machine
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, CompletionStateMachine>, ScrivoError> {
        self.machine
            .lock()
            .map_err(|_| ScrivoError::Provider("completion state lock poisoned".to_string()))
    }

    /// Request a completion and resolve it through `show` or `reject`.
    ///
    /// The state lock is never held across the provider call.
    pub async fn run(&self, prompt: &CompletionPrompt) -> Result<CompletionOutcome, ScrivoError> {
        let generation = {
            let mut machine = self.lock()?;
            if !machine.request_completion() {
                return Ok(CompletionOutcome::Busy);
            }
            machine.generation()
        };

        let response = match tokio::time::timeout(self.timeout, self.provider.complete(prompt)).await
        {
            Ok(Ok(text)) if text.trim().is_empty() => Err(RejectReason::Empty),
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => {
                warn!("Completion provider failed: {}", e);
                Err(RejectReason::Failed(e.to_string()))
            }
            Err(_) => {
                warn!("Completion timed out after {:?}", self.timeout);
                Err(RejectReason::TimedOut)
            }
        };

        let mut machine = self.lock()?;
        if machine.generation() != generation || !machine.is_active() {
            debug!("Dropping stale completion for generation {}", generation);
            return Ok(CompletionOutcome::Stale);
        }
        match response {
            Ok(text) => {
                machine.show(&text);
                Ok(CompletionOutcome::Shown(text))
            }
            Err(reason) => {
                machine.reject();
                Ok(CompletionOutcome::Rejected(reason))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CollectionMethod;
    use crate::session::{CompletionEvent, CompletionState};
    use pretty_assertions::assert_eq;

    struct Fixed(Result<String, String>);

    #[async_trait]
    impl CompletionProvider for Fixed {
        async fn complete(&self, _prompt: &CompletionPrompt) -> Result<String, ScrivoError> {
            self.0.clone().map_err(ScrivoError::Provider)
        }
    }

    struct Slow;

    #[async_trait]
    impl CompletionProvider for Slow {
        async fn complete(&self, _prompt: &CompletionPrompt) -> Result<String, ScrivoError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("late".to_string())
        }
    }

    fn prompt() -> CompletionPrompt {
        let result = ContextCollectionResult {
            trigger_position: 10,
            primary_keywords: vec!["灵剑".to_string()],
            secondary_keywords: Vec::new(),
            detected_entities: vec!["陈云寒".to_string()],
            rag_query: "陈云寒 灵剑".to_string(),
            relevance_score: 0.6,
            collection_method: CollectionMethod::Full,
            context: "陈云寒拔出灵剑".to_string(),
            summary: String::new(),
        };
        CompletionPrompt::from_collection(&result, &[])
    }

    fn driver(provider: impl CompletionProvider + 'static, timeout_ms: u64) -> CompletionDriver {
        CompletionDriver::new(
            Arc::new(Mutex::new(CompletionStateMachine::new())),
            Arc::new(provider),
            &CompletionConfig { timeout_ms },
        )
    }

    #[test]
    fn test_render_lists_entities_then_context() {
        let rendered = prompt().render();
        assert!(rendered.starts_with("Characters and places: 陈云寒\n"));
        assert!(rendered.ends_with("Continue the text:\n陈云寒拔出灵剑"));
    }

    #[tokio::test]
    async fn test_success_shows_text() {
        let driver = driver(Fixed(Ok("剑光一闪".to_string())), 1000);
        let outcome = driver.run(&prompt()).await.unwrap();
        assert_eq!(outcome, CompletionOutcome::Shown("剑光一闪".to_string()));
        let machine = driver.machine().lock().unwrap();
        assert_eq!(machine.state(), CompletionState::Visible);
        assert_eq!(machine.completion_text(), "剑光一闪");
    }

    #[tokio::test]
    async fn test_failure_rejects() {
        let driver = driver(Fixed(Err("quota".to_string())), 1000);
        let outcome = driver.run(&prompt()).await.unwrap();
        assert!(matches!(
            outcome,
            CompletionOutcome::Rejected(RejectReason::Failed(_))
        ));
        assert_eq!(
            driver.machine().lock().unwrap().state(),
            CompletionState::Idle
        );
    }

    #[tokio::test]
    async fn test_blank_text_rejects() {
        let driver = driver(Fixed(Ok("  ".to_string())), 1000);
        let outcome = driver.run(&prompt()).await.unwrap();
        assert_eq!(outcome, CompletionOutcome::Rejected(RejectReason::Empty));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_rejects() {
        let driver = driver(Slow, 50);
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        driver
            .machine()
            .lock()
            .unwrap()
            .subscribe(move |e| sink.lock().unwrap().push(e.clone()));

        let outcome = driver.run(&prompt()).await.unwrap();
        assert_eq!(outcome, CompletionOutcome::Rejected(RejectReason::TimedOut));
        assert_eq!(
            *events.lock().unwrap(),
            vec![
                CompletionEvent::StateChanged(CompletionState::Generating),
                CompletionEvent::TextToClear,
                CompletionEvent::StateChanged(CompletionState::Idle),
            ]
        );
    }

    #[tokio::test]
    async fn test_busy_when_already_generating() {
        let driver = driver(Fixed(Ok("x".to_string())), 1000);
        driver.machine().lock().unwrap().request_completion();
        let outcome = driver.run(&prompt()).await.unwrap();
        assert_eq!(outcome, CompletionOutcome::Busy);
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_request_is_stale() {
        struct Gated;

        #[async_trait]
        impl CompletionProvider for Gated {
            async fn complete(&self, _prompt: &CompletionPrompt) -> Result<String, ScrivoError> {
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok("old answer".to_string())
            }
        }

        let driver = Arc::new(driver(Gated, 10_000));
        let running = {
            let driver = driver.clone();
            tokio::spawn(async move { driver.run(&prompt()).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        {
            let mut machine = driver.machine().lock().unwrap();
            assert!(machine.reject());
            assert!(machine.request_completion());
        }
        let outcome = running.await.unwrap().unwrap();
        assert_eq!(outcome, CompletionOutcome::Stale);
        let machine = driver.machine().lock().unwrap();
        assert_eq!(machine.state(), CompletionState::Generating);
        assert_eq!(machine.generation(), 2);
    }
}
