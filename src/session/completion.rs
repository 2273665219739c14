//! Ghost-text lifecycle for one editing session.
//!
//! `Idle -> Generating -> Visible -> Idle`, with `reject` returning to `Idle`
//! from either active state. Operations called from the wrong state return
//! `false` and emit nothing, so key handlers can call them speculatively.

use std::fmt;

use serde::Serialize;
use tracing::debug;

/// Lifecycle state of the inline suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionState {
    Idle,
    Generating,
    Visible,
}

impl fmt::Display for CompletionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompletionState::Idle => "idle",
            CompletionState::Generating => "generating",
            CompletionState::Visible => "visible",
        };
        f.write_str(s)
    }
}

/// Notifications delivered to the editing surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionEvent {
    StateChanged(CompletionState),
    /// New ghost text to display; empty means "nothing to display".
    CompletionUpdated(String),
    /// The user accepted this text; the surface inserts it.
    TextAccepted(String),
    /// The displayed suggestion (if any) must be cleared.
    TextToClear,
}

/// Handle returned by [`CompletionStateMachine::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Key input as seen by the suggestion layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorInput {
    /// Tab.
    Accept,
    /// Escape.
    Dismiss,
    /// Anything else that edits or moves the cursor.
    Other,
}

/// Whether the surface should still process the key itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputDisposition {
    Consumed,
    PassThrough,
}

type Observer = Box<dyn Fn(&CompletionEvent) + Send + Sync>;

/// Per-session suggestion state. Observers run synchronously inside the
/// transition and must not call back into the machine.
pub struct CompletionStateMachine {
    state: CompletionState,
    completion_text: String,
    generation: u64,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: u64,
}

impl Default for CompletionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CompletionStateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionStateMachine")
            .field("state", &self.state)
            .field("completion_text", &self.completion_text)
            .field("generation", &self.generation)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl CompletionStateMachine {
    pub fn new() -> Self {
        Self {
            state: CompletionState::Idle,
            completion_text: String::new(),
            generation: 0,
            observers: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn state(&self) -> CompletionState {
        self.state
    }

    /// Text currently displayed; empty unless `Visible`.
    pub fn completion_text(&self) -> &str {
        &self.completion_text
    }

    /// True while generating or showing a suggestion.
    pub fn is_active(&self) -> bool {
        self.state != CompletionState::Idle
    }

    /// Bumped by every successful [`request_completion`](Self::request_completion).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn subscribe<F>(&mut self, observer: F) -> SubscriptionId
    where
        F: Fn(&CompletionEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sid, _)| *sid != id);
        self.observers.len() != before
    }

    fn emit(&self, event: CompletionEvent) {
        for (_, observer) in &self.observers {
            observer(&event);
        }
    }

    fn transition(&mut self, to: CompletionState) {
        debug!("Completion state {} -> {}", self.state, to);
        self.state = to;
    }

    /// `Idle -> Generating`. Fails while a completion is already in flight.
    pub fn request_completion(&mut self) -> bool {
        if self.state != CompletionState::Idle {
            return false;
        }
        self.generation += 1;
        self.transition(CompletionState::Generating);
        self.emit(CompletionEvent::StateChanged(CompletionState::Generating));
        true
    }

    /// `Generating -> Visible` with `text` as the suggestion.
    pub fn show(&mut self, text: &str) -> bool {
        if self.state != CompletionState::Generating {
            return false;
        }
        self.completion_text = text.to_string();
        self.transition(CompletionState::Visible);
        self.emit(CompletionEvent::StateChanged(CompletionState::Visible));
        self.emit(CompletionEvent::CompletionUpdated(text.to_string()));
        true
    }

    /// `Visible -> Idle`, handing the suggestion to the surface.
    pub fn accept(&mut self) -> bool {
        if self.state != CompletionState::Visible {
            return false;
        }
        let text = std::mem::take(&mut self.completion_text);
        self.transition(CompletionState::Idle);
        self.emit(CompletionEvent::TextAccepted(text));
        self.emit(CompletionEvent::CompletionUpdated(String::new()));
        self.emit(CompletionEvent::StateChanged(CompletionState::Idle));
        true
    }

    /// `Generating | Visible -> Idle`, discarding any suggestion.
    pub fn reject(&mut self) -> bool {
        if self.state == CompletionState::Idle {
            return false;
        }
        self.completion_text.clear();
        self.transition(CompletionState::Idle);
        self.emit(CompletionEvent::TextToClear);
        self.emit(CompletionEvent::StateChanged(CompletionState::Idle));
        true
    }

    /// Route a key press: Tab accepts a visible suggestion, Escape dismisses,
    /// and any other input cancels an active suggestion before the surface
    /// handles the key.
    pub fn handle_input(&mut self, input: EditorInput) -> InputDisposition {
        match input {
            EditorInput::Accept if self.accept() => InputDisposition::Consumed,
            EditorInput::Dismiss if self.reject() => InputDisposition::Consumed,
            _ => {
                self.reject();
                InputDisposition::PassThrough
            }
        }
    }
}
