//! Chat widget state and the controller that drives it.
//!
//! [`ChatState`] is a plain value; every transcript or visibility change goes
//! through [`ChatState::apply`] with a [`ChatEvent`]. [`ChatSession`] keeps
//! one state inside an [`Orchestrator`], so each turn and each reset is a
//! single tracked request whose outcome is folded back into the transcript.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::model::{ChatMessage, Visibility};
use crate::orchestrator::{Orchestrator, Outcome, RequestTracker, Tracked};
use crate::transport::ChatTransport;

pub const GREETING: &str = "Hello! I'm your AI Health Assistant. How can I help you today?";
pub const NO_REPLY_APOLOGY: &str = "I'm sorry, I couldn't process your request.";
pub const ERROR_APOLOGY: &str = "I'm sorry, I encountered an error. Please try again later.";
pub const RESET_NOTICE: &str = "Conversation has been reset. How can I help you today?";

#[derive(Debug, Clone, PartialEq)]
pub struct ChatState {
    pub visibility: Visibility,
    /// False once the assistant has been removed from the page.
    pub present: bool,
    pub session_id: Option<String>,
    pub history: Vec<ChatMessage>,
    /// Pending flag and last error for chat turns and resets.
    requests: RequestTracker,
}

impl Default for ChatState {
    fn default() -> Self {
        Self {
            visibility: Visibility::Closed,
            present: true,
            session_id: None,
            history: vec![ChatMessage::assistant(GREETING)],
            requests: RequestTracker::default(),
        }
    }
}

impl Tracked for ChatState {
    fn tracker(&self) -> &RequestTracker {
        &self.requests
    }

    fn tracker_mut(&mut self) -> &mut RequestTracker {
        &mut self.requests
    }
}

/// Transcript and visibility changes. Request bookkeeping is not an event:
/// the [`RequestTracker`] inside the state is driven by the [`Orchestrator`].
#[derive(Debug, Clone)]
pub enum ChatEvent {
    Open,
    Close,
    ToggleMinimize,
    /// Close and tear down: forget the session and reseed the transcript.
    Remove,
    SendStarted(ChatMessage),
    ReplyReceived {
        reply: ChatMessage,
        session_id: Option<String>,
    },
    /// The turn failed; the apology keeps the transcript from ending on the user.
    SendFailed(ChatMessage),
    ResetSucceeded(ChatMessage),
}

impl ChatState {
    pub fn apply(mut self, event: ChatEvent) -> Self {
        match event {
            ChatEvent::Open => {
                if self.visibility == Visibility::Closed {
                    self.visibility = Visibility::Expanded;
                }
            }
            ChatEvent::Close => self.visibility = Visibility::Closed,
            ChatEvent::ToggleMinimize => {
                self.visibility = match self.visibility {
                    Visibility::Expanded => Visibility::Minimized,
                    Visibility::Minimized => Visibility::Expanded,
                    Visibility::Closed => Visibility::Closed,
                };
            }
            ChatEvent::Remove => {
                self.visibility = Visibility::Closed;
                self.present = false;
                self.session_id = None;
                self.history = vec![ChatMessage::assistant(GREETING)];
            }
            ChatEvent::SendStarted(message) => self.history.push(message),
            ChatEvent::ReplyReceived { reply, session_id } => {
                if session_id.is_some() {
                    self.session_id = session_id;
                }
                self.history.push(reply);
            }
            ChatEvent::SendFailed(apology) => self.history.push(apology),
            ChatEvent::ResetSucceeded(notice) => self.history = vec![notice],
        }
        self
    }

    fn step(&mut self, event: ChatEvent) {
        *self = self.clone().apply(event);
    }

    pub fn is_pending(&self) -> bool {
        self.requests.is_pending()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.requests.last_error()
    }

    /// A send starts only for non-blank text with nothing in flight.
    pub fn can_send(&self, text: &str) -> bool {
        !text.trim().is_empty() && !self.is_pending()
    }

    /// Session to reset, if a reset may start now.
    pub fn resettable_session(&self) -> Option<&str> {
        if self.is_pending() {
            return None;
        }
        self.session_id.as_deref()
    }
}

type RemoveHook = Box<dyn Fn() + Send + Sync>;

pub struct ChatSession {
    transport: Arc<dyn ChatTransport>,
    chat: Orchestrator<ChatState>,
    on_remove: Option<RemoveHook>,
}

impl ChatSession {
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            transport,
            chat: Orchestrator::new(ChatState::default()),
            on_remove: None,
        }
    }

    /// Called after the widget has been removed, so its owner can stop showing it.
    pub fn with_remove_hook(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_remove = Some(Box::new(hook));
        self
    }

    pub async fn snapshot(&self) -> ChatState {
        self.chat.lock().await.clone()
    }

    async fn dispatch(&self, event: ChatEvent) {
        self.chat.lock().await.step(event);
    }

    pub async fn open(&self) {
        self.dispatch(ChatEvent::Open).await;
    }

    pub async fn close(&self) {
        self.dispatch(ChatEvent::Close).await;
    }

    pub async fn toggle_minimize(&self) {
        self.dispatch(ChatEvent::ToggleMinimize).await;
    }

    pub async fn remove(&self) {
        self.dispatch(ChatEvent::Remove).await;
        info!("health assistant removed");
        if let Some(hook) = &self.on_remove {
            hook();
        }
    }

    /// Send one user turn. Returns `false` when the call was a no-op.
    ///
    /// The user message is appended before the transport is called, and an
    /// assistant message always follows it, even when the call fails.
    pub async fn send(&self, text: &str) -> bool {
        let transport = &self.transport;
        self.chat
            .execute(
                |state| {
                    if !state.can_send(text) {
                        debug!(pending = state.is_pending(), "ignoring chat send");
                        return None;
                    }
                    state.step(ChatEvent::SendStarted(ChatMessage::user(text)));
                    Some(state.session_id.clone())
                },
                |session_id| async move { transport.send(text, session_id.as_deref()).await },
                |state, outcome| {
                    let event = match outcome {
                        Outcome::Completed(response) => {
                            let text = response
                                .response
                                .filter(|t| !t.is_empty())
                                .unwrap_or_else(|| NO_REPLY_APOLOGY.to_string());
                            ChatEvent::ReplyReceived {
                                reply: ChatMessage::assistant(text),
                                session_id: response.session_id,
                            }
                        }
                        Outcome::Failed(_) => {
                            ChatEvent::SendFailed(ChatMessage::assistant(ERROR_APOLOGY))
                        }
                        Outcome::Superseded => return,
                    };
                    state.step(event);
                },
            )
            .await
            .is_some()
    }

    /// Wipe the transcript on the server and locally. The session id is kept.
    /// Returns `false` when the call was a no-op.
    pub async fn reset(&self) -> bool {
        let transport = &self.transport;
        self.chat
            .execute(
                |state| {
                    let Some(session_id) = state.resettable_session() else {
                        debug!(pending = state.is_pending(), "ignoring chat reset");
                        return None;
                    };
                    info!(session_id = %session_id, "resetting conversation");
                    Some(session_id.to_string())
                },
                |session_id| async move { transport.reset(&session_id).await },
                |state, outcome| {
                    if let Outcome::Completed(()) = outcome {
                        let notice = ChatMessage::assistant(RESET_NOTICE);
                        state.step(ChatEvent::ResetSucceeded(notice));
                    }
                },
            )
            .await
            .is_some()
    }
}
