//! Translation of backend `console` events into frontend notifications.

use tokio::sync::mpsc;

use crate::convert::{classify_method, message_text, remote_object};
use crate::store::{CandidateParameter, MessageCandidate, MessageStore};
use crate::types::{ConsoleEvent, FrontendEvent, MessageType};

/// Console domain state for one debugging session.
///
/// Starts disabled. While disabled, backend events are dropped without being
/// buffered. `clear_messages` works in either state.
#[derive(Debug)]
pub struct ConsoleAgent {
    enabled: bool,
    store: MessageStore,
    notifications: mpsc::UnboundedSender<FrontendEvent>,
}

impl ConsoleAgent {
    pub fn new(notifications: mpsc::UnboundedSender<FrontendEvent>) -> Self {
        Self {
            enabled: false,
            store: MessageStore::new(),
            notifications,
        }
    }

    pub fn enable(&mut self) {
        if !self.enabled {
            tracing::info!("Console agent enabled");
        }
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        if self.enabled {
            tracing::info!("Console agent disabled");
        }
        self.enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    /// Translates one backend event. Returns false when the event was ignored
    /// because the agent is disabled.
    pub fn handle_console_event(&mut self, event: ConsoleEvent) -> bool {
        if !self.enabled {
            tracing::debug!(method = %event.method, "Dropping console event while disabled");
            return false;
        }

        let candidate = build_candidate(&event);
        if candidate.kind == MessageType::Clear {
            self.clear_messages();
            return true;
        }

        let appended = self.store.append(candidate);
        let notification = if appended.is_repeat {
            FrontendEvent::MessageRepeatCountUpdated {
                count: appended.message.repeat_count - 1,
            }
        } else {
            FrontendEvent::MessageAdded {
                message: appended.message.clone(),
            }
        };
        tracing::debug!(
            index = appended.message.index,
            repeat = appended.is_repeat,
            "Translated console event"
        );
        self.notify(notification);
        true
    }

    pub fn clear_messages(&mut self) {
        let removed = self.store.len();
        self.store.clear();
        tracing::info!(removed, "Console messages cleared");
        self.notify(FrontendEvent::MessagesCleared {});
    }

    fn notify(&self, event: FrontendEvent) {
        if self.notifications.send(event).is_err() {
            tracing::warn!("Frontend notification channel closed; dropping console notification");
        }
    }
}

pub fn build_candidate(event: &ConsoleEvent) -> MessageCandidate {
    let (level, kind) = classify_method(&event.method);

    let parameters: Vec<CandidateParameter> = event
        .parameters
        .iter()
        .map(|mirror| CandidateParameter {
            remote: remote_object(mirror),
            handle: mirror.handle.filter(|_| mirror.is_object_like()),
        })
        .collect();

    let remotes: Vec<_> = parameters.iter().map(|p| p.remote.clone()).collect();
    let text = message_text(event, &remotes);

    MessageCandidate {
        level,
        kind,
        text,
        url: event.url.clone(),
        line: event.line,
        column: event.column,
        stack_trace: event.stack_trace.clone(),
        parameters,
    }
}
