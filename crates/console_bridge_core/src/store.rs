//! Ordered console history with consecutive repeat detection.

use serde_json::Value;

use crate::console_id::ConsoleId;
use crate::types::{ConsoleMessage, MessageLevel, MessageType, RemoteObject};
use crate::{ConsoleError, Result};

const CONSOLE_API_SOURCE: &str = "console-api";

/// A translated message that has not been given an index yet.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageCandidate {
    pub level: MessageLevel,
    pub kind: MessageType,
    pub text: String,
    pub url: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub stack_trace: Option<Value>,
    pub parameters: Vec<CandidateParameter>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CandidateParameter {
    pub remote: RemoteObject,
    /// Set for values that live behind a backend handle.
    pub handle: Option<u64>,
}

impl MessageCandidate {
    fn repeats(&self, last: &ConsoleMessage) -> bool {
        self.level == last.level
            && self.kind == last.kind
            && self.text == last.text
            && self.url == last.url
            && self.line == last.line
            && self.column == last.column
            && self.stack_trace == last.stack_trace
            && self.parameters.len() == last.parameters.len()
            && self
                .parameters
                .iter()
                .zip(&last.parameters)
                .all(|(candidate, stored)| candidate.remote.renders_like(stored))
    }

    /// Assigns the index and labels every handle-backed parameter with its console-id.
    fn into_message(self, index: u64) -> ConsoleMessage {
        let mut parameters = Vec::with_capacity(self.parameters.len());
        let mut handles = Vec::with_capacity(self.parameters.len());
        for (position, parameter) in self.parameters.into_iter().enumerate() {
            let mut remote = parameter.remote;
            if parameter.handle.is_some() {
                remote.object_id = Some(ConsoleId::new(index, position as u64 + 1).to_string());
            }
            parameters.push(remote);
            handles.push(parameter.handle);
        }

        ConsoleMessage {
            index,
            source: CONSOLE_API_SOURCE.to_string(),
            level: self.level,
            kind: self.kind,
            text: self.text,
            url: self.url,
            line: self.line,
            column: self.column,
            stack_trace: self.stack_trace,
            repeat_count: 1,
            parameters,
            handles,
        }
    }
}

#[derive(Debug)]
pub struct Appended<'a> {
    pub message: &'a ConsoleMessage,
    pub is_repeat: bool,
}

/// Message history. Indices keep counting across `clear`, so an id handed out
/// before a clear never names a later message.
#[derive(Debug)]
pub struct MessageStore {
    messages: Vec<ConsoleMessage>,
    next_index: u64,
}

impl Default for MessageStore {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            next_index: 1,
        }
    }
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `candidate`, or bumps the repeat counter of the last message when
    /// the candidate renders identically to it.
    pub fn append(&mut self, candidate: MessageCandidate) -> Appended<'_> {
        let repeats_last = self
            .messages
            .last()
            .is_some_and(|last| candidate.repeats(last));

        if repeats_last {
            let position = self.messages.len() - 1;
            let last = &mut self.messages[position];
            last.repeat_count = last.repeat_count.saturating_add(1);
            return Appended {
                message: &self.messages[position],
                is_repeat: true,
            };
        }

        let index = self.next_index;
        self.next_index += 1;
        self.messages.push(candidate.into_message(index));
        Appended {
            message: &self.messages[self.messages.len() - 1],
            is_repeat: false,
        }
    }

    pub fn get(&self, index: u64) -> Result<&ConsoleMessage> {
        self.messages
            .binary_search_by_key(&index, |message| message.index)
            .map(|position| &self.messages[position])
            .map_err(|_| ConsoleError::MessageNotFound(index))
    }

    pub fn last(&self) -> Option<&ConsoleMessage> {
        self.messages.last()
    }

    /// Empties the history. Numbering continues where it left off.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
