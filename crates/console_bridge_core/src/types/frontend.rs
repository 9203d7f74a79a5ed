use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use super::Mirror;

/// Inspector `Runtime.RemoteObject` as rendered inside console messages.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteObject {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl RemoteObject {
    /// Equality on everything the frontend renders, ignoring `objectId`.
    pub fn renders_like(&self, other: &RemoteObject) -> bool {
        self.kind == other.kind
            && self.subtype == other.subtype
            && self.class_name == other.class_name
            && self.description == other.description
            && self.value == other.value
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageLevel {
    Log,
    Info,
    Debug,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageType {
    Log,
    Dir,
    #[serde(rename = "dirxml")]
    DirXml,
    Table,
    Trace,
    Clear,
    StartGroup,
    StartGroupCollapsed,
    EndGroup,
    Assert,
}

/// A translated console message as held by the store and sent to the frontend.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleMessage {
    /// 1-based position in the store, embedded in every objectId of this message.
    #[serde(skip)]
    pub index: u64,
    pub source: String,
    pub level: MessageLevel,
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<Value>,
    pub repeat_count: u32,
    pub parameters: Vec<RemoteObject>,
    /// Backend handle behind each parameter, `None` for primitives.
    #[serde(skip)]
    pub(crate) handles: Vec<Option<u64>>,
}

impl ConsoleMessage {
    /// Backend handle of the 1-based parameter `param_index`.
    pub fn handle_of(&self, param_index: u64) -> Option<u64> {
        let position = usize::try_from(param_index).ok()?.checked_sub(1)?;
        self.handles.get(position).copied().flatten()
    }
}

/// Notifications pushed to the frontend, one per translated event, in order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "method", content = "params")]
pub enum FrontendEvent {
    #[serde(rename = "Console.messageAdded")]
    MessageAdded { message: ConsoleMessage },
    #[serde(rename = "Console.messageRepeatCountUpdated")]
    MessageRepeatCountUpdated { count: u32 },
    #[serde(rename = "Console.messagesCleared")]
    MessagesCleared {},
}

/// Object body plus the shallow descriptions of every handle it references.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupResult {
    pub body: Mirror,
    pub refs: BTreeMap<u64, Mirror>,
}
