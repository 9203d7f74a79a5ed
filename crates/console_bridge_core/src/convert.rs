//! Conversion of V8 debugger values into inspector shapes.

use serde_json::Value;

use crate::types::{ConsoleEvent, MessageLevel, MessageType, Mirror, RemoteObject};

/// Maps the console method that produced an event to the frontend's
/// level/type pair.
pub fn classify_method(method: &str) -> (MessageLevel, MessageType) {
    match method {
        "info" => (MessageLevel::Info, MessageType::Log),
        "debug" => (MessageLevel::Debug, MessageType::Log),
        "warn" | "warning" => (MessageLevel::Warning, MessageType::Log),
        "error" => (MessageLevel::Error, MessageType::Log),
        "dir" => (MessageLevel::Log, MessageType::Dir),
        "dirxml" => (MessageLevel::Log, MessageType::DirXml),
        "trace" => (MessageLevel::Log, MessageType::Trace),
        "assert" => (MessageLevel::Error, MessageType::Assert),
        "table" => (MessageLevel::Log, MessageType::Table),
        "group" => (MessageLevel::Log, MessageType::StartGroup),
        "groupCollapsed" => (MessageLevel::Log, MessageType::StartGroupCollapsed),
        "groupEnd" => (MessageLevel::Log, MessageType::EndGroup),
        "clear" => (MessageLevel::Log, MessageType::Clear),
        _ => (MessageLevel::Log, MessageType::Log),
    }
}

/// Converts a mirror into a remote object. Object-like values come back
/// without an `objectId`; the store labels them once the message index is known.
pub fn remote_object(mirror: &Mirror) -> RemoteObject {
    match mirror.kind.as_str() {
        "undefined" => RemoteObject {
            kind: "undefined".into(),
            subtype: None,
            object_id: None,
            class_name: None,
            description: Some("undefined".into()),
            value: None,
        },
        "null" => RemoteObject {
            kind: "object".into(),
            subtype: Some("null".into()),
            object_id: None,
            class_name: None,
            description: Some("null".into()),
            value: Some(Value::Null),
        },
        "function" => RemoteObject {
            kind: "function".into(),
            subtype: None,
            object_id: None,
            class_name: Some(
                mirror
                    .class_name
                    .clone()
                    .unwrap_or_else(|| "Function".to_string()),
            ),
            description: mirror.text.clone().or_else(|| mirror.name.clone()),
            value: None,
        },
        "object" | "regexp" | "error" => {
            let class_name = mirror
                .class_name
                .clone()
                .unwrap_or_else(|| "Object".to_string());
            let subtype = object_subtype(&mirror.kind, &class_name);
            let description = if mirror.kind == "object" {
                Some(class_name.clone())
            } else {
                mirror.text.clone().or_else(|| Some(class_name.clone()))
            };
            RemoteObject {
                kind: "object".into(),
                subtype: subtype.map(str::to_string),
                object_id: None,
                class_name: Some(class_name),
                description,
                value: None,
            }
        }
        kind => RemoteObject {
            kind: kind.to_string(),
            subtype: None,
            object_id: None,
            class_name: None,
            description: Some(primitive_description(mirror)),
            value: mirror.value.clone(),
        },
    }
}

fn object_subtype(kind: &str, class_name: &str) -> Option<&'static str> {
    match (kind, class_name) {
        ("regexp", _) | (_, "RegExp") => Some("regexp"),
        ("error", _) => Some("error"),
        (_, "Array") => Some("array"),
        (_, "Date") => Some("date"),
        _ => None,
    }
}

fn primitive_description(mirror: &Mirror) -> String {
    if let Some(text) = &mirror.text {
        return text.clone();
    }
    match &mirror.value {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => mirror.kind.clone(),
    }
}

/// The event's own formatted text, else the parameter descriptions joined by spaces.
pub fn message_text(event: &ConsoleEvent, parameters: &[RemoteObject]) -> String {
    if let Some(text) = &event.text {
        return text.clone();
    }
    parameters
        .iter()
        .filter_map(|parameter| parameter.description.as_deref())
        .collect::<Vec<_>>()
        .join(" ")
}
