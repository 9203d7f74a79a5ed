use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A value as the V8 debugger serializes it, either inline in an event or as an
/// entry of a `lookup` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mirror {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<u64>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constructor_function: Option<HandleRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proto_object: Option<HandleRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prototype_object: Option<HandleRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<PropertyMirror>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inferred_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleRef {
    #[serde(rename = "ref")]
    pub handle: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyMirror {
    /// V8 reports array indices as numbers and everything else as strings.
    pub name: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_type: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<u32>,
    #[serde(rename = "ref")]
    pub handle: u64,
}

impl Mirror {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            handle: None,
            kind: kind.into(),
            class_name: None,
            constructor_function: None,
            proto_object: None,
            prototype_object: None,
            properties: Vec::new(),
            name: None,
            inferred_name: None,
            value: None,
            text: None,
        }
    }

    /// Types the debugger keeps behind a handle instead of inlining a value.
    pub fn is_object_like(&self) -> bool {
        matches!(
            self.kind.as_str(),
            "object" | "function" | "regexp" | "error"
        )
    }

    /// Every handle this body points at, in body order, without duplicates.
    pub fn referenced_handles(&self) -> Vec<u64> {
        let links = [
            self.constructor_function,
            self.proto_object,
            self.prototype_object,
        ];
        let mut handles: Vec<u64> = Vec::new();
        let candidates = links
            .iter()
            .flatten()
            .map(|link| link.handle)
            .chain(self.properties.iter().map(|property| property.handle));
        for handle in candidates {
            if !handles.contains(&handle) {
                handles.push(handle);
            }
        }
        handles
    }

    /// Shallow copy without the links and properties, enough to render a ref.
    pub fn summary(&self) -> Mirror {
        Mirror {
            handle: self.handle,
            kind: self.kind.clone(),
            class_name: self.class_name.clone(),
            name: self.name.clone(),
            inferred_name: self.inferred_name.clone(),
            value: self.value.clone(),
            text: self.text.clone(),
            ..Mirror::new(self.kind.clone())
        }
    }
}
