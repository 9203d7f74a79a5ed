//! Resolution of console-ids into object bodies.
//!
//! Resolution is split in two so callers can validate against the store while
//! holding it, then release it before the backend round-trip.

use std::collections::BTreeMap;

use crate::backend::DebuggerBackend;
use crate::console_id::ConsoleId;
use crate::store::MessageStore;
use crate::types::LookupResult;
use crate::{ConsoleError, Result};

/// Finds the backend handle behind `id`.
pub fn locate(store: &MessageStore, id: ConsoleId) -> Result<u64> {
    let message = store.get(id.message_index)?;
    message
        .handle_of(id.param_index)
        .ok_or(ConsoleError::ObjectNotFound(id.param_index))
}

/// Fetches the body of `handle` and a summary of everything it references.
pub async fn fetch<B>(backend: &B, id: ConsoleId, handle: u64) -> Result<LookupResult>
where
    B: DebuggerBackend + ?Sized,
{
    tracing::debug!(%id, handle, "Looking up console object");
    let response = backend.lookup(&[handle]).await?;

    let body = response
        .object(handle)
        .cloned()
        .ok_or(ConsoleError::ObjectNotFound(id.param_index))?;

    let refs: BTreeMap<u64, _> = body
        .referenced_handles()
        .into_iter()
        .filter_map(|referenced| {
            response
                .reference(referenced)
                .map(|mirror| (referenced, mirror.summary()))
        })
        .collect();

    Ok(LookupResult { body, refs })
}

pub async fn lookup<B>(store: &MessageStore, backend: &B, id: ConsoleId) -> Result<LookupResult>
where
    B: DebuggerBackend + ?Sized,
{
    let handle = locate(store, id)?;
    fetch(backend, id, handle).await
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::backend::LookupResponse;
    use crate::store::{CandidateParameter, MessageCandidate};
    use crate::types::{MessageLevel, MessageType, RemoteObject};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Backend serving the lookup reply for the `{a: 1}` object at handle 6.
    #[derive(Default)]
    pub(crate) struct FakeBackend {
        pub(crate) requests: Mutex<Vec<Vec<u64>>>,
        pub(crate) fail_with: Option<String>,
    }

    pub(crate) fn object_lookup_response() -> LookupResponse {
        serde_json::from_value(json!({
            "body": {
                "6": {
                    "handle": 6,
                    "type": "object",
                    "className": "Object",
                    "constructorFunction": { "ref": 7 },
                    "protoObject": { "ref": 8 },
                    "prototypeObject": { "ref": 9 },
                    "properties": [{ "name": "a", "propertyType": 1, "ref": 10 }],
                    "text": "#<Object>"
                }
            },
            "refs": [
                {
                    "handle": 7,
                    "type": "function",
                    "className": "Function",
                    "name": "Object",
                    "protoObject": { "ref": 11 },
                    "text": "function Object() { [native code] }"
                },
                { "handle": 8, "type": "object", "className": "Object", "text": "#<Object>" },
                { "handle": 9, "type": "undefined", "text": "undefined" },
                { "handle": 10, "type": "number", "value": 1, "text": "1" },
                { "handle": 11, "type": "object", "className": "Object", "text": "#<Object>" }
            ]
        }))
        .unwrap()
    }

    #[async_trait]
    impl DebuggerBackend for FakeBackend {
        async fn lookup(&self, handles: &[u64]) -> Result<LookupResponse> {
            self.requests.lock().unwrap().push(handles.to_vec());
            if let Some(message) = &self.fail_with {
                return Err(ConsoleError::backend("lookup", message.clone()));
            }
            let response = object_lookup_response();
            let mut filtered = LookupResponse {
                refs: response.refs.clone(),
                ..LookupResponse::default()
            };
            for handle in handles {
                if let Some(body) = response.object(*handle) {
                    filtered.body.insert(handle.to_string(), body.clone());
                }
            }
            Ok(filtered)
        }
    }

    fn parameter(kind: &str, handle: Option<u64>) -> CandidateParameter {
        CandidateParameter {
            remote: RemoteObject {
                kind: kind.into(),
                subtype: None,
                object_id: None,
                class_name: None,
                description: Some(kind.into()),
                value: None,
            },
            handle,
        }
    }

    fn store_with(parameters: Vec<Vec<CandidateParameter>>) -> MessageStore {
        let mut store = MessageStore::new();
        for (n, parameters) in parameters.into_iter().enumerate() {
            store.append(MessageCandidate {
                level: MessageLevel::Log,
                kind: MessageType::Log,
                text: format!("message {n}"),
                url: None,
                line: None,
                column: None,
                stack_trace: None,
                parameters,
            });
        }
        store
    }

    #[test]
    fn locate_reports_missing_message_before_missing_object() {
        let store = store_with(vec![vec![parameter("string", None)]]);

        let err = locate(&store, ConsoleId::new(3, 1)).unwrap_err();
        assert_eq!(err.to_string(), "Console message #3# not found");

        let err = locate(&store, ConsoleId::new(1, 0)).unwrap_err();
        assert_eq!(err.to_string(), "Object #0# not found");
    }

    #[test]
    fn locate_rejects_primitive_parameters() {
        let store = store_with(vec![vec![parameter("string", None)]]);
        assert!(matches!(
            locate(&store, ConsoleId::new(1, 1)),
            Err(ConsoleError::ObjectNotFound(1))
        ));
    }

    #[tokio::test]
    async fn lookup_returns_body_and_refs_for_every_reference() {
        let store = store_with(vec![
            vec![parameter("string", None)],
            vec![parameter("object", Some(6))],
        ]);
        let backend = FakeBackend::default();

        let result = lookup(&store, &backend, ConsoleId::new(2, 1)).await.unwrap();

        assert_eq!(
            serde_json::to_value(&result.body).unwrap(),
            json!({
                "handle": 6,
                "type": "object",
                "className": "Object",
                "constructorFunction": { "ref": 7 },
                "protoObject": { "ref": 8 },
                "prototypeObject": { "ref": 9 },
                "properties": [{ "name": "a", "propertyType": 1, "ref": 10 }],
                "text": "#<Object>"
            })
        );
        assert_eq!(result.refs.keys().copied().collect::<Vec<_>>(), vec![7, 8, 9, 10]);
        assert!(result.refs[&7].proto_object.is_none());
        assert_eq!(*backend.requests.lock().unwrap(), vec![vec![6_u64]]);
    }

    #[tokio::test]
    async fn unresolvable_handle_is_object_not_found() {
        let store = store_with(vec![vec![parameter("object", Some(99))]]);
        let backend = FakeBackend::default();

        let err = lookup(&store, &backend, ConsoleId::new(1, 1)).await.unwrap_err();
        assert_eq!(err.to_string(), "Object #1# not found");
    }

    #[tokio::test]
    async fn backend_errors_propagate_without_body() {
        let store = store_with(vec![vec![parameter("object", Some(6))]]);
        let backend = FakeBackend {
            fail_with: Some("connection reset".into()),
            ..FakeBackend::default()
        };

        let err = lookup(&store, &backend, ConsoleId::new(1, 1)).await.unwrap_err();
        assert!(matches!(err, ConsoleError::Backend { .. }));
    }
}
