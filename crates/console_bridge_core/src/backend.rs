use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use crate::types::Mirror;
use crate::Result;

/// Reply of the debugger's `lookup` command: bodies keyed by the requested
/// handle, plus every object those bodies reference.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LookupResponse {
    #[serde(default)]
    pub body: HashMap<String, Mirror>,
    #[serde(default)]
    pub refs: Vec<Mirror>,
}

impl LookupResponse {
    pub fn object(&self, handle: u64) -> Option<&Mirror> {
        self.body.get(&handle.to_string())
    }

    pub fn reference(&self, handle: u64) -> Option<&Mirror> {
        self.refs.iter().find(|mirror| mirror.handle == Some(handle))
    }
}

/// The part of the debugger backend the console bridge depends on.
#[async_trait]
pub trait DebuggerBackend: Send + Sync {
    async fn lookup(&self, handles: &[u64]) -> Result<LookupResponse>;
}
