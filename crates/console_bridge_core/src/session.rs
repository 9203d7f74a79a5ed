use std::sync::Arc;

use tokio::{
    sync::{mpsc, Mutex},
    task::JoinHandle,
};

use crate::agent::ConsoleAgent;
use crate::backend::DebuggerBackend;
use crate::console_id::{is_console_id, ConsoleId};
use crate::resolver;
use crate::types::{ConsoleEvent, FrontendEvent, LookupResult};
use crate::{ConsoleError, Result};

/// Everything the console bridge keeps for one debugging session: the agent
/// with its message history and the backend used to resolve console-ids.
pub struct ConsoleSession<B: ?Sized> {
    agent: Arc<Mutex<ConsoleAgent>>,
    backend: Arc<B>,
}

impl<B: ?Sized> Clone for ConsoleSession<B> {
    fn clone(&self) -> Self {
        Self {
            agent: self.agent.clone(),
            backend: self.backend.clone(),
        }
    }
}

impl<B> ConsoleSession<B>
where
    B: DebuggerBackend + ?Sized + 'static,
{
    pub fn new(backend: Arc<B>, notifications: mpsc::UnboundedSender<FrontendEvent>) -> Self {
        Self {
            agent: Arc::new(Mutex::new(ConsoleAgent::new(notifications))),
            backend,
        }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub async fn enable(&self) {
        self.agent.lock().await.enable();
    }

    pub async fn disable(&self) {
        self.agent.lock().await.disable();
    }

    pub async fn is_enabled(&self) -> bool {
        self.agent.lock().await.is_enabled()
    }

    pub async fn clear_messages(&self) {
        self.agent.lock().await.clear_messages();
    }

    pub async fn message_count(&self) -> usize {
        self.agent.lock().await.store().len()
    }

    pub async fn handle_console_event(&self, event: ConsoleEvent) -> bool {
        self.agent.lock().await.handle_console_event(event)
    }

    /// Feeds backend console events into the agent in arrival order until the
    /// sending side goes away.
    pub fn spawn_event_pump(
        &self,
        mut events: mpsc::UnboundedReceiver<ConsoleEvent>,
    ) -> JoinHandle<()> {
        let agent = self.agent.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                agent.lock().await.handle_console_event(event);
            }
            tracing::debug!("Console event stream ended");
        })
    }

    /// Resolves `console_id` to the object body it refers to.
    ///
    /// Message and parameter existence are decided against the history as it is
    /// when the call starts; the store is not locked during the backend request.
    pub async fn lookup_console_id(&self, console_id: &str) -> Result<LookupResult> {
        if !is_console_id(console_id) {
            return Err(ConsoleError::MalformedId(console_id.to_string()));
        }
        let id = ConsoleId::parse(console_id)?;

        let handle = {
            let agent = self.agent.lock().await;
            resolver::locate(agent.store(), id)?
        };

        let result = resolver::fetch(&*self.backend, id, handle).await;
        if let Err(e) = &result {
            tracing::warn!(console_id, "Console lookup failed: {e}");
        }
        result
    }
}
