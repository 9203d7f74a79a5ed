use std::{collections::VecDeque, sync::Arc};

use console_bridge_core::{
    is_console_id, types::FrontendEvent, types::LookupResult, BridgeConfig, ConsoleError,
    ConsoleSession, DebuggerClient,
};
use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters, ServerHandler},
    model::*,
    tool, tool_handler, tool_router, transport, ErrorData as McpError, ServiceExt,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{
    sync::{mpsc, Mutex},
    task::JoinHandle,
};

const DEFAULT_POLL_MAX: usize = 256;

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
struct ConsoleAttachParams {
    /// `host:port` of the debugger; defaults to `DEBUGGER_ADDR`.
    #[serde(default)]
    addr: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
struct ConsoleDetachParams {}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
struct ConsoleEnableParams {}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
struct ConsoleDisableParams {}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
struct ConsoleClearMessagesParams {}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
struct ConsoleLookupParams {
    console_id: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
struct ConsolePollEventsParams {
    #[serde(default)]
    max: Option<usize>,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
enum SessionState {
    Detached,
    Attached,
    /// Still attached, but the debugger closed the connection.
    Disconnected,
}

struct AttachedSession {
    console: ConsoleSession<DebuggerClient>,
    addr: String,
    pump_task: JoinHandle<()>,
    collector_task: JoinHandle<()>,
}

impl AttachedSession {
    fn shutdown(self) {
        self.pump_task.abort();
        self.collector_task.abort();
    }
}

struct SessionManager {
    session: Option<AttachedSession>,
}

impl SessionManager {
    fn new() -> Self {
        Self { session: None }
    }

    fn state(&self) -> SessionState {
        match &self.session {
            None => SessionState::Detached,
            Some(attached) if attached.console.backend().is_connected() => {
                SessionState::Attached
            }
            Some(_) => SessionState::Disconnected,
        }
    }
}

type NotificationBuffer = Arc<Mutex<VecDeque<(u64, Value)>>>;

#[derive(Clone)]
struct ConsoleMcpServer {
    tool_router: ToolRouter<Self>,
    config: BridgeConfig,
    session: Arc<Mutex<SessionManager>>,
    notifications: NotificationBuffer,
}

fn to_mcp_error(message: impl Into<String>) -> McpError {
    McpError::internal_error(message.into(), None)
}

fn detached_session_error(tool_name: &str) -> McpError {
    to_mcp_error(format!(
        "{tool_name} requires an attached console session. Call console_attach first."
    ))
}

fn push_recent_notification(
    buffer: &mut VecDeque<(u64, Value)>,
    max_len: usize,
    seq: u64,
    notification: Value,
) {
    buffer.push_back((seq, notification));
    while buffer.len() > max_len {
        buffer.pop_front();
    }
}

fn drain_notifications(buffer: &mut VecDeque<(u64, Value)>, max: usize) -> Vec<Value> {
    let count = max.min(buffer.len());
    buffer
        .drain(..count)
        .map(|(seq, notification)| json!({ "seq": seq, "notification": notification }))
        .collect()
}

async fn collect_notifications(
    mut notifications: mpsc::UnboundedReceiver<FrontendEvent>,
    buffer: NotificationBuffer,
    max_len: usize,
) {
    let mut seq = 0_u64;
    while let Some(event) = notifications.recv().await {
        let value = match serde_json::to_value(&event) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Failed to serialize console notification: {e}");
                continue;
            }
        };
        let mut events = buffer.lock().await;
        push_recent_notification(&mut events, max_len, seq, value);
        seq = seq.saturating_add(1);
    }
}

/// Lookup misses go back to the caller as data; transport failures as tool errors.
fn lookup_outcome(
    console_id: &str,
    result: Result<LookupResult, ConsoleError>,
) -> Result<CallToolResult, McpError> {
    match result {
        Ok(LookupResult { body, refs }) => Ok(CallToolResult::structured(json!({
            "ok": true,
            "console_id": console_id,
            "error": null,
            "body": body,
            "refs": refs,
        }))),
        Err(e) if e.is_not_found() => Ok(CallToolResult::structured(json!({
            "ok": false,
            "console_id": console_id,
            "error": e.to_string(),
        }))),
        Err(e) => Err(to_mcp_error(format!("Lookup of {console_id} failed: {e}"))),
    }
}

#[tool_router]
impl ConsoleMcpServer {
    fn new(config: BridgeConfig) -> Self {
        Self {
            tool_router: Self::tool_router(),
            config,
            session: Arc::new(Mutex::new(SessionManager::new())),
            notifications: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    async fn attached_console(
        &self,
        tool_name: &str,
    ) -> Result<ConsoleSession<DebuggerClient>, McpError> {
        let manager = self.session.lock().await;
        manager
            .session
            .as_ref()
            .map(|attached| attached.console.clone())
            .ok_or_else(|| detached_session_error(tool_name))
    }

    #[tool(description = "Connect to a V8 debugger and start collecting console events")]
    async fn console_attach(
        &self,
        params: Parameters<ConsoleAttachParams>,
    ) -> Result<CallToolResult, McpError> {
        let params = params.0;
        let mut manager = self.session.lock().await;

        if manager.session.is_some() {
            return Err(to_mcp_error(
                "A console session is already attached. Detach before attaching again.",
            ));
        }

        let config = match params.addr {
            Some(addr) => self.config.clone().with_debugger_addr(addr),
            None => self.config.clone(),
        };
        let addr = config.debugger_addr.clone();
        let max_buffered = config.max_buffered_events;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let client = DebuggerClient::connect(config, events_tx)
            .await
            .map_err(|e| to_mcp_error(format!("Failed to connect to debugger at '{addr}': {e}")))?;

        let (notifications_tx, notifications_rx) = mpsc::unbounded_channel();
        let console = ConsoleSession::new(Arc::new(client), notifications_tx);
        let pump_task = console.spawn_event_pump(events_rx);
        let collector_task = tokio::spawn(collect_notifications(
            notifications_rx,
            self.notifications.clone(),
            max_buffered,
        ));

        self.notifications.lock().await.clear();
        manager.session = Some(AttachedSession {
            console,
            addr: addr.clone(),
            pump_task,
            collector_task,
        });
        tracing::info!("Console session attached to {addr}");

        Ok(CallToolResult::structured(json!({
            "ok": true,
            "state": manager.state(),
            "addr": addr,
        })))
    }

    #[tool(description = "Disconnect the current console session")]
    async fn console_detach(
        &self,
        _params: Parameters<ConsoleDetachParams>,
    ) -> Result<CallToolResult, McpError> {
        let mut manager = self.session.lock().await;

        if let Some(attached) = manager.session.take() {
            tracing::info!("Console session detached from {}", attached.addr);
            attached.shutdown();
        }

        Ok(CallToolResult::structured(json!({
            "ok": true,
            "state": manager.state(),
        })))
    }

    #[tool(description = "Enable console message translation (Console.enable)")]
    async fn console_enable(
        &self,
        _params: Parameters<ConsoleEnableParams>,
    ) -> Result<CallToolResult, McpError> {
        let console = self.attached_console("console_enable").await?;
        console.enable().await;

        Ok(CallToolResult::structured(json!({
            "ok": true,
            "enabled": true,
        })))
    }

    #[tool(description = "Stop translating console messages (Console.disable)")]
    async fn console_disable(
        &self,
        _params: Parameters<ConsoleDisableParams>,
    ) -> Result<CallToolResult, McpError> {
        let console = self.attached_console("console_disable").await?;
        console.disable().await;

        Ok(CallToolResult::structured(json!({
            "ok": true,
            "enabled": false,
        })))
    }

    #[tool(description = "Clear the console message history (Console.clearMessages)")]
    async fn console_clear_messages(
        &self,
        _params: Parameters<ConsoleClearMessagesParams>,
    ) -> Result<CallToolResult, McpError> {
        let console = self.attached_console("console_clear_messages").await?;
        console.clear_messages().await;

        Ok(CallToolResult::structured(json!({
            "ok": true,
            "enabled": console.is_enabled().await,
        })))
    }

    #[tool(description = "Fetch the object behind a console:<message>:<param> id")]
    async fn console_lookup(
        &self,
        params: Parameters<ConsoleLookupParams>,
    ) -> Result<CallToolResult, McpError> {
        let console_id = params.0.console_id;
        if !is_console_id(&console_id) {
            return Err(McpError::invalid_params(
                format!("'{console_id}' is not a console id (expected console:<n>:<m>)"),
                None,
            ));
        }

        let console = self.attached_console("console_lookup").await?;
        let result = console.lookup_console_id(&console_id).await;
        lookup_outcome(&console_id, result)
    }

    #[tool(description = "Drain buffered Console.* notifications in arrival order")]
    async fn console_poll_events(
        &self,
        params: Parameters<ConsolePollEventsParams>,
    ) -> Result<CallToolResult, McpError> {
        let max = params.0.max.unwrap_or(DEFAULT_POLL_MAX);
        let state = self.session.lock().await.state();
        let (events, remaining) = {
            let mut buffer = self.notifications.lock().await;
            let events = drain_notifications(&mut buffer, max);
            (events, buffer.len())
        };

        Ok(CallToolResult::structured(json!({
            "ok": true,
            "state": state,
            "events": events,
            "remaining": remaining,
        })))
    }
}

#[tool_handler]
impl ServerHandler for ConsoleMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Console bridge between a V8 debugger and inspector Console.* messages".into(),
            ),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let server = ConsoleMcpServer::new(BridgeConfig::from_env());
    let transport = transport::stdio();

    tracing::info!("Starting Console MCP Server on stdio...");

    server.serve(transport).await?.waiting().await?;

    Ok(())
}
