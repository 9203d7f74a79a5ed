use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
    net::TcpStream,
    sync::{mpsc, oneshot, Mutex},
    task::JoinHandle,
    time::timeout,
};

use crate::backend::{DebuggerBackend, LookupResponse};
use crate::framing::{decode_body, encode_frame, read_frame_body};
use crate::types::ConsoleEvent;
use crate::{BridgeConfig, ConsoleError, Result};

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Value>>>>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Connection to a V8 debugger agent.
///
/// Requests are correlated with responses through `request_seq`; `console`
/// events are decoded and forwarded to the channel given at construction.
pub struct DebuggerClient {
    config: BridgeConfig,
    writer: Mutex<BoxedWriter>,
    pending: PendingMap,
    next_seq: AtomicU64,
    reader_task: JoinHandle<()>,
}

impl DebuggerClient {
    pub async fn connect(
        config: BridgeConfig,
        events: mpsc::UnboundedSender<ConsoleEvent>,
    ) -> Result<Self> {
        tracing::info!("Connecting to debugger at {}", config.debugger_addr);
        let stream = timeout(config.timeout, TcpStream::connect(&config.debugger_addr))
            .await
            .map_err(|_| ConsoleError::Timeout(config.timeout))??;
        stream.set_nodelay(true)?;

        let (reader, writer) = stream.into_split();
        Ok(Self::from_io(config, reader, writer, events))
    }

    pub fn from_io<R, W>(
        config: BridgeConfig,
        reader: R,
        writer: W,
        events: mpsc::UnboundedSender<ConsoleEvent>,
    ) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let reader_task = tokio::spawn(reader_loop(reader, pending.clone(), events));

        Self {
            config,
            writer: Mutex::new(Box::new(writer)),
            pending,
            next_seq: AtomicU64::new(1),
            reader_task,
        }
    }

    /// Sends `command` and waits for its response. A `success: false` reply
    /// becomes [`ConsoleError::Backend`].
    pub async fn request(&self, command: &str, arguments: Option<Value>) -> Result<Value> {
        if !self.is_connected() {
            return Err(ConsoleError::Disconnected);
        }

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let mut request = json!({
            "seq": seq,
            "type": "request",
            "command": command,
        });
        if let Some(arguments) = arguments {
            request["arguments"] = arguments;
        }

        tracing::debug!("Sending debugger request: command={}, seq={}", command, seq);
        let frame = encode_frame(&request)?;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(seq, tx);

        let written = {
            let mut writer = self.writer.lock().await;
            match writer.write_all(&frame).await {
                Ok(()) => writer.flush().await,
                Err(e) => Err(e),
            }
        };
        if let Err(e) = written {
            self.pending.lock().await.remove(&seq);
            return Err(e.into());
        }

        let response = match timeout(self.config.timeout, rx).await {
            Ok(Ok(value)) => value,
            Ok(Err(_)) => return Err(ConsoleError::Disconnected),
            Err(_) => {
                self.pending.lock().await.remove(&seq);
                return Err(ConsoleError::Timeout(self.config.timeout));
            }
        };

        let success = response
            .get("success")
            .and_then(Value::as_bool)
            .unwrap_or(true);
        if !success {
            let message = response
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown debugger error");
            tracing::warn!("Debugger request failed: command={}, message={}", command, message);
            return Err(ConsoleError::backend(command, message));
        }

        tracing::debug!("Debugger request successful: command={}, seq={}", command, seq);
        Ok(response)
    }

    pub fn is_connected(&self) -> bool {
        !self.reader_task.is_finished()
    }
}

impl Drop for DebuggerClient {
    fn drop(&mut self) {
        self.reader_task.abort();
    }
}

#[async_trait]
impl DebuggerBackend for DebuggerClient {
    async fn lookup(&self, handles: &[u64]) -> Result<LookupResponse> {
        let response = self
            .request(
                "lookup",
                Some(json!({ "handles": handles, "includeSource": false })),
            )
            .await?;
        if !response.get("body").is_some_and(Value::is_object) {
            return Err(ConsoleError::InvalidResponse(
                "lookup reply has no body".to_string(),
            ));
        }
        Ok(serde_json::from_value(response)?)
    }
}

async fn reader_loop<R>(
    reader: R,
    pending: PendingMap,
    events: mpsc::UnboundedSender<ConsoleEvent>,
) where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    loop {
        let body = match read_frame_body(&mut reader).await {
            Ok(Some(body)) => body,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!("Debugger connection closed: {e}");
                break;
            }
        };
        let message = match decode_body(&body) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("Skipping debugger frame: {e}");
                continue;
            }
        };
        dispatch(message, &pending, &events).await;
    }

    // Dropping the senders wakes every waiter with `Disconnected`.
    pending.lock().await.clear();
}

async fn dispatch(
    message: Value,
    pending: &PendingMap,
    events: &mpsc::UnboundedSender<ConsoleEvent>,
) {
    match message.get("type").and_then(Value::as_str) {
        Some("response") => {
            let Some(request_seq) = message.get("request_seq").and_then(Value::as_u64) else {
                tracing::warn!("Debugger response without request_seq");
                return;
            };
            let waiter = pending.lock().await.remove(&request_seq);
            match waiter {
                Some(tx) => {
                    let _ = tx.send(message);
                }
                None => tracing::debug!("No pending request for request_seq={}", request_seq),
            }
        }
        Some("event") => {
            let name = message
                .get("event")
                .and_then(Value::as_str)
                .unwrap_or_default();
            if name != "console" {
                tracing::debug!("Ignoring debugger event: {}", name);
                return;
            }
            let body = message.get("body").cloned().unwrap_or(Value::Null);
            match serde_json::from_value::<ConsoleEvent>(body) {
                Ok(event) => {
                    if events.send(event).is_err() {
                        tracing::debug!("Console event receiver dropped");
                    }
                }
                Err(e) => tracing::warn!("Malformed console event: {e}"),
            }
        }
        _ => tracing::debug!("Ignoring debugger message without a known type"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::read_frame;
    use std::time::Duration;
    use tokio::io::{AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf};

    struct FakeDebugger {
        reader: BufReader<ReadHalf<DuplexStream>>,
        writer: WriteHalf<DuplexStream>,
    }

    impl FakeDebugger {
        async fn next_request(&mut self) -> Value {
            loop {
                if let Some(message) = read_frame(&mut self.reader).await.unwrap() {
                    return message;
                }
            }
        }

        async fn send(&mut self, message: Value) {
            let frame = encode_frame(&message).unwrap();
            self.writer.write_all(&frame).await.unwrap();
            self.writer.flush().await.unwrap();
        }
    }

    fn connect(
        config: BridgeConfig,
    ) -> (
        DebuggerClient,
        FakeDebugger,
        mpsc::UnboundedReceiver<ConsoleEvent>,
    ) {
        let (client_io, debugger_io) = tokio::io::duplex(64 * 1024);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (reader, writer) = tokio::io::split(client_io);
        let client = DebuggerClient::from_io(config, reader, writer, events_tx);

        let (reader, writer) = tokio::io::split(debugger_io);
        let debugger = FakeDebugger {
            reader: BufReader::new(reader),
            writer,
        };
        (client, debugger, events_rx)
    }

    #[tokio::test]
    async fn lookup_sends_handles_and_parses_body_and_refs() {
        let (client, mut debugger, _events) = connect(BridgeConfig::default());

        let debugger_task = tokio::spawn(async move {
            let request = debugger.next_request().await;
            assert_eq!(request["type"], "request");
            assert_eq!(request["command"], "lookup");
            assert_eq!(request["arguments"], json!({ "handles": [6], "includeSource": false }));
            let seq = request["seq"].as_u64().unwrap();
            debugger
                .send(json!({
                    "seq": 100,
                    "request_seq": seq,
                    "type": "response",
                    "command": "lookup",
                    "success": true,
                    "body": { "6": { "handle": 6, "type": "object", "className": "Object" } },
                    "refs": [{ "handle": 7, "type": "function", "className": "Function" }],
                    "running": true
                }))
                .await;
            debugger
        });

        let response = client.lookup(&[6]).await.unwrap();
        assert_eq!(response.object(6).unwrap().class_name.as_deref(), Some("Object"));
        assert_eq!(response.reference(7).unwrap().kind, "function");
        let _debugger = debugger_task.await.unwrap();
    }

    #[tokio::test]
    async fn failed_response_becomes_backend_error() {
        let (client, mut debugger, _events) = connect(BridgeConfig::default());

        let debugger_task = tokio::spawn(async move {
            let request = debugger.next_request().await;
            let seq = request["seq"].as_u64().unwrap();
            debugger
                .send(json!({
                    "request_seq": seq,
                    "type": "response",
                    "command": "lookup",
                    "success": false,
                    "message": "Object #6# not found"
                }))
                .await;
            debugger
        });

        let err = client.request("lookup", None).await.unwrap_err();
        match err {
            ConsoleError::Backend { command, message } => {
                assert_eq!(command, "lookup");
                assert_eq!(message, "Object #6# not found");
            }
            other => panic!("expected Backend error, got {other:?}"),
        }
        let _debugger = debugger_task.await.unwrap();
    }

    #[tokio::test]
    async fn console_events_are_forwarded_after_handshake() {
        let (_client, mut debugger, mut events) = connect(BridgeConfig::default());

        debugger
            .writer
            .write_all(b"Type: connect\r\nV8-Version: 3.14.5\r\nContent-Length: 0\r\n\r\n")
            .await
            .unwrap();
        debugger
            .send(json!({ "seq": 1, "type": "event", "event": "break", "body": {} }))
            .await;
        debugger
            .send(json!({
                "seq": 2,
                "type": "event",
                "event": "console",
                "body": {
                    "method": "log",
                    "parameters": [{ "type": "string", "value": "simple text" }]
                }
            }))
            .await;

        let event = events.recv().await.unwrap();
        assert_eq!(event.method, "log");
        assert_eq!(event.parameters[0].value, Some(json!("simple text")));
    }

    #[tokio::test]
    async fn unanswered_request_times_out() {
        let config = BridgeConfig::new("unused:0", Duration::from_millis(20));
        let (client, _debugger, _events) = connect(config);

        let err = client.request("lookup", None).await.unwrap_err();
        assert!(matches!(err, ConsoleError::Timeout(_)));
        assert!(client.pending.lock().await.is_empty());
    }

    #[tokio::test]
    async fn closed_connection_fails_pending_requests() {
        let (client, debugger, _events) = connect(BridgeConfig::default());

        let debugger_task = tokio::spawn(async move {
            let mut debugger = debugger;
            let _ = debugger.next_request().await;
            drop(debugger);
        });

        let err = client.request("lookup", None).await.unwrap_err();
        assert!(matches!(err, ConsoleError::Disconnected));
        debugger_task.await.unwrap();
    }

    #[tokio::test]
    async fn malformed_frame_is_skipped_and_connection_stays_up() {
        let (client, mut debugger, mut events) = connect(BridgeConfig::default());

        debugger
            .writer
            .write_all(b"Content-Length: 3\r\n\r\n{x}")
            .await
            .unwrap();
        debugger
            .send(json!({
                "seq": 2,
                "type": "event",
                "event": "console",
                "body": { "method": "log", "parameters": [] }
            }))
            .await;

        let event = events.recv().await.unwrap();
        assert_eq!(event.method, "log");
        assert!(client.is_connected());
    }

    #[tokio::test]
    async fn request_after_reader_exit_fails_fast() {
        let config = BridgeConfig::new("unused:0", Duration::from_secs(30));
        let (client, debugger, _events) = connect(config);
        drop(debugger);

        for _ in 0..100 {
            if !client.is_connected() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(!client.is_connected());

        let err = timeout(Duration::from_secs(1), client.request("lookup", None))
            .await
            .expect("request must not wait for the full timeout")
            .unwrap_err();
        assert!(matches!(err, ConsoleError::Disconnected));
    }

    #[tokio::test]
    async fn lookup_reply_without_body_is_invalid_response() {
        let (client, mut debugger, _events) = connect(BridgeConfig::default());

        let debugger_task = tokio::spawn(async move {
            let request = debugger.next_request().await;
            let seq = request["seq"].as_u64().unwrap();
            debugger
                .send(json!({
                    "request_seq": seq,
                    "type": "response",
                    "command": "lookup",
                    "success": true
                }))
                .await;
            debugger
        });

        let err = client.lookup(&[6]).await.unwrap_err();
        assert!(matches!(err, ConsoleError::InvalidResponse(_)));
        let _debugger = debugger_task.await.unwrap();
    }
}
