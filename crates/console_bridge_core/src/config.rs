use std::time::Duration;

const DEFAULT_DEBUGGER_ADDR: &str = "127.0.0.1:5858";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MAX_BUFFERED_EVENTS: usize = 1024;

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// `host:port` of the V8 debugger agent.
    pub debugger_addr: String,
    /// Upper bound for a single backend request/response round-trip.
    pub timeout: Duration,
    /// How many frontend notifications a server keeps before evicting the oldest.
    pub max_buffered_events: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            debugger_addr: DEFAULT_DEBUGGER_ADDR.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_buffered_events: DEFAULT_MAX_BUFFERED_EVENTS,
        }
    }
}

impl BridgeConfig {
    pub fn new(debugger_addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            debugger_addr: debugger_addr.into(),
            timeout,
            ..Self::default()
        }
    }

    pub fn from_env() -> Self {
        let debugger_addr = std::env::var("DEBUGGER_ADDR")
            .unwrap_or_else(|_| DEFAULT_DEBUGGER_ADDR.to_string());

        let timeout = std::env::var("DEBUGGER_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_TIMEOUT);

        let max_buffered_events = std::env::var("CONSOLE_MAX_BUFFERED_EVENTS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|max| *max > 0)
            .unwrap_or(DEFAULT_MAX_BUFFERED_EVENTS);

        Self {
            debugger_addr,
            timeout,
            max_buffered_events,
        }
    }

    pub fn with_debugger_addr(mut self, debugger_addr: impl Into<String>) -> Self {
        self.debugger_addr = debugger_addr.into();
        self
    }
}
