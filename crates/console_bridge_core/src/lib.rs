//! Console Bridge Core
//!
//! Translates raw `console.*` events coming from a V8 debugger backend into
//! inspector-frontend `Console.*` notifications, keeps the message history used
//! for repeat detection, and resolves `console:<message>:<param>` identifiers back
//! into object bodies fetched from the backend.

pub mod agent;
pub mod backend;
pub mod client;
pub mod config;
pub mod console_id;
pub mod convert;
pub mod error;
pub mod framing;
pub mod resolver;
pub mod session;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use agent::ConsoleAgent;
pub use backend::DebuggerBackend;
pub use client::DebuggerClient;
pub use config::BridgeConfig;
pub use console_id::{is_console_id, ConsoleId};
pub use error::ConsoleError;
pub use session::ConsoleSession;
pub use store::MessageStore;

/// Result type alias using ConsoleError
pub type Result<T> = std::result::Result<T, ConsoleError>;
