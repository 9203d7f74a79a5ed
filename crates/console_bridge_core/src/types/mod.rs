mod events;
mod frontend;
mod mirror;

pub use events::ConsoleEvent;
pub use frontend::{
    ConsoleMessage, FrontendEvent, LookupResult, MessageLevel, MessageType, RemoteObject,
};
pub use mirror::{HandleRef, Mirror, PropertyMirror};
