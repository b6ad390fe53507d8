//! Delivery of retrieved files to the chat

pub mod classify;
pub mod dispatcher;
pub mod transport;

pub use classify::{partition, MediaKind, Partition};
pub use dispatcher::Dispatcher;
pub use transport::{EditOutcome, FileSource, StatusHandle, Transport, TransportError};
