//! Shared per-process state: pending quality menus and per-chat gates

pub mod locks;
pub mod registry;

pub use locks::ChatLocks;
pub use registry::{JobRegistry, PendingChoice, Rejection};
