//! One running job per chat.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::core::types::ConversationId;

/// One gate per conversation. A second job for a busy chat is refused, not queued.
///
/// Gates are created on first use and kept for the life of the process.
#[derive(Clone, Default)]
pub struct ChatLocks {
    locks: Arc<DashMap<ConversationId, Arc<Mutex<()>>>>,
}

impl ChatLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the chat's gate, or `None` when a job already holds it.
    ///
    /// The gate is released when the returned guard is dropped.
    pub fn try_acquire(&self, chat: ConversationId) -> Option<OwnedMutexGuard<()>> {
        let lock = self.locks.entry(chat).or_default().clone();
        lock.try_lock_owned().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_is_refused_until_release() {
        let locks = ChatLocks::new();
        let chat = ConversationId(7);

        let guard = locks.try_acquire(chat).unwrap();
        assert!(locks.try_acquire(chat).is_none());

        // other chats are independent
        assert!(locks.try_acquire(ConversationId(8)).is_some());

        drop(guard);
        assert!(locks.try_acquire(chat).is_some());
    }
}
