//! Pending quality choices, keyed by menu token.
//!
//! Entries expire after the configured TTL and are purged whenever the registry is checked.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::core::types::{ConversationId, SenderId};
use crate::download::quality::new_token;

/// An open quality menu waiting for its owner's choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingChoice {
    pub token: String,
    pub chat: ConversationId,
    pub user: SenderId,
    pub url: String,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PendingChoice {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Why a resolution attempt was refused. None of these is an error for the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Token never existed, was already used, or was purged
    Unknown,
    Expired,
    /// Someone other than the requester pressed the button
    Foreign,
}

/// Pending quality choices keyed by token.
///
/// Process-scoped and never persisted. Expired entries are purged whenever a
/// resolution is attempted; there is no background sweeper.
#[derive(Clone)]
pub struct JobRegistry {
    jobs: Arc<Mutex<HashMap<String, PendingChoice>>>,
    ttl: Duration,
}

impl JobRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            jobs: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    pub async fn register(
        &self,
        chat: ConversationId,
        user: SenderId,
        url: &str,
        title: &str,
        description: &str,
    ) -> PendingChoice {
        self.register_at(chat, user, url, title, description, Utc::now()).await
    }

    pub async fn register_at(
        &self,
        chat: ConversationId,
        user: SenderId,
        url: &str,
        title: &str,
        description: &str,
        now: DateTime<Utc>,
    ) -> PendingChoice {
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::zero());
        let mut jobs = self.jobs.lock().await;

        let mut token = new_token();
        while jobs.contains_key(&token) {
            token = new_token();
        }

        let entry = PendingChoice {
            token: token.clone(),
            chat,
            user,
            url: url.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            created_at: now,
            expires_at: now + ttl,
        };
        jobs.insert(token, entry.clone());
        entry
    }

    /// Validates `token` for `user` without consuming it.
    pub async fn check(&self, token: &str, user: SenderId) -> Result<PendingChoice, Rejection> {
        self.check_at(token, user, Utc::now()).await
    }

    /// Ownership is checked before expiry, so a foreign user is always refused.
    pub async fn check_at(&self, token: &str, user: SenderId, now: DateTime<Utc>) -> Result<PendingChoice, Rejection> {
        let mut jobs = self.jobs.lock().await;
        let outcome = match jobs.get(token) {
            None => Err(Rejection::Unknown),
            Some(entry) if entry.user != user => Err(Rejection::Foreign),
            Some(entry) if entry.is_expired_at(now) => Err(Rejection::Expired),
            Some(entry) => Ok(entry.clone()),
        };

        let before = jobs.len();
        jobs.retain(|_, entry| !entry.is_expired_at(now));
        let purged = before - jobs.len();
        if purged > 0 {
            log::debug!("JOBS | purged {} expired menus", purged);
        }

        outcome
    }

    /// Removes and returns the entry, if still present.
    pub async fn take(&self, token: &str) -> Option<PendingChoice> {
        self.jobs.lock().await.remove(token)
    }

    pub async fn remove(&self, token: &str) -> bool {
        self.jobs.lock().await.remove(token).is_some()
    }

    pub async fn len(&self) -> usize {
        self.jobs.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.lock().await.is_empty()
    }
}
