//! In-memory flow session store.
//!
//! Each authentication attempt is keyed by the caller supplied `flowId` and
//! moves through a small state machine: `Pending` on creation, then exactly
//! one of `Success` or `Failed` once the PIN submission handler resolves it.
//! Both outcomes are terminal.

use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Flows older than this are treated as absent and dropped on access.
pub const DEFAULT_FLOW_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStatus {
    Pending,
    Success,
    Failed,
}

/// State associated with one `flowId`.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub tenant: String,
    pub organization: Option<String>,
    pub user: Option<Value>,
    pub status: FlowStatus,
    created_at: Instant,
}

impl SessionRecord {
    #[must_use]
    pub fn new(tenant: String, organization: Option<String>, user: Option<Value>) -> Self {
        Self {
            tenant,
            organization,
            user,
            status: FlowStatus::Pending,
            created_at: Instant::now(),
        }
    }

    fn expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() > ttl
    }
}

#[derive(Debug)]
pub enum RegisterOutcome {
    /// The flow was unseen and a record was created.
    Created,
    /// The flow already existed; the stored record is returned untouched.
    Existing(SessionRecord),
}

/// Mutex guarded map of `flowId` to [`SessionRecord`].
///
/// A single lock covers every read-modify-write, so concurrent authenticate
/// calls for the same flow cannot race on creation.
#[derive(Debug)]
pub struct SessionStore {
    ttl: Duration,
    sessions: Mutex<HashMap<String, SessionRecord>>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_FLOW_TTL)
    }

    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Create the record for `flow_id` unless a live one already exists.
    pub async fn register(&self, flow_id: &str, record: SessionRecord) -> RegisterOutcome {
        let mut sessions = self.sessions.lock().await;

        if let Some(existing) = sessions.get(flow_id) {
            if !existing.expired(self.ttl) {
                return RegisterOutcome::Existing(existing.clone());
            }
        }

        sessions.insert(flow_id.to_string(), record);

        RegisterOutcome::Created
    }

    pub async fn get(&self, flow_id: &str) -> Option<SessionRecord> {
        let mut sessions = self.sessions.lock().await;

        if sessions
            .get(flow_id)
            .is_some_and(|record| record.expired(self.ttl))
        {
            sessions.remove(flow_id);
            return None;
        }

        sessions.get(flow_id).cloned()
    }

    pub async fn put(&self, flow_id: &str, record: SessionRecord) {
        let mut sessions = self.sessions.lock().await;
        sessions.insert(flow_id.to_string(), record);
    }

    pub async fn contains(&self, flow_id: &str) -> bool {
        self.get(flow_id).await.is_some()
    }

    /// `Pending -> Success`, binding the verified user to the flow.
    ///
    /// Returns false when the flow is unknown, expired, or already terminal.
    pub async fn complete(&self, flow_id: &str, user: Value) -> bool {
        self.transition(flow_id, FlowStatus::Success, Some(user))
            .await
    }

    /// `Pending -> Failed`. Returns false when the flow is unknown, expired,
    /// or already terminal.
    pub async fn fail(&self, flow_id: &str) -> bool {
        self.transition(flow_id, FlowStatus::Failed, None).await
    }

    async fn transition(&self, flow_id: &str, status: FlowStatus, user: Option<Value>) -> bool {
        let mut sessions = self.sessions.lock().await;

        match sessions.get_mut(flow_id) {
            Some(record) if record.status == FlowStatus::Pending && !record.expired(self.ttl) => {
                record.status = status;
                if user.is_some() {
                    record.user = user;
                }
                true
            }
            _ => false,
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
