use chrono::{DateTime, Utc};
use memsess_core::{AttributeValue, Session};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionView {
    pub session_id: String,
    pub last_access: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub ttl_secs: i64,
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl SessionView {
    pub async fn from_session(session: &Session) -> Self {
        Self {
            session_id: session.id().to_string(),
            last_access: session.last_access(),
            expires_at: session.expires_at(),
            ttl_secs: session.ttl().num_seconds(),
            attributes: session.attributes().await,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeView {
    pub key: String,
    pub value: AttributeValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub sessions: usize,
}
