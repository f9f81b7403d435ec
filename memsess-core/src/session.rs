use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use std::sync::Mutex;
use tracing::debug;

use crate::{AttributeValue, KvStore};

/// One client's server-side state: identifier, idle clock and a private
/// attribute bag.
///
/// The attribute bag has its own lock, independent of the manager's
/// registry. A get/set racing a destroy of the same session may act on a
/// store that is already unreachable from the registry.
pub struct Session {
    id: String,
    ttl: Duration,
    last_access: Mutex<DateTime<Utc>>,
    attributes: KvStore<AttributeValue>,
}

impl Session {
    /// Attribute key under which login stores the principal.
    pub const USER_KEY: &'static str = "user";

    pub fn new(id: impl Into<String>, ttl: Duration) -> Self {
        Self {
            id: id.into(),
            ttl,
            last_access: Mutex::new(Utc::now()),
            attributes: KvStore::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn last_access(&self) -> DateTime<Utc> {
        *self.last_access.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Mark the session as used now and return the new timestamp.
    pub fn touch(&self) -> DateTime<Utc> {
        let now = Utc::now();
        self.set_last_access(now);
        now
    }

    pub fn set_last_access(&self, at: DateTime<Utc>) {
        debug!("[{}] last access set to {}", self.id, at);
        *self.last_access.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = at;
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.last_access()
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Expired once `now` is strictly past `last_access + ttl`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at()
    }

    /// Attribute lookup. A miss is `None`, not an error.
    pub async fn get(&self, key: &str) -> Option<AttributeValue> {
        self.attributes.load(key).await
    }

    pub async fn set(&self, key: impl Into<String>, value: impl Into<AttributeValue>) -> bool {
        self.attributes.store(key, value.into()).await
    }

    pub async fn remove(&self, key: &str) -> Option<AttributeValue> {
        self.attributes.delete(key).await
    }

    pub async fn attributes(&self) -> BTreeMap<String, AttributeValue> {
        self.attributes.entries().await.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Principal;

    #[tokio::test]
    async fn test_attribute_round_trip() {
        let session = Session::new("s1", Duration::seconds(60));
        let values = vec![
            ("flag", AttributeValue::Bool(true)),
            ("count", AttributeValue::Integer(-7)),
            ("ratio", AttributeValue::Float(0.25)),
            ("name", AttributeValue::from("bob")),
            ("nothing", AttributeValue::Null),
            (Session::USER_KEY, AttributeValue::from(Principal::new("bob"))),
        ];

        for (key, value) in &values {
            assert!(session.set(*key, value.clone()).await);
        }
        for (key, value) in &values {
            assert_eq!(session.get(key).await.as_ref(), Some(value));
        }
        assert_eq!(session.attributes().await.len(), values.len());
    }

    #[tokio::test]
    async fn test_missing_attribute_is_none() {
        let session = Session::new("s1", Duration::seconds(60));
        assert_eq!(session.get("absent").await, None);

        session.set("k", "v").await;
        assert_eq!(session.remove("k").await, Some(AttributeValue::from("v")));
        assert_eq!(session.get("k").await, None);
    }

    #[tokio::test]
    async fn test_expiry_boundary() {
        let session = Session::new("s1", Duration::seconds(60));
        let base = Utc::now();
        session.set_last_access(base);

        assert_eq!(session.expires_at(), base + Duration::seconds(60));
        assert!(!session.is_expired_at(base + Duration::seconds(60)));
        assert!(session.is_expired_at(base + Duration::seconds(61)));
    }

    #[tokio::test]
    async fn test_touch_moves_clock_forward() {
        let session = Session::new("s1", Duration::seconds(60));
        let old = Utc::now() - Duration::seconds(30);
        session.set_last_access(old);

        let touched = session.touch();
        assert!(touched > old);
        assert_eq!(session.last_access(), touched);
    }
}
