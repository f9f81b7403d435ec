use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{KvStore, Session};

/// Configuration for the session manager
#[derive(Clone, Debug)]
pub struct SessionManagerConfig {
    /// Name of the cookie carrying the session id
    pub cookie_name: String,
    /// Idle time after which a session may be swept
    pub ttl: Duration,
    /// Pause between two sweeps of the registry
    pub sweep_interval: Duration,
}

impl Default for SessionManagerConfig {
    fn default() -> Self {
        Self {
            cookie_name: "memsess_id".to_string(),
            ttl: Duration::from_secs(30 * 60),
            sweep_interval: Duration::from_secs(10),
        }
    }
}

impl SessionManagerConfig {
    pub fn with_cookie_name(mut self, cookie_name: impl Into<String>) -> Self {
        self.cookie_name = cookie_name.into();
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_sweep_interval(mut self, sweep_interval: Duration) -> Self {
        self.sweep_interval = sweep_interval;
        self
    }
}

struct SweepTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Session manager - owns the id -> session registry
/// Handles creation, lookup and destruction, and runs the expiry sweep
pub struct SessionManager {
    registry: KvStore<Arc<Session>>,
    config: SessionManagerConfig,
    ttl: chrono::Duration,
    sweeper: Mutex<Option<SweepTask>>,
}

impl SessionManager {
    /// Create a new session manager. The sweep does not run until `start`.
    pub fn new(config: SessionManagerConfig) -> Self {
        let ttl = chrono::Duration::from_std(config.ttl).unwrap_or(chrono::Duration::MAX);
        Self {
            registry: KvStore::new(),
            config,
            ttl,
            sweeper: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &SessionManagerConfig {
        &self.config
    }

    pub fn cookie_name(&self) -> &str {
        &self.config.cookie_name
    }

    pub fn ttl(&self) -> Duration {
        self.config.ttl
    }

    /// Return the session registered under `id`, registering a fresh one
    /// if there is none. An existing session is returned untouched.
    pub async fn create(&self, id: &str) -> Arc<Session> {
        let ttl = self.ttl;
        let mut created = false;
        let session = self
            .registry
            .get_or_insert_with(id, || {
                created = true;
                Arc::new(Session::new(id, ttl))
            })
            .await;

        if created {
            info!("[{}] Created new session", id);
        } else {
            debug!("[{}] Using existing session", id);
        }
        session
    }

    /// Registered session for `id`, if any. Does not refresh its clock.
    pub async fn lookup(&self, id: &str) -> Option<Arc<Session>> {
        self.registry.load(id).await
    }

    /// Remove the session for `id`. Succeeds whether or not it existed.
    pub async fn destroy(&self, id: &str) -> bool {
        if self.registry.delete(id).await.is_some() {
            info!("[{}] Destroyed session", id);
        }
        true
    }

    /// Run one sweep against `now`, returning how many sessions were removed.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        sweep_registry(&self.registry, now).await
    }

    /// Get the number of live sessions
    pub async fn session_count(&self) -> usize {
        self.registry.len().await
    }

    pub async fn session_ids(&self) -> Vec<String> {
        self.registry.keys().await
    }

    /// Spawn the background sweep. Returns false if it is already running.
    pub async fn start(&self) -> bool {
        let mut sweeper = self.sweeper.lock().await;
        if sweeper.as_ref().is_some_and(|task| !task.handle.is_finished()) {
            return false;
        }

        let token = CancellationToken::new();
        let handle = tokio::spawn(sweep_loop(
            self.registry.clone(),
            self.config.sweep_interval,
            token.clone(),
        ));
        *sweeper = Some(SweepTask { token, handle });
        true
    }

    /// Cancel the background sweep and wait for it to exit.
    /// Returns false if it was not running.
    pub async fn stop(&self) -> bool {
        let task = self.sweeper.lock().await.take();
        match task {
            Some(task) => {
                task.token.cancel();
                let _ = task.handle.await;
                true
            }
            None => false,
        }
    }

    pub async fn is_sweeping(&self) -> bool {
        self.sweeper
            .lock()
            .await
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        if let Some(task) = self.sweeper.get_mut().take() {
            debug!("Dropping session manager, cancelling sweep");
            task.token.cancel();
        }
    }
}

async fn sweep_loop(registry: KvStore<Arc<Session>>, interval: Duration, token: CancellationToken) {
    info!("Session sweep started, interval {:?}", interval);
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }

        let removed = sweep_registry(&registry, Utc::now()).await;
        if removed > 0 {
            info!("Sweep removed {} expired sessions", removed);
        }
    }
    info!("Session sweep stopped");
}

/// The registry write lock is held for the whole scan, so creates and
/// destroys wait for it to finish.
async fn sweep_registry(registry: &KvStore<Arc<Session>>, now: DateTime<Utc>) -> usize {
    let expired = registry
        .retain(|_, session| !session.is_expired_at(now))
        .await;
    for (id, _) in &expired {
        info!("[{}] Session expired, destroyed", id);
    }
    expired.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> SessionManager {
        SessionManager::new(SessionManagerConfig::default().with_ttl(Duration::from_secs(60)))
    }

    #[tokio::test]
    async fn test_create_is_idempotent() {
        let manager = manager();
        let first = manager.create("abc").await;
        let old = Utc::now() - chrono::Duration::seconds(5);
        first.set_last_access(old);

        let second = manager.create("abc").await;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.last_access(), old);
        assert_eq!(manager.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_create_yields_one_session() {
        let manager = Arc::new(manager());
        let tasks: Vec<_> = (0..32)
            .map(|_| {
                let manager = manager.clone();
                tokio::spawn(async move { manager.create("shared").await })
            })
            .collect();

        let sessions: Vec<Arc<Session>> = futures::future::join_all(tasks)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        assert!(sessions.iter().all(|s| Arc::ptr_eq(s, &sessions[0])));
        assert_eq!(manager.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_lookup_does_not_create() {
        let manager = manager();
        assert!(manager.lookup("nope").await.is_none());
        assert_eq!(manager.session_count().await, 0);

        let created = manager.create("yes").await;
        let found = manager.lookup("yes").await.unwrap();
        assert!(Arc::ptr_eq(&created, &found));
    }

    #[tokio::test]
    async fn test_destroy_then_create_gives_fresh_session() {
        let manager = manager();
        let old = manager.create("abc").await;
        old.set("k", "v").await;
        old.set_last_access(Utc::now() - chrono::Duration::seconds(30));

        assert!(manager.destroy("abc").await);
        assert!(manager.lookup("abc").await.is_none());
        assert!(manager.destroy("abc").await);

        let fresh = manager.create("abc").await;
        assert!(!Arc::ptr_eq(&old, &fresh));
        assert!(fresh.last_access() > old.last_access());
        assert_eq!(fresh.get("k").await, None);
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired() {
        let manager = manager();
        let now = Utc::now();

        let stale = manager.create("stale").await;
        stale.set_last_access(now - chrono::Duration::seconds(61));
        let alive = manager.create("alive").await;
        alive.set_last_access(now - chrono::Duration::seconds(59));

        assert_eq!(manager.sweep_at(now).await, 1);
        assert!(manager.lookup("stale").await.is_none());
        assert!(manager.lookup("alive").await.is_some());
        assert_eq!(manager.sweep_at(now).await, 0);
    }

    #[tokio::test]
    async fn test_background_sweep_lifecycle() {
        let manager = SessionManager::new(
            SessionManagerConfig::default()
                .with_ttl(Duration::from_secs(60))
                .with_sweep_interval(Duration::from_millis(20)),
        );
        let stale = manager.create("stale").await;
        stale.set_last_access(Utc::now() - chrono::Duration::seconds(120));
        manager.create("alive").await;

        assert!(manager.start().await);
        assert!(!manager.start().await);
        assert!(manager.is_sweeping().await);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(manager.session_ids().await, vec!["alive"]);

        assert!(manager.stop().await);
        assert!(!manager.is_sweeping().await);
        assert!(!manager.stop().await);

        // Nothing sweeps once stopped.
        let late = manager.create("late").await;
        late.set_last_access(Utc::now() - chrono::Duration::seconds(120));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(manager.lookup("late").await.is_some());

        // And it can be restarted.
        assert!(manager.start().await);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(manager.lookup("late").await.is_none());
        manager.stop().await;
    }
}
