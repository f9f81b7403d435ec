use memsess_core::{AttributeValue, IdGenerator, Principal, Session, SessionManager};
use std::sync::Arc;
use tower_cookies::cookie::time::{Duration as CookieDuration, OffsetDateTime};
use tower_cookies::{Cookie, Cookies};
use tracing::{debug, info};

use crate::BindError;

/// Ties the session cookie on a request/response pair to the manager.
///
/// A missing cookie, or one with an empty value, means "no session yet"
/// for every entry point and is never an error. Only id generation can
/// fail, and it fails before anything is registered.
pub struct SessionBinder {
    manager: Arc<SessionManager>,
    ids: Arc<dyn IdGenerator>,
}

impl SessionBinder {
    pub fn new(manager: Arc<SessionManager>, ids: Arc<dyn IdGenerator>) -> Self {
        Self { manager, ids }
    }

    pub fn manager(&self) -> &Arc<SessionManager> {
        &self.manager
    }

    /// Create or fetch the session named by the request cookie, refresh its
    /// clock and send the cookie back with a renewed expiry.
    pub async fn bind_for_request(&self, cookies: &Cookies) -> Result<Arc<Session>, BindError> {
        let id = self.resolve_id(cookies)?;
        let session = self.manager.create(&id).await;
        session.touch();
        self.write_cookie(cookies, &session);
        Ok(session)
    }

    /// Same as `bind_for_request`, then record `principal` as the session user.
    pub async fn bind_for_login(
        &self,
        principal: Principal,
        cookies: &Cookies,
    ) -> Result<Arc<Session>, BindError> {
        let id = self.resolve_id(cookies)?;
        let session = match self.manager.lookup(&id).await {
            Some(session) => session,
            None => self.manager.create(&id).await,
        };
        session.touch();
        info!("[{}] Logged in as {}", id, principal.username);
        session
            .set(Session::USER_KEY, AttributeValue::Principal(principal))
            .await;
        self.write_cookie(cookies, &session);
        Ok(session)
    }

    /// Destroy the session named by the request cookie and clear the cookie.
    /// Returns false when the request carried no session.
    pub async fn unbind(&self, cookies: &Cookies) -> bool {
        let Some(id) = self.read_session_id(cookies) else {
            return false;
        };
        self.manager.destroy(&id).await;
        cookies.remove(
            Cookie::build((self.manager.cookie_name().to_string(), ""))
                .path("/")
                .build(),
        );
        true
    }

    fn read_session_id(&self, cookies: &Cookies) -> Option<String> {
        cookies
            .get(self.manager.cookie_name())
            .map(|cookie| cookie.value().to_string())
            .filter(|value| !value.is_empty())
    }

    fn resolve_id(&self, cookies: &Cookies) -> Result<String, BindError> {
        if let Some(id) = self.read_session_id(cookies) {
            return Ok(id);
        }
        let id = self.ids.generate()?;
        debug!("[{}] No session cookie, minted new id", id);
        Ok(id)
    }

    fn write_cookie(&self, cookies: &Cookies, session: &Session) {
        let ttl_secs = i64::try_from(self.manager.ttl().as_secs()).unwrap_or(i64::MAX);
        let mut cookie = Cookie::build((self.manager.cookie_name().to_string(), session.id().to_string()))
            .path("/")
            .max_age(CookieDuration::seconds(ttl_secs));
        if let Ok(expires) = OffsetDateTime::from_unix_timestamp(session.expires_at().timestamp()) {
            cookie = cookie.expires(expires);
        }
        cookies.add(cookie.build());
    }
}
