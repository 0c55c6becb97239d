//! Per-visitor interactive session.
//!
//! Each session's `SessionState` sits behind its own async mutex. A handler
//! holds the lock for its whole interaction, so requests from one session run
//! one after another while different sessions proceed in parallel.
//! Sessions end explicitly (`/session/end`) or after sitting idle.

use std::sync::Arc;
use std::time::Duration;

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::analysis::{AnalysisResult, StarRating};

pub const SESSION_COOKIE: &str = "resume_match_session";

/// Last submitted form inputs, echoed back on every render.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormValues {
    pub duties: String,
    pub requirements: String,
    pub preferred: String,
    pub user_name: String,
}

/// Everything remembered between interactions of one session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    /// Last successful analysis. Only ever replaced as a whole.
    pub result: Option<AnalysisResult>,
    /// Score of the last feedback notification sent; the dedup key.
    pub last_feedback: Option<StarRating>,
    /// Display name used in notifications.
    pub user_name: Option<String>,
    pub form: FormValues,
}

impl SessionState {
    /// True when this rating has not been sent yet as the latest feedback.
    pub fn is_new_feedback(&self, rating: StarRating) -> bool {
        self.last_feedback != Some(rating)
    }
}

/// Shared handle to one session's state.
pub type SessionHandle = Arc<Mutex<SessionState>>;

struct SessionEntry {
    state: SessionHandle,
    last_seen: DateTime<Utc>,
}

/// Process-local session table. Clones share the same table.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<DashMap<Uuid, SessionEntry>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a fresh session.
    pub fn start(&self) -> (Uuid, SessionHandle) {
        let id = Uuid::new_v4();
        let state = SessionHandle::default();
        self.sessions.insert(
            id,
            SessionEntry {
                state: state.clone(),
                last_seen: Utc::now(),
            },
        );
        debug!("Session {id} started");
        (id, state)
    }

    /// Looks up a live session and marks it as active.
    pub fn get(&self, id: Uuid) -> Option<SessionHandle> {
        let mut entry = self.sessions.get_mut(&id)?;
        entry.last_seen = Utc::now();
        Some(entry.state.clone())
    }

    /// Resolves the session named by the request cookie, starting a new one
    /// when the cookie is absent or names a session that has ended.
    pub fn resume_or_start(&self, jar: &CookieJar) -> (Uuid, SessionHandle) {
        session_id(jar)
            .and_then(|id| Some((id, self.get(id)?)))
            .unwrap_or_else(|| self.start())
    }

    /// Discards the session. Returns false when it did not exist.
    pub fn end(&self, id: Uuid) -> bool {
        let ended = self.sessions.remove(&id).is_some();
        if ended {
            debug!("Session {id} ended");
        }
        ended
    }

    /// Ends every session not seen since `now - idle`.
    pub fn evict_idle(&self, now: DateTime<Utc>, idle: chrono::Duration) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, entry| now - entry.last_seen < idle);
        before - self.sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }
}

/// Periodically ends idle sessions.
pub fn spawn_idle_sweeper(store: SessionStore, idle: Duration) -> JoinHandle<()> {
    let idle_chrono =
        chrono::Duration::from_std(idle).unwrap_or_else(|_| chrono::Duration::weeks(52));
    let period = (idle / 4).max(Duration::from_secs(1));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let evicted = store.evict_idle(Utc::now(), idle_chrono);
            if evicted > 0 {
                info!("Ended {evicted} idle session(s), {} remaining", store.len());
            }
        }
    })
}

pub fn session_id(jar: &CookieJar) -> Option<Uuid> {
    jar.get(SESSION_COOKIE)
        .filter(|c| !c.value().is_empty())
        .and_then(|c| Uuid::parse_str(c.value()).ok())
}

pub fn session_cookie(id: Uuid) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

pub fn expired_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .removal()
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderMap, HeaderValue};

    fn jar_with_cookie(cookie: &str) -> CookieJar {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        CookieJar::from_headers(&headers)
    }

    #[test]
    fn test_cookie_is_found_among_others() {
        let id = Uuid::new_v4();
        let jar = jar_with_cookie(&format!("theme=dark; {SESSION_COOKIE}={id}; lang=ko"));
        assert_eq!(session_id(&jar), Some(id));
    }

    #[test]
    fn test_malformed_cookie_is_ignored() {
        let jar = jar_with_cookie(&format!("{SESSION_COOKIE}=not-a-uuid"));
        assert_eq!(session_id(&jar), None);
        assert_eq!(session_id(&CookieJar::new()), None);
    }

    #[test]
    fn test_session_cookie_attributes() {
        let id = Uuid::new_v4();
        let set = session_cookie(id).to_string();
        assert!(set.starts_with(&format!("{SESSION_COOKIE}={id}")));
        assert!(set.contains("HttpOnly"));
        assert!(set.contains("SameSite=Lax"));
        assert!(set.contains("Path=/"));

        let expired = expired_session_cookie().to_string();
        assert!(expired.starts_with(&format!("{SESSION_COOKIE}=;")));
        assert!(expired.contains("Max-Age=0"));
    }

    #[test]
    fn test_unknown_session_starts_fresh() {
        let store = SessionStore::new();
        let stale = Uuid::new_v4();
        let jar = jar_with_cookie(&format!("{SESSION_COOKIE}={stale}"));
        let (id, _) = store.resume_or_start(&jar);
        assert_ne!(id, stale);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_state_survives_until_session_end() {
        let store = SessionStore::new();
        let (id, handle) = store.start();
        handle.lock().await.result = Some(AnalysisResult {
            final_result: "Score: 80".to_string(),
            latency_ms: 12,
        });

        let jar = jar_with_cookie(&format!("{SESSION_COOKIE}={id}"));
        let (resumed, handle) = store.resume_or_start(&jar);
        assert_eq!(resumed, id);
        assert_eq!(
            handle.lock().await.result.as_ref().map(|r| r.final_result.as_str()),
            Some("Score: 80")
        );

        assert!(store.end(id));
        assert!(store.get(id).is_none());
        assert!(!store.end(id));
    }

    #[tokio::test]
    async fn test_session_lock_serializes_interactions() {
        let store = SessionStore::new();
        let (id, first) = store.start();
        let guard = first.lock().await;

        let second = store.get(id).unwrap();
        assert!(second.try_lock().is_err());
        drop(guard);
        assert!(second.try_lock().is_ok());
    }

    #[test]
    fn test_idle_sessions_are_evicted() {
        let store = SessionStore::new();
        let (stale, _) = store.start();
        let later = Utc::now() + chrono::Duration::hours(2);
        let (fresh, _) = store.start();
        store.sessions.get_mut(&fresh).unwrap().last_seen = later;

        let evicted = store.evict_idle(later, chrono::Duration::hours(1));
        assert_eq!(evicted, 1);
        assert!(!store.sessions.contains_key(&stale));
        assert!(store.sessions.contains_key(&fresh));
    }

    #[test]
    fn test_feedback_dedup_key() {
        let five = StarRating::from_score(5).unwrap();
        let mut state = SessionState::default();
        assert!(state.is_new_feedback(five));
        state.last_feedback = Some(five);
        assert!(!state.is_new_feedback(five));
        assert!(state.is_new_feedback(StarRating::from_score(4).unwrap()));
    }
}
