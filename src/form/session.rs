//! Per-user form sessions and the registry that owns them.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, warn};

use super::text::Language;
use crate::store::SessionStore;

/// Where a session is in its lifecycle.
///
/// NotStarted → InProgress ⇄ ValidationError, InProgress → Completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    #[default]
    NotStarted,
    InProgress,
    ValidationError,
    Completed,
}

impl FlowState {
    pub fn can_transition_to(&self, target: FlowState) -> bool {
        use FlowState::*;
        matches!(
            (self, target),
            (NotStarted, InProgress)
                | (InProgress, ValidationError)
                | (ValidationError, InProgress)
                | (InProgress, Completed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl std::fmt::Display for FlowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::ValidationError => "validation_error",
            Self::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

/// One user's in-progress questionnaire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormSession {
    pub user_id: String,
    pub event_id: Option<String>,
    pub registration_id: Option<String>,
    pub language: Language,
    /// Id of the question the user is currently being asked.
    pub current_question: String,
    /// Accepted answers in the order they were given.
    pub answers: Map<String, Value>,
    #[serde(default)]
    pub state: FlowState,
    /// The user already had a stored record when the session started.
    #[serde(default)]
    pub returning_user: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FormSession {
    pub fn new(
        user_id: impl Into<String>,
        event_id: Option<String>,
        language: Language,
        first_question: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            event_id,
            registration_id: None,
            language,
            current_question: first_question.into(),
            answers: Map::new(),
            state: FlowState::NotStarted,
            returning_user: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Store an accepted answer. Re-answering a question keeps its position.
    pub fn record(&mut self, question_id: &str, answer: Value) {
        self.answers.insert(question_id.to_string(), answer);
        self.updated_at = Utc::now();
    }

    pub fn answer(&self, question_id: &str) -> Option<&Value> {
        self.answers.get(question_id)
    }

    /// The answer as plain text, if it is a string.
    pub fn answer_str(&self, question_id: &str) -> Option<&str> {
        self.answers.get(question_id).and_then(Value::as_str)
    }

    /// Move to `target`, refusing transitions the lifecycle does not allow.
    pub fn transition(&mut self, target: FlowState) -> Result<(), String> {
        if self.state == target {
            return Ok(());
        }
        if !self.state.can_transition_to(target) {
            return Err(format!("Cannot transition from {} to {}", self.state, target));
        }
        self.state = target;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Owns the active-session table, per-user locks, and write-through
/// persistence of the whole table.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, FormSession>>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    persist_lock: Mutex<()>,
    store: Arc<dyn SessionStore>,
}

impl SessionRegistry {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            locks: Mutex::new(HashMap::new()),
            persist_lock: Mutex::new(()),
            store,
        }
    }

    /// Build a registry pre-populated from the store. A failed load starts
    /// empty rather than refusing to run.
    pub async fn restore(store: Arc<dyn SessionStore>) -> Self {
        let registry = Self::new(store);
        match registry.store.load_all().await {
            Ok(mut loaded) => {
                loaded.retain(|_, s| !s.state.is_terminal());
                debug!(count = loaded.len(), "Restored form sessions");
                *registry.sessions.write().await = loaded;
            }
            Err(e) => warn!("Failed to load form sessions, starting empty: {}", e),
        }
        registry
    }

    /// Acquire the exclusive lock for one user. Held for the duration of a
    /// start or advance so answers for the same user are applied in order.
    pub async fn lock_user(&self, user_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(user_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Release a guard from [`lock_user`](Self::lock_user). The user's lock
    /// entry is dropped once nobody holds or waits on it and the user has no
    /// session, so the table only tracks users with live forms.
    pub async fn release_user(&self, user_id: &str, guard: OwnedMutexGuard<()>) {
        drop(guard);
        let mut locks = self.locks.lock().await;
        let idle = locks
            .get(user_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1);
        if idle && !self.sessions.read().await.contains_key(user_id) {
            locks.remove(user_id);
        }
    }

    #[cfg(test)]
    pub(crate) async fn lock_count(&self) -> usize {
        self.locks.lock().await.len()
    }

    pub async fn get(&self, user_id: &str) -> Option<FormSession> {
        self.sessions.read().await.get(user_id).cloned()
    }

    /// Insert or replace a session and persist the table. A completed
    /// session is dropped instead; only live forms are kept.
    pub async fn put(&self, session: FormSession) {
        if session.state.is_terminal() {
            self.remove(&session.user_id).await;
            return;
        }
        self.sessions
            .write()
            .await
            .insert(session.user_id.clone(), session);
        self.persist().await;
    }

    /// Drop a session and persist the table.
    pub async fn remove(&self, user_id: &str) -> Option<FormSession> {
        let removed = self.sessions.write().await.remove(user_id);
        if removed.is_some() {
            self.persist().await;
        }
        removed
    }

    pub async fn user_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    async fn persist(&self) {
        let _guard = self.persist_lock.lock().await;
        let snapshot = self.sessions.read().await.clone();
        if let Err(e) = self.store.save_all(&snapshot).await {
            warn!("Failed to persist form sessions: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemorySessionStore;

    #[test]
    fn valid_transitions() {
        use FlowState::*;
        for (from, to) in [
            (NotStarted, InProgress),
            (InProgress, ValidationError),
            (ValidationError, InProgress),
            (InProgress, Completed),
        ] {
            assert!(from.can_transition_to(to), "{from} should transition to {to}");
        }
    }

    #[test]
    fn invalid_transitions() {
        use FlowState::*;
        assert!(!NotStarted.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(InProgress));
        assert!(!ValidationError.can_transition_to(Completed));
        assert!(Completed.is_terminal());
        assert!(!InProgress.is_terminal());
    }

    #[test]
    fn display_matches_serde() {
        use FlowState::*;
        for state in [NotStarted, InProgress, ValidationError, Completed] {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(format!("\"{state}\""), json);
        }
    }

    #[test]
    fn session_transition_rejects_skips() {
        let mut session = FormSession::new("u1", None, Language::He, "language");
        assert!(session.transition(FlowState::Completed).is_err());
        session.transition(FlowState::InProgress).unwrap();
        // Same-state transition is a no-op
        session.transition(FlowState::InProgress).unwrap();
        session.transition(FlowState::Completed).unwrap();
        assert_eq!(session.state, FlowState::Completed);
    }

    #[test]
    fn record_keeps_first_position() {
        let mut session = FormSession::new("u1", None, Language::He, "language");
        session.record("language", Value::from("he"));
        session.record("event_selection", Value::from("E1"));
        session.record("language", Value::from("en"));
        let keys: Vec<_> = session.answers.keys().cloned().collect();
        assert_eq!(keys, vec!["language", "event_selection"]);
        assert_eq!(session.answer_str("language"), Some("en"));
    }

    #[tokio::test]
    async fn registry_writes_through() {
        let store = Arc::new(MemorySessionStore::new());
        let registry = SessionRegistry::new(store.clone());

        registry
            .put(FormSession::new("u1", None, Language::He, "language"))
            .await;
        assert_eq!(store.save_count().await, 1);
        assert_eq!(store.load_all().await.unwrap().len(), 1);

        assert!(registry.remove("u1").await.is_some());
        assert_eq!(store.save_count().await, 2);
        assert!(store.load_all().await.unwrap().is_empty());

        // Removing an absent session does not write
        assert!(registry.remove("u1").await.is_none());
        assert_eq!(store.save_count().await, 2);
    }

    #[tokio::test]
    async fn lock_entries_dropped_with_session() {
        let registry = SessionRegistry::new(Arc::new(MemorySessionStore::new()));

        let guard = registry.lock_user("u1").await;
        registry
            .put(FormSession::new("u1", None, Language::He, "language"))
            .await;
        registry.release_user("u1", guard).await;
        // Live session keeps its lock
        assert_eq!(registry.lock_count().await, 1);

        let guard = registry.lock_user("u1").await;
        registry.remove("u1").await;
        registry.release_user("u1", guard).await;
        assert_eq!(registry.lock_count().await, 0);

        for user in ["u2", "u3", "u4"] {
            let guard = registry.lock_user(user).await;
            registry.release_user(user, guard).await;
        }
        assert_eq!(registry.lock_count().await, 0);
    }

    #[tokio::test]
    async fn waiting_user_keeps_lock_entry() {
        let registry = Arc::new(SessionRegistry::new(Arc::new(MemorySessionStore::new())));
        let first = registry.lock_user("u1").await;

        let waiter = {
            let registry = registry.clone();
            tokio::spawn(async move {
                let guard = registry.lock_user("u1").await;
                registry.release_user("u1", guard).await;
            })
        };
        // Let the waiter queue on the same mutex
        while Arc::strong_count(registry.locks.lock().await.get("u1").unwrap()) < 3 {
            tokio::task::yield_now().await;
        }

        registry.release_user("u1", first).await;
        assert_eq!(registry.lock_count().await, 1);

        waiter.await.unwrap();
        assert_eq!(registry.lock_count().await, 0);
    }

    #[tokio::test]
    async fn restore_loads_previous_table() {
        let store = Arc::new(MemorySessionStore::new());
        {
            let registry = SessionRegistry::new(store.clone());
            let mut session = FormSession::new("u1", Some("E1".into()), Language::En, "pronouns");
            session.record("language", Value::from("en"));
            registry.put(session).await;
        }

        let restored = SessionRegistry::restore(store).await;
        let session = restored.get("u1").await.unwrap();
        assert_eq!(session.current_question, "pronouns");
        assert_eq!(session.language, Language::En);
        assert_eq!(restored.user_ids().await, vec!["u1".to_string()]);
    }

    #[tokio::test]
    async fn completed_sessions_are_not_kept() {
        let store = Arc::new(MemorySessionStore::new());
        let registry = SessionRegistry::new(store.clone());
        let mut session = FormSession::new("u1", None, Language::En, "language");
        session.transition(FlowState::InProgress).unwrap();
        registry.put(session.clone()).await;

        session.transition(FlowState::Completed).unwrap();
        registry.put(session.clone()).await;
        assert!(registry.get("u1").await.is_none());
        assert!(store.load_all().await.unwrap().is_empty());

        // A completed entry in an old snapshot is not resumed
        let mut snapshot = HashMap::new();
        snapshot.insert("u1".to_string(), session);
        store.save_all(&snapshot).await.unwrap();
        let restored = SessionRegistry::restore(store).await;
        assert!(restored.user_ids().await.is_empty());
    }

    #[tokio::test]
    async fn user_lock_is_exclusive() {
        let registry = Arc::new(SessionRegistry::new(Arc::new(MemorySessionStore::new())));
        let guard = registry.lock_user("u1").await;

        let other = registry.clone();
        let contended = tokio::spawn(async move {
            let _g = other.lock_user("u1").await;
        });
        // A different user is not blocked
        let _u2 = registry.lock_user("u2").await;

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!contended.is_finished());
        drop(guard);
        contended.await.unwrap();
    }
}
