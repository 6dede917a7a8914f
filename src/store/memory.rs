//! In-memory collaborators for the local runner and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::traits::{
    Event, EventStore, Registration, RegistrationStatus, RegistrationStore, SessionStore, Shift,
    UserRecord, UserStore,
};
use crate::error::StoreError;
use crate::form::FormSession;

/// Users keyed by external id.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record, replacing any existing one with the same id.
    pub async fn insert(&self, user: UserRecord) {
        self.users.write().await.insert(user.external_id.clone(), user);
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn get_by_external_id(&self, external_id: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.users.read().await.get(external_id).cloned())
    }

    async fn update_field(
        &self,
        external_id: &str,
        field: &str,
        value: &Value,
    ) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        let user = users
            .entry(external_id.to_string())
            .or_insert_with(|| UserRecord::new(external_id));
        user.fields.insert(field.to_string(), value.clone());
        debug!(user_id = %external_id, field, "User field updated");
        Ok(true)
    }
}

/// Registrations keyed by registration id.
#[derive(Default)]
pub struct MemoryRegistrationStore {
    registrations: RwLock<HashMap<String, Registration>>,
}

impl MemoryRegistrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, registration_id: &str) -> Option<Registration> {
        self.registrations.read().await.get(registration_id).cloned()
    }

    pub async fn all(&self) -> Vec<Registration> {
        self.registrations.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl RegistrationStore for MemoryRegistrationStore {
    async fn create(
        &self,
        user_id: &str,
        event_id: &str,
        status: RegistrationStatus,
    ) -> Result<Option<Registration>, StoreError> {
        let mut registrations = self.registrations.write().await;
        let duplicate = registrations
            .values()
            .any(|r| r.user_id == user_id && r.event_id == event_id && r.status.is_active());
        if duplicate {
            return Ok(None);
        }

        let registration = Registration {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            event_id: event_id.to_string(),
            status,
            fields: serde_json::Map::new(),
        };
        registrations.insert(registration.id.clone(), registration.clone());
        Ok(Some(registration))
    }

    async fn update_field(
        &self,
        registration_id: &str,
        field: &str,
        value: &Value,
    ) -> Result<bool, StoreError> {
        let mut registrations = self.registrations.write().await;
        let Some(registration) = registrations.get_mut(registration_id) else {
            return Ok(false);
        };
        if field == "status" {
            registration.status = serde_json::from_value(value.clone())?;
        } else {
            registration.fields.insert(field.to_string(), value.clone());
        }
        Ok(true)
    }

    async fn get_active_registration(
        &self,
        user_id: &str,
        event_id: &str,
    ) -> Result<Option<Registration>, StoreError> {
        Ok(self
            .registrations
            .read()
            .await
            .values()
            .find(|r| r.user_id == user_id && r.event_id == event_id && r.status.is_active())
            .cloned())
    }
}

/// A fixed list of events and shifts.
pub struct MemoryEventStore {
    events: Vec<Event>,
    shifts: Vec<Shift>,
}

impl MemoryEventStore {
    pub fn new(events: Vec<Event>) -> Self {
        Self {
            events,
            shifts: default_shifts(),
        }
    }
}

/// The two night shifts used when no shift data is configured.
pub fn default_shifts() -> Vec<Shift> {
    vec![
        Shift {
            id: "first".into(),
            label: "21:00-1:00".into(),
        },
        Shift {
            id: "second".into(),
            label: "01:00-4:00".into(),
        },
    ]
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn get_by_id(&self, event_id: &str) -> Result<Option<Event>, StoreError> {
        Ok(self.events.iter().find(|e| e.id == event_id).cloned())
    }

    async fn list_upcoming(&self) -> Result<Vec<Event>, StoreError> {
        Ok(self.events.clone())
    }

    async fn list_shifts(&self) -> Result<Vec<Shift>, StoreError> {
        Ok(self.shifts.clone())
    }
}

/// Session snapshot held in memory. Counts saves so tests can assert on
/// write-through behaviour.
#[derive(Default)]
pub struct MemorySessionStore {
    snapshot: RwLock<HashMap<String, FormSession>>,
    saves: RwLock<usize>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn save_count(&self) -> usize {
        *self.saves.read().await
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load_all(&self) -> Result<HashMap<String, FormSession>, StoreError> {
        Ok(self.snapshot.read().await.clone())
    }

    async fn save_all(&self, sessions: &HashMap<String, FormSession>) -> Result<(), StoreError> {
        *self.snapshot.write().await = sessions.clone();
        *self.saves.write().await += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn update_field_creates_user() {
        let store = MemoryUserStore::new();
        assert!(store.get_by_external_id("u1").await.unwrap().is_none());

        store
            .update_field("u1", "full_name", &Value::from("Dana Levi"))
            .await
            .unwrap();

        let user = store.get_by_external_id("u1").await.unwrap().unwrap();
        assert_eq!(user.field("full_name"), Some(&Value::from("Dana Levi")));
    }

    #[tokio::test]
    async fn duplicate_active_registration_rejected() {
        let store = MemoryRegistrationStore::new();
        let first = store
            .create("u1", "E1", RegistrationStatus::Incomplete)
            .await
            .unwrap();
        assert!(first.is_some());

        let second = store
            .create("u1", "E1", RegistrationStatus::Incomplete)
            .await
            .unwrap();
        assert!(second.is_none());

        // Different event is fine
        assert!(store
            .create("u1", "E2", RegistrationStatus::Incomplete)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn cancelled_registration_is_not_active() {
        let store = MemoryRegistrationStore::new();
        let reg = store
            .create("u1", "E1", RegistrationStatus::Incomplete)
            .await
            .unwrap()
            .unwrap();
        store
            .update_field(&reg.id, "status", &serde_json::json!("cancelled"))
            .await
            .unwrap();

        assert!(store.get_active_registration("u1", "E1").await.unwrap().is_none());
        assert!(store
            .create("u1", "E1", RegistrationStatus::Incomplete)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn declined_registration_is_not_active() {
        let store = MemoryRegistrationStore::new();
        let reg = store
            .create("u1", "E1", RegistrationStatus::Incomplete)
            .await
            .unwrap()
            .unwrap();
        store
            .update_field(&reg.id, "status", &serde_json::json!("uninterested"))
            .await
            .unwrap();

        assert!(store.get_active_registration("u1", "E1").await.unwrap().is_none());
        let again = store
            .create("u1", "E1", RegistrationStatus::Incomplete)
            .await
            .unwrap()
            .unwrap();
        assert_ne!(again.id, reg.id);
        assert_eq!(
            store.get_active_registration("u1", "E1").await.unwrap().unwrap().id,
            again.id
        );
    }

    #[tokio::test]
    async fn update_unknown_registration_returns_false() {
        let store = MemoryRegistrationStore::new();
        let updated = store
            .update_field("missing", "form_complete", &Value::Bool(true))
            .await
            .unwrap();
        assert!(!updated);
    }

    #[tokio::test]
    async fn event_lookup_and_default_shifts() {
        let store = MemoryEventStore::new(vec![Event {
            id: "E1".into(),
            event_type: "play".into(),
            ..Default::default()
        }]);
        assert_eq!(store.get_by_id("E1").await.unwrap().unwrap().event_type, "play");
        assert!(store.get_by_id("E2").await.unwrap().is_none());
        assert_eq!(store.list_shifts().await.unwrap().len(), 2);
    }
}
