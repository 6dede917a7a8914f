//! Collaborator contracts the form engine talks to.
//!
//! The engine never assumes a backend: user and registration records,
//! events, outbound messages, operator notifications and the active-session
//! snapshot all go through these traits.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ChannelError, StoreError};
use crate::form::FormSession;

/// A stored participant record, keyed by the chat platform's user id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub external_id: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl UserRecord {
    pub fn new(external_id: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            fields: Map::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// Lifecycle of a registration record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    /// Created at event selection, form still in progress.
    #[default]
    Incomplete,
    /// Form finished and the user wants to attend.
    Pending,
    /// Form finished and the user declined.
    Uninterested,
    Cancelled,
}

impl RegistrationStatus {
    /// Whether a registration in this status blocks a new one for the same
    /// user and event. A declined registration does not.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Incomplete | Self::Pending)
    }
}

impl std::fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Incomplete => "incomplete",
            Self::Pending => "pending",
            Self::Uninterested => "uninterested",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// A user's registration for one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub id: String,
    pub user_id: String,
    pub event_id: String,
    pub status: RegistrationStatus,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

/// An event users can register for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Event {
    pub id: String,
    pub name: String,
    pub event_type: String,
    pub start_date: String,
    pub start_time: String,
    pub end_time: String,
    pub location: String,
    pub description: String,
    pub participant_commitment: String,
    pub line_rules: String,
    pub place_rules: String,
}

/// A volunteer shift offered to dungeon monitors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shift {
    pub id: String,
    pub label: String,
}

/// Opaque id of a choice prompt returned by the messenger.
pub type ChoiceHandle = String;

/// One selectable entry in an outbound choice prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceOption {
    pub value: String,
    pub label: String,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_by_external_id(&self, external_id: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Write one field, creating the record if it does not exist yet.
    async fn update_field(
        &self,
        external_id: &str,
        field: &str,
        value: &Value,
    ) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait RegistrationStore: Send + Sync {
    /// Create a registration. Returns `None` when an active registration for
    /// the same user and event already exists.
    async fn create(
        &self,
        user_id: &str,
        event_id: &str,
        status: RegistrationStatus,
    ) -> Result<Option<Registration>, StoreError>;

    async fn update_field(
        &self,
        registration_id: &str,
        field: &str,
        value: &Value,
    ) -> Result<bool, StoreError>;

    async fn get_active_registration(
        &self,
        user_id: &str,
        event_id: &str,
    ) -> Result<Option<Registration>, StoreError>;
}

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn get_by_id(&self, event_id: &str) -> Result<Option<Event>, StoreError>;

    async fn list_upcoming(&self) -> Result<Vec<Event>, StoreError>;

    async fn list_shifts(&self) -> Result<Vec<Shift>, StoreError>;
}

/// Outbound messages to the participant.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_text(&self, user_id: &str, text: &str) -> Result<(), ChannelError>;

    async fn send_choice(
        &self,
        user_id: &str,
        prompt: &str,
        options: &[ChoiceOption],
        allow_multiple: bool,
    ) -> Result<ChoiceHandle, ChannelError>;
}

/// Operator-facing notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str) -> Result<(), ChannelError>;
}

/// Whole-table persistence of active sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load_all(&self) -> Result<HashMap<String, FormSession>, StoreError>;

    async fn save_all(&self, sessions: &HashMap<String, FormSession>) -> Result<(), StoreError>;
}
