//! Persistence and collaborator contracts.

pub mod file;
pub mod memory;
pub mod traits;

pub use file::JsonFileSessionStore;
pub use memory::{MemoryEventStore, MemoryRegistrationStore, MemorySessionStore, MemoryUserStore};
pub use traits::{
    ChoiceHandle, ChoiceOption, Event, EventStore, Messenger, Notifier, Registration,
    RegistrationStatus, RegistrationStore, SessionStore, Shift, UserRecord, UserStore,
};
