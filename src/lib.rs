//! Form Flow: bilingual event-registration questionnaire engine.

pub mod channels;
pub mod config;
pub mod error;
pub mod form;
pub mod routes;
pub mod store;
