//! Per-question behaviour beyond plain answer routing.
//!
//! The catalog maps question ids to these hooks so the flow controller never
//! branches on question ids itself.

use super::text::{BilingualText, Language};
use crate::store::Event;

/// Extra handling applied when an answer to a question is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerHook {
    /// The answer switches the session language.
    SetLanguage,
    /// The answer is an event id; create the registration for it.
    CreateRegistration,
    /// Store the answer keyed by the session's event type.
    KeyByEventType,
    /// A "no" answer ends the form as declined.
    RegistrationIntent,
}

/// Text sent to the user before a question is presented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextHook {
    /// Fixed section introduction.
    Intro(BilingualText),
    EventDescription,
    ParticipantCommitment,
    LineRules,
    PlaceRules,
}

impl ContextHook {
    /// The text to send, or `None` when it depends on event data that is
    /// missing or empty.
    pub fn render(&self, language: Language, event: Option<&Event>) -> Option<String> {
        let text = match self {
            Self::Intro(text) => text.resolve(language).to_string(),
            Self::EventDescription => event_description(event?, language),
            Self::ParticipantCommitment => event?.participant_commitment.clone(),
            Self::LineRules => event?.line_rules.clone(),
            Self::PlaceRules => event?.place_rules.clone(),
        };
        (!text.trim().is_empty()).then_some(text)
    }
}

/// Summary of an event shown before asking whether to register.
pub fn event_description(event: &Event, language: Language) -> String {
    let presents = BilingualText::new("Wild Ginger גאים להציג:", "Wild Ginger proudly presents:");
    let mut lines = vec![
        presents.resolve(language).to_string(),
        event.name.clone(),
        format!(
            "{}, {}-{}, {}",
            event.start_date, event.start_time, event.end_time, event.location
        ),
    ];
    if !event.description.trim().is_empty() {
        lines.push(String::new());
        lines.push(event.description.clone());
    }
    lines.join("\n")
}
