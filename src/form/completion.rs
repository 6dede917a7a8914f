//! Completion workflow: finalises the registration once the form ends.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use super::questions::ids;
use super::session::{FlowState, FormSession, SessionRegistry};
use super::text::BilingualText;
use super::validation::answer_text;
use crate::store::{Messenger, Notifier, RegistrationStatus, RegistrationStore};

/// Result of a finished form, returned to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionPayload {
    pub user_id: String,
    pub event_id: Option<String>,
    pub registration_id: Option<String>,
    /// False when the user declined to register.
    pub registered: bool,
    pub status: RegistrationStatus,
    pub message: BilingualText,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partner_invite: Option<String>,
    pub answers: Map<String, Value>,
}

pub fn completed_message() -> BilingualText {
    BilingualText::new(
        "תודה על ההרשמה! נציג יצור איתך קשר בקרוב.",
        "Thank you for registering! A representative will contact you soon.",
    )
}

pub fn declined_message() -> BilingualText {
    BilingualText::new(
        "תודה שמילאת את הטופס! ניתן להתחיל מחדש בכל עת עם הפקודה /start",
        "Thank you for filling out the form! You can start over at any time with the /start command",
    )
}

fn partner_message(link: Option<&str>) -> BilingualText {
    match link {
        Some(link) => BilingualText::new(
            format!("כדי שהפרטנר/ית יוכלו להירשם, שלחו להם את הלינק הבא:\n{link}"),
            format!("Send this link to your partner so they can register too:\n{link}"),
        ),
        None => BilingualText::new(
            "אל תשכחו לבקש מהפרטנר/ית למלא גם את הטופס.",
            "Don't forget to ask your partner to fill out the form as well.",
        ),
    }
}

/// Runs the end-of-form steps. Every step logs its own failure and the
/// workflow carries on.
pub struct CompletionWorkflow {
    registrations: Arc<dyn RegistrationStore>,
    messenger: Arc<dyn Messenger>,
    notifier: Arc<dyn Notifier>,
    invite_base: Option<String>,
}

impl CompletionWorkflow {
    pub fn new(
        registrations: Arc<dyn RegistrationStore>,
        messenger: Arc<dyn Messenger>,
        notifier: Arc<dyn Notifier>,
        invite_base: Option<String>,
    ) -> Self {
        Self {
            registrations,
            messenger,
            notifier,
            invite_base,
        }
    }

    /// Finalise `session`:
    ///
    /// 1. Mark the registration's form as complete.
    /// 2. Set its status to pending (registered) or uninterested (declined).
    /// 3. For returning users, mark the get-to-know step complete; for
    ///    partner registrations, send the partner invitation.
    /// 4. Send the completion message.
    /// 5. Remove the session from the active set.
    /// 6. Notify operators.
    pub async fn run(
        &self,
        mut session: FormSession,
        registered: bool,
        sessions: &SessionRegistry,
    ) -> CompletionPayload {
        let user_id = session.user_id.clone();
        if let Err(e) = session.transition(FlowState::Completed) {
            warn!(user_id = %user_id, "Unexpected completion transition: {}", e);
        }

        let status = if registered {
            RegistrationStatus::Pending
        } else {
            RegistrationStatus::Uninterested
        };

        if let Some(registration_id) = session.registration_id.as_deref() {
            self.update_registration(registration_id, "form_complete", Value::Bool(true))
                .await;
            self.update_registration(registration_id, "status", Value::from(status.to_string()))
                .await;
            if session.returning_user {
                self.update_registration(registration_id, "get_to_know_complete", Value::Bool(true))
                    .await;
            }
        } else {
            warn!(user_id = %user_id, "Form completed without a linked registration");
        }

        let partner_invite = if registered && session.answer_str(ids::PARTNER_OR_SINGLE) == Some("partner") {
            let link = match (&self.invite_base, &session.registration_id) {
                (Some(base), Some(reg)) => Some(format!("{base}{reg}")),
                _ => None,
            };
            let text = partner_message(link.as_deref());
            self.send(&user_id, text.resolve(session.language)).await;
            link
        } else {
            None
        };

        let message = if registered {
            completed_message()
        } else {
            declined_message()
        };
        self.send(&user_id, message.resolve(session.language)).await;

        sessions.remove(&user_id).await;

        let summary = operator_summary(&session, status);
        if let Err(e) = self.notifier.notify(&summary).await {
            warn!(user_id = %user_id, "Failed to notify operators: {}", e);
        }

        info!(
            user_id = %user_id,
            event_id = session.event_id.as_deref().unwrap_or("-"),
            status = %status,
            answers = session.answers.len(),
            "Form completed"
        );

        CompletionPayload {
            user_id,
            event_id: session.event_id,
            registration_id: session.registration_id,
            registered,
            status,
            message,
            partner_invite,
            answers: session.answers,
        }
    }

    async fn update_registration(&self, registration_id: &str, field: &str, value: Value) {
        match self
            .registrations
            .update_field(registration_id, field, &value)
            .await
        {
            Ok(true) => {}
            Ok(false) => warn!(registration_id, field, "Registration not found while completing form"),
            Err(e) => warn!(registration_id, field, "Failed to update registration: {}", e),
        }
    }

    async fn send(&self, user_id: &str, text: &str) {
        if let Err(e) = self.messenger.send_text(user_id, text).await {
            warn!(user_id, "Failed to send completion message: {}", e);
        }
    }
}

/// Plain-text summary for operators: who, which event, and every answer.
pub fn operator_summary(session: &FormSession, status: RegistrationStatus) -> String {
    let mut lines = vec![
        "Registration form completed".to_string(),
        format!("User: {}", session.user_id),
        format!("Event: {}", session.event_id.as_deref().unwrap_or("-")),
        format!(
            "Registration: {}",
            session.registration_id.as_deref().unwrap_or("-")
        ),
        format!("Status: {status}"),
        "Answers:".to_string(),
    ];
    lines.extend(
        session
            .answers
            .iter()
            .map(|(id, answer)| format!("- {id}: {}", answer_text(answer))),
    );
    lines.join("\n")
}
