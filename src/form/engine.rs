//! FormFlowEngine: drives one user at a time through the question catalog.
//!
//! Each `advance` validates the answer for the current question, applies the
//! question's answer hook, routes the answer to the user or registration
//! record, then scans forward for the next question that should not be
//! skipped. Persistence failures are logged and never block the flow.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use super::catalog::Catalog;
use super::completion::{CompletionPayload, CompletionWorkflow};
use super::hooks::AnswerHook;
use super::model::{QuestionDefinition, QuestionType, SaveTarget};
use super::session::{FlowState, FormSession, SessionRegistry};
use super::skip::{FlowContext, SkipEvaluator, should_skip};
use super::text::{BilingualText, Language};
use super::validation::{Clock, Validator, Verdict, answer_text, is_skip_sentinel};
use crate::config::EngineConfig;
use crate::error::FlowError;
use crate::store::{
    ChoiceOption, EventStore, Messenger, Notifier, Registration, RegistrationStatus,
    RegistrationStore, SessionStore, UserStore,
};

/// Collaborators the engine is wired with.
pub struct EngineDeps {
    pub users: Arc<dyn UserStore>,
    pub registrations: Arc<dyn RegistrationStore>,
    pub events: Arc<dyn EventStore>,
    pub messenger: Arc<dyn Messenger>,
    pub notifier: Arc<dyn Notifier>,
    pub sessions: Arc<dyn SessionStore>,
    pub clock: Arc<dyn Clock>,
}

/// Result of `start`.
#[derive(Debug, Clone)]
pub struct StartOutcome {
    pub question: QuestionDefinition,
    /// An existing session was re-attached instead of creating a new one.
    pub resumed: bool,
}

/// Result of `advance`.
#[derive(Debug, Clone)]
pub enum AdvanceOutcome {
    /// Answer accepted; this question is now being asked.
    Next { question: QuestionDefinition },
    /// Answer rejected; the same question is still current.
    Rejected {
        question: QuestionDefinition,
        message: BilingualText,
    },
    /// The selected event already has an active registration for this user.
    AlreadyRegistered {
        registration_id: String,
        status: RegistrationStatus,
    },
    Completed(CompletionPayload),
}

/// Snapshot of a session's progress, for status endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct FormProgress {
    pub user_id: String,
    pub event_id: Option<String>,
    pub registration_id: Option<String>,
    pub language: Language,
    pub state: FlowState,
    pub current_question: String,
    pub answered: usize,
    /// Questions answered plus those still expected to be asked.
    pub total: usize,
    pub percent: u8,
}

fn already_registered_message(status: RegistrationStatus) -> BilingualText {
    BilingualText::new(
        format!("כבר נרשמת לאירוע הזה (סטטוס: {status})."),
        format!("You are already registered for this event (status: {status})."),
    )
}

enum RegistrationOpen {
    Created(Registration),
    Existing(Registration),
    Failed,
}

pub struct FormFlowEngine {
    catalog: Arc<Catalog>,
    sessions: SessionRegistry,
    users: Arc<dyn UserStore>,
    registrations: Arc<dyn RegistrationStore>,
    messenger: Arc<dyn Messenger>,
    skip: SkipEvaluator,
    validator: Validator,
    completion: CompletionWorkflow,
    default_language: Language,
}

impl FormFlowEngine {
    /// Build the engine, restoring any sessions left in the session store.
    pub async fn new(catalog: Arc<Catalog>, deps: EngineDeps, config: &EngineConfig) -> Self {
        let sessions = SessionRegistry::restore(deps.sessions).await;
        Self {
            catalog,
            sessions,
            skip: SkipEvaluator::new(deps.users.clone(), deps.events),
            validator: Validator::new(deps.clock),
            completion: CompletionWorkflow::new(
                deps.registrations.clone(),
                deps.messenger.clone(),
                deps.notifier,
                config.invite_base.clone(),
            ),
            users: deps.users,
            registrations: deps.registrations,
            messenger: deps.messenger,
            default_language: config.default_language,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Begin the form for `user_id`, or re-attach to the live session if one
    /// exists. The current question is (re)sent either way.
    pub async fn start(
        &self,
        user_id: &str,
        event_id: Option<&str>,
        language: Option<Language>,
    ) -> Result<StartOutcome, FlowError> {
        let _guard = self.sessions.lock_user(user_id).await;

        if let Some(session) = self.sessions.get(user_id).await {
            let question = self.question_for(&session)?;
            info!(user_id, question = %question.id, "Resuming form session");
            let ctx = self.skip.context(&session).await;
            self.present(&session, question, &ctx).await;
            return Ok(StartOutcome {
                question: question.clone(),
                resumed: true,
            });
        }

        let first = self.catalog.first();
        let mut session = FormSession::new(
            user_id,
            event_id.map(str::to_string),
            language.unwrap_or(self.default_language),
            first.id.clone(),
        );
        session.returning_user = match self.users.get_by_external_id(user_id).await {
            Ok(user) => user.is_some(),
            Err(e) => {
                warn!(user_id, "User lookup failed at form start: {}", e);
                false
            }
        };
        if let Err(e) = session.transition(FlowState::InProgress) {
            warn!(user_id, "Unexpected start transition: {}", e);
        }

        info!(
            user_id,
            event_id = event_id.unwrap_or("-"),
            returning = session.returning_user,
            "Form session started"
        );
        self.sessions.put(session.clone()).await;

        let ctx = self.skip.context(&session).await;
        self.present(&session, first, &ctx).await;

        Ok(StartOutcome {
            question: first.clone(),
            resumed: false,
        })
    }

    /// Apply one answer to the user's current question.
    pub async fn advance(&self, user_id: &str, answer: Value) -> Result<AdvanceOutcome, FlowError> {
        let guard = self.sessions.lock_user(user_id).await;
        let outcome = self.apply_answer(user_id, answer).await;
        self.sessions.release_user(user_id, guard).await;
        outcome
    }

    async fn apply_answer(&self, user_id: &str, answer: Value) -> Result<AdvanceOutcome, FlowError> {
        let Some(mut session) = self.sessions.get(user_id).await else {
            warn!(user_id, "Answer received without an active form session");
            return Err(FlowError::NoActiveSession(user_id.to_string()));
        };
        let question = self.question_for(&session)?;

        let bypass = question.kind == QuestionType::Text && is_skip_sentinel(&answer);
        if bypass {
            debug!(user_id, question = %question.id, "Skip word given, validation bypassed");
        } else if let Verdict::Invalid { message, flag } = self.validator.validate(question, &answer) {
            debug!(user_id, question = %question.id, "Answer rejected");
            if let Some(flag) = flag {
                self.apply_failure_flag(&session, &flag).await;
            }
            if let Err(e) = session.transition(FlowState::ValidationError) {
                warn!(user_id, "Unexpected validation transition: {}", e);
            }
            self.sessions.put(session.clone()).await;
            self.send_text(user_id, message.resolve(session.language)).await;
            return Ok(AdvanceOutcome::Rejected {
                question: question.clone(),
                message,
            });
        }

        if session.state == FlowState::ValidationError
            && let Err(e) = session.transition(FlowState::InProgress)
        {
            warn!(user_id, "Unexpected recovery transition: {}", e);
        }

        let hook = self.catalog.answer_hook(&question.id);
        match hook {
            Some(AnswerHook::SetLanguage) => match answer_text(&answer).parse::<Language>() {
                Ok(language) => session.language = language,
                Err(e) => warn!(user_id, "Keeping session language: {}", e),
            },
            Some(AnswerHook::CreateRegistration) => {
                let event_id = answer_text(&answer).trim().to_string();
                match self.open_registration(user_id, &event_id).await {
                    RegistrationOpen::Existing(existing) => {
                        info!(
                            user_id,
                            event_id = %event_id,
                            registration_id = %existing.id,
                            "Already registered for event"
                        );
                        let message = already_registered_message(existing.status);
                        self.send_text(user_id, message.resolve(session.language)).await;
                        return Ok(AdvanceOutcome::AlreadyRegistered {
                            registration_id: existing.id,
                            status: existing.status,
                        });
                    }
                    RegistrationOpen::Created(registration) => {
                        session.registration_id = Some(registration.id);
                    }
                    RegistrationOpen::Failed => {}
                }
                session.event_id = Some(event_id);
            }
            Some(AnswerHook::KeyByEventType) | Some(AnswerHook::RegistrationIntent) | None => {}
        }

        session.record(&question.id, answer.clone());

        let ctx = self.skip.context(&session).await;
        self.route_answer(&session, question, &answer, hook, &ctx).await;

        if hook == Some(AnswerHook::RegistrationIntent) && answer_text(&answer).trim() == "no" {
            info!(user_id, "User declined to register");
            let payload = self.completion.run(session, false, &self.sessions).await;
            return Ok(AdvanceOutcome::Completed(payload));
        }

        match self.next_question(&session, question, &ctx) {
            Some(next) => {
                session.current_question = next.id.clone();
                self.sessions.put(session.clone()).await;
                self.present(&session, next, &ctx).await;
                Ok(AdvanceOutcome::Next {
                    question: next.clone(),
                })
            }
            None => {
                let payload = self.completion.run(session, true, &self.sessions).await;
                Ok(AdvanceOutcome::Completed(payload))
            }
        }
    }

    /// The question the user is currently being asked.
    pub async fn current_question(&self, user_id: &str) -> Option<QuestionDefinition> {
        let session = self.sessions.get(user_id).await?;
        self.catalog.get(&session.current_question).cloned()
    }

    pub async fn session(&self, user_id: &str) -> Option<FormSession> {
        self.sessions.get(user_id).await
    }

    pub async fn progress(&self, user_id: &str) -> Option<FormProgress> {
        let session = self.sessions.get(user_id).await?;
        let ctx = self.skip.context(&session).await;

        let answered = session.answers.len();
        let total = self
            .catalog
            .definitions()
            .iter()
            .filter(|q| session.answer(&q.id).is_some() || !should_skip(q, &session, &ctx))
            .count()
            .max(1);
        let percent = ((answered * 100) / total).min(100) as u8;

        Some(FormProgress {
            user_id: session.user_id.clone(),
            event_id: session.event_id.clone(),
            registration_id: session.registration_id.clone(),
            language: session.language,
            state: session.state,
            current_question: session.current_question.clone(),
            answered,
            total,
            percent,
        })
    }

    /// Drop the user's session without completing it.
    pub async fn abandon(&self, user_id: &str) -> bool {
        let guard = self.sessions.lock_user(user_id).await;
        let removed = self.sessions.remove(user_id).await.is_some();
        self.sessions.release_user(user_id, guard).await;
        if removed {
            info!(user_id, "Form session abandoned");
        }
        removed
    }

    pub async fn active_users(&self) -> Vec<String> {
        self.sessions.user_ids().await
    }

    fn question_for(&self, session: &FormSession) -> Result<&QuestionDefinition, FlowError> {
        self.catalog.get(&session.current_question).ok_or_else(|| {
            error!(
                user_id = %session.user_id,
                question = %session.current_question,
                "Session points at a question missing from the catalog"
            );
            FlowError::UnknownQuestion {
                user_id: session.user_id.clone(),
                question: session.current_question.clone(),
            }
        })
    }

    /// First question after `current` that should not be skipped, honouring
    /// jump rules.
    fn next_question<'a>(
        &'a self,
        session: &FormSession,
        current: &QuestionDefinition,
        ctx: &FlowContext,
    ) -> Option<&'a QuestionDefinition> {
        let from = match self.catalog.jump_target(current.order, ctx.event_type()) {
            Some(target) => {
                debug!(
                    user_id = %session.user_id,
                    from = %current.id,
                    to = %target.id,
                    "Jumping ahead for event type"
                );
                target.order
            }
            None => current.order + 1,
        };

        self.catalog.from_order(from).find(|q| {
            let skip = should_skip(q, session, ctx);
            if skip {
                debug!(user_id = %session.user_id, question = %q.id, "Skipping question");
            }
            !skip
        })
    }

    async fn open_registration(&self, user_id: &str, event_id: &str) -> RegistrationOpen {
        match self
            .registrations
            .get_active_registration(user_id, event_id)
            .await
        {
            Ok(Some(existing)) => return RegistrationOpen::Existing(existing),
            Ok(None) => {}
            Err(e) => warn!(user_id, event_id, "Active registration lookup failed: {}", e),
        }

        match self
            .registrations
            .create(user_id, event_id, RegistrationStatus::Incomplete)
            .await
        {
            Ok(Some(registration)) => {
                info!(
                    user_id,
                    event_id,
                    registration_id = %registration.id,
                    "Registration created"
                );
                RegistrationOpen::Created(registration)
            }
            Ok(None) => match self
                .registrations
                .get_active_registration(user_id, event_id)
                .await
            {
                Ok(Some(existing)) => RegistrationOpen::Existing(existing),
                _ => {
                    warn!(user_id, event_id, "Registration rejected as duplicate but none found");
                    RegistrationOpen::Failed
                }
            },
            Err(e) => {
                warn!(user_id, event_id, "Failed to create registration: {}", e);
                RegistrationOpen::Failed
            }
        }
    }

    /// Write an accepted answer to the record its question targets.
    async fn route_answer(
        &self,
        session: &FormSession,
        question: &QuestionDefinition,
        answer: &Value,
        hook: Option<AnswerHook>,
        ctx: &FlowContext,
    ) {
        if hook == Some(AnswerHook::CreateRegistration) {
            return;
        }

        let value = match (hook, ctx.event_type()) {
            (Some(AnswerHook::KeyByEventType), Some(event_type)) => {
                let mut keyed = Map::new();
                keyed.insert(event_type.to_string(), answer.clone());
                Value::Object(keyed)
            }
            (Some(AnswerHook::KeyByEventType), None) => {
                warn!(user_id = %session.user_id, question = %question.id, "No event type to key answer by");
                answer.clone()
            }
            _ => answer.clone(),
        };

        let user_id = session.user_id.as_str();
        match question.save_to {
            Some(SaveTarget::Users) => {
                if let Err(e) = self.users.update_field(user_id, &question.id, &value).await {
                    warn!(user_id, question = %question.id, "Failed to save answer to user: {}", e);
                }
            }
            Some(SaveTarget::Registrations) => {
                let Some(registration_id) = session.registration_id.as_deref() else {
                    debug!(user_id, question = %question.id, "No registration linked, answer kept in session only");
                    return;
                };
                match self
                    .registrations
                    .update_field(registration_id, &question.id, &value)
                    .await
                {
                    Ok(true) => {}
                    Ok(false) => warn!(user_id, registration_id, "Registration not found while saving answer"),
                    Err(e) => warn!(
                        user_id,
                        question = %question.id,
                        "Failed to save answer to registration: {}",
                        e
                    ),
                }
            }
            None => {}
        }
    }

    async fn apply_failure_flag(&self, session: &FormSession, flag: &str) {
        let Some(registration_id) = session.registration_id.as_deref() else {
            return;
        };
        if let Err(e) = self
            .registrations
            .update_field(registration_id, flag, &Value::Bool(false))
            .await
        {
            warn!(registration_id, flag, "Failed to set validation flag: {}", e);
        }
    }

    /// Send context texts, then the question itself.
    async fn present(&self, session: &FormSession, question: &QuestionDefinition, ctx: &FlowContext) {
        let user_id = session.user_id.as_str();
        let language = session.language;

        for hook in self.catalog.context_hooks(&question.id) {
            if let Some(text) = hook.render(language, ctx.event.as_ref()) {
                self.send_text(user_id, &text).await;
            }
        }

        let title = question.title.resolve(language);
        let placeholder = question.placeholder.as_ref().map(|p| p.resolve(language));

        if question.kind.is_choice() {
            if let Some(placeholder) = placeholder {
                self.send_text(user_id, placeholder).await;
            }
            let options: Vec<ChoiceOption> = question
                .options
                .iter()
                .map(|o| ChoiceOption {
                    value: o.value.clone(),
                    label: o.text.resolve(language).to_string(),
                })
                .collect();
            if let Err(e) = self
                .messenger
                .send_choice(user_id, title, &options, question.kind.allows_multiple())
                .await
            {
                warn!(user_id, question = %question.id, "Failed to send question: {}", e);
            }
        } else {
            let text = match placeholder {
                Some(placeholder) => format!("{title}\n\n{placeholder}"),
                None => title.to_string(),
            };
            self.send_text(user_id, &text).await;
        }
    }

    async fn send_text(&self, user_id: &str, text: &str) {
        if let Err(e) = self.messenger.send_text(user_id, text).await {
            warn!(user_id, "Failed to send message: {}", e);
        }
    }
}
