//! Skip-condition evaluation.
//!
//! External lookups (the stored user record and the session's event) are
//! gathered once into a [`FlowContext`]; [`should_skip`] itself is a pure
//! function of the question, the session and that context.

use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use super::model::{Combinator, Comparison, QuestionDefinition, SkipConditionItem};
use super::session::FormSession;
use super::validation::is_blank;
use crate::store::{Event, EventStore, UserRecord, UserStore};

/// Collaborator data looked up once per advance.
#[derive(Debug, Clone, Default)]
pub struct FlowContext {
    pub user: Option<UserRecord>,
    pub event: Option<Event>,
}

impl FlowContext {
    pub fn event_type(&self) -> Option<&str> {
        self.event.as_ref().map(|e| e.event_type.as_str())
    }
}

/// Fetches the data skip conditions depend on.
pub struct SkipEvaluator {
    users: Arc<dyn UserStore>,
    events: Arc<dyn EventStore>,
}

impl SkipEvaluator {
    pub fn new(users: Arc<dyn UserStore>, events: Arc<dyn EventStore>) -> Self {
        Self { users, events }
    }

    /// Look up the user record and event for `session`. Lookup failures are
    /// logged and treated as absent.
    pub async fn context(&self, session: &FormSession) -> FlowContext {
        let user = match self.users.get_by_external_id(&session.user_id).await {
            Ok(user) => user,
            Err(e) => {
                warn!(user_id = %session.user_id, "User lookup failed: {}", e);
                None
            }
        };

        let event = match session.event_id.as_deref() {
            Some(event_id) => match self.events.get_by_id(event_id).await {
                Ok(event) => event,
                Err(e) => {
                    warn!(event_id, "Event lookup failed: {}", e);
                    None
                }
            },
            None => None,
        };

        FlowContext { user, event }
    }
}

/// Whether `question` should be skipped for this session.
pub fn should_skip(question: &QuestionDefinition, session: &FormSession, ctx: &FlowContext) -> bool {
    let Some(condition) = &question.skip else {
        return false;
    };
    let matches = |item: &SkipConditionItem| item_matches(item, session, ctx);

    match condition.combinator {
        Combinator::Or => condition.items.iter().any(matches),
        Combinator::And => !condition.items.is_empty() && condition.items.iter().all(matches),
        Combinator::Not => condition.items.first().is_some_and(|item| !matches(item)),
    }
}

fn item_matches(item: &SkipConditionItem, session: &FormSession, ctx: &FlowContext) -> bool {
    match item {
        SkipConditionItem::FieldValue { field, comparison } => {
            // A missing or empty answer counts as a match for both comparisons.
            let Some(answer) = session.answer(field).filter(|a| !is_blank(a)) else {
                return true;
            };
            match comparison {
                Comparison::Equals(value) => answer_equals(answer, value),
                Comparison::NotIn(values) => !values.iter().any(|v| answer_equals(answer, v)),
            }
        }
        SkipConditionItem::UserExists { field } => ctx
            .user
            .as_ref()
            .and_then(|u| u.field(field))
            .is_some_and(|v| !is_blank(v)),
        SkipConditionItem::EventType { value } => ctx.event_type() == Some(value.as_str()),
    }
}

fn answer_equals(answer: &Value, expected: &str) -> bool {
    match answer {
        Value::String(s) => s == expected,
        Value::Array(items) => items.iter().any(|v| v.as_str() == Some(expected)),
        other => other.to_string() == expected,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::form::Language;
    use crate::form::model::{QuestionType, SkipCondition};

    fn question_with(skip: SkipCondition) -> QuestionDefinition {
        QuestionDefinition::new("q", QuestionType::Text, 10, "ש", "Q").with_skip(skip)
    }

    fn session() -> FormSession {
        FormSession::new("u1", Some("E1".into()), Language::He, "q")
    }

    fn cuddle_context() -> FlowContext {
        FlowContext {
            user: None,
            event: Some(Event {
                id: "E1".into(),
                event_type: "cuddle".into(),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn no_condition_never_skips() {
        let q = QuestionDefinition::new("q", QuestionType::Text, 1, "ש", "Q");
        assert!(!should_skip(&q, &session(), &FlowContext::default()));
    }

    #[test]
    fn empty_or_never_skips() {
        let q = question_with(SkipCondition::any(vec![]));
        assert!(!should_skip(&q, &session(), &FlowContext::default()));
    }

    #[test]
    fn field_equals() {
        let q = question_with(SkipCondition::any(vec![SkipConditionItem::field_equals(
            "partner_or_single",
            "single",
        )]));
        let mut s = session();
        s.record("partner_or_single", json!("single"));
        assert!(should_skip(&q, &s, &FlowContext::default()));

        s.record("partner_or_single", json!("partner"));
        assert!(!should_skip(&q, &s, &FlowContext::default()));
    }

    #[test]
    fn missing_or_empty_answer_counts_as_match() {
        let q = question_with(SkipCondition::any(vec![SkipConditionItem::field_equals(
            "alcohol_in_event",
            "no",
        )]));
        let mut s = session();
        assert!(should_skip(&q, &s, &FlowContext::default()));
        s.record("alcohol_in_event", json!(""));
        assert!(should_skip(&q, &s, &FlowContext::default()));
    }

    #[test]
    fn not_in_matches_missing_answer() {
        let q = question_with(SkipCondition::any(vec![SkipConditionItem::field_not_in(
            "contact_type",
            &["other"],
        )]));
        let mut s = session();
        assert!(should_skip(&q, &s, &FlowContext::default()));

        s.record("contact_type", json!("bdsm_only"));
        assert!(should_skip(&q, &s, &FlowContext::default()));

        s.record("contact_type", json!("other"));
        assert!(!should_skip(&q, &s, &FlowContext::default()));
    }

    #[test]
    fn user_exists_checks_named_field() {
        let q = question_with(SkipCondition::any(vec![SkipConditionItem::user_exists("full_name")]));
        let s = session();
        assert!(!should_skip(&q, &s, &FlowContext::default()));

        let mut user = UserRecord::new("u1");
        user.fields.insert("full_name".into(), json!(""));
        let ctx = FlowContext { user: Some(user.clone()), event: None };
        assert!(!should_skip(&q, &s, &ctx));

        user.fields.insert("full_name".into(), json!("Dana Levi"));
        let ctx = FlowContext { user: Some(user), event: None };
        assert!(should_skip(&q, &s, &ctx));
    }

    #[test]
    fn event_type_exact_match() {
        let q = question_with(SkipCondition::any(vec![SkipConditionItem::event_type("cuddle")]));
        assert!(should_skip(&q, &session(), &cuddle_context()));
        assert!(!should_skip(&q, &session(), &FlowContext::default()));

        let q = question_with(SkipCondition::any(vec![SkipConditionItem::event_type("Cuddle")]));
        assert!(!should_skip(&q, &session(), &cuddle_context()));
    }

    #[test]
    fn or_any_item_matches() {
        let q = question_with(SkipCondition::any(vec![
            SkipConditionItem::event_type("play"),
            SkipConditionItem::field_equals("share_bdsm_interests", "no"),
        ]));
        let mut s = session();
        s.record("share_bdsm_interests", json!("yes"));
        assert!(!should_skip(&q, &s, &cuddle_context()));
        s.record("share_bdsm_interests", json!("no"));
        assert!(should_skip(&q, &s, &cuddle_context()));
    }

    #[test]
    fn and_and_not_combinators() {
        let items = vec![
            SkipConditionItem::event_type("cuddle"),
            SkipConditionItem::field_equals("wants_to_helper", "no"),
        ];
        let and = question_with(SkipCondition {
            combinator: Combinator::And,
            items: items.clone(),
        });
        let not = question_with(SkipCondition {
            combinator: Combinator::Not,
            items: vec![SkipConditionItem::event_type("cuddle")],
        });

        let mut s = session();
        s.record("wants_to_helper", json!("yes"));
        assert!(!should_skip(&and, &s, &cuddle_context()));
        s.record("wants_to_helper", json!("no"));
        assert!(should_skip(&and, &s, &cuddle_context()));

        assert!(!should_skip(&not, &s, &cuddle_context()));
        assert!(should_skip(&not, &s, &FlowContext::default()));
    }

    #[test]
    fn deterministic_for_same_inputs() {
        let q = question_with(SkipCondition::any(vec![SkipConditionItem::field_equals(
            "partner_or_single",
            "single",
        )]));
        let mut s = session();
        s.record("partner_or_single", json!("partner"));
        let ctx = cuddle_context();
        let first = should_skip(&q, &s, &ctx);
        for _ in 0..5 {
            assert_eq!(should_skip(&q, &s, &ctx), first);
        }
    }
}
