//! Question catalog: ordered definitions plus the hook and jump tables
//! registered alongside them.

use std::collections::HashMap;

use tracing::info;

use super::hooks::{AnswerHook, ContextHook};
use super::model::QuestionDefinition;
use super::questions::{self, CUDDLE, ids};
use crate::error::CatalogError;
use crate::store::{Event, EventStore, Shift};

/// After the question at `after_order`, sessions for events of
/// `event_type` continue at `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JumpRule {
    pub after_order: u32,
    pub event_type: String,
    pub target: String,
}

/// Immutable, ordered set of questions with O(1) lookup by id.
#[derive(Debug)]
pub struct Catalog {
    questions: Vec<QuestionDefinition>,
    index: HashMap<String, usize>,
    answer_hooks: HashMap<String, AnswerHook>,
    context_hooks: HashMap<String, Vec<ContextHook>>,
    jumps: Vec<JumpRule>,
}

impl Catalog {
    /// Build the registration form from the event store's upcoming events
    /// and shifts.
    pub async fn load(events: &dyn EventStore) -> Result<Self, CatalogError> {
        let upcoming = events.list_upcoming().await?;
        let shifts = events.list_shifts().await?;
        let catalog = Self::build(&upcoming, &shifts)?;
        info!(
            questions = catalog.len(),
            events = upcoming.len(),
            shifts = shifts.len(),
            "Question catalog loaded"
        );
        Ok(catalog)
    }

    pub fn build(events: &[Event], shifts: &[Shift]) -> Result<Self, CatalogError> {
        Self::with_default_hooks(questions::question_definitions(events, shifts))
    }

    /// Wrap arbitrary question data with the registration form's hooks and
    /// jump rule.
    pub fn with_default_hooks(questions: Vec<QuestionDefinition>) -> Result<Self, CatalogError> {
        let mut builder = CatalogBuilder::new(questions)
            .answer_hook(ids::LANGUAGE, AnswerHook::SetLanguage)
            .answer_hook(ids::EVENT_SELECTION, AnswerHook::CreateRegistration)
            .answer_hook(ids::RELEVANT_EXPERIENCE, AnswerHook::KeyByEventType)
            .answer_hook(ids::WOULD_YOU_LIKE_TO_REGISTER, AnswerHook::RegistrationIntent);

        for (id, text) in questions::intro_texts() {
            builder = builder.context_hook(id, ContextHook::Intro(text));
        }

        builder
            .context_hook(ids::WOULD_YOU_LIKE_TO_REGISTER, ContextHook::EventDescription)
            .context_hook(ids::AGREE_PARTICIPANT_COMMITMENT, ContextHook::ParticipantCommitment)
            .context_hook(ids::AGREE_LINE_RULES, ContextHook::LineRules)
            .context_hook(ids::AGREE_PLACE_RULES, ContextHook::PlaceRules)
            .jump(JumpRule {
                after_order: 13,
                event_type: CUDDLE.to_string(),
                target: ids::FOOD_RESTRICTIONS.to_string(),
            })
            .build()
    }

    /// All questions sorted by order.
    pub fn definitions(&self) -> &[QuestionDefinition] {
        &self.questions
    }

    pub fn get(&self, id: &str) -> Option<&QuestionDefinition> {
        self.index.get(id).map(|&i| &self.questions[i])
    }

    /// The entry question. Always the language question.
    pub fn first(&self) -> &QuestionDefinition {
        &self.questions[0]
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Questions from `order` onwards, inclusive.
    pub fn from_order(&self, order: u32) -> impl Iterator<Item = &QuestionDefinition> {
        self.questions.iter().filter(move |q| q.order >= order)
    }

    pub fn answer_hook(&self, id: &str) -> Option<AnswerHook> {
        self.answer_hooks.get(id).copied()
    }

    pub fn context_hooks(&self, id: &str) -> &[ContextHook] {
        self.context_hooks.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The question to jump to after the question at `order`, if a jump rule
    /// applies for this event type.
    pub fn jump_target(&self, order: u32, event_type: Option<&str>) -> Option<&QuestionDefinition> {
        let event_type = event_type?;
        self.jumps
            .iter()
            .find(|j| j.after_order == order && j.event_type == event_type)
            .and_then(|j| self.get(&j.target))
    }
}

/// Assembles and checks a [`Catalog`].
pub struct CatalogBuilder {
    questions: Vec<QuestionDefinition>,
    answer_hooks: HashMap<String, AnswerHook>,
    context_hooks: HashMap<String, Vec<ContextHook>>,
    jumps: Vec<JumpRule>,
}

impl CatalogBuilder {
    pub fn new(questions: Vec<QuestionDefinition>) -> Self {
        Self {
            questions,
            answer_hooks: HashMap::new(),
            context_hooks: HashMap::new(),
            jumps: Vec::new(),
        }
    }

    pub fn answer_hook(mut self, id: &str, hook: AnswerHook) -> Self {
        self.answer_hooks.insert(id.to_string(), hook);
        self
    }

    /// Context hooks for one question run in registration order.
    pub fn context_hook(mut self, id: &str, hook: ContextHook) -> Self {
        self.context_hooks.entry(id.to_string()).or_default().push(hook);
        self
    }

    pub fn jump(mut self, rule: JumpRule) -> Self {
        self.jumps.push(rule);
        self
    }

    pub fn build(self) -> Result<Catalog, CatalogError> {
        let mut questions = self.questions;
        if questions.is_empty() {
            return Err(CatalogError::Empty);
        }
        questions.sort_by_key(|q| q.order);

        let mut index = HashMap::with_capacity(questions.len());
        for (i, q) in questions.iter().enumerate() {
            if index.insert(q.id.clone(), i).is_some() {
                return Err(CatalogError::DuplicateId(q.id.clone()));
            }
            if i > 0 && questions[i - 1].order == q.order {
                return Err(CatalogError::DuplicateOrder {
                    order: q.order,
                    first: questions[i - 1].id.clone(),
                    second: q.id.clone(),
                });
            }
        }

        if questions[0].id != ids::LANGUAGE {
            return Err(CatalogError::WrongFirstQuestion {
                expected: ids::LANGUAGE.to_string(),
                found: questions[0].id.clone(),
            });
        }

        let referenced = self
            .answer_hooks
            .keys()
            .chain(self.context_hooks.keys())
            .chain(self.jumps.iter().map(|j| &j.target));
        for id in referenced {
            if !index.contains_key(id) {
                return Err(CatalogError::UnknownHookTarget(id.clone()));
            }
        }

        Ok(Catalog {
            questions,
            index,
            answer_hooks: self.answer_hooks,
            context_hooks: self.context_hooks,
            jumps: self.jumps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::model::QuestionType;

    fn q(id: &str, order: u32) -> QuestionDefinition {
        QuestionDefinition::new(id, QuestionType::Text, order, id, id)
    }

    #[test]
    fn default_catalog_is_sorted_and_indexed() {
        let catalog = Catalog::build(&[], &[]).unwrap();
        assert_eq!(catalog.first().id, ids::LANGUAGE);
        assert!(catalog.definitions().windows(2).all(|w| w[0].order < w[1].order));
        assert_eq!(catalog.get(ids::FOOD_RESTRICTIONS).unwrap().order, 25);
        assert!(catalog.get("nope").is_none());
    }

    #[test]
    fn default_hooks_registered() {
        let catalog = Catalog::build(&[], &[]).unwrap();
        assert_eq!(
            catalog.answer_hook(ids::EVENT_SELECTION),
            Some(AnswerHook::CreateRegistration)
        );
        assert_eq!(catalog.answer_hook("pronouns"), None);

        // Intro first, then the event's commitment text
        let hooks = catalog.context_hooks(ids::AGREE_PARTICIPANT_COMMITMENT);
        assert!(matches!(hooks[0], ContextHook::Intro(_)));
        assert_eq!(hooks[1], ContextHook::ParticipantCommitment);
        assert!(catalog.context_hooks("pronouns").is_empty());
    }

    #[test]
    fn jump_only_for_matching_event_type() {
        let catalog = Catalog::build(&[], &[]).unwrap();
        assert_eq!(
            catalog.jump_target(13, Some(CUDDLE)).map(|q| q.id.as_str()),
            Some(ids::FOOD_RESTRICTIONS)
        );
        assert!(catalog.jump_target(13, Some("play")).is_none());
        assert!(catalog.jump_target(12, Some(CUDDLE)).is_none());
        assert!(catalog.jump_target(13, None).is_none());
    }

    #[test]
    fn from_order_is_inclusive() {
        let catalog = Catalog::build(&[], &[]).unwrap();
        assert_eq!(catalog.from_order(36).map(|q| q.order).collect::<Vec<_>>(), vec![36, 37]);
        assert_eq!(catalog.from_order(38).count(), 0);
    }

    #[test]
    fn rejects_duplicate_order() {
        let err = CatalogBuilder::new(vec![q("language", 1), q("a", 2), q("b", 2)])
            .build()
            .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateOrder { order: 2, .. }));
    }

    #[test]
    fn rejects_duplicate_id() {
        let err = CatalogBuilder::new(vec![q("language", 1), q("a", 2), q("a", 3)])
            .build()
            .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateId(id) if id == "a"));
    }

    #[test]
    fn rejects_non_language_entry() {
        let err = CatalogBuilder::new(vec![q("a", 1), q("language", 2)])
            .build()
            .unwrap_err();
        assert!(matches!(err, CatalogError::WrongFirstQuestion { .. }));
    }

    #[test]
    fn rejects_unknown_hook_target() {
        let err = CatalogBuilder::new(vec![q("language", 1)])
            .answer_hook("missing", AnswerHook::SetLanguage)
            .build()
            .unwrap_err();
        assert!(matches!(err, CatalogError::UnknownHookTarget(id) if id == "missing"));

        let err = CatalogBuilder::new(vec![q("language", 1)])
            .jump(JumpRule {
                after_order: 1,
                event_type: CUDDLE.into(),
                target: "gone".into(),
            })
            .build()
            .unwrap_err();
        assert!(matches!(err, CatalogError::UnknownHookTarget(_)));
    }

    #[test]
    fn rejects_empty() {
        assert!(matches!(
            CatalogBuilder::new(vec![]).build(),
            Err(CatalogError::Empty)
        ));
    }

    #[tokio::test]
    async fn load_uses_event_store() {
        let store = crate::store::MemoryEventStore::new(vec![Event {
            id: "E1".into(),
            name: "Cuddle Party".into(),
            event_type: CUDDLE.into(),
            ..Default::default()
        }]);
        let catalog = Catalog::load(&store).await.unwrap();
        let options = &catalog.get(ids::EVENT_SELECTION).unwrap().options;
        assert_eq!(options.len(), 1);
        assert_eq!(catalog.get(ids::DM_SHIFTS).unwrap().options.len(), 2);
    }
}
