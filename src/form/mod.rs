//! The registration form: question catalog, sessions, validation, skip
//! logic, and the flow engine tying them together.

pub mod catalog;
pub mod completion;
pub mod engine;
pub mod hooks;
pub mod links;
pub mod model;
pub mod questions;
pub mod session;
pub mod skip;
pub mod text;
pub mod validation;

pub use catalog::{Catalog, CatalogBuilder, JumpRule};
pub use completion::{CompletionPayload, CompletionWorkflow};
pub use engine::{AdvanceOutcome, EngineDeps, FormFlowEngine, FormProgress, StartOutcome};
pub use hooks::{AnswerHook, ContextHook};
pub use model::{
    Combinator, Comparison, QuestionDefinition, QuestionOption, QuestionType, RuleKind,
    SaveTarget, SkipCondition, SkipConditionItem, ValidationRule,
};
pub use session::{FlowState, FormSession, SessionRegistry};
pub use skip::{FlowContext, SkipEvaluator, should_skip};
pub use text::{BilingualText, Language};
pub use validation::{Clock, FixedClock, SystemClock, Validator, Verdict};
