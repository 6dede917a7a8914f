//! Question definitions: types, options, validation rules and skip conditions.

use serde::Serialize;

use super::text::BilingualText;

/// How a question is asked and what shape its answer takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionType {
    Text,
    Number,
    Date,
    Url,
    Email,
    Phone,
    Select,
    MultiSelect,
    Boolean,
    TelegramLink,
    FacebookLink,
}

impl QuestionType {
    /// Presented as a fixed list of options rather than free text.
    pub fn is_choice(&self) -> bool {
        matches!(self, Self::Select | Self::MultiSelect | Self::Boolean)
    }

    pub fn allows_multiple(&self) -> bool {
        matches!(self, Self::MultiSelect)
    }
}

/// Which record an accepted answer is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SaveTarget {
    Users,
    Registrations,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionOption {
    pub value: String,
    pub text: BilingualText,
}

impl QuestionOption {
    pub fn new(value: impl Into<String>, he: &str, en: &str) -> Self {
        Self {
            value: value.into(),
            text: BilingualText::new(he, en),
        }
    }
}

/// The check a [`ValidationRule`] performs, with its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleKind {
    Required,
    MinLength {
        min: usize,
    },
    MaxLength {
        max: usize,
    },
    /// Passes when the pattern matches anywhere in the answer. On failure
    /// the named registration field is set to `false`.
    Regex {
        pattern: String,
        failure_flag: Option<String>,
    },
    DateRange,
    AgeRange {
        min_age: u32,
        max_age: u32,
    },
    TelegramLinkFormat,
    FacebookLinkFormat,
    Unique,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationRule {
    #[serde(flatten)]
    pub kind: RuleKind,
    pub message: BilingualText,
}

impl ValidationRule {
    pub fn new(kind: RuleKind, he: &str, en: &str) -> Self {
        Self {
            kind,
            message: BilingualText::new(he, en),
        }
    }
}

/// Comparison used by a field-value skip item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Equals(String),
    NotIn(Vec<String>),
}

/// One test inside a [`SkipCondition`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SkipConditionItem {
    /// Compares an earlier answer in the same session.
    FieldValue { field: String, comparison: Comparison },
    /// Checks a field on the stored user record.
    UserExists { field: String },
    /// Compares the type of the event the session is registering for.
    EventType { value: String },
}

impl SkipConditionItem {
    pub fn field_equals(field: &str, value: &str) -> Self {
        Self::FieldValue {
            field: field.to_string(),
            comparison: Comparison::Equals(value.to_string()),
        }
    }

    pub fn field_not_in(field: &str, values: &[&str]) -> Self {
        Self::FieldValue {
            field: field.to_string(),
            comparison: Comparison::NotIn(values.iter().map(|v| v.to_string()).collect()),
        }
    }

    pub fn user_exists(field: &str) -> Self {
        Self::UserExists {
            field: field.to_string(),
        }
    }

    pub fn event_type(value: &str) -> Self {
        Self::EventType {
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Combinator {
    Or,
    And,
    Not,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkipCondition {
    pub combinator: Combinator,
    pub items: Vec<SkipConditionItem>,
}

impl SkipCondition {
    /// Skip when any item matches.
    pub fn any(items: Vec<SkipConditionItem>) -> Self {
        Self {
            combinator: Combinator::Or,
            items,
        }
    }
}

/// A single question in the catalog. Immutable once the catalog is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionDefinition {
    pub id: String,
    pub kind: QuestionType,
    pub title: BilingualText,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<BilingualText>,
    pub required: bool,
    pub save_to: Option<SaveTarget>,
    pub order: u32,
    pub options: Vec<QuestionOption>,
    pub rules: Vec<ValidationRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<SkipCondition>,
}

impl QuestionDefinition {
    pub fn new(id: &str, kind: QuestionType, order: u32, he: &str, en: &str) -> Self {
        Self {
            id: id.to_string(),
            kind,
            title: BilingualText::new(he, en),
            placeholder: None,
            required: false,
            save_to: None,
            order,
            options: Vec::new(),
            rules: Vec::new(),
            skip: None,
        }
    }

    pub fn with_save_to(mut self, target: SaveTarget) -> Self {
        self.save_to = Some(target);
        self
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_placeholder(mut self, placeholder: BilingualText) -> Self {
        self.placeholder = Some(placeholder);
        self
    }

    pub fn with_options(mut self, options: Vec<QuestionOption>) -> Self {
        self.options = options;
        self
    }

    pub fn with_rule(mut self, rule: ValidationRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_skip(mut self, skip: SkipCondition) -> Self {
        self.skip = Some(skip);
        self
    }
}
