//! Answer validation against a question's declared rules.
//!
//! Pure: no I/O. Rules run in declaration order and the first failure is
//! reported. A failing REGEX rule may carry a flag name that the caller
//! writes to the registration record.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{Datelike, NaiveDate, Utc};
use regex::Regex;
use serde_json::Value;
use tracing::{debug, error};

use super::links::LinkRules;
use super::model::{QuestionDefinition, RuleKind};
use super::text::BilingualText;

/// Answers that skip validation on free-text questions.
pub const SKIP_SENTINELS: [&str; 2] = ["continue", "המשך"];

/// Source of "today" for age checks.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// A clock pinned to one date.
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Outcome of validating one answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    Invalid {
        message: BilingualText,
        /// Registration field to set to `false` because of this failure.
        flag: Option<String>,
    },
}

impl Verdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    fn fail(message: &BilingualText) -> Self {
        Self::Invalid {
            message: message.clone(),
            flag: None,
        }
    }
}

pub struct Validator {
    clock: Arc<dyn Clock>,
    links: LinkRules,
    date: Regex,
    /// REGEX rule patterns, compiled on first use.
    patterns: Mutex<HashMap<String, Regex>>,
}

impl Validator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            links: LinkRules::default_rules(),
            date: Regex::new(r"^(\d{2})/(\d{2})/(\d{4})$").unwrap(),
            patterns: Mutex::new(HashMap::new()),
        }
    }

    pub fn validate(&self, question: &QuestionDefinition, answer: &Value) -> Verdict {
        let text = answer_text(answer);
        let text = text.trim();

        for rule in &question.rules {
            let passed = match &rule.kind {
                RuleKind::Required => !is_blank(answer),
                RuleKind::MinLength { min } => text.chars().count() >= *min,
                RuleKind::MaxLength { max } => text.chars().count() <= *max,
                RuleKind::Regex {
                    pattern,
                    failure_flag,
                } => match self.pattern(pattern) {
                    Ok(re) if re.is_match(text) => true,
                    Ok(_) => {
                        return Verdict::Invalid {
                            message: rule.message.clone(),
                            flag: failure_flag.clone(),
                        };
                    }
                    Err(e) => {
                        error!(question = %question.id, "Invalid validation pattern {}: {}", pattern, e);
                        false
                    }
                },
                RuleKind::DateRange => self.parse_date(text).is_some(),
                RuleKind::AgeRange { min_age, max_age } => match self.parse_date(text) {
                    Some(birth) => {
                        let age = age_on(birth, self.clock.today());
                        age >= i64::from(*min_age) && age <= i64::from(*max_age)
                    }
                    None => false,
                },
                RuleKind::TelegramLinkFormat => self.links.is_telegram_link(text),
                RuleKind::FacebookLinkFormat => self.links.is_social_link(text),
                RuleKind::Unique => {
                    debug!(question = %question.id, "Uniqueness is not checked, accepting");
                    true
                }
            };

            if !passed {
                return Verdict::fail(&rule.message);
            }
        }

        Verdict::Valid
    }

    /// Compiled form of a rule pattern. Only patterns that compile are kept.
    fn pattern(&self, pattern: &str) -> Result<Regex, regex::Error> {
        let mut patterns = self.patterns.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(re) = patterns.get(pattern) {
            return Ok(re.clone());
        }
        let re = Regex::new(pattern)?;
        patterns.insert(pattern.to_string(), re.clone());
        Ok(re)
    }

    /// Parse `DD/MM/YYYY` into a real calendar date.
    pub fn parse_date(&self, text: &str) -> Option<NaiveDate> {
        let caps = self.date.captures(text.trim())?;
        let day = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        let year = caps[3].parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, day)
    }
}

/// Whole years between `birth` and `today`.
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> i64 {
    let mut years = i64::from(today.year() - birth.year());
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    years
}

/// Whether an answer is the explicit "skip this question" word.
pub fn is_skip_sentinel(answer: &Value) -> bool {
    answer.as_str().is_some_and(|s| {
        let s = s.trim().to_lowercase();
        SKIP_SENTINELS.contains(&s.as_str())
    })
}

/// An answer flattened to text. Multi-select answers are comma-joined.
pub fn answer_text(answer: &Value) -> String {
    match answer {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

/// Missing, empty, whitespace-only or an empty selection.
pub fn is_blank(answer: &Value) -> bool {
    match answer {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::form::model::{QuestionType, ValidationRule};

    fn validator_on(y: i32, m: u32, d: u32) -> Validator {
        Validator::new(Arc::new(FixedClock(NaiveDate::from_ymd_opt(y, m, d).unwrap())))
    }

    fn question(rules: Vec<RuleKind>) -> QuestionDefinition {
        rules.into_iter().enumerate().fold(
            QuestionDefinition::new("q", QuestionType::Text, 1, "ש", "Q"),
            |q, (i, kind)| q.with_rule(ValidationRule::new(kind, &format!("שגיאה {i}"), &format!("error {i}"))),
        )
    }

    fn message_of(verdict: Verdict) -> String {
        match verdict {
            Verdict::Invalid { message, .. } => message.en,
            Verdict::Valid => panic!("expected invalid"),
        }
    }

    #[test]
    fn required_rejects_blank_answers() {
        let v = validator_on(2025, 1, 1);
        let q = question(vec![RuleKind::Required]);
        assert!(!v.validate(&q, &json!("")).is_valid());
        assert!(!v.validate(&q, &json!("   ")).is_valid());
        assert!(!v.validate(&q, &json!([])).is_valid());
        assert!(!v.validate(&q, &Value::Null).is_valid());
        assert!(v.validate(&q, &json!("x")).is_valid());
        assert!(v.validate(&q, &json!(["play"])).is_valid());
    }

    #[test]
    fn first_failing_rule_wins() {
        let v = validator_on(2025, 1, 1);
        let q = question(vec![RuleKind::Required, RuleKind::MinLength { min: 2 }]);
        assert_eq!(message_of(v.validate(&q, &json!(""))), "error 0");
        assert_eq!(message_of(v.validate(&q, &json!("a"))), "error 1");
        assert!(v.validate(&q, &json!("ab")).is_valid());
    }

    #[test]
    fn lengths_count_characters_not_bytes() {
        let v = validator_on(2025, 1, 1);
        let q = question(vec![RuleKind::MaxLength { max: 4 }]);
        // 5 characters, 9 bytes
        assert!(!v.validate(&q, &json!("דנה ל")).is_valid());
        // 4 characters, 8 bytes
        assert!(v.validate(&q, &json!("דנהל")).is_valid());
    }

    #[test]
    fn regex_failure_carries_flag() {
        let v = validator_on(2025, 1, 1);
        let q = question(vec![RuleKind::Regex {
            pattern: "זנגביל|ginger".into(),
            failure_flag: Some("line_rules_first_try".into()),
        }]);
        assert!(v.validate(&q, &json!("I agree, ginger")).is_valid());
        assert!(v.validate(&q, &json!("מסכים זנגביל")).is_valid());
        match v.validate(&q, &json!("I agree")) {
            Verdict::Invalid { flag, .. } => assert_eq!(flag.as_deref(), Some("line_rules_first_try")),
            Verdict::Valid => panic!("expected invalid"),
        }
    }

    #[test]
    fn invalid_pattern_fails_without_panicking() {
        let v = validator_on(2025, 1, 1);
        let q = question(vec![RuleKind::Regex {
            pattern: "(unclosed".into(),
            failure_flag: None,
        }]);
        assert!(!v.validate(&q, &json!("anything")).is_valid());
        assert!(!v.validate(&q, &json!("anything")).is_valid());
        assert!(v.patterns.lock().unwrap().is_empty());
    }

    #[test]
    fn patterns_compile_once() {
        let v = validator_on(2025, 1, 1);
        let q = question(vec![RuleKind::Regex {
            pattern: "ginger".into(),
            failure_flag: None,
        }]);
        assert!(v.validate(&q, &json!("ginger")).is_valid());
        assert!(!v.validate(&q, &json!("mint")).is_valid());
        assert!(v.validate(&q, &json!("ginger tea")).is_valid());
        assert_eq!(v.patterns.lock().unwrap().len(), 1);
    }

    #[test]
    fn date_range_requires_real_dates() {
        let v = validator_on(2025, 1, 1);
        let q = question(vec![RuleKind::DateRange]);
        assert!(v.validate(&q, &json!("15/03/2024")).is_valid());
        assert!(!v.validate(&q, &json!("31/02/2024")).is_valid());
        assert!(!v.validate(&q, &json!("2024-03-15")).is_valid());
        assert!(!v.validate(&q, &json!("1/3/2024")).is_valid());
    }

    #[test]
    fn age_range_against_fixed_clock() {
        let q = question(vec![RuleKind::AgeRange { min_age: 18, max_age: 100 }]);

        // 25 years old
        let v = validator_on(2025, 6, 1);
        assert!(v.validate(&q, &json!("01/01/2000")).is_valid());

        // Turns 18 tomorrow
        let v = validator_on(2025, 12, 31);
        assert!(!v.validate(&q, &json!("01/01/2008")).is_valid());
        // Turns 18 today
        let v = validator_on(2026, 1, 1);
        assert!(v.validate(&q, &json!("01/01/2008")).is_valid());

        // Exactly 100 passes, 101 fails
        let v = validator_on(2025, 6, 1);
        assert!(v.validate(&q, &json!("01/06/1925")).is_valid());
        assert!(!v.validate(&q, &json!("01/06/1924")).is_valid());
    }

    #[test]
    fn age_on_counts_whole_years() {
        let birth = NaiveDate::from_ymd_opt(2000, 3, 15).unwrap();
        assert_eq!(age_on(birth, NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()), 24);
        assert_eq!(age_on(birth, NaiveDate::from_ymd_opt(2025, 3, 15).unwrap()), 25);
    }

    #[test]
    fn link_rules() {
        let v = validator_on(2025, 1, 1);
        let tg = question(vec![RuleKind::TelegramLinkFormat]);
        assert!(v.validate(&tg, &json!("@partner")).is_valid());
        assert!(!v.validate(&tg, &json!("partner")).is_valid());

        let fb = question(vec![RuleKind::FacebookLinkFormat]);
        assert!(v.validate(&fb, &json!("instagram.com/dana")).is_valid());
        assert!(!v.validate(&fb, &json!("linkedin.com/in/dana")).is_valid());
    }

    #[test]
    fn unique_accepts() {
        let v = validator_on(2025, 1, 1);
        assert!(v.validate(&question(vec![RuleKind::Unique]), &json!("x")).is_valid());
    }

    #[test]
    fn skip_sentinels() {
        assert!(is_skip_sentinel(&json!("continue")));
        assert!(is_skip_sentinel(&json!(" Continue ")));
        assert!(is_skip_sentinel(&json!("המשך")));
        assert!(!is_skip_sentinel(&json!("continue please")));
        assert!(!is_skip_sentinel(&json!(["continue"])));
    }

    #[test]
    fn multi_select_text_is_joined() {
        assert_eq!(answer_text(&json!(["play", "cuddle"])), "play, cuddle");
        assert_eq!(answer_text(&Value::Null), "");
    }
}
