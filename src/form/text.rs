//! Bilingual (Hebrew/English) text.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Languages the questionnaire is offered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    He,
    En,
}

impl Language {
    /// Language used when a text has no entry for the requested one.
    pub const FALLBACK: Language = Language::En;

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::He => "he",
            Self::En => "en",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "he" | "hebrew" => Ok(Self::He),
            "en" | "english" => Ok(Self::En),
            other => Err(format!("unsupported language: {other}")),
        }
    }
}

/// A piece of user-facing text in both languages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BilingualText {
    pub he: String,
    pub en: String,
}

impl BilingualText {
    pub fn new(he: impl Into<String>, en: impl Into<String>) -> Self {
        Self {
            he: he.into(),
            en: en.into(),
        }
    }

    /// Text for `language`, falling back to [`Language::FALLBACK`] and then
    /// to whichever entry is non-empty.
    pub fn resolve(&self, language: Language) -> &str {
        let primary = self.get(language);
        if !primary.is_empty() {
            return primary;
        }
        let fallback = self.get(Language::FALLBACK);
        if !fallback.is_empty() {
            return fallback;
        }
        if self.he.is_empty() { &self.en } else { &self.he }
    }

    fn get(&self, language: Language) -> &str {
        match language {
            Language::He => &self.he,
            Language::En => &self.en,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.he.is_empty() && self.en.is_empty()
    }
}
