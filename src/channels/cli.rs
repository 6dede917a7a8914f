//! CLI channel: stdin/stdout REPL for filling in the form locally.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::{Stream, StreamExt, stream};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use uuid::Uuid;

use crate::error::{ChannelError, FlowError};
use crate::form::{AdvanceOutcome, FormFlowEngine, QuestionDefinition};
use crate::store::{ChoiceHandle, ChoiceOption, Messenger, Notifier};

pub type LineStream = Pin<Box<dyn Stream<Item = String> + Send>>;

/// A line typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    Start { event_id: Option<String> },
    Cancel,
    Progress,
    Quit,
    Answer(String),
}

impl CliCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("/start") => Self::Start {
                event_id: parts.next().map(str::to_string),
            },
            Some("/cancel") => Self::Cancel,
            Some("/progress") => Self::Progress,
            Some("/quit") | Some("/exit") => Self::Quit,
            _ => Self::Answer(line.to_string()),
        }
    }
}

/// Turn typed input into an answer for `question`. Choice questions accept
/// option numbers as shown in the prompt; multi-select takes several,
/// separated by commas or spaces.
pub fn parse_answer(question: Option<&QuestionDefinition>, input: &str) -> Value {
    let input = input.trim();
    let Some(question) = question.filter(|q| q.kind.is_choice()) else {
        return Value::String(input.to_string());
    };

    let pick = |token: &str| -> String {
        token
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| question.options.get(i))
            .map(|o| o.value.clone())
            .unwrap_or_else(|| token.to_string())
    };

    if question.kind.allows_multiple() {
        let values = input
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
            .map(|t| Value::String(pick(t)))
            .collect();
        Value::Array(values)
    } else {
        Value::String(pick(input))
    }
}

/// A single local participant talking to the engine from a terminal.
pub struct CliChannel {
    user_id: String,
}

impl CliChannel {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Non-empty stdin lines until EOF.
    pub fn lines(&self) -> LineStream {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        tokio::spawn(async move {
            let reader = BufReader::new(tokio::io::stdin());
            let mut lines = reader.lines();

            eprint!("> ");

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim().to_string();
                        if line.is_empty() {
                            eprint!("> ");
                            continue;
                        }
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF
                    Err(e) => {
                        tracing::error!("Error reading stdin: {}", e);
                        break;
                    }
                }
            }
        });

        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|line| (line, rx))
        });

        Box::pin(stream)
    }

    /// Read commands and answers until `/quit` or EOF.
    pub async fn run(&self, engine: Arc<FormFlowEngine>) -> Result<(), ChannelError> {
        let mut lines = self.lines();
        let user_id = self.user_id.as_str();

        while let Some(line) = lines.next().await {
            match CliCommand::parse(&line) {
                CliCommand::Quit => break,
                CliCommand::Start { event_id } => {
                    if let Err(e) = engine.start(user_id, event_id.as_deref(), None).await {
                        eprintln!("❌ {}", e);
                    }
                }
                CliCommand::Cancel => {
                    if engine.abandon(user_id).await {
                        eprintln!("ℹ️  Form cancelled. /start to begin again.");
                    } else {
                        eprintln!("ℹ️  No form in progress.");
                    }
                }
                CliCommand::Progress => match engine.progress(user_id).await {
                    Some(p) => eprintln!(
                        "ℹ️  {} ({}/{} answered, {}%)",
                        p.current_question, p.answered, p.total, p.percent
                    ),
                    None => eprintln!("ℹ️  No form in progress."),
                },
                CliCommand::Answer(input) => {
                    let question = engine.current_question(user_id).await;
                    let answer = parse_answer(question.as_ref(), &input);
                    match engine.advance(user_id, answer).await {
                        Ok(AdvanceOutcome::Completed(payload)) => {
                            eprintln!("✅ Form finished ({})", payload.status);
                        }
                        Ok(_) => {}
                        Err(FlowError::NoActiveSession(_)) => {
                            eprintln!("ℹ️  Type /start to begin the registration form.");
                        }
                        Err(e) => eprintln!("❌ {}", e),
                    }
                }
            }
            eprint!("> ");
        }

        Ok(())
    }
}

#[async_trait]
impl Messenger for CliChannel {
    async fn send_text(&self, _user_id: &str, text: &str) -> Result<(), ChannelError> {
        println!("\n{}\n", text);
        Ok(())
    }

    async fn send_choice(
        &self,
        _user_id: &str,
        prompt: &str,
        options: &[ChoiceOption],
        allow_multiple: bool,
    ) -> Result<ChoiceHandle, ChannelError> {
        println!("\n{}", prompt);
        for (i, option) in options.iter().enumerate() {
            println!("  {}. {}", i + 1, option.label);
        }
        if allow_multiple {
            println!("  (several numbers, separated by commas)");
        }
        println!();
        Ok(Uuid::new_v4().to_string())
    }
}

#[async_trait]
impl Notifier for CliChannel {
    async fn notify(&self, message: &str) -> Result<(), ChannelError> {
        eprintln!("📋 {}", message.replace('\n', "\n   "));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::form::{QuestionOption, QuestionType};

    fn choice(kind: QuestionType) -> QuestionDefinition {
        QuestionDefinition::new("food", kind, 1, "אוכל", "Food").with_options(vec![
            QuestionOption::new("vegan", "טבעוני", "Vegan"),
            QuestionOption::new("kosher", "כשר", "Kosher"),
            QuestionOption::new("none", "אין", "None"),
        ])
    }

    #[test]
    fn parses_commands() {
        assert_eq!(CliCommand::parse("/start"), CliCommand::Start { event_id: None });
        assert_eq!(
            CliCommand::parse("/start E7"),
            CliCommand::Start { event_id: Some("E7".into()) }
        );
        assert_eq!(CliCommand::parse(" /cancel "), CliCommand::Cancel);
        assert_eq!(CliCommand::parse("/exit"), CliCommand::Quit);
        assert_eq!(CliCommand::parse("Dana"), CliCommand::Answer("Dana".into()));
    }

    #[test]
    fn numbers_select_options() {
        let q = choice(QuestionType::Select);
        assert_eq!(parse_answer(Some(&q), "2"), json!("kosher"));
        assert_eq!(parse_answer(Some(&q), "vegan"), json!("vegan"));
        // Out of range stays as typed
        assert_eq!(parse_answer(Some(&q), "9"), json!("9"));
        assert_eq!(parse_answer(Some(&q), "0"), json!("0"));
    }

    #[test]
    fn multi_select_collects_values() {
        let q = choice(QuestionType::MultiSelect);
        assert_eq!(parse_answer(Some(&q), "1, 3"), json!(["vegan", "none"]));
        assert_eq!(parse_answer(Some(&q), ""), json!([]));
    }

    #[test]
    fn free_text_passes_through() {
        let q = QuestionDefinition::new("full_name", QuestionType::Text, 5, "שם", "Name");
        assert_eq!(parse_answer(Some(&q), " 42 "), json!("42"));
        assert_eq!(parse_answer(None, "hi"), json!("hi"));
    }
}
