//! In-memory channel that records everything sent through it.
//!
//! Used by tests and embedders that want to inspect outbound traffic instead
//! of delivering it.

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::ChannelError;
use crate::store::{ChoiceHandle, ChoiceOption, Messenger, Notifier};

/// One outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Text {
        user_id: String,
        text: String,
    },
    Choice {
        user_id: String,
        prompt: String,
        options: Vec<ChoiceOption>,
        allow_multiple: bool,
    },
}

impl Sent {
    pub fn user_id(&self) -> &str {
        match self {
            Self::Text { user_id, .. } | Self::Choice { user_id, .. } => user_id,
        }
    }
}

#[derive(Default)]
pub struct RecordingChannel {
    sent: RwLock<Vec<Sent>>,
    notifications: RwLock<Vec<String>>,
    fail_sends: bool,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// A channel whose every send fails. Nothing is recorded.
    pub fn failing() -> Self {
        Self {
            fail_sends: true,
            ..Self::default()
        }
    }

    pub async fn sent_for(&self, user_id: &str) -> Vec<Sent> {
        self.sent
            .read()
            .await
            .iter()
            .filter(|s| s.user_id() == user_id)
            .cloned()
            .collect()
    }

    /// Plain texts sent to `user_id`, in order.
    pub async fn texts_for(&self, user_id: &str) -> Vec<String> {
        self.sent_for(user_id)
            .await
            .into_iter()
            .filter_map(|s| match s {
                Sent::Text { text, .. } => Some(text),
                Sent::Choice { .. } => None,
            })
            .collect()
    }

    /// Choice prompts sent to `user_id`, in order.
    pub async fn prompts_for(&self, user_id: &str) -> Vec<String> {
        self.sent_for(user_id)
            .await
            .into_iter()
            .filter_map(|s| match s {
                Sent::Choice { prompt, .. } => Some(prompt),
                Sent::Text { .. } => None,
            })
            .collect()
    }

    pub async fn last_for(&self, user_id: &str) -> Option<Sent> {
        self.sent_for(user_id).await.pop()
    }

    pub async fn notifications(&self) -> Vec<String> {
        self.notifications.read().await.clone()
    }

    pub async fn clear(&self) {
        self.sent.write().await.clear();
        self.notifications.write().await.clear();
    }

    fn check(&self) -> Result<(), ChannelError> {
        if self.fail_sends {
            return Err(ChannelError::SendFailed {
                name: "recording".to_string(),
                reason: "sends disabled".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Messenger for RecordingChannel {
    async fn send_text(&self, user_id: &str, text: &str) -> Result<(), ChannelError> {
        self.check()?;
        self.sent.write().await.push(Sent::Text {
            user_id: user_id.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send_choice(
        &self,
        user_id: &str,
        prompt: &str,
        options: &[ChoiceOption],
        allow_multiple: bool,
    ) -> Result<ChoiceHandle, ChannelError> {
        self.check()?;
        self.sent.write().await.push(Sent::Choice {
            user_id: user_id.to_string(),
            prompt: prompt.to_string(),
            options: options.to_vec(),
            allow_multiple,
        });
        Ok(Uuid::new_v4().to_string())
    }
}

#[async_trait]
impl Notifier for RecordingChannel {
    async fn notify(&self, message: &str) -> Result<(), ChannelError> {
        self.check()?;
        self.notifications.write().await.push(message.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_per_user() {
        let channel = RecordingChannel::new();
        channel.send_text("a", "hello").await.unwrap();
        channel
            .send_choice("b", "pick", &[ChoiceOption { value: "1".into(), label: "One".into() }], false)
            .await
            .unwrap();
        channel.notify("ops").await.unwrap();

        assert_eq!(channel.texts_for("a").await, vec!["hello"]);
        assert!(channel.texts_for("b").await.is_empty());
        assert_eq!(channel.prompts_for("b").await, vec!["pick"]);
        assert_eq!(channel.notifications().await, vec!["ops"]);

        channel.clear().await;
        assert!(channel.sent_for("a").await.is_empty());
    }

    #[tokio::test]
    async fn failing_channel_errors() {
        let channel = RecordingChannel::failing();
        assert!(channel.send_text("a", "x").await.is_err());
        assert!(channel.notify("x").await.is_err());
        assert!(channel.sent_for("a").await.is_empty());
    }
}
