use std::sync::Arc;

use {
    async_trait::async_trait,
    courier_channels::{ChatActionTarget, ChatActions},
    teloxide::types::{ChatAction, MessageId},
    tracing::debug,
};

use crate::outbound::TelegramOutbound;

/// Chat actions and reaction cleanup through the Bot API.
pub struct TelegramChatActions {
    outbound: Arc<TelegramOutbound>,
}

impl TelegramChatActions {
    #[must_use]
    pub fn new(outbound: Arc<TelegramOutbound>) -> Self {
        Self { outbound }
    }
}

#[async_trait]
impl ChatActions for TelegramChatActions {
    async fn send_typing(&self, target: &ChatActionTarget) -> courier_channels::Result<()> {
        self.outbound
            .chat_action(target.chat_id, &target.thread, ChatAction::Typing)
            .await?;
        Ok(())
    }

    async fn send_record_voice(&self, target: &ChatActionTarget) -> courier_channels::Result<()> {
        self.outbound
            .chat_action(target.chat_id, &target.thread, ChatAction::RecordVoice)
            .await?;
        Ok(())
    }

    async fn clear_ack_reaction(&self, target: &ChatActionTarget) -> courier_channels::Result<()> {
        let Some(message_id) = target.message_id else {
            debug!(chat_id = target.chat_id, "no inbound message, nothing to clear");
            return Ok(());
        };
        self.outbound
            .clear_reactions(target.chat_id, MessageId(message_id))
            .await?;
        Ok(())
    }
}
