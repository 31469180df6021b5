//! Side channels around a reply: topic capability, chat actions, and
//! acknowledgment reactions.

use {
    async_trait::async_trait,
    courier_common::types::{ConversationHandle, ThreadSpec},
};

use crate::Result;

/// Decides whether topic/thread addressing is available in a chat.
#[async_trait]
pub trait TopicsResolver: Send + Sync {
    async fn resolve_topics_enabled(&self, conversation: &ConversationHandle) -> Result<bool>;
}

/// The chat (and inbound message) a side-channel action applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatActionTarget {
    pub chat_id: i64,
    pub thread: ThreadSpec,
    pub message_id: Option<i32>,
}

/// Typing indicators and reaction cleanup.
///
/// Every method is best effort: callers log failures and carry on.
#[async_trait]
pub trait ChatActions: Send + Sync {
    async fn send_typing(&self, target: &ChatActionTarget) -> Result<()>;

    async fn send_record_voice(&self, target: &ChatActionTarget) -> Result<()>;

    /// Remove the acknowledgment reaction placed on the inbound message.
    async fn clear_ack_reaction(&self, target: &ChatActionTarget) -> Result<()>;
}
