use {
    async_trait::async_trait,
    courier_common::types::{ReplyPayload, ReplyToMode, ThreadSpec},
};

use crate::Result;

/// A fully formed reply to send through the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryRequest {
    pub chat_id: i64,
    pub thread: ThreadSpec,
    pub replies: Vec<ReplyPayload>,
    pub reply_to_mode: ReplyToMode,
    pub reply_to_message_id: Option<i32>,
    /// Maximum characters per sent message. Longer replies are split.
    pub text_limit: usize,
}

/// Outcome of a delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// At least one message reached the chat.
    pub delivered: bool,
    /// Transport ids of the sent messages, in send order.
    pub message_ids: Vec<i32>,
}

/// Sends final replies when no streaming channel delivered them.
#[async_trait]
pub trait DeliveryService: Send + Sync {
    async fn deliver_replies(&self, request: DeliveryRequest) -> Result<DeliveryReport>;
}
