use std::sync::Arc;

use {
    async_trait::async_trait,
    courier_channels::{DeliveryReport, DeliveryRequest, DeliveryService},
    tracing::info,
};

use crate::{
    outbound::TelegramOutbound,
    text::{chunk_message, effective_limit},
};

/// Sends final replies as plain-text messages.
pub struct TelegramDelivery {
    outbound: Arc<TelegramOutbound>,
}

impl TelegramDelivery {
    #[must_use]
    pub fn new(outbound: Arc<TelegramOutbound>) -> Self {
        Self { outbound }
    }
}

#[async_trait]
impl DeliveryService for TelegramDelivery {
    async fn deliver_replies(&self, request: DeliveryRequest) -> courier_channels::Result<DeliveryReport> {
        let limit = effective_limit(request.text_limit);
        let mut message_ids = Vec::new();

        for reply in request.replies.iter().filter(|r| !r.is_empty()) {
            for chunk in chunk_message(&reply.text, limit) {
                let reply_to = request
                    .reply_to_message_id
                    .filter(|_| request.reply_to_mode.applies_to(message_ids.len()));
                let id = self
                    .outbound
                    .send_text(request.chat_id, &request.thread, &chunk, reply_to, reply.silent)
                    .await?;
                message_ids.push(id.0);
            }
        }

        info!(
            account_id = self.outbound.account_id(),
            chat_id = request.chat_id,
            thread_id = ?request.thread.send_thread_id(),
            messages = message_ids.len(),
            "telegram replies delivered"
        );
        Ok(DeliveryReport {
            delivered: !message_ids.is_empty(),
            message_ids,
        })
    }
}
