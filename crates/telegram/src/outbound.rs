//! Low-level Telegram requests shared by every adapter in this crate.

use std::{future::Future, time::Duration};

use {
    courier_common::types::ThreadSpec,
    teloxide::{
        ApiError, RequestError,
        payloads::{SendChatActionSetters, SendMessageSetters, SetMessageReactionSetters},
        prelude::*,
        types::{ChatAction, ChatId, MessageId, ReactionType, ReplyParameters, ThreadId},
    },
    tracing::{debug, warn},
};

#[cfg(feature = "metrics")]
use courier_metrics::{counter, labels, telegram as tg_metrics};

use crate::Result;

const TELEGRAM_RETRY_AFTER_MAX_RETRIES: usize = 4;

/// Outbound request helper for one bot account.
#[derive(Clone)]
pub struct TelegramOutbound {
    bot: Bot,
    account_id: String,
}

impl std::fmt::Debug for TelegramOutbound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramOutbound")
            .field("account_id", &self.account_id)
            .finish_non_exhaustive()
    }
}

impl TelegramOutbound {
    #[must_use]
    pub fn new(bot: Bot, account_id: impl Into<String>) -> Self {
        Self {
            bot,
            account_id: account_id.into(),
        }
    }

    #[must_use]
    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Send one plain-text message into `thread`.
    pub async fn send_text(
        &self,
        chat_id: i64,
        thread: &ThreadSpec,
        text: &str,
        reply_to: Option<i32>,
        silent: bool,
    ) -> Result<MessageId> {
        let chat = ChatId(chat_id);
        let thread_id = thread_id(thread);
        let reply_params = reply_params(reply_to);

        let result = self
            .run_with_retry(chat_id, "send message", || {
                let mut req = self.bot.send_message(chat, text);
                if let Some(id) = thread_id {
                    req = req.message_thread_id(id);
                }
                if silent {
                    req = req.disable_notification(true);
                }
                if let Some(ref rp) = reply_params {
                    req = req.reply_parameters(rp.clone());
                }
                async move { req.await }
            })
            .await;

        match result {
            Ok(message) => {
                #[cfg(feature = "metrics")]
                counter!(tg_metrics::MESSAGES_SENT_TOTAL, labels::ACCOUNT_ID => self.account_id.clone())
                    .increment(1);
                debug!(
                    account_id = %self.account_id,
                    chat_id,
                    message_id = message.id.0,
                    thread_id = ?thread.send_thread_id(),
                    reply_to = ?reply_to,
                    text_len = text.len(),
                    "telegram message sent"
                );
                Ok(message.id)
            },
            Err(e) => {
                #[cfg(feature = "metrics")]
                counter!(tg_metrics::MESSAGE_SEND_ERRORS_TOTAL, labels::ACCOUNT_ID => self.account_id.clone())
                    .increment(1);
                Err(e.into())
            },
        }
    }

    /// Replace the text of an existing message.
    ///
    /// "Message is not modified" counts as success.
    pub async fn edit_text(&self, chat_id: i64, message_id: MessageId, text: &str) -> Result<()> {
        let chat = ChatId(chat_id);
        match self
            .run_with_retry(chat_id, "edit message", || {
                let req = self.bot.edit_message_text(chat, message_id, text);
                async move { req.await }
            })
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if is_message_not_modified_error(&e) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn delete(&self, chat_id: i64, message_id: MessageId) -> Result<()> {
        let chat = ChatId(chat_id);
        self.run_with_retry(chat_id, "delete message", || {
            let req = self.bot.delete_message(chat, message_id);
            async move { req.await }
        })
        .await?;
        Ok(())
    }

    pub async fn chat_action(&self, chat_id: i64, thread: &ThreadSpec, action: ChatAction) -> Result<()> {
        let mut req = self.bot.send_chat_action(ChatId(chat_id), action);
        if let Some(id) = thread_id(thread) {
            req = req.message_thread_id(id);
        }
        req.await?;
        Ok(())
    }

    /// Remove the bot's reactions from a message.
    pub async fn clear_reactions(&self, chat_id: i64, message_id: MessageId) -> Result<()> {
        self.bot
            .set_message_reaction(ChatId(chat_id), message_id)
            .reaction(Vec::<ReactionType>::new())
            .await?;
        Ok(())
    }

    async fn run_with_retry<T, F, Fut>(
        &self,
        chat_id: i64,
        operation: &'static str,
        mut request: F,
    ) -> std::result::Result<T, RequestError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, RequestError>>,
    {
        let mut retries = 0usize;

        loop {
            match request().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let Some(wait) = retry_after_duration(&err) else {
                        return Err(err);
                    };

                    if retries >= TELEGRAM_RETRY_AFTER_MAX_RETRIES {
                        warn!(
                            account_id = %self.account_id,
                            chat_id,
                            operation,
                            retries,
                            max_retries = TELEGRAM_RETRY_AFTER_MAX_RETRIES,
                            retry_after_secs = wait.as_secs(),
                            "telegram rate limit persisted after retries"
                        );
                        return Err(err);
                    }

                    retries += 1;
                    #[cfg(feature = "metrics")]
                    counter!(tg_metrics::RATE_LIMITED_TOTAL, labels::OPERATION => operation).increment(1);
                    warn!(
                        account_id = %self.account_id,
                        chat_id,
                        operation,
                        retries,
                        max_retries = TELEGRAM_RETRY_AFTER_MAX_RETRIES,
                        retry_after_secs = wait.as_secs(),
                        "telegram rate limited, waiting before retry"
                    );
                    tokio::time::sleep(wait).await;
                },
            }
        }
    }
}

/// Thread id for outgoing requests. See [`ThreadSpec::send_thread_id`].
fn thread_id(thread: &ThreadSpec) -> Option<ThreadId> {
    thread.send_thread_id().map(|id| ThreadId(MessageId(id)))
}

fn reply_params(reply_to: Option<i32>) -> Option<ReplyParameters> {
    reply_to.map(|id| ReplyParameters::new(MessageId(id)).allow_sending_without_reply())
}

fn retry_after_duration(error: &RequestError) -> Option<Duration> {
    match error {
        RequestError::RetryAfter(wait) => Some(wait.duration()),
        _ => None,
    }
}

fn is_message_not_modified_error(error: &RequestError) -> bool {
    matches!(error, RequestError::Api(ApiError::MessageNotModified))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::test_api::{MockTelegramApi, MockBehavior},
        courier_common::types::ThreadSpec,
    };

    #[test]
    fn retry_after_duration_extracts_wait() {
        let err = RequestError::RetryAfter(teloxide::types::Seconds::from_seconds(42));
        assert_eq!(retry_after_duration(&err), Some(Duration::from_secs(42)));
    }

    #[test]
    fn retry_after_duration_ignores_other_errors() {
        let err = RequestError::Io(std::io::Error::other("boom"));
        assert_eq!(retry_after_duration(&err), None);
    }

    #[test]
    fn is_message_not_modified_error_detects_variant() {
        let err = RequestError::Api(ApiError::MessageNotModified);
        assert!(is_message_not_modified_error(&err));
        assert!(!is_message_not_modified_error(&RequestError::Api(
            ApiError::MessageToEditNotFound
        )));
    }

    #[test]
    fn general_forum_topic_has_no_thread_id() {
        assert_eq!(thread_id(&ThreadSpec::forum(1)), None);
        assert_eq!(thread_id(&ThreadSpec::forum(5)), Some(ThreadId(MessageId(5))));
        assert_eq!(thread_id(&ThreadSpec::dm(777)), Some(ThreadId(MessageId(777))));
    }

    #[tokio::test]
    async fn send_text_targets_thread_and_reply() {
        let api = MockTelegramApi::start(MockBehavior::default()).await;
        let outbound = TelegramOutbound::new(api.bot(), "main");

        let id = outbound
            .send_text(123, &ThreadSpec::dm(777), "hi", Some(456), true)
            .await
            .unwrap();

        let sent = api.requests_for("sendmessage");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0]["chat_id"], 123);
        assert_eq!(sent[0]["text"], "hi");
        assert_eq!(sent[0]["message_thread_id"], 777);
        assert_eq!(sent[0]["disable_notification"], true);
        assert_eq!(sent[0]["reply_parameters"]["message_id"], 456);
        assert_eq!(id, MessageId(1));
        api.shutdown().await;
    }

    #[tokio::test]
    async fn not_modified_edit_is_success() {
        let api = MockTelegramApi::start(MockBehavior {
            edit_error: Some(crate::test_api::NOT_MODIFIED),
            ..Default::default()
        })
        .await;
        let outbound = TelegramOutbound::new(api.bot(), "main");

        outbound.edit_text(123, MessageId(5), "same").await.unwrap();
        api.shutdown().await;
    }

    #[tokio::test]
    async fn missing_message_edit_is_reported() {
        let api = MockTelegramApi::start(MockBehavior {
            edit_error: Some(crate::test_api::EDIT_NOT_FOUND),
            ..Default::default()
        })
        .await;
        let outbound = TelegramOutbound::new(api.bot(), "main");

        let err = outbound.edit_text(123, MessageId(5), "gone").await.unwrap_err();
        assert!(err.is_message_missing());
        api.shutdown().await;
    }

    #[tokio::test]
    async fn rate_limited_send_is_retried() {
        let api = MockTelegramApi::start(MockBehavior {
            rate_limited_sends: 1,
            ..Default::default()
        })
        .await;
        let outbound = TelegramOutbound::new(api.bot(), "main");

        outbound
            .send_text(123, &ThreadSpec::none(), "later", None, false)
            .await
            .unwrap();

        assert_eq!(api.requests_for("sendmessage").len(), 2);
        api.shutdown().await;
    }
}
