//! Wires one Telegram bot account into the dispatch orchestrator.

use std::{sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    courier_auto_reply::{DispatchServices, DispatchSettings},
    courier_channels::{
        DraftStream, DraftStreamParams, EditStream, EditStreamParams, ReplyDispatcher,
        StreamFactory,
    },
    courier_config::DispatchConfig,
};

use crate::{
    Result,
    actions::TelegramChatActions,
    config::TelegramAccountConfig,
    delivery::TelegramDelivery,
    draft::TelegramDraftStream,
    edit::TelegramEditStream,
    outbound::TelegramOutbound,
    text::TELEGRAM_MAX_MESSAGE_LEN,
    topics::TelegramTopicsResolver,
};

/// Opens draft and edit streams for one account.
pub struct TelegramStreamFactory {
    outbound: Arc<TelegramOutbound>,
    draft_throttle: Duration,
    edit_throttle: Duration,
}

#[async_trait]
impl StreamFactory for TelegramStreamFactory {
    async fn create_draft_stream(
        &self,
        params: DraftStreamParams,
    ) -> courier_channels::Result<Box<dyn DraftStream>> {
        Ok(Box::new(TelegramDraftStream::spawn(
            Arc::clone(&self.outbound),
            params,
            self.draft_throttle,
        )))
    }

    async fn create_edit_stream(
        &self,
        params: EditStreamParams,
    ) -> courier_channels::Result<Box<dyn EditStream>> {
        Ok(Box::new(TelegramEditStream::new(
            Arc::clone(&self.outbound),
            params,
            self.edit_throttle,
        )))
    }
}

/// A configured bot account.
pub struct TelegramAccount {
    account_id: String,
    config: TelegramAccountConfig,
    outbound: Arc<TelegramOutbound>,
}

impl TelegramAccount {
    pub fn new(account_id: impl Into<String>, config: TelegramAccountConfig) -> Result<Self> {
        let bot = config.bot()?;
        Ok(Self::with_bot(bot, account_id, config))
    }

    /// Use an existing client, e.g. one pointed at a test server.
    #[must_use]
    pub fn with_bot(bot: teloxide::Bot, account_id: impl Into<String>, config: TelegramAccountConfig) -> Self {
        let account_id = account_id.into();
        Self {
            outbound: Arc::new(TelegramOutbound::new(bot, account_id.clone())),
            account_id,
            config,
        }
    }

    #[must_use]
    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    #[must_use]
    pub fn config(&self) -> &TelegramAccountConfig {
        &self.config
    }

    /// Dispatch settings for this account: global defaults, then account
    /// overrides, clamped to Telegram's message limit.
    #[must_use]
    pub fn settings(&self, base: &DispatchConfig) -> DispatchSettings {
        DispatchSettings::resolve(base, &self.config.settings_overrides(), TELEGRAM_MAX_MESSAGE_LEN)
    }

    /// Collaborators for the orchestrator, with `provider` generating replies.
    #[must_use]
    pub fn services(&self, provider: Arc<dyn ReplyDispatcher>) -> DispatchServices {
        DispatchServices {
            topics: Arc::new(TelegramTopicsResolver {
                dm_topics: self.config.dm_topics,
            }),
            streams: Arc::new(TelegramStreamFactory {
                outbound: Arc::clone(&self.outbound),
                draft_throttle: Duration::from_millis(self.config.draft_throttle_ms),
                edit_throttle: Duration::from_millis(self.config.edit_throttle_ms),
            }),
            provider,
            delivery: Arc::new(TelegramDelivery::new(Arc::clone(&self.outbound))),
            actions: Arc::new(TelegramChatActions::new(Arc::clone(&self.outbound))),
        }
    }
}
