use {
    courier_auto_reply::SettingsOverrides,
    courier_common::types::{ReplyToMode, StreamingMode},
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

use crate::{Result, error::Context};

/// Configuration for a single Telegram bot account.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramAccountConfig {
    /// Bot token from @BotFather.
    #[serde(serialize_with = "serialize_secret")]
    pub token: Secret<String>,

    /// Bot API base URL, for self-hosted Bot API servers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Streaming mode for this account (`off`, `partial`, `block`, or the
    /// `none`/`draft`/`edit` spellings). Overrides `dispatch.streaming_mode`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_mode: Option<StreamingMode>,

    /// Overrides `dispatch.reply_to_mode`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_mode: Option<ReplyToMode>,

    /// Overrides `dispatch.text_limit`. Clamped to 4096.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_limit: Option<usize>,

    /// Minimum interval between draft message commits (ms).
    pub draft_throttle_ms: u64,

    /// Minimum interval between edit-in-place updates (ms).
    pub edit_throttle_ms: u64,

    /// Private chats with this bot have topics enabled.
    pub dm_topics: bool,

    /// Agent that answers on this account.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
}

impl std::fmt::Debug for TelegramAccountConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramAccountConfig")
            .field("token", &"[REDACTED]")
            .field("stream_mode", &self.stream_mode)
            .field("reply_to_mode", &self.reply_to_mode)
            .field("text_limit", &self.text_limit)
            .field("dm_topics", &self.dm_topics)
            .finish_non_exhaustive()
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

impl Default for TelegramAccountConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            api_url: None,
            stream_mode: None,
            reply_to_mode: None,
            text_limit: None,
            draft_throttle_ms: 1000,
            edit_throttle_ms: 300,
            dm_topics: false,
            agent_id: None,
        }
    }
}

impl TelegramAccountConfig {
    /// Parse an account entry from the `[telegram.<id>]` config table.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).context("invalid telegram account config")
    }

    /// Account-level values layered over the global dispatch config.
    #[must_use]
    pub fn settings_overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            streaming_mode: self.stream_mode,
            reply_to_mode: self.reply_to_mode,
            text_limit: self.text_limit,
        }
    }

    /// Build the teloxide client for this account.
    pub fn bot(&self) -> Result<teloxide::Bot> {
        let bot = teloxide::Bot::new(self.token.expose_secret());
        match &self.api_url {
            Some(raw) => {
                let url =
                    reqwest::Url::parse(raw).with_context(|| format!("invalid api_url {raw:?}"))?;
                Ok(bot.set_api_url(url))
            },
            None => Ok(bot),
        }
    }
}
