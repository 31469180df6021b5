//! Config schema types.

use std::collections::HashMap;

use {
    courier_common::types::{ReplyToMode, StreamingMode},
    serde::{Deserialize, Serialize},
};

/// Telegram's hard limit on message text length.
pub const DEFAULT_TEXT_LIMIT: usize = 4096;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CourierConfig {
    pub dispatch: DispatchConfig,
    /// Telegram bot accounts keyed by account id. Values are parsed by the
    /// telegram crate so the schema here does not track transport options.
    pub telegram: HashMap<String, serde_json::Value>,
    pub metrics: MetricsConfig,
}

/// Defaults applied to every dispatch unless an account overrides them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Streaming channel opened while a reply is generated.
    pub streaming_mode: StreamingMode,
    /// Whether replies quote the inbound message.
    pub reply_to_mode: ReplyToMode,
    /// Maximum characters per emitted message.
    pub text_limit: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            streaming_mode: StreamingMode::None,
            reply_to_mode: ReplyToMode::First,
            text_limit: DEFAULT_TEXT_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    /// Labels added to every exported series.
    pub labels: HashMap<String, String>,
}
