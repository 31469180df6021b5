//! Conversation, threading, and reply types shared by the dispatch pipeline.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

/// How a thread identifier should be interpreted by the transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadScope {
    /// A topic inside a private chat.
    Dm,
    /// A forum topic inside a supergroup.
    Forum,
    /// Plain chat without topics.
    #[default]
    None,
}

impl ThreadScope {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dm => "dm",
            Self::Forum => "forum",
            Self::None => "none",
        }
    }
}

/// Logical thread/topic target of a reply.
///
/// The same value is handed to whichever streaming channel is opened and to
/// the final delivery, so streamed and delivered content land in one place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadSpec {
    pub id: Option<i32>,
    pub scope: ThreadScope,
}

impl ThreadSpec {
    #[must_use]
    pub fn new(id: Option<i32>, scope: ThreadScope) -> Self {
        Self { id, scope }
    }

    #[must_use]
    pub fn dm(id: i32) -> Self {
        Self::new(Some(id), ThreadScope::Dm)
    }

    #[must_use]
    pub fn forum(id: i32) -> Self {
        Self::new(Some(id), ThreadScope::Forum)
    }

    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Thread id to put on outgoing transport requests.
    ///
    /// The general topic of a forum (id 1) must be addressed without a thread
    /// id, otherwise the transport rejects the request.
    #[must_use]
    pub fn send_thread_id(&self) -> Option<i32> {
        match (self.scope, self.id) {
            (ThreadScope::Forum, Some(1)) => None,
            (ThreadScope::None, _) => None,
            (_, id) => id,
        }
    }
}

/// Which message a streaming channel or delivery is answering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyToMode {
    /// Never quote the inbound message.
    Off,
    /// Quote the inbound message on the first outgoing message only.
    #[default]
    First,
    /// Quote the inbound message on every outgoing message.
    All,
}

impl ReplyToMode {
    /// Whether the message at `index` (0-based, across the whole reply)
    /// should carry reply parameters.
    #[must_use]
    pub fn applies_to(self, index: usize) -> bool {
        match self {
            Self::Off => false,
            Self::First => index == 0,
            Self::All => true,
        }
    }
}

impl FromStr for ReplyToMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "first" => Ok(Self::First),
            "all" => Ok(Self::All),
            other => Err(Error::message(format!("unknown reply-to mode: {other}"))),
        }
    }
}

/// Which streaming channel, if any, a dispatch call opens.
///
/// Accepts both the orchestrator names (`none`, `draft`, `edit`) and the
/// platform names used in account configs (`off`, `partial`, `block`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamingMode {
    #[default]
    #[serde(alias = "off")]
    None,
    #[serde(alias = "partial")]
    Draft,
    #[serde(alias = "block")]
    Edit,
}

impl StreamingMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Draft => "draft",
            Self::Edit => "edit",
        }
    }
}

impl fmt::Display for StreamingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StreamingMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "off" => Ok(Self::None),
            "draft" | "partial" => Ok(Self::Draft),
            "edit" | "block" => Ok(Self::Edit),
            other => Err(Error::message(format!("unknown streaming mode: {other}"))),
        }
    }
}

/// Kind tag attached to each piece of content the reply provider emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyKind {
    /// Incremental progress.
    Block,
    /// The complete reply.
    Final,
}

/// Reply content produced by the reply provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyPayload {
    pub text: String,
    /// Send without a notification sound.
    #[serde(default)]
    pub silent: bool,
}

impl ReplyPayload {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            silent: false,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Agent/account routing of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteInfo {
    pub agent_id: String,
    pub account_id: String,
}

impl Default for RouteInfo {
    fn default() -> Self {
        Self {
            agent_id: "default".into(),
            account_id: "default".into(),
        }
    }
}

/// Kind of chat a conversation happens in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    #[default]
    Private,
    Group,
    Supergroup,
    Channel,
}

impl ChatKind {
    #[must_use]
    pub fn is_group(self) -> bool {
        matches!(self, Self::Group | Self::Supergroup)
    }
}

/// Handle on the inbound conversation, as seen by the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationHandle {
    pub chat_id: i64,
    pub kind: ChatKind,
    /// Supergroup has forum topics turned on.
    #[serde(default)]
    pub is_forum: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_thread_id: Option<i32>,
}
