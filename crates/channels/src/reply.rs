//! Reply provider contract and the ordered event stream it writes into.

use {
    async_trait::async_trait,
    courier_common::types::{ReplyKind, ReplyPayload, ReplyToMode, RouteInfo, ThreadSpec},
    tokio::sync::mpsc,
    tracing::trace,
};

use crate::Result;

/// Content emitted by a reply provider, in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyEvent {
    /// Best-effort partial text, ahead of block completion.
    Partial(String),
    /// An incremental chunk of the reply.
    Block(ReplyPayload),
    /// The complete reply. At most one per dispatch.
    Final(ReplyPayload),
}

impl ReplyEvent {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Partial(_) => "partial",
            Self::Block(_) => "block",
            Self::Final(_) => "final",
        }
    }
}

/// Receiving end of a reply event stream.
pub type ReplyEventReceiver = mpsc::Receiver<ReplyEvent>;

/// Writing end of a reply event stream, handed to the provider.
///
/// Every send waits for buffer space, so events reach the consumer in the
/// order they were produced and a slow consumer slows the provider down.
#[derive(Debug)]
pub struct ReplySink {
    tx: mpsc::Sender<ReplyEvent>,
    stream_partials: bool,
}

/// Create a bounded reply event stream.
///
/// Partial text is only forwarded when `stream_partials` is set; otherwise
/// [`ReplySink::partial`] is a no-op.
#[must_use]
pub fn reply_channel(capacity: usize, stream_partials: bool) -> (ReplySink, ReplyEventReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ReplySink { tx, stream_partials }, rx)
}

impl ReplySink {
    /// Emit reply content. Returns `false` if the consumer has gone away.
    pub async fn deliver(&self, payload: ReplyPayload, kind: ReplyKind) -> bool {
        let event = match kind {
            ReplyKind::Block => ReplyEvent::Block(payload),
            ReplyKind::Final => ReplyEvent::Final(payload),
        };
        self.tx.send(event).await.is_ok()
    }

    /// Emit best-effort partial text. Returns `false` if partials are not
    /// wanted for this dispatch or the consumer has gone away.
    pub async fn partial(&self, text: impl Into<String>) -> bool {
        if !self.stream_partials {
            trace!("partial reply dropped, partial streaming disabled");
            return false;
        }
        self.tx.send(ReplyEvent::Partial(text.into())).await.is_ok()
    }

    /// Whether partial text is consumed for this dispatch.
    #[must_use]
    pub fn streams_partials(&self) -> bool {
        self.stream_partials
    }
}

/// Everything a reply provider needs to produce one reply.
#[derive(Debug, Clone)]
pub struct ReplyRequest {
    pub chat_id: i64,
    pub thread: ThreadSpec,
    pub reply_to_mode: ReplyToMode,
    pub reply_to_message_id: Option<i32>,
    pub text_limit: usize,
    pub route: RouteInfo,
    pub skill_filter: Option<Vec<String>>,
    pub history_key: Option<String>,
    pub history_limit: usize,
}

/// What the provider reports once it has finished emitting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplyDispatchResult {
    /// A final reply was produced and should reach the user.
    pub queued_final: bool,
}

/// Produces reply content for one inbound message.
#[async_trait]
pub trait ReplyDispatcher: Send + Sync {
    /// Generate the reply, writing block and final content into `sink`.
    ///
    /// Implementations emit zero or more blocks followed by at most one
    /// final. They must not emit anything after returning.
    async fn dispatch_reply(
        &self,
        request: ReplyRequest,
        sink: ReplySink,
    ) -> Result<ReplyDispatchResult>;
}
