//! Streaming channel capability.
//!
//! A [`StreamingPlan`] is resolved once per call and opened into a boxed
//! [`ReplyChannel`]. The orchestrator only talks to the trait object.

use {
    async_trait::async_trait,
    courier_channels::{
        DraftStream, DraftStreamParams, EditStream, EditStreamParams, StreamFactory,
    },
    courier_common::types::{ReplyPayload, StreamingMode},
    tracing::{debug, warn},
};

use crate::{context::DispatchContext, settings::DispatchSettings};

/// Which streaming channel a call opens, with its bound parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamingPlan {
    None,
    Draft(DraftStreamParams),
    Edit(EditStreamParams),
}

impl StreamingPlan {
    /// Resolve the configured mode against the conversation.
    ///
    /// Drafts are only offered in private chats with a topic thread and
    /// topics enabled. Anything else falls back to [`StreamingPlan::None`].
    #[must_use]
    pub fn resolve(
        context: &DispatchContext,
        settings: &DispatchSettings,
        topics_enabled: bool,
        edit_target: Option<i32>,
    ) -> Self {
        match settings.streaming_mode {
            StreamingMode::None => Self::None,
            StreamingMode::Draft => {
                if context.is_group || context.thread.id.is_none() || !topics_enabled {
                    debug!(
                        chat_id = context.chat_id,
                        is_group = context.is_group,
                        thread_id = ?context.thread.id,
                        topics_enabled,
                        "draft streaming unavailable for this chat, not streaming"
                    );
                    return Self::None;
                }
                Self::Draft(DraftStreamParams {
                    chat_id: context.chat_id,
                    thread: context.thread,
                    text_limit: settings.text_limit,
                })
            },
            StreamingMode::Edit => Self::Edit(EditStreamParams {
                chat_id: context.chat_id,
                thread: context.thread,
                reply_to_message_id: context
                    .message_id
                    .filter(|_| settings.reply_to_mode.applies_to(0)),
                target_message_id: edit_target,
                text_limit: settings.text_limit,
            }),
        }
    }

    #[must_use]
    pub fn mode(&self) -> StreamingMode {
        match self {
            Self::None => StreamingMode::None,
            Self::Draft(_) => StreamingMode::Draft,
            Self::Edit(_) => StreamingMode::Edit,
        }
    }
}

/// Capability the orchestrator folds reply events into.
///
/// No method fails: channel problems are logged and surface through
/// [`ReplyChannel::degraded`].
#[async_trait]
pub trait ReplyChannel: Send {
    /// Streaming mode this channel implements.
    fn mode(&self) -> StreamingMode;

    async fn on_partial(&mut self, text: &str);

    async fn on_block(&mut self, payload: &ReplyPayload);

    /// Handle the final reply. Returns `true` when the channel itself put
    /// the final reply in front of the user.
    async fn on_final(&mut self, payload: &ReplyPayload) -> bool;

    /// Release the channel. Called exactly once, on every exit path.
    async fn close(&mut self);

    /// The channel stopped being reliable during this call.
    fn degraded(&self) -> bool;
}

/// Passthrough used when nothing is streamed.
#[derive(Debug, Default)]
pub struct NoopChannel {
    degraded: bool,
}

impl NoopChannel {
    /// Stand-in for a streaming channel that could not be opened.
    #[must_use]
    pub fn fallback() -> Self {
        Self { degraded: true }
    }
}

#[async_trait]
impl ReplyChannel for NoopChannel {
    fn mode(&self) -> StreamingMode {
        StreamingMode::None
    }

    async fn on_partial(&mut self, _text: &str) {}

    async fn on_block(&mut self, _payload: &ReplyPayload) {}

    async fn on_final(&mut self, _payload: &ReplyPayload) -> bool {
        false
    }

    async fn close(&mut self) {}

    fn degraded(&self) -> bool {
        self.degraded
    }
}

/// Mirrors every piece of reply text into a draft message.
///
/// The draft is never the delivered reply.
pub struct DraftChannel {
    stream: Box<dyn DraftStream>,
    final_seen: bool,
    flush_failed: bool,
}

impl DraftChannel {
    #[must_use]
    pub fn new(stream: Box<dyn DraftStream>) -> Self {
        Self {
            stream,
            final_seen: false,
            flush_failed: false,
        }
    }
}

#[async_trait]
impl ReplyChannel for DraftChannel {
    fn mode(&self) -> StreamingMode {
        StreamingMode::Draft
    }

    async fn on_partial(&mut self, text: &str) {
        // Partial text trailing the final would roll the draft back.
        if self.final_seen {
            debug!("partial reply after final ignored");
            return;
        }
        self.stream.update(text);
    }

    async fn on_block(&mut self, payload: &ReplyPayload) {
        self.stream.update(&payload.text);
    }

    async fn on_final(&mut self, payload: &ReplyPayload) -> bool {
        self.stream.update(&payload.text);
        self.final_seen = true;
        false
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.flush().await {
            warn!(error = %e, "draft flush failed");
            self.flush_failed = true;
        }
        self.stream.stop().await;
    }

    fn degraded(&self) -> bool {
        self.flush_failed
    }
}

/// Rewrites one message in place as blocks accumulate.
pub struct EditChannel {
    stream: Box<dyn EditStream>,
    accumulated: String,
    /// The stream has shown a message at some point.
    had_message: bool,
    degraded: bool,
}

impl EditChannel {
    #[must_use]
    pub fn new(stream: Box<dyn EditStream>) -> Self {
        let had_message = stream.has_message();
        Self {
            stream,
            accumulated: String::new(),
            had_message,
            degraded: false,
        }
    }
}

#[async_trait]
impl ReplyChannel for EditChannel {
    fn mode(&self) -> StreamingMode {
        StreamingMode::Edit
    }

    async fn on_partial(&mut self, _text: &str) {}

    async fn on_block(&mut self, payload: &ReplyPayload) {
        self.accumulated.push_str(&payload.text);
        if self.degraded {
            return;
        }
        let applied = self.stream.update(&self.accumulated).await;
        if self.stream.has_message() {
            self.had_message = true;
        } else if self.had_message {
            warn!(
                applied,
                "edit stream lost its message, falling back to delivery"
            );
            self.degraded = true;
        }
    }

    async fn on_final(&mut self, payload: &ReplyPayload) -> bool {
        if self.degraded || !self.stream.has_message() {
            return false;
        }
        if self.stream.finalize(&payload.text).await {
            return true;
        }
        warn!("edit stream finalize failed, falling back to delivery");
        self.degraded = true;
        false
    }

    async fn close(&mut self) {
        self.stream.stop().await;
    }

    fn degraded(&self) -> bool {
        self.degraded
    }
}

/// Open the channel for `plan`.
///
/// A factory failure yields a degraded passthrough so the final reply still
/// goes out through delivery.
pub async fn open_channel(factory: &dyn StreamFactory, plan: StreamingPlan) -> Box<dyn ReplyChannel> {
    match plan {
        StreamingPlan::None => Box::new(NoopChannel::default()),
        StreamingPlan::Draft(params) => match factory.create_draft_stream(params).await {
            Ok(stream) => Box::new(DraftChannel::new(stream)),
            Err(e) => {
                warn!(error = %e, "failed to open draft stream, delivering without streaming");
                Box::new(NoopChannel::fallback())
            },
        },
        StreamingPlan::Edit(params) => match factory.create_edit_stream(params).await {
            Ok(stream) => Box::new(EditChannel::new(stream)),
            Err(e) => {
                warn!(error = %e, "failed to open edit stream, delivering without streaming");
                Box::new(NoopChannel::fallback())
            },
        },
    }
}
