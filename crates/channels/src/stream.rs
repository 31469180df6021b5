//! Streaming channels: draft messages and edit-in-place replies.

use {async_trait::async_trait, courier_common::types::ThreadSpec};

use crate::Result;

/// Where a draft stream posts its in-progress text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftStreamParams {
    pub chat_id: i64,
    pub thread: ThreadSpec,
    /// Maximum characters shown in the draft.
    pub text_limit: usize,
}

/// Which message an edit stream rewrites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditStreamParams {
    pub chat_id: i64,
    pub thread: ThreadSpec,
    /// Inbound message the streamed reply answers, if reply-to is enabled.
    pub reply_to_message_id: Option<i32>,
    /// Existing message to edit. When `None`, the first update creates it.
    pub target_message_id: Option<i32>,
    pub text_limit: usize,
}

/// An editable "draft" message that shows partial reply text.
///
/// The draft is never the delivered reply. It is torn down by
/// [`DraftStream::stop`] once the final reply goes out through delivery.
#[async_trait]
pub trait DraftStream: Send + Sync {
    /// Queue `text` as the new draft content.
    ///
    /// Never blocks. Implementations apply updates in call order and may
    /// collapse intermediate texts.
    fn update(&self, text: &str);

    /// Wait until every queued update has been committed or has failed.
    async fn flush(&self) -> Result<()>;

    /// Release the draft. Idempotent and infallible.
    async fn stop(&self);
}

/// A single message rewritten in place as reply content accumulates.
#[async_trait]
pub trait EditStream: Send + Sync {
    /// Show `text` in the message. Returns whether the edit was applied.
    ///
    /// `false` does not abort the stream: the text may have been throttled
    /// or the transport may have refused it.
    async fn update(&self, text: &str) -> bool;

    /// Commit the final reply text. Returns `true` when the message now
    /// holds the complete reply, after which updates are ignored.
    async fn finalize(&self, text: &str) -> bool;

    /// Whether an editable message currently exists.
    ///
    /// Becomes `false` when the message was never created or was deleted
    /// externally.
    fn has_message(&self) -> bool;

    /// Release the stream. Idempotent and infallible.
    async fn stop(&self);
}

/// Opens streaming channels for one dispatch call.
#[async_trait]
pub trait StreamFactory: Send + Sync {
    async fn create_draft_stream(&self, params: DraftStreamParams) -> Result<Box<dyn DraftStream>>;

    async fn create_edit_stream(&self, params: EditStreamParams) -> Result<Box<dyn EditStream>>;
}
