use courier_common::types::{ConversationHandle, RouteInfo, ThreadSpec};

/// Side-channel state of the inbound message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SideChannels {
    /// Show "recording voice" instead of "typing" while the reply is built.
    pub record_voice: bool,
    /// An acknowledgment reaction was placed on the inbound message.
    pub ack_reaction_pending: bool,
    /// Remove that reaction once the reply is out.
    pub remove_ack_after_reply: bool,
}

/// Conversation state for one dispatch call.
///
/// Owned by the caller and read-only for the duration of the call.
#[derive(Debug, Clone, Default)]
pub struct DispatchContext {
    pub chat_id: i64,
    pub is_group: bool,
    /// Inbound message being answered.
    pub message_id: Option<i32>,
    pub resolved_thread_id: Option<i32>,
    pub thread: ThreadSpec,
    pub history_key: Option<String>,
    pub history_limit: usize,
    pub route: RouteInfo,
    pub skill_filter: Option<Vec<String>>,
    /// Primary conversation handle, used for topic resolution.
    pub conversation: ConversationHandle,
    pub side_channels: SideChannels,
}

impl DispatchContext {
    /// Build a context from the inbound conversation handle.
    ///
    /// The thread scope is derived from the chat kind: forum topics in
    /// groups, DM topics in private chats.
    #[must_use]
    pub fn from_conversation(conversation: ConversationHandle, route: RouteInfo) -> Self {
        let is_group = conversation.kind.is_group();
        let thread = match (conversation.message_thread_id, is_group) {
            (Some(id), true) if conversation.is_forum => ThreadSpec::forum(id),
            (Some(id), false) => ThreadSpec::dm(id),
            _ => ThreadSpec::none(),
        };
        Self {
            chat_id: conversation.chat_id,
            is_group,
            message_id: conversation.message_id,
            resolved_thread_id: thread.id,
            thread,
            route,
            conversation,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_side_channels(mut self, side_channels: SideChannels) -> Self {
        self.side_channels = side_channels;
        self
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        courier_common::types::{ChatKind, ThreadScope},
    };

    #[test]
    fn private_thread_becomes_dm_topic() {
        let ctx = DispatchContext::from_conversation(
            ConversationHandle {
                chat_id: 123,
                kind: ChatKind::Private,
                message_id: Some(456),
                message_thread_id: Some(777),
                ..Default::default()
            },
            RouteInfo::default(),
        );
        assert!(!ctx.is_group);
        assert_eq!(ctx.thread, ThreadSpec::dm(777));
        assert_eq!(ctx.resolved_thread_id, Some(777));
        assert_eq!(ctx.message_id, Some(456));
    }

    #[test]
    fn forum_group_thread_becomes_forum_topic() {
        let ctx = DispatchContext::from_conversation(
            ConversationHandle {
                chat_id: -100,
                kind: ChatKind::Supergroup,
                is_forum: true,
                message_thread_id: Some(9),
                ..Default::default()
            },
            RouteInfo::default(),
        );
        assert!(ctx.is_group);
        assert_eq!(ctx.thread.scope, ThreadScope::Forum);
    }

    #[test]
    fn reply_thread_in_plain_group_is_ignored() {
        let ctx = DispatchContext::from_conversation(
            ConversationHandle {
                chat_id: -5,
                kind: ChatKind::Group,
                message_thread_id: Some(3),
                ..Default::default()
            },
            RouteInfo::default(),
        );
        assert_eq!(ctx.thread, ThreadSpec::none());
    }
}
