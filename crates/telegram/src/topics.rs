use {
    async_trait::async_trait,
    courier_channels::TopicsResolver,
    courier_common::types::{ChatKind, ConversationHandle},
};

/// Topic support: forum supergroups have it, private chats have it when the
/// account enables DM topics.
#[derive(Debug, Clone, Copy, Default)]
pub struct TelegramTopicsResolver {
    pub dm_topics: bool,
}

#[async_trait]
impl TopicsResolver for TelegramTopicsResolver {
    async fn resolve_topics_enabled(
        &self,
        conversation: &ConversationHandle,
    ) -> courier_channels::Result<bool> {
        Ok(match conversation.kind {
            ChatKind::Private => self.dm_topics,
            ChatKind::Group | ChatKind::Supergroup => conversation.is_forum,
            ChatKind::Channel => false,
        })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case(ChatKind::Private, false, true, true)]
    #[case(ChatKind::Private, false, false, false)]
    #[case(ChatKind::Supergroup, true, false, true)]
    #[case(ChatKind::Supergroup, false, true, false)]
    #[case(ChatKind::Channel, true, true, false)]
    #[tokio::test]
    async fn topics_by_chat_kind(
        #[case] kind: ChatKind,
        #[case] is_forum: bool,
        #[case] dm_topics: bool,
        #[case] expected: bool,
    ) {
        let resolver = TelegramTopicsResolver { dm_topics };
        let conversation = ConversationHandle {
            kind,
            is_forum,
            ..Default::default()
        };
        assert_eq!(resolver.resolve_topics_enabled(&conversation).await.unwrap(), expected);
    }
}
