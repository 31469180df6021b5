use {courier_common::types::StreamingMode, serde::Serialize};

/// Which collaborator put the final reply in front of the user.
///
/// The draft stream never appears here: drafts are torn down and the final
/// reply is delivered separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalSource {
    EditStream,
    DeliveryService,
}

impl FinalSource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EditStream => "edit_stream",
            Self::DeliveryService => "delivery_service",
        }
    }
}

/// What happened to the acknowledgment reaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AckReaction {
    /// No reaction was pending.
    #[default]
    NotPending,
    /// Pending, but left in place (not requested, or nothing was emitted).
    Kept,
    Cleared,
    /// Clearing failed. The reply itself is unaffected.
    Failed,
}

/// Result of one dispatch call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DispatchOutcome {
    /// The provider reported a final reply.
    pub queued_final: bool,
    /// Source of truth for the user-visible final reply, if one went out.
    pub final_source: Option<FinalSource>,
    /// Streaming mode actually used after capability checks.
    pub streaming: StreamingMode,
    /// A streaming channel failed and the call fell back to delivery.
    pub degraded: bool,
    pub ack_reaction: AckReaction,
}

impl DispatchOutcome {
    /// Whether the final reply reached the user through any channel.
    #[must_use]
    pub fn delivered(&self) -> bool {
        self.final_source.is_some()
    }
}
