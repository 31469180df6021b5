//! Collaborator contracts for reply dispatch.
//!
//! The dispatch orchestrator talks to the outside world only through the
//! traits in this crate: streaming channels (draft and edit), the reply
//! provider, the final delivery service, topic resolution, and chat-action
//! side channels. Transport crates (e.g. Telegram) implement them.

pub mod actions;
pub mod delivery;
pub mod error;
pub mod reply;
pub mod stream;

pub use {
    actions::{ChatActionTarget, ChatActions, TopicsResolver},
    delivery::{DeliveryReport, DeliveryRequest, DeliveryService},
    error::{Error, Result},
    reply::{
        ReplyDispatchResult, ReplyDispatcher, ReplyEvent, ReplyEventReceiver, ReplyRequest,
        ReplySink, reply_channel,
    },
    stream::{DraftStream, DraftStreamParams, EditStream, EditStreamParams, StreamFactory},
};
