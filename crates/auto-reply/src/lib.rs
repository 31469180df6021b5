//! Reply dispatch: the glue between a reply provider and a chat transport.
//!
//! Flow: resolve topic capability → open the streaming channel picked by
//! settings (draft, edit, or none) → run the reply provider and fold its
//! ordered event stream into the channel → finalize the channel or hand the
//! final reply to the delivery service → clear side channels → report the
//! outcome.

pub mod channel;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod outcome;
pub mod settings;

#[cfg(test)]
mod testing;

pub use {
    context::{DispatchContext, SideChannels},
    dispatch::{DispatchOptions, DispatchRequest, DispatchServices, ReplyOrchestrator},
    error::{Error, Result},
    channel::{ReplyChannel, StreamingPlan},
    outcome::{AckReaction, DispatchOutcome, FinalSource},
    settings::{DispatchSettings, SettingsOverrides},
};
