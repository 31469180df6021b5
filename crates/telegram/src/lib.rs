//! Telegram transport for courier.
//!
//! Implements the collaborator traits from `courier-channels` with teloxide:
//! draft streams (a silent placeholder message), edit streams (one reply
//! message rewritten in place), plain-text delivery, topic capability, and
//! chat actions.

pub mod actions;
pub mod config;
pub mod delivery;
pub mod draft;
pub mod edit;
pub mod error;
pub mod outbound;
pub mod services;
pub mod text;
pub mod topics;

#[cfg(test)]
mod test_api;

pub use {
    config::TelegramAccountConfig,
    error::{Error, Result},
    services::{TelegramAccount, TelegramStreamFactory},
};
