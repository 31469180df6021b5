//! Edit stream: one reply message rewritten in place as content grows.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use {
    async_trait::async_trait,
    courier_channels::{EditStream, EditStreamParams},
    teloxide::types::MessageId,
    tokio::{sync::Mutex, time::Instant},
    tracing::{debug, warn},
};

#[cfg(feature = "metrics")]
use courier_metrics::{counter, labels, telegram as tg_metrics};

use crate::{
    outbound::TelegramOutbound,
    text::{chunk_message, effective_limit, truncate_chars},
};

#[derive(Debug, Default)]
struct EditState {
    message_id: Option<MessageId>,
    shown: String,
    last_edit: Option<Instant>,
    finalized: bool,
    stopped: bool,
}

pub struct TelegramEditStream {
    outbound: Arc<TelegramOutbound>,
    params: EditStreamParams,
    limit: usize,
    throttle: Duration,
    state: Mutex<EditState>,
    has_message: AtomicBool,
}

impl TelegramEditStream {
    #[must_use]
    pub fn new(outbound: Arc<TelegramOutbound>, params: EditStreamParams, throttle: Duration) -> Self {
        let message_id = params.target_message_id.map(MessageId);
        Self {
            outbound,
            limit: effective_limit(params.text_limit),
            params,
            throttle,
            has_message: AtomicBool::new(message_id.is_some()),
            state: Mutex::new(EditState {
                message_id,
                ..Default::default()
            }),
        }
    }

    fn forget_message(&self, state: &mut EditState) {
        state.message_id = None;
        self.has_message.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl EditStream for TelegramEditStream {
    async fn update(&self, text: &str) -> bool {
        let mut state = self.state.lock().await;
        if state.finalized || state.stopped {
            return false;
        }
        let display = truncate_chars(text, self.limit);
        if display.trim().is_empty() {
            return false;
        }
        let chat_id = self.params.chat_id;

        let Some(message_id) = state.message_id else {
            return match self
                .outbound
                .send_text(
                    chat_id,
                    &self.params.thread,
                    display,
                    self.params.reply_to_message_id,
                    false,
                )
                .await
            {
                Ok(id) => {
                    state.message_id = Some(id);
                    state.shown = display.to_string();
                    state.last_edit = Some(Instant::now());
                    self.has_message.store(true, Ordering::SeqCst);
                    true
                },
                Err(e) => {
                    warn!(account_id = self.outbound.account_id(), chat_id, error = %e, "failed to send streamed reply");
                    false
                },
            };
        };

        if state.shown == display {
            return true;
        }
        if state
            .last_edit
            .is_some_and(|last| last.elapsed() < self.throttle)
        {
            // Skipped; the next update or finalize carries the full text.
            return false;
        }

        let result = self.outbound.edit_text(chat_id, message_id, display).await;
        state.last_edit = Some(Instant::now());
        match result {
            Ok(()) => {
                #[cfg(feature = "metrics")]
                counter!(tg_metrics::STREAMING_EDITS_TOTAL, labels::STREAM => "edit").increment(1);
                state.shown = display.to_string();
                true
            },
            Err(e) if e.is_message_missing() => {
                warn!(
                    account_id = self.outbound.account_id(),
                    chat_id,
                    message_id = message_id.0,
                    "streamed reply message disappeared"
                );
                self.forget_message(&mut state);
                false
            },
            Err(e) => {
                debug!(account_id = self.outbound.account_id(), chat_id, error = %e, "streamed edit failed");
                false
            },
        }
    }

    async fn finalize(&self, text: &str) -> bool {
        let mut state = self.state.lock().await;
        if state.finalized {
            return true;
        }
        if state.stopped {
            return false;
        }
        let Some(message_id) = state.message_id else {
            return false;
        };
        let chunks = chunk_message(text, self.limit);
        let Some((first, rest)) = chunks.split_first() else {
            return false;
        };
        let chat_id = self.params.chat_id;

        if let Err(e) = self.outbound.edit_text(chat_id, message_id, first).await {
            if e.is_message_missing() {
                self.forget_message(&mut state);
            }
            warn!(account_id = self.outbound.account_id(), chat_id, error = %e, "failed to finalize streamed reply");
            return false;
        }
        state.shown.clone_from(first);

        for chunk in rest {
            if let Err(e) = self
                .outbound
                .send_text(chat_id, &self.params.thread, chunk, None, false)
                .await
            {
                warn!(
                    account_id = self.outbound.account_id(),
                    chat_id,
                    error = %e,
                    "failed to send overflow chunk of streamed reply"
                );
                return false;
            }
        }

        state.finalized = true;
        debug!(
            account_id = self.outbound.account_id(),
            chat_id,
            message_id = message_id.0,
            chunks = chunks.len(),
            "streamed reply finalized"
        );
        true
    }

    fn has_message(&self) -> bool {
        self.has_message.load(Ordering::SeqCst)
    }

    async fn stop(&self) {
        self.state.lock().await.stopped = true;
    }
}
