//! Draft stream: a silent placeholder message that mirrors partial reply
//! text until the real reply is delivered.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use {
    async_trait::async_trait,
    courier_channels::{DraftStream, DraftStreamParams},
    teloxide::types::MessageId,
    tokio::{
        sync::{mpsc, oneshot},
        time::Instant,
    },
    tracing::{debug, warn},
};

#[cfg(feature = "metrics")]
use courier_metrics::{counter, labels, telegram as tg_metrics};

use crate::{
    outbound::TelegramOutbound,
    text::{effective_limit, truncate_chars},
};

enum DraftCommand {
    Update(String),
    Flush(oneshot::Sender<Result<(), String>>),
    Stop(oneshot::Sender<()>),
}

/// Handle to a draft message driven by a background worker.
///
/// Dropping the handle without calling [`DraftStream::stop`] lets the worker
/// delete the draft on its own.
pub struct TelegramDraftStream {
    tx: mpsc::UnboundedSender<DraftCommand>,
    stopped: AtomicBool,
}

impl TelegramDraftStream {
    /// Spawn the worker for one draft. Must be called inside a tokio runtime.
    #[must_use]
    pub fn spawn(outbound: Arc<TelegramOutbound>, params: DraftStreamParams, throttle: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = DraftWorker {
            outbound,
            limit: effective_limit(params.text_limit),
            params,
            throttle,
            message_id: None,
            committed: String::new(),
            pending: None,
            last_commit: None,
            last_error: None,
        };
        tokio::spawn(worker.run(rx));
        Self {
            tx,
            stopped: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl DraftStream for TelegramDraftStream {
    fn update(&self, text: &str) {
        if self.tx.send(DraftCommand::Update(text.to_string())).is_err() {
            debug!("draft update after worker exit ignored");
        }
    }

    async fn flush(&self) -> courier_channels::Result<()> {
        let (ack, done) = oneshot::channel();
        if self.tx.send(DraftCommand::Flush(ack)).is_err() {
            return Err(courier_channels::Error::closed("draft stream stopped"));
        }
        match done.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(message)) => Err(courier_channels::Error::unavailable(message)),
            Err(_) => Err(courier_channels::Error::closed("draft worker exited")),
        }
    }

    async fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        let (ack, done) = oneshot::channel();
        if self.tx.send(DraftCommand::Stop(ack)).is_ok() {
            let _ = done.await;
        }
    }
}

struct DraftWorker {
    outbound: Arc<TelegramOutbound>,
    params: DraftStreamParams,
    limit: usize,
    throttle: Duration,
    message_id: Option<MessageId>,
    /// Text currently shown in the draft.
    committed: String,
    /// Latest text not yet committed. Intermediate texts collapse into it.
    pending: Option<String>,
    last_commit: Option<Instant>,
    last_error: Option<String>,
}

impl DraftWorker {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<DraftCommand>) {
        loop {
            let command = match self.next_commit_at() {
                Some(at) => tokio::select! {
                    command = rx.recv() => command,
                    () = tokio::time::sleep_until(at) => {
                        self.commit().await;
                        continue;
                    },
                },
                None => rx.recv().await,
            };

            match command {
                Some(DraftCommand::Update(text)) => {
                    self.pending = Some(text);
                    if self.next_commit_at().is_some_and(|at| at <= Instant::now()) {
                        self.commit().await;
                    }
                },
                Some(DraftCommand::Flush(ack)) => {
                    self.commit().await;
                    let _ = ack.send(self.last_error.clone().map_or(Ok(()), Err));
                },
                Some(DraftCommand::Stop(ack)) => {
                    self.discard().await;
                    let _ = ack.send(());
                    return;
                },
                None => {
                    self.discard().await;
                    return;
                },
            }
        }
    }

    /// When the pending text may be committed, if there is any.
    fn next_commit_at(&self) -> Option<Instant> {
        self.pending.as_ref()?;
        Some(match self.last_commit {
            Some(last) => last + self.throttle,
            None => Instant::now(),
        })
    }

    async fn commit(&mut self) {
        let Some(text) = self.pending.take() else {
            return;
        };
        let display = truncate_chars(&text, self.limit);
        if display.trim().is_empty() || display == self.committed {
            return;
        }

        let chat_id = self.params.chat_id;
        let result = match self.message_id {
            Some(id) => self.outbound.edit_text(chat_id, id, display).await,
            None => self
                .outbound
                .send_text(chat_id, &self.params.thread, display, None, true)
                .await
                .map(|id| {
                    self.message_id = Some(id);
                }),
        };
        self.last_commit = Some(Instant::now());

        match result {
            Ok(()) => {
                #[cfg(feature = "metrics")]
                counter!(tg_metrics::STREAMING_EDITS_TOTAL, labels::STREAM => "draft").increment(1);
                self.committed = display.to_string();
                self.last_error = None;
            },
            Err(e) => {
                if e.is_message_missing() {
                    // Deleted by someone else; the next commit posts a new draft.
                    self.message_id = None;
                    self.committed.clear();
                }
                warn!(
                    account_id = self.outbound.account_id(),
                    chat_id,
                    error = %e,
                    "draft commit failed"
                );
                self.last_error = Some(e.to_string());
            },
        }
    }

    async fn discard(&mut self) {
        self.pending = None;
        let Some(id) = self.message_id.take() else {
            return;
        };
        if let Err(e) = self.outbound.delete(self.params.chat_id, id).await {
            debug!(
                account_id = self.outbound.account_id(),
                chat_id = self.params.chat_id,
                message_id = id.0,
                error = %e,
                "failed to delete draft message"
            );
        }
    }
}
