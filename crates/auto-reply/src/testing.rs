//! Recording fakes for the collaborator traits.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use {
    async_trait::async_trait,
    courier_channels::{
        ChatActionTarget, ChatActions, DeliveryReport, DeliveryRequest, DeliveryService,
        DraftStream, DraftStreamParams, EditStream, EditStreamParams, Error, ReplyDispatchResult,
        ReplyDispatcher, ReplyEvent, ReplyRequest, ReplySink, Result, StreamFactory,
        TopicsResolver,
    },
    courier_common::types::{ConversationHandle, ReplyKind},
};

use crate::dispatch::DispatchServices;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamCall {
    Update(String),
    Finalize(String),
    Flush,
    Stop,
}

/// Shared, ordered log of stream calls.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<StreamCall>>>);

impl CallLog {
    fn push(&self, call: StreamCall) {
        self.0.lock().unwrap().push(call);
    }

    pub fn snapshot(&self) -> Vec<StreamCall> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&StreamCall) -> bool) -> usize {
        self.0.lock().unwrap().iter().filter(|c| pred(c)).count()
    }
}

#[derive(Debug, Default)]
pub struct RecordingDraftStream {
    log: CallLog,
    fail_flush: bool,
}

impl RecordingDraftStream {
    pub fn calls(&self) -> CallLog {
        self.log.clone()
    }
}

#[async_trait]
impl DraftStream for RecordingDraftStream {
    fn update(&self, text: &str) {
        self.log.push(StreamCall::Update(text.into()));
    }

    async fn flush(&self) -> Result<()> {
        self.log.push(StreamCall::Flush);
        if self.fail_flush {
            return Err(Error::unavailable("flush refused"));
        }
        Ok(())
    }

    async fn stop(&self) {
        self.log.push(StreamCall::Stop);
    }
}

#[derive(Debug, Clone, Copy)]
struct EditBehavior {
    lose_after: Option<usize>,
    finalize_ok: bool,
}

impl Default for EditBehavior {
    fn default() -> Self {
        Self {
            lose_after: None,
            finalize_ok: true,
        }
    }
}

/// Edit stream whose message appears on the first update.
#[derive(Debug, Default)]
pub struct RecordingEditStream {
    log: CallLog,
    behavior: EditBehavior,
    updates: AtomicUsize,
    has_message: AtomicBool,
}

impl RecordingEditStream {
    pub fn calls(&self) -> CallLog {
        self.log.clone()
    }

    /// The message disappears once `n` updates have been applied.
    pub fn lose_message_after(mut self, n: usize) -> Self {
        self.behavior.lose_after = Some(n);
        self
    }

    pub fn failing_finalize(mut self) -> Self {
        self.behavior.finalize_ok = false;
        self
    }
}

#[async_trait]
impl EditStream for RecordingEditStream {
    async fn update(&self, text: &str) -> bool {
        self.log.push(StreamCall::Update(text.into()));
        // Blank text cannot create a message.
        if text.trim().is_empty() && !self.has_message() {
            return false;
        }
        let n = self.updates.fetch_add(1, Ordering::SeqCst) + 1;
        let lost = self.behavior.lose_after.is_some_and(|limit| n > limit);
        self.has_message.store(!lost, Ordering::SeqCst);
        !lost
    }

    async fn finalize(&self, text: &str) -> bool {
        self.log.push(StreamCall::Finalize(text.into()));
        self.behavior.finalize_ok
    }

    fn has_message(&self) -> bool {
        self.has_message.load(Ordering::SeqCst)
    }

    async fn stop(&self) {
        self.log.push(StreamCall::Stop);
    }
}

#[derive(Debug, Default)]
pub struct RecordingStreamFactory {
    pub log: CallLog,
    pub draft_params: Mutex<Vec<DraftStreamParams>>,
    pub edit_params: Mutex<Vec<EditStreamParams>>,
    fail: bool,
    fail_flush: bool,
    edit: EditBehavior,
}

impl RecordingStreamFactory {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn failing_flush() -> Self {
        Self {
            fail_flush: true,
            ..Default::default()
        }
    }

    pub fn losing_message_after(n: usize) -> Self {
        Self {
            edit: EditBehavior {
                lose_after: Some(n),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn failing_finalize() -> Self {
        Self {
            edit: EditBehavior {
                finalize_ok: false,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn opened(&self) -> usize {
        self.draft_params.lock().unwrap().len() + self.edit_params.lock().unwrap().len()
    }
}

#[async_trait]
impl StreamFactory for RecordingStreamFactory {
    async fn create_draft_stream(&self, params: DraftStreamParams) -> Result<Box<dyn DraftStream>> {
        self.draft_params.lock().unwrap().push(params);
        if self.fail {
            return Err(Error::unavailable("draft streams disabled"));
        }
        Ok(Box::new(RecordingDraftStream {
            log: self.log.clone(),
            fail_flush: self.fail_flush,
        }))
    }

    async fn create_edit_stream(&self, params: EditStreamParams) -> Result<Box<dyn EditStream>> {
        self.edit_params.lock().unwrap().push(params);
        if self.fail {
            return Err(Error::unavailable("edit streams disabled"));
        }
        Ok(Box::new(RecordingEditStream {
            log: self.log.clone(),
            behavior: self.edit,
            updates: AtomicUsize::new(0),
            has_message: AtomicBool::new(false),
        }))
    }
}

/// Replays a fixed event script.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    events: Vec<ReplyEvent>,
    queued_final: bool,
    failure: Option<String>,
    hang: bool,
    pub requests: Mutex<Vec<ReplyRequest>>,
}

impl ScriptedProvider {
    pub fn new(events: Vec<ReplyEvent>) -> Self {
        let queued_final = events.iter().any(|e| matches!(e, ReplyEvent::Final(_)));
        Self {
            events,
            queued_final,
            ..Default::default()
        }
    }

    pub fn queued_final(mut self, queued: bool) -> Self {
        self.queued_final = queued;
        self
    }

    pub fn failing_after_events(mut self, message: &str) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Never resolves after emitting its events.
    pub fn hanging(mut self) -> Self {
        self.hang = true;
        self
    }
}

#[async_trait]
impl ReplyDispatcher for ScriptedProvider {
    async fn dispatch_reply(
        &self,
        request: ReplyRequest,
        sink: ReplySink,
    ) -> Result<ReplyDispatchResult> {
        self.requests.lock().unwrap().push(request);
        for event in self.events.clone() {
            match event {
                ReplyEvent::Partial(text) => {
                    sink.partial(text).await;
                },
                ReplyEvent::Block(payload) => {
                    sink.deliver(payload, ReplyKind::Block).await;
                },
                ReplyEvent::Final(payload) => {
                    sink.deliver(payload, ReplyKind::Final).await;
                },
            }
        }
        if self.hang {
            // Keep the sink alive so the consumer cannot finish early.
            let _sink = sink;
            loop {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
        }
        if let Some(message) = &self.failure {
            return Err(Error::unavailable(message));
        }
        Ok(ReplyDispatchResult {
            queued_final: self.queued_final,
        })
    }
}

#[derive(Debug, Default)]
pub struct RecordingDelivery {
    pub requests: Mutex<Vec<DeliveryRequest>>,
    fail: bool,
}

impl RecordingDelivery {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn delivered(&self) -> Vec<DeliveryRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeliveryService for RecordingDelivery {
    async fn deliver_replies(&self, request: DeliveryRequest) -> Result<DeliveryReport> {
        let count = request.replies.len();
        self.requests.lock().unwrap().push(request);
        if self.fail {
            return Err(Error::unavailable("transport down"));
        }
        Ok(DeliveryReport {
            delivered: count > 0,
            message_ids: (1..=i32::try_from(count).unwrap()).collect(),
        })
    }
}

/// Topics resolver with a fixed answer, or a failure when `None`.
#[derive(Debug)]
pub struct StaticTopics(pub Option<bool>);

#[async_trait]
impl TopicsResolver for StaticTopics {
    async fn resolve_topics_enabled(&self, _conversation: &ConversationHandle) -> Result<bool> {
        self.0.ok_or_else(|| Error::unavailable("topics lookup failed"))
    }
}

#[derive(Debug, Default)]
pub struct RecordingActions {
    pub calls: Mutex<Vec<&'static str>>,
    fail: bool,
}

impl RecordingActions {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn recorded(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &'static str) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        if self.fail {
            return Err(Error::unavailable("action refused"));
        }
        Ok(())
    }
}

#[async_trait]
impl ChatActions for RecordingActions {
    async fn send_typing(&self, _target: &ChatActionTarget) -> Result<()> {
        self.record("typing")
    }

    async fn send_record_voice(&self, _target: &ChatActionTarget) -> Result<()> {
        self.record("record_voice")
    }

    async fn clear_ack_reaction(&self, _target: &ChatActionTarget) -> Result<()> {
        self.record("clear_ack")
    }
}

/// Concrete handles to every fake behind a [`DispatchServices`].
pub struct Harness {
    pub streams: Arc<RecordingStreamFactory>,
    pub provider: Arc<ScriptedProvider>,
    pub delivery: Arc<RecordingDelivery>,
    pub actions: Arc<RecordingActions>,
    pub services: DispatchServices,
}

impl Harness {
    pub fn new(provider: ScriptedProvider) -> Self {
        Self::with(
            provider,
            RecordingStreamFactory::default(),
            RecordingDelivery::default(),
            RecordingActions::default(),
            Some(true),
        )
    }

    pub fn with(
        provider: ScriptedProvider,
        streams: RecordingStreamFactory,
        delivery: RecordingDelivery,
        actions: RecordingActions,
        topics: Option<bool>,
    ) -> Self {
        let streams = Arc::new(streams);
        let provider = Arc::new(provider);
        let delivery = Arc::new(delivery);
        let actions = Arc::new(actions);
        let services = DispatchServices {
            topics: Arc::new(StaticTopics(topics)),
            streams: streams.clone(),
            provider: provider.clone(),
            delivery: delivery.clone(),
            actions: actions.clone(),
        };
        Self {
            streams,
            provider,
            delivery,
            actions,
            services,
        }
    }
}
