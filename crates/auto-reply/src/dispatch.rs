//! The reply dispatch orchestrator.

use std::sync::Arc;

use {
    courier_channels::{
        ChatActionTarget, ChatActions, DeliveryRequest, DeliveryService, ReplyDispatchResult,
        ReplyDispatcher, ReplyEvent, ReplyEventReceiver, ReplyRequest, ReplySink, StreamFactory,
        TopicsResolver, reply_channel,
    },
    courier_common::types::ReplyPayload,
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

#[cfg(feature = "metrics")]
use courier_metrics::{counter, dispatch as dispatch_metrics, histogram, labels};

use crate::{
    Error, Result,
    channel::{ReplyChannel, StreamingPlan, open_channel},
    context::DispatchContext,
    outcome::{AckReaction, DispatchOutcome, FinalSource},
    settings::DispatchSettings,
};

/// Default capacity of the provider → orchestrator event buffer.
const DEFAULT_EVENT_BUFFER: usize = 16;

/// Collaborators a dispatch call is wired to.
#[derive(Clone)]
pub struct DispatchServices {
    pub topics: Arc<dyn TopicsResolver>,
    pub streams: Arc<dyn StreamFactory>,
    pub provider: Arc<dyn ReplyDispatcher>,
    pub delivery: Arc<dyn DeliveryService>,
    pub actions: Arc<dyn ChatActions>,
}

/// Per-call knobs that are not configuration.
#[derive(Debug, Clone, Default)]
pub struct DispatchOptions {
    /// Aborts the call when triggered. Any opened channel is still stopped.
    pub cancel: Option<CancellationToken>,
    /// Capacity of the event buffer between provider and orchestrator.
    /// Zero means the default.
    pub event_buffer: usize,
    /// Existing message an edit stream should rewrite instead of sending a
    /// new one.
    pub edit_target_message_id: Option<i32>,
}

pub struct DispatchRequest<'a> {
    pub context: &'a DispatchContext,
    pub settings: DispatchSettings,
    pub options: DispatchOptions,
}

/// Running fold over the provider's events.
#[derive(Debug, Default)]
struct ReplyFold {
    blocks: String,
    final_payload: Option<ReplyPayload>,
    channel_delivered_final: bool,
    events: usize,
}

impl ReplyFold {
    async fn apply(&mut self, channel: &mut dyn ReplyChannel, event: ReplyEvent) {
        self.events += 1;
        match event {
            ReplyEvent::Partial(text) => channel.on_partial(&text).await,
            ReplyEvent::Block(payload) => {
                self.blocks.push_str(&payload.text);
                channel.on_block(&payload).await;
            },
            ReplyEvent::Final(payload) => {
                if self.final_payload.is_some() {
                    warn!("reply provider emitted a second final reply, ignoring it");
                    return;
                }
                self.channel_delivered_final = channel.on_final(&payload).await;
                self.final_payload = Some(payload);
            },
        }
    }

    /// Content for the delivery service: the final reply, or the blocks
    /// seen so far when no final arrived.
    fn delivery_content(&mut self) -> Option<ReplyPayload> {
        let payload = self
            .final_payload
            .take()
            .unwrap_or_else(|| ReplyPayload::text(std::mem::take(&mut self.blocks)));
        (!payload.is_empty()).then_some(payload)
    }
}

/// Decides, per call, how reply content reaches the user and guarantees a
/// single authoritative final reply.
pub struct ReplyOrchestrator {
    services: DispatchServices,
}

impl ReplyOrchestrator {
    #[must_use]
    pub fn new(services: DispatchServices) -> Self {
        Self { services }
    }

    /// Run one reply through the configured streaming channel and make sure
    /// the final reply is delivered exactly once.
    pub async fn dispatch(&self, request: DispatchRequest<'_>) -> Result<DispatchOutcome> {
        let DispatchRequest {
            context,
            settings,
            options,
        } = request;

        #[cfg(feature = "metrics")]
        let start = std::time::Instant::now();

        let topics_enabled = match self
            .services
            .topics
            .resolve_topics_enabled(&context.conversation)
            .await
        {
            Ok(enabled) => enabled,
            Err(e) => {
                warn!(chat_id = context.chat_id, error = %e, "topics lookup failed, assuming disabled");
                false
            },
        };

        let plan = StreamingPlan::resolve(
            context,
            &settings,
            topics_enabled,
            options.edit_target_message_id,
        );
        let stream_partials = matches!(plan, StreamingPlan::Draft(_));
        let mut channel = open_channel(self.services.streams.as_ref(), plan).await;
        let streaming = channel.mode();

        debug!(
            chat_id = context.chat_id,
            thread_id = ?context.thread.id,
            thread_scope = context.thread.scope.as_str(),
            requested = %settings.streaming_mode,
            streaming = %streaming,
            "dispatching reply"
        );

        #[cfg(feature = "metrics")]
        counter!(dispatch_metrics::DISPATCHES_TOTAL, labels::MODE => streaming.as_str()).increment(1);

        self.signal_activity(context).await;

        let buffer = match options.event_buffer {
            0 => DEFAULT_EVENT_BUFFER,
            n => n,
        };
        let (sink, events) = reply_channel(buffer, stream_partials);
        let reply_request = ReplyRequest {
            chat_id: context.chat_id,
            thread: context.thread,
            reply_to_mode: settings.reply_to_mode,
            reply_to_message_id: context.message_id,
            text_limit: settings.text_limit,
            route: context.route.clone(),
            skill_filter: context.skill_filter.clone(),
            history_key: context.history_key.clone(),
            history_limit: context.history_limit,
        };
        let cancel = options.cancel.unwrap_or_default();

        let mut fold = ReplyFold::default();
        let provided = self
            .fold_events(reply_request, sink, events, channel.as_mut(), &mut fold, &cancel)
            .await;

        // Every exit path below this point has a closed channel.
        channel.close().await;
        let degraded = channel.degraded();

        let result = match provided {
            Ok(result) => result,
            Err(e) => {
                match &e {
                    Error::Cancelled => info!(chat_id = context.chat_id, "dispatch cancelled"),
                    other => {
                        error!(chat_id = context.chat_id, error = %other, "reply provider failed");
                        #[cfg(feature = "metrics")]
                        counter!(dispatch_metrics::PROVIDER_FAILURES_TOTAL).increment(1);
                    },
                }
                return Err(e);
            },
        };

        if degraded {
            #[cfg(feature = "metrics")]
            counter!(dispatch_metrics::FALLBACKS_TOTAL, labels::MODE => settings.streaming_mode.as_str())
                .increment(1);
        }

        let mut final_source = fold
            .channel_delivered_final
            .then_some(FinalSource::EditStream);

        if result.queued_final && final_source.is_none() {
            final_source = self.deliver_final(context, &settings, &mut fold).await?;
        }

        let ack_reaction = self.settle_ack(context, final_source.is_some()).await;

        if let Some(source) = final_source {
            #[cfg(feature = "metrics")]
            counter!(dispatch_metrics::FINAL_REPLIES_TOTAL, labels::SOURCE => source.as_str()).increment(1);
            debug!(chat_id = context.chat_id, source = source.as_str(), "final reply delivered");
        }

        #[cfg(feature = "metrics")]
        histogram!(dispatch_metrics::DISPATCH_DURATION_SECONDS).record(start.elapsed().as_secs_f64());

        info!(
            chat_id = context.chat_id,
            streaming = %streaming,
            events = fold.events,
            queued_final = result.queued_final,
            final_source = final_source.map(FinalSource::as_str),
            degraded,
            "reply dispatched"
        );

        Ok(DispatchOutcome {
            queued_final: result.queued_final,
            final_source,
            streaming,
            degraded,
            ack_reaction,
        })
    }

    /// Drive the provider while folding its events, in emission order, into
    /// the channel. Events still buffered when the provider resolves are
    /// drained before returning.
    async fn fold_events(
        &self,
        request: ReplyRequest,
        sink: ReplySink,
        mut events: ReplyEventReceiver,
        channel: &mut dyn ReplyChannel,
        fold: &mut ReplyFold,
        cancel: &CancellationToken,
    ) -> Result<ReplyDispatchResult> {
        let mut provider = self.services.provider.dispatch_reply(request, sink);

        let result = loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(Error::Cancelled),
                Some(event) = events.recv() => fold.apply(channel, event).await,
                result = &mut provider => break result,
            }
        };

        events.close();
        while let Some(event) = events.recv().await {
            fold.apply(channel, event).await;
        }

        result.map_err(Error::Provider)
    }

    async fn deliver_final(
        &self,
        context: &DispatchContext,
        settings: &DispatchSettings,
        fold: &mut ReplyFold,
    ) -> Result<Option<FinalSource>> {
        let Some(payload) = fold.delivery_content() else {
            debug!(chat_id = context.chat_id, "final reply queued without content, nothing to deliver");
            return Ok(None);
        };

        let request = DeliveryRequest {
            chat_id: context.chat_id,
            thread: context.thread,
            replies: vec![payload],
            reply_to_mode: settings.reply_to_mode,
            reply_to_message_id: context.message_id,
            text_limit: settings.text_limit,
        };

        match self.services.delivery.deliver_replies(request).await {
            Ok(report) if report.delivered => Ok(Some(FinalSource::DeliveryService)),
            Ok(_) => {
                warn!(chat_id = context.chat_id, "delivery service sent no messages");
                Ok(None)
            },
            Err(source) => {
                error!(chat_id = context.chat_id, error = %source, "final reply delivery failed");
                #[cfg(feature = "metrics")]
                counter!(dispatch_metrics::DELIVERY_FAILURES_TOTAL).increment(1);
                Err(Error::Delivery { source })
            },
        }
    }

    fn action_target(context: &DispatchContext) -> ChatActionTarget {
        ChatActionTarget {
            chat_id: context.chat_id,
            thread: context.thread,
            message_id: context.message_id,
        }
    }

    /// Show typing (or voice recording) once, before the reply is generated.
    async fn signal_activity(&self, context: &DispatchContext) {
        let target = Self::action_target(context);
        let (action, result) = if context.side_channels.record_voice {
            ("record_voice", self.services.actions.send_record_voice(&target).await)
        } else {
            ("typing", self.services.actions.send_typing(&target).await)
        };
        if let Err(e) = result {
            debug!(chat_id = context.chat_id, action, error = %e, "chat action failed");
        }
    }

    async fn settle_ack(&self, context: &DispatchContext, final_emitted: bool) -> AckReaction {
        let side = context.side_channels;
        if !side.ack_reaction_pending {
            return AckReaction::NotPending;
        }
        if !side.remove_ack_after_reply || !final_emitted {
            return AckReaction::Kept;
        }
        match self
            .services
            .actions
            .clear_ack_reaction(&Self::action_target(context))
            .await
        {
            Ok(()) => AckReaction::Cleared,
            Err(e) => {
                warn!(chat_id = context.chat_id, error = %e, "failed to clear ack reaction");
                AckReaction::Failed
            },
        }
    }
}
