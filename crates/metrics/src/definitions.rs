//! Metric name and label definitions.
//!
//! Every metric emitted by courier is named here so the set of exported
//! series is documented in one place.

/// Reply dispatch (orchestrator) metrics
pub mod dispatch {
    /// Dispatch calls started, labelled by effective streaming mode
    pub const DISPATCHES_TOTAL: &str = "courier_dispatches_total";
    /// Dispatch duration in seconds
    pub const DISPATCH_DURATION_SECONDS: &str = "courier_dispatch_duration_seconds";
    /// Streaming channels that degraded to the delivery service
    pub const FALLBACKS_TOTAL: &str = "courier_dispatch_fallbacks_total";
    /// Reply provider failures
    pub const PROVIDER_FAILURES_TOTAL: &str = "courier_dispatch_provider_failures_total";
    /// Final delivery failures
    pub const DELIVERY_FAILURES_TOTAL: &str = "courier_dispatch_delivery_failures_total";
    /// Final replies by source (edit_stream, delivery_service)
    pub const FINAL_REPLIES_TOTAL: &str = "courier_dispatch_final_replies_total";
}

/// Telegram transport metrics
pub mod telegram {
    /// Messages sent to Telegram
    pub const MESSAGES_SENT_TOTAL: &str = "courier_telegram_messages_sent_total";
    /// Message send errors
    pub const MESSAGE_SEND_ERRORS_TOTAL: &str = "courier_telegram_message_send_errors_total";
    /// Streaming edit operations, labelled by stream (draft, edit)
    pub const STREAMING_EDITS_TOTAL: &str = "courier_telegram_streaming_edits_total";
    /// Requests delayed by a server-side `retry_after`
    pub const RATE_LIMITED_TOTAL: &str = "courier_telegram_rate_limited_total";
}

/// Common label keys
pub mod labels {
    pub const MODE: &str = "mode";
    pub const SOURCE: &str = "source";
    pub const STREAM: &str = "stream";
    pub const ACCOUNT_ID: &str = "account_id";
    pub const OPERATION: &str = "operation";
}

/// Standard histogram buckets for different metric types
pub mod buckets {
    use once_cell::sync::Lazy;

    /// Dispatch duration buckets (in seconds)
    /// Covers 50ms to 5 minutes (reply generation can be slow)
    pub static DISPATCH_DURATION: Lazy<Vec<f64>> = Lazy::new(|| {
        vec![
            0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 15.0, 30.0, 60.0, 120.0, 300.0,
        ]
    });
}
