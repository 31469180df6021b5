//! Scripted reply provider: replays a recorded sequence of reply events.

use std::{path::Path, time::Duration};

use {
    anyhow::{Context, Result},
    async_trait::async_trait,
    courier_channels::{ReplyDispatchResult, ReplyDispatcher, ReplyRequest, ReplySink},
    courier_common::types::{ReplyKind, ReplyPayload},
    serde::Deserialize,
    tracing::debug,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptEventKind {
    Partial,
    Block,
    Final,
}

/// One step of a replay script.
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptEvent {
    pub kind: ScriptEventKind,
    pub text: String,
    /// Wait this long before emitting the event.
    #[serde(default)]
    pub delay_ms: u64,
    #[serde(default)]
    pub silent: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplayScript {
    pub events: Vec<ScriptEvent>,
    /// Defaults to whether the script contains a final event.
    #[serde(default)]
    pub queued_final: Option<bool>,
    /// Fail after emitting every event, as a broken provider would.
    #[serde(default)]
    pub fail_with: Option<String>,
}

impl ReplayScript {
    /// Load a script from JSON or YAML, picked by file extension.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read script {}", path.display()))?;
        Self::parse(&raw, path)
    }

    pub fn parse(raw: &str, path: &Path) -> Result<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        match ext {
            "yaml" | "yml" => serde_yaml::from_str(raw).context("invalid YAML script"),
            "json" => serde_json::from_str(raw).context("invalid JSON script"),
            other => anyhow::bail!("unsupported script format: .{other}"),
        }
    }

    fn queued_final(&self) -> bool {
        self.queued_final.unwrap_or_else(|| {
            self.events
                .iter()
                .any(|e| e.kind == ScriptEventKind::Final)
        })
    }
}

pub struct ScriptedReplyDispatcher {
    script: ReplayScript,
}

impl ScriptedReplyDispatcher {
    #[must_use]
    pub fn new(script: ReplayScript) -> Self {
        Self { script }
    }
}

#[async_trait]
impl ReplyDispatcher for ScriptedReplyDispatcher {
    async fn dispatch_reply(
        &self,
        request: ReplyRequest,
        sink: ReplySink,
    ) -> courier_channels::Result<ReplyDispatchResult> {
        debug!(
            chat_id = request.chat_id,
            agent_id = %request.route.agent_id,
            events = self.script.events.len(),
            partials = sink.streams_partials(),
            "replaying reply script"
        );

        for event in &self.script.events {
            if event.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(event.delay_ms)).await;
            }
            let payload = ReplyPayload {
                text: event.text.clone(),
                silent: event.silent,
            };
            let accepted = match event.kind {
                ScriptEventKind::Partial => {
                    if !sink.streams_partials() {
                        continue;
                    }
                    sink.partial(payload.text).await
                },
                ScriptEventKind::Block => sink.deliver(payload, ReplyKind::Block).await,
                ScriptEventKind::Final => sink.deliver(payload, ReplyKind::Final).await,
            };
            if !accepted {
                return Err(courier_channels::Error::closed("reply consumer went away"));
            }
        }

        if let Some(message) = &self.script.fail_with {
            return Err(courier_channels::Error::unavailable(message));
        }
        Ok(ReplyDispatchResult {
            queued_final: self.script.queued_final(),
        })
    }
}
