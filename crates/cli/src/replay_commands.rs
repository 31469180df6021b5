use std::{path::PathBuf, sync::Arc};

use {
    anyhow::{Context, Result},
    clap::{Args, ValueEnum},
    courier_auto_reply::{
        DispatchContext, DispatchOptions, DispatchRequest, ReplyOrchestrator, SideChannels,
    },
    courier_common::types::{ChatKind, ConversationHandle, ReplyToMode, RouteInfo, StreamingMode},
    courier_config::CourierConfig,
    courier_metrics::{MetricsRecorderConfig, init_metrics},
    courier_telegram::{TelegramAccount, TelegramAccountConfig},
    tokio_util::sync::CancellationToken,
    tracing::{info, warn},
};

use crate::script::{ReplayScript, ScriptedReplyDispatcher};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ChatKindArg {
    Private,
    Group,
    Supergroup,
}

impl From<ChatKindArg> for ChatKind {
    fn from(kind: ChatKindArg) -> Self {
        match kind {
            ChatKindArg::Private => Self::Private,
            ChatKindArg::Group => Self::Group,
            ChatKindArg::Supergroup => Self::Supergroup,
        }
    }
}

#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// Reply script (JSON or YAML).
    #[arg(long)]
    pub script: PathBuf,
    /// Telegram account id from the `[telegram.<id>]` config table.
    #[arg(long, default_value = "main")]
    pub account: String,
    #[arg(long, allow_negative_numbers = true)]
    pub chat_id: i64,
    #[arg(long, value_enum, default_value = "private")]
    pub chat_kind: ChatKindArg,
    /// The supergroup has forum topics.
    #[arg(long)]
    pub forum: bool,
    /// Topic/thread the inbound message was posted in.
    #[arg(long)]
    pub thread_id: Option<i32>,
    /// Inbound message being answered.
    #[arg(long)]
    pub message_id: Option<i32>,
    /// Override the streaming mode (none, draft, edit).
    #[arg(long)]
    pub mode: Option<StreamingMode>,
    /// Override the reply-to mode (off, first, all).
    #[arg(long)]
    pub reply_to: Option<ReplyToMode>,
    /// Existing message to rewrite in edit mode.
    #[arg(long)]
    pub edit_message_id: Option<i32>,
    /// Show "recording voice" instead of "typing".
    #[arg(long)]
    pub record_voice: bool,
    /// Clear the acknowledgment reaction on the inbound message afterwards.
    #[arg(long)]
    pub clear_ack: bool,
    /// Print Prometheus metrics after the replay.
    #[arg(long)]
    pub print_metrics: bool,
}

pub async fn handle_replay(args: ReplayArgs, config: CourierConfig) -> Result<()> {
    let metrics = init_metrics(MetricsRecorderConfig {
        enabled: config.metrics.enabled || args.print_metrics,
        global_labels: config.metrics.labels.clone().into_iter().collect(),
    })?;

    let raw = config
        .telegram
        .get(&args.account)
        .cloned()
        .with_context(|| format!("no [telegram.{}] account in config", args.account))?;
    let account_config = TelegramAccountConfig::from_value(raw)?;
    let account = TelegramAccount::new(&args.account, account_config)?;

    let script = ReplayScript::load(&args.script)?;
    let provider = Arc::new(ScriptedReplyDispatcher::new(script));

    let route = RouteInfo {
        agent_id: account
            .config()
            .agent_id
            .clone()
            .unwrap_or_else(|| RouteInfo::default().agent_id),
        account_id: account.account_id().to_string(),
    };
    let context = DispatchContext::from_conversation(
        ConversationHandle {
            chat_id: args.chat_id,
            kind: args.chat_kind.into(),
            is_forum: args.forum,
            message_id: args.message_id,
            message_thread_id: args.thread_id,
        },
        route,
    )
    .with_side_channels(SideChannels {
        record_voice: args.record_voice,
        ack_reaction_pending: args.clear_ack && args.message_id.is_some(),
        remove_ack_after_reply: args.clear_ack,
    });

    let mut settings = account.settings(&config.dispatch);
    if let Some(mode) = args.mode {
        settings.streaming_mode = mode;
    }
    if let Some(reply_to) = args.reply_to {
        settings.reply_to_mode = reply_to;
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling dispatch");
            on_signal.cancel();
        }
    });

    info!(
        account_id = account.account_id(),
        chat_id = args.chat_id,
        streaming = %settings.streaming_mode,
        "replaying scripted reply"
    );

    let orchestrator = ReplyOrchestrator::new(account.services(provider));
    let outcome = orchestrator
        .dispatch(DispatchRequest {
            context: &context,
            settings,
            options: DispatchOptions {
                cancel: Some(cancel),
                edit_target_message_id: args.edit_message_id,
                ..Default::default()
            },
        })
        .await?;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    if args.print_metrics {
        print!("{}", metrics.render());
    }
    Ok(())
}
