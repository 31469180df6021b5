use {
    courier_common::types::{ReplyToMode, StreamingMode},
    courier_config::DispatchConfig,
    serde::{Deserialize, Serialize},
};

/// Per-call dispatch settings, fixed for the lifetime of the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchSettings {
    pub streaming_mode: StreamingMode,
    pub reply_to_mode: ReplyToMode,
    /// Maximum characters per emitted message, already clamped to the
    /// transport maximum.
    pub text_limit: usize,
}

/// Platform/account-level values that win over the global dispatch config.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettingsOverrides {
    pub streaming_mode: Option<StreamingMode>,
    pub reply_to_mode: Option<ReplyToMode>,
    pub text_limit: Option<usize>,
}

impl DispatchSettings {
    /// Layer `overrides` on top of `base` and clamp the text limit to
    /// `platform_max`.
    #[must_use]
    pub fn resolve(
        base: &DispatchConfig,
        overrides: &SettingsOverrides,
        platform_max: usize,
    ) -> Self {
        let requested = overrides.text_limit.unwrap_or(base.text_limit);
        Self {
            streaming_mode: overrides.streaming_mode.unwrap_or(base.streaming_mode),
            reply_to_mode: overrides.reply_to_mode.unwrap_or(base.reply_to_mode),
            text_limit: requested.clamp(1, platform_max.max(1)),
        }
    }
}

#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[test]
    fn overrides_win_over_base() {
        let base = DispatchConfig::default();
        let settings = DispatchSettings::resolve(
            &base,
            &SettingsOverrides {
                streaming_mode: Some(StreamingMode::Edit),
                reply_to_mode: Some(ReplyToMode::Off),
                text_limit: None,
            },
            4096,
        );
        assert_eq!(settings.streaming_mode, StreamingMode::Edit);
        assert_eq!(settings.reply_to_mode, ReplyToMode::Off);
        assert_eq!(settings.text_limit, base.text_limit);
    }

    #[rstest]
    #[case(Some(10_000), 4096)]
    #[case(Some(0), 1)]
    #[case(Some(2000), 2000)]
    #[case(None, 4096)]
    fn text_limit_is_clamped(#[case] requested: Option<usize>, #[case] expected: usize) {
        let settings = DispatchSettings::resolve(
            &DispatchConfig::default(),
            &SettingsOverrides {
                text_limit: requested,
                ..Default::default()
            },
            4096,
        );
        assert_eq!(settings.text_limit, expected);
    }
}
