use thiserror::Error;

/// Fatal dispatch failures.
///
/// Streaming-channel and side-channel problems never show up here: they
/// degrade the call instead of failing it.
#[derive(Debug, Error)]
pub enum Error {
    /// The reply provider failed. The provider's error is kept as-is.
    #[error(transparent)]
    Provider(courier_channels::Error),

    /// No streaming channel delivered the final reply and the delivery
    /// service failed too, so the user got nothing.
    #[error("final reply delivery failed: {source}")]
    Delivery {
        #[source]
        source: courier_channels::Error,
    },

    /// The caller cancelled the dispatch.
    #[error("dispatch cancelled")]
    Cancelled,
}

impl Error {
    #[must_use]
    pub fn is_provider(&self) -> bool {
        matches!(self, Self::Provider(_))
    }

    #[must_use]
    pub fn is_delivery(&self) -> bool {
        matches!(self, Self::Delivery { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
