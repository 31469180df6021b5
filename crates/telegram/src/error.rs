use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Telegram(#[from] teloxide::RequestError),

    #[error(transparent)]
    Channel(#[from] courier_channels::Error),

    #[error("{message}")]
    Message { message: String },

    #[error("{context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// The message being edited no longer exists.
    #[must_use]
    pub fn is_message_missing(&self) -> bool {
        matches!(
            self,
            Self::Telegram(teloxide::RequestError::Api(
                teloxide::ApiError::MessageToEditNotFound
            ))
        )
    }
}

impl From<Error> for courier_channels::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Channel(inner) => inner,
            other => Self::external("telegram", other),
        }
    }
}

impl courier_common::FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

courier_common::impl_context!();
