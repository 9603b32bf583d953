use thiserror::Error;

/// Opaque error produced by a [`crate::Transport`] implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum Error {
    /// The payload for `topic` could not be encoded as JSON.
    #[error("failed to serialize payload for {topic}")]
    Serialization {
        topic: String,
        #[source]
        source: serde_json::Error,
    },

    /// The transport refused or failed the publish. `source` is the
    /// transport's own error, untouched.
    #[error("failed to publish to {topic}")]
    Transport {
        topic: String,
        #[source]
        source: BoxError,
    },
}

impl Error {
    /// Topic the failed publish was aimed at.
    pub fn topic(&self) -> &str {
        match self {
            Error::Serialization { topic, .. } | Error::Transport { topic, .. } => topic,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
