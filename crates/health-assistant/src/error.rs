use health_common::error::TransportError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Required user input is missing; the message is shown as-is in the banner.
    #[error("{0}")]
    Validation(String),

    #[error("config error: {0}")]
    Config(String),
}
