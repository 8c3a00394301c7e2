use fedgate_connector::FactoryError;
use fedgate_types::{ConfigError, DynError};

/// Errors surfaced to the transport layer.
///
/// Every variant is transparent: callers see the message and source chain of the original
/// failure.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    #[error(transparent)]
    Factory(#[from] FactoryError),

    #[error(transparent)]
    Connector(#[from] DynError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
