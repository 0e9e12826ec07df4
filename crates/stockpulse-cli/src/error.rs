use thiserror::Error;

use stockpulse_core::{CacheError, GatewayError, SymbolRejection};

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("invalid argument: {0}")]
    Usage(String),

    #[error(transparent)]
    Rejected(#[from] SymbolRejection),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Usage(_) => 2,
            Self::Rejected(SymbolRejection::Cache(_)) => 4,
            Self::Rejected(_) => 3,
            Self::Gateway(GatewayError::Validation(_)) => 2,
            Self::Gateway(_) | Self::Cache(_) => 4,
            Self::Serialization(_) | Self::Io(_) => 10,
        }
    }
}
