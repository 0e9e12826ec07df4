use thiserror::Error;

use stockpulse_warehouse::WarehouseError;

/// Domain construction errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("ticker cannot be empty")]
    EmptyTicker,
    #[error("ticker length {len} exceeds max {max}")]
    TickerTooLong { len: usize, max: usize },
    #[error("ticker contains invalid character '{ch}' at index {index}")]
    TickerInvalidChar { ch: char, index: usize },
    #[error("ticker '{value}' is reserved")]
    ReservedTicker { value: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be greater than zero")]
    NonPositiveValue { field: &'static str },

    #[error("chart series must hold exactly {expected} points, got {actual}")]
    ChartLength { expected: usize, actual: usize },
    #[error("chart series dates must be strictly increasing")]
    ChartOrder,
}

/// Failures talking to the remote market-data provider.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("no API key configured")]
    MissingApiKey,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("upstream returned status {status}")]
    Status { status: u16 },
    #[error("upstream rate limit reached: {0}")]
    RateLimited(String),
    #[error("malformed upstream payload: {0}")]
    Malformed(String),
    #[error("upstream returned no usable data")]
    Empty,
    #[error("upstream call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("circuit breaker is open")]
    CircuitOpen,
    #[error("upstream does not know '{0}'")]
    NotFound(String),
}

impl RemoteError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingApiKey => "remote.missing_api_key",
            Self::Transport(_) => "remote.transport",
            Self::Status { .. } => "remote.status",
            Self::RateLimited(_) => "remote.rate_limited",
            Self::Malformed(_) => "remote.malformed",
            Self::Empty => "remote.empty",
            Self::Timeout { .. } => "remote.timeout",
            Self::CircuitOpen => "remote.circuit_open",
            Self::NotFound(_) => "remote.not_found",
        }
    }

    /// Whether a caller-side retry could plausibly succeed. The core itself
    /// never retries.
    pub const fn retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_)
                | Self::Status { .. }
                | Self::RateLimited(_)
                | Self::Timeout { .. }
                | Self::CircuitOpen
        )
    }
}

/// Cache store failures. The gateway logs these and treats them as a miss.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),
    #[error("cache task failed: {0}")]
    Join(String),
}

impl From<WarehouseError> for CacheError {
    fn from(error: WarehouseError) -> Self {
        Self::Backend(error.to_string())
    }
}

/// Errors surfaced by the gateway's narrow single-symbol paths.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("symbol '{symbol}' is not in the company directory")]
    UnknownSymbol { symbol: String },
    #[error("simulation produced an empty snapshot")]
    EmptySimulation,
}

/// Reasons a ticker is refused admission. Every variant is a rejection;
/// nothing unverifiable is ever admitted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SymbolRejection {
    #[error("'{symbol}' is not a well-formed ticker")]
    InvalidFormat { symbol: String },
    #[error("'{symbol}' is a reserved placeholder")]
    Reserved { symbol: String },
    #[error("'{symbol}' could not be verified")]
    Unverified { symbol: String },
    #[error("verification of '{symbol}' timed out")]
    TimedOut { symbol: String },
    #[error(transparent)]
    Cache(#[from] CacheError),
}
