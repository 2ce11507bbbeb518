use thiserror::Error;

/// provider-rank error types
#[derive(Error, Debug)]
pub enum RankError {
    /// Upstream answered with a non-2xx status
    #[error("fetch error: {url} returned HTTP {status}")]
    Fetch { status: u16, url: String },

    /// Request never produced a status (connect failure, unreadable body)
    #[error("fetch error: request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    /// Record is malformed or missing a required field
    #[error("schema error: {record} has missing or invalid field `{field}`")]
    Schema { record: String, field: String },

    /// Cache read/write failed
    #[error("store error: {0}")]
    Store(String),

    /// No ranking has been written for this category yet
    #[error("ranking for category `{0}` is not available")]
    DataUnavailable(String),

    /// Ranking exists but cannot be decoded
    #[error("ranking for category `{category}` is corrupted: {reason}")]
    Corruption { category: String, reason: String },

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),
}

impl RankError {
    pub fn schema(record: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Schema {
            record: record.into(),
            field: field.into(),
        }
    }

    /// True for both flavours of upstream failure
    pub fn is_fetch(&self) -> bool {
        matches!(self, Self::Fetch { .. } | Self::Transport { .. })
    }

    /// HTTP status a routing layer should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Fetch { status, .. } => *status,
            Self::Transport { .. } | Self::Schema { .. } => 502,
            Self::Store(_) => 503,
            Self::DataUnavailable(_) => 404,
            Self::Corruption { .. } | Self::Config(_) => 500,
        }
    }
}

/// Result type alias for provider-rank
pub type Result<T> = std::result::Result<T, RankError>;
