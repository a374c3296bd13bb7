//! Error types for the casino engine
//!
//! Game rule violations are reported as `GameError`; failures at the I/O and
//! configuration boundaries have their own enums and fold into `CasinoError`.

/// Root error type for all casino operations
#[derive(Debug, thiserror::Error)]
pub enum CasinoError {
    /// Game rule violations (stake, funds, transitions)
    #[error("Game error: {0}")]
    Game(#[from] GameError),

    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Persistence errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Promo code redemption errors
    #[error("Promo error: {0}")]
    Promo(#[from] PromoError),
}

/// Recoverable game errors. None of these mutate a balance or a session.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GameError {
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: f64, available: f64 },

    #[error("Invalid stake {stake}: minimum is {minimum}")]
    InvalidStake { stake: f64, minimum: f64 },

    #[error("Cannot {action} while session is {state}")]
    InvalidTransition {
        state: &'static str,
        action: &'static str,
    },

    #[error("Cell {index} is outside the {size}-cell grid")]
    InvalidCell { index: usize, size: usize },

    #[error("Unknown case: {0}")]
    UnknownCase(String),

    #[error("Unknown session: {0}")]
    UnknownSession(String),
}

/// Configuration and validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),
}

/// Key-value persistence errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Corrupted data: {0}")]
    CorruptedData(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),
}

/// Promo redemption errors, mirroring the remote redemption endpoint
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PromoError {
    #[error("Promo code is empty")]
    EmptyCode,

    #[error("Promo code not found: {0}")]
    NotFound(String),

    #[error("Promo code is inactive: {0}")]
    Inactive(String),

    #[error("Promo code exhausted: {0}")]
    Exhausted(String),

    #[error("Promo code {code} already used by {user_id}")]
    AlreadyUsed { code: String, user_id: String },
}

// External error conversions
impl From<std::io::Error> for CasinoError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::PermissionDenied => {
                CasinoError::Storage(StorageError::PermissionDenied(e.to_string()))
            }
            _ => CasinoError::Storage(StorageError::ReadFailed(e.to_string())),
        }
    }
}

impl From<serde_json::Error> for CasinoError {
    fn from(e: serde_json::Error) -> Self {
        CasinoError::Storage(StorageError::CorruptedData(e.to_string()))
    }
}

impl From<toml::de::Error> for CasinoError {
    fn from(e: toml::de::Error) -> Self {
        CasinoError::Configuration(ConfigurationError::LoadFailed(e.to_string()))
    }
}

// Convenience type alias for Results
pub type CasinoResult<T> = Result<T, CasinoError>;
