//! エラー型定義
//!
//! 統一エラー型（thiserror使用）

use thiserror::Error;

/// Common layer error type
#[derive(Debug, Error)]
pub enum CommonError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Daemon error type
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Common layer error
    #[error(transparent)]
    Common(#[from] CommonError),

    /// Container engine unreachable
    #[error("Container engine unavailable: {0}")]
    RuntimeUnavailable(String),

    /// Service image has not been downloaded yet
    #[error("Image for service '{0}' is not downloaded")]
    ImageNotDownloaded(String),

    /// All launch attempts exhausted without a port
    #[error("Failed to start service '{service}' after {attempts} attempts")]
    LaunchExhausted {
        /// 対象サービスID
        service: String,
        /// 試行回数
        attempts: usize,
    },

    /// Catalog loading error
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Host metrics collection error
    #[error("Failed to collect metrics: {0}")]
    Metrics(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias (Common)
pub type CommonResult<T> = Result<T, CommonError>;

/// Result type alias (Daemon)
pub type DaemonResult<T> = Result<T, DaemonError>;
