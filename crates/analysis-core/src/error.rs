use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Config error: {0}")]
    ConfigError(String),
}

impl AnalysisError {
    /// Provider-side failures that should not stop a cycle.
    pub fn is_provider_error(&self) -> bool {
        matches!(
            self,
            AnalysisError::ApiError(_)
                | AnalysisError::QuotaExceeded(_)
                | AnalysisError::InsufficientData(_)
                | AnalysisError::InvalidData(_)
        )
    }
}
