/// Convenience result type used across the filter pipeline.
pub type FxResult<T> = Result<T, FxError>;

/// Top-level error taxonomy for pool and pipeline APIs.
#[derive(thiserror::Error, Debug)]
pub enum FxError {
    /// Caller broke a usage contract (empty chain, double release, unbalanced push/pop).
    #[error("contract violation: {0}")]
    Contract(String),

    /// A GPU surface could not be created or sized.
    #[error("resource error: {0}")]
    Resource(String),

    /// Invalid options or filter parameters.
    #[error("validation error: {0}")]
    Validation(String),

    /// Errors when serializing or deserializing options.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FxError {
    /// Build a [`FxError::Contract`] value.
    pub fn contract(msg: impl Into<String>) -> Self {
        Self::Contract(msg.into())
    }

    /// Build a [`FxError::Resource`] value.
    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource(msg.into())
    }

    /// Build a [`FxError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`FxError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Return `true` for programmer errors that must never be swallowed.
    pub fn is_contract(&self) -> bool {
        matches!(self, Self::Contract(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
