use thiserror::Error;

/// Errors that can occur while resolving or searching recipes
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The requested recipe does not exist in its owning source
    #[error("Recipe not found: {0}")]
    NotFound(String),

    /// The catalog API's paid quota is exhausted (HTTP 402)
    #[error("Catalog quota exceeded")]
    QuotaExceeded,

    /// A remote source answered with an unexpected status or bad payload
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// The persistent store could not be reached; retryable
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// The completion endpoint returned output this subsystem cannot parse
    #[error("Generated output invalid: {0}")]
    GenerationInvalid(String),

    /// Admission rejected a candidate whose title already exists in the pool
    #[error("A generated recipe titled \"{0}\" already exists")]
    DuplicateTitle(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(#[from] config::ConfigError),
}

impl ResolveError {
    /// Whether a bounded retry at the call site is worthwhile. Quota
    /// exhaustion must never be retried within the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ResolveError::StoreUnavailable(_) | ResolveError::SourceUnavailable(_)
        )
    }
}

/// Failure surfaced by a [`crate::store::RecipeStore`] implementation.
/// Distinct from not-found, which stores report as `Ok(None)`.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing store could not be reached or the statement failed
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A persisted row could not be decoded back into a recipe
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

impl From<StoreError> for ResolveError {
    fn from(err: StoreError) -> Self {
        ResolveError::StoreUnavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_is_not_retryable() {
        assert!(!ResolveError::QuotaExceeded.is_retryable());
        assert!(!ResolveError::NotFound("x".to_string()).is_retryable());
        assert!(!ResolveError::DuplicateTitle("Soup".to_string()).is_retryable());
    }

    #[test]
    fn test_outages_are_retryable() {
        assert!(ResolveError::StoreUnavailable("down".to_string()).is_retryable());
        assert!(ResolveError::SourceUnavailable("503".to_string()).is_retryable());
    }

    #[test]
    fn test_store_error_converts_to_retryable_kind() {
        let err: ResolveError = StoreError::Unavailable("locked".to_string()).into();
        assert!(err.is_retryable());
    }
}
