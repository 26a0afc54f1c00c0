use service_core::error::AppError;
use thiserror::Error;

/// Failures reported by an identity provider client.
#[derive(Error, Debug)]
pub enum ProviderFailure {
    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),

    #[error("Sign-in cancelled by user")]
    Cancelled,

    #[error("Identity provider error: {0}")]
    Failed(String),
}

/// Failures reported by a credential exchanger.
#[derive(Error, Debug)]
pub enum ExchangeFailure {
    #[error("Invalid assertion: {0}")]
    InvalidAssertion(String),

    #[error("Backend unreachable: {0}")]
    Unreachable(String),

    /// `raw` is the backend's response body, kept verbatim for diagnostics.
    #[error("Exchange rejected by backend: {code}")]
    Rejected { code: String, raw: String },
}

/// Result of a failed sign-in, one variant per failure kind.
#[derive(Error, Debug)]
pub enum SignInError {
    #[error("Identity provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Sign-in cancelled by user")]
    UserCancelled,

    #[error("Identity provider error: {0}")]
    ProviderError(String),

    #[error("Invalid assertion: {0}")]
    InvalidAssertion(String),

    #[error("Backend unreachable: {0}")]
    BackendUnreachable(String),

    #[error("Exchange rejected by backend: {code}")]
    ExchangeRejected { code: String, raw: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignInErrorKind {
    ProviderUnavailable,
    UserCancelled,
    ProviderError,
    InvalidAssertion,
    BackendUnreachable,
    ExchangeRejected,
}

impl SignInErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignInErrorKind::ProviderUnavailable => "provider_unavailable",
            SignInErrorKind::UserCancelled => "user_cancelled",
            SignInErrorKind::ProviderError => "provider_error",
            SignInErrorKind::InvalidAssertion => "invalid_assertion",
            SignInErrorKind::BackendUnreachable => "backend_unreachable",
            SignInErrorKind::ExchangeRejected => "exchange_rejected",
        }
    }
}

impl SignInError {
    pub fn kind(&self) -> SignInErrorKind {
        match self {
            SignInError::ProviderUnavailable(_) => SignInErrorKind::ProviderUnavailable,
            SignInError::UserCancelled => SignInErrorKind::UserCancelled,
            SignInError::ProviderError(_) => SignInErrorKind::ProviderError,
            SignInError::InvalidAssertion(_) => SignInErrorKind::InvalidAssertion,
            SignInError::BackendUnreachable(_) => SignInErrorKind::BackendUnreachable,
            SignInError::ExchangeRejected { .. } => SignInErrorKind::ExchangeRejected,
        }
    }
}

impl From<ProviderFailure> for SignInError {
    fn from(err: ProviderFailure) -> Self {
        match err {
            ProviderFailure::Unavailable(e) => SignInError::ProviderUnavailable(e),
            ProviderFailure::Cancelled => SignInError::UserCancelled,
            ProviderFailure::Failed(e) => SignInError::ProviderError(e),
        }
    }
}

impl From<ExchangeFailure> for SignInError {
    fn from(err: ExchangeFailure) -> Self {
        match err {
            ExchangeFailure::InvalidAssertion(e) => SignInError::InvalidAssertion(e),
            ExchangeFailure::Unreachable(e) => SignInError::BackendUnreachable(e),
            ExchangeFailure::Rejected { code, raw } => SignInError::ExchangeRejected { code, raw },
        }
    }
}

impl From<SignInError> for AppError {
    fn from(err: SignInError) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_failures_keep_their_kind() {
        assert_eq!(
            SignInError::from(ProviderFailure::Cancelled).kind(),
            SignInErrorKind::UserCancelled
        );
        assert_eq!(
            SignInError::from(ProviderFailure::Unavailable("offline".into())).kind(),
            SignInErrorKind::ProviderUnavailable
        );
        assert_eq!(
            SignInError::from(ProviderFailure::Failed("boom".into())).kind(),
            SignInErrorKind::ProviderError
        );
    }

    #[test]
    fn test_rejection_keeps_raw_backend_body() {
        let err = SignInError::from(ExchangeFailure::Rejected {
            code: "USER_DISABLED".into(),
            raw: r#"{"error":{"message":"USER_DISABLED"}}"#.into(),
        });

        match err {
            SignInError::ExchangeRejected { code, raw } => {
                assert_eq!(code, "USER_DISABLED");
                assert!(raw.contains("USER_DISABLED"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_kind_labels_are_distinct() {
        let kinds = [
            SignInErrorKind::ProviderUnavailable,
            SignInErrorKind::UserCancelled,
            SignInErrorKind::ProviderError,
            SignInErrorKind::InvalidAssertion,
            SignInErrorKind::BackendUnreachable,
            SignInErrorKind::ExchangeRejected,
        ];
        let labels: std::collections::HashSet<_> = kinds.iter().map(|k| k.as_str()).collect();
        assert_eq!(labels.len(), kinds.len());
    }
}
