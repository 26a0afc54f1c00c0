use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::models::{IdentityAssertion, GOOGLE_PROVIDER_ID};
use crate::services::error::ProviderFailure;

/// Capability that produces identity assertions from an external provider.
#[async_trait]
pub trait IdentityProviderClient: Send + Sync {
    /// Provider identifier stamped on issued assertions (e.g. `google.com`).
    fn provider_id(&self) -> &str;

    /// Confirm the provider's services can be reached before prompting.
    async fn check_availability(&self) -> Result<(), ProviderFailure>;

    /// Drive the provider-controlled prompt and return a fresh assertion.
    async fn obtain_assertion(&self) -> Result<IdentityAssertion, ProviderFailure>;
}

/// What the user must do to approve a device sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRequest {
    pub verification_uri: String,
    pub user_code: String,
    pub expires_in: u64,
}

/// Surface through which a provider shows its verification step to the user.
pub trait VerificationPrompt: Send + Sync {
    fn present(&self, request: &VerificationRequest);
}

#[derive(Debug, Clone)]
enum MockBehavior {
    Issue(String),
    Sequence(String),
    Unavailable(String),
    Cancel,
    Fail(String),
}

/// Scripted provider for tests and local development.
pub struct MockIdentityProvider {
    behavior: MockBehavior,
    availability_checks: AtomicUsize,
    assertions_requested: AtomicUsize,
}

impl MockIdentityProvider {
    fn with_behavior(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            availability_checks: AtomicUsize::new(0),
            assertions_requested: AtomicUsize::new(0),
        }
    }

    /// Always issues `token`.
    pub fn issuing(token: impl Into<String>) -> Self {
        Self::with_behavior(MockBehavior::Issue(token.into()))
    }

    /// Issues `{prefix}-1`, `{prefix}-2`, ... one per request.
    pub fn issuing_sequence(prefix: impl Into<String>) -> Self {
        Self::with_behavior(MockBehavior::Sequence(prefix.into()))
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::with_behavior(MockBehavior::Unavailable(reason.into()))
    }

    pub fn cancelling() -> Self {
        Self::with_behavior(MockBehavior::Cancel)
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        Self::with_behavior(MockBehavior::Fail(reason.into()))
    }

    pub fn availability_checks(&self) -> usize {
        self.availability_checks.load(Ordering::SeqCst)
    }

    pub fn assertions_requested(&self) -> usize {
        self.assertions_requested.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProviderClient for MockIdentityProvider {
    fn provider_id(&self) -> &str {
        GOOGLE_PROVIDER_ID
    }

    async fn check_availability(&self) -> Result<(), ProviderFailure> {
        self.availability_checks.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            MockBehavior::Unavailable(reason) => Err(ProviderFailure::Unavailable(reason.clone())),
            _ => Ok(()),
        }
    }

    async fn obtain_assertion(&self) -> Result<IdentityAssertion, ProviderFailure> {
        let n = self.assertions_requested.fetch_add(1, Ordering::SeqCst) + 1;
        match &self.behavior {
            MockBehavior::Issue(token) => Ok(IdentityAssertion::new(token.clone(), GOOGLE_PROVIDER_ID)),
            MockBehavior::Sequence(prefix) => Ok(IdentityAssertion::new(
                format!("{}-{}", prefix, n),
                GOOGLE_PROVIDER_ID,
            )),
            MockBehavior::Unavailable(reason) => Err(ProviderFailure::Unavailable(reason.clone())),
            MockBehavior::Cancel => Err(ProviderFailure::Cancelled),
            MockBehavior::Fail(reason) => Err(ProviderFailure::Failed(reason.clone())),
        }
    }
}
