use secrecy::{ExposeSecret, Secret};
use std::fmt;

/// Provider identifier the backend expects for Google-issued ID tokens.
pub const GOOGLE_PROVIDER_ID: &str = "google.com";

/// A short-lived identity token issued by an external identity provider.
///
/// Deliberately not `Clone`: exchanging an assertion consumes it, so an
/// assertion can back at most one exchange.
pub struct IdentityAssertion {
    token: Secret<String>,
    provider_id: String,
}

impl IdentityAssertion {
    pub fn new(token: impl Into<String>, provider_id: impl Into<String>) -> Self {
        Self {
            token: Secret::new(token.into()),
            provider_id: provider_id.into(),
        }
    }

    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    pub fn is_empty(&self) -> bool {
        self.token.expose_secret().trim().is_empty()
    }

    /// Consume the assertion, yielding the raw token for the credential.
    pub fn into_token(self) -> Secret<String> {
        self.token
    }
}

impl fmt::Debug for IdentityAssertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityAssertion")
            .field("token", &"[REDACTED]")
            .field("provider_id", &self.provider_id)
            .finish()
    }
}
