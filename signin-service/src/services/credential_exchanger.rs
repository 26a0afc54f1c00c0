use async_trait::async_trait;
use secrecy::ExposeSecret;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::models::{CredentialRef, IdentityAssertion, SessionPrincipal};
use crate::services::error::ExchangeFailure;

/// Trades an identity assertion for a backend session.
///
/// Implementations make exactly one backend attempt per call.
#[async_trait]
pub trait CredentialExchanger: Send + Sync {
    async fn exchange(&self, assertion: IdentityAssertion)
        -> Result<SessionPrincipal, ExchangeFailure>;
}

#[derive(Debug, Clone)]
enum MockOutcome {
    Accept,
    InvalidAssertion(String),
    Unreachable(String),
    Reject { code: String, raw: String },
}

/// Scripted exchanger for tests and local development.
///
/// Accepted tokens map to principal ids registered with
/// [`MockCredentialExchanger::with_principal`], falling back to
/// `user-for-{token}`.
pub struct MockCredentialExchanger {
    outcome: MockOutcome,
    principals: HashMap<String, String>,
    latency: Option<Duration>,
    exchanged: Mutex<Vec<String>>,
}

impl MockCredentialExchanger {
    fn with_outcome(outcome: MockOutcome) -> Self {
        Self {
            outcome,
            principals: HashMap::new(),
            latency: None,
            exchanged: Mutex::new(Vec::new()),
        }
    }

    pub fn accepting() -> Self {
        Self::with_outcome(MockOutcome::Accept)
    }

    pub fn invalid_assertion(reason: impl Into<String>) -> Self {
        Self::with_outcome(MockOutcome::InvalidAssertion(reason.into()))
    }

    pub fn unreachable(reason: impl Into<String>) -> Self {
        Self::with_outcome(MockOutcome::Unreachable(reason.into()))
    }

    pub fn rejecting(code: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::with_outcome(MockOutcome::Reject {
            code: code.into(),
            raw: raw.into(),
        })
    }

    pub fn with_principal(mut self, token: impl Into<String>, principal_id: impl Into<String>) -> Self {
        self.principals.insert(token.into(), principal_id.into());
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Tokens received so far, in call order.
    pub fn exchanged_tokens(&self) -> Vec<String> {
        self.exchanged
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn calls(&self) -> usize {
        self.exchanged_tokens().len()
    }
}

#[async_trait]
impl CredentialExchanger for MockCredentialExchanger {
    async fn exchange(
        &self,
        assertion: IdentityAssertion,
    ) -> Result<SessionPrincipal, ExchangeFailure> {
        let provider_id = assertion.provider_id().to_string();
        let token = assertion.into_token().expose_secret().clone();
        self.exchanged
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(token.clone());

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        match &self.outcome {
            MockOutcome::Accept => {
                let id = self
                    .principals
                    .get(&token)
                    .cloned()
                    .unwrap_or_else(|| format!("user-for-{}", token));
                Ok(SessionPrincipal::new(
                    id,
                    CredentialRef {
                        provider_id,
                        federated_id: None,
                    },
                ))
            }
            MockOutcome::InvalidAssertion(reason) => {
                Err(ExchangeFailure::InvalidAssertion(reason.clone()))
            }
            MockOutcome::Unreachable(reason) => Err(ExchangeFailure::Unreachable(reason.clone())),
            MockOutcome::Reject { code, raw } => Err(ExchangeFailure::Rejected {
                code: code.clone(),
                raw: raw.clone(),
            }),
        }
    }
}
