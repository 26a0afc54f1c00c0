use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

use crate::models::{SessionPrincipal, SignInAttempt, SignInState};
use crate::services::credential_exchanger::CredentialExchanger;
use crate::services::error::SignInError;
use crate::services::identity_provider::IdentityProviderClient;
use crate::services::metrics;

/// Sign-in orchestration: obtain an assertion, exchange it, report the result.
///
/// Every call to [`SignInFlow::sign_in`] is an independent attempt. Nothing is
/// cached between calls and concurrent calls share no mutable state, so two
/// successful calls yield two distinct sessions.
#[derive(Clone)]
pub struct SignInFlow {
    provider: Arc<dyn IdentityProviderClient>,
    exchanger: Arc<dyn CredentialExchanger>,
}

impl SignInFlow {
    pub fn new(
        provider: Arc<dyn IdentityProviderClient>,
        exchanger: Arc<dyn CredentialExchanger>,
    ) -> Self {
        Self {
            provider,
            exchanger,
        }
    }

    pub async fn sign_in(&self) -> Result<SessionPrincipal, SignInError> {
        let mut attempt = SignInAttempt::new();
        let span = tracing::info_span!(
            "sign_in",
            attempt_id = %attempt.id(),
            provider_id = %self.provider.provider_id()
        );

        let started = Instant::now();
        let result = self.run(&mut attempt).instrument(span).await;

        let outcome = match &result {
            Ok(_) => metrics::OUTCOME_AUTHENTICATED,
            Err(e) => e.kind().as_str(),
        };
        metrics::record_attempt(outcome, started.elapsed());

        result
    }

    async fn run(&self, attempt: &mut SignInAttempt) -> Result<SessionPrincipal, SignInError> {
        advance(attempt, SignInState::AwaitingAssertion);

        match self.authenticate().await {
            Ok(principal) => {
                advance(attempt, SignInState::Authenticated);
                tracing::info!(
                    principal_id = %principal.id,
                    is_new_user = principal.is_new_user,
                    "Sign-in succeeded"
                );
                Ok(principal)
            }
            Err(err) => {
                advance(attempt, SignInState::Failed);
                log_failure(&err);
                Err(err)
            }
        }
    }

    async fn authenticate(&self) -> Result<SessionPrincipal, SignInError> {
        self.provider.check_availability().await?;

        let assertion = self.provider.obtain_assertion().await?;
        if assertion.is_empty() {
            return Err(SignInError::InvalidAssertion(
                "provider returned an empty assertion".to_string(),
            ));
        }

        // The assertion moves into the exchanger and cannot be reused.
        Ok(self.exchanger.exchange(assertion).await?)
    }
}

fn advance(attempt: &mut SignInAttempt, next: SignInState) {
    if let Err(e) = attempt.transition(next) {
        tracing::error!(error = %e, "Sign-in state machine violated");
    }
}

fn log_failure(err: &SignInError) {
    let kind = err.kind().as_str();
    match err {
        SignInError::UserCancelled => {
            tracing::info!(kind, "Sign-in cancelled by user");
        }
        SignInError::ProviderUnavailable(detail) | SignInError::BackendUnreachable(detail) => {
            tracing::warn!(kind, detail = %detail, "Sign-in failed");
        }
        SignInError::ExchangeRejected { code, raw } => {
            tracing::error!(kind, code = %code, raw = %raw, "Sign-in rejected by backend");
        }
        SignInError::ProviderError(detail) | SignInError::InvalidAssertion(detail) => {
            tracing::error!(kind, detail = %detail, "Sign-in failed");
        }
    }
}
