//! Lifecycle of a single sign-in attempt.

use uuid::Uuid;

/// Sign-in attempt state.
///
/// `Idle -> AwaitingAssertion -> (Authenticated | Failed)`. Both outcomes are
/// terminal; a retry is a new attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignInState {
    Idle,
    AwaitingAssertion,
    Authenticated,
    Failed,
}

impl SignInState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignInState::Idle => "idle",
            SignInState::AwaitingAssertion => "awaiting_assertion",
            SignInState::Authenticated => "authenticated",
            SignInState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SignInState::Authenticated | SignInState::Failed)
    }

    pub fn can_transition_to(&self, next: SignInState) -> bool {
        matches!(
            (self, next),
            (SignInState::Idle, SignInState::AwaitingAssertion)
                | (SignInState::AwaitingAssertion, SignInState::Authenticated)
                | (SignInState::AwaitingAssertion, SignInState::Failed)
        )
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Invalid sign-in transition from {from} to {to}")]
pub struct InvalidTransition {
    pub from: &'static str,
    pub to: &'static str,
}

/// One sign-in attempt. Owned by a single `sign_in` call and never shared.
#[derive(Debug)]
pub struct SignInAttempt {
    id: Uuid,
    state: SignInState,
}

impl SignInAttempt {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: SignInState::Idle,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SignInState {
        self.state
    }

    pub fn transition(&mut self, next: SignInState) -> Result<(), InvalidTransition> {
        if !self.state.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.state.as_str(),
                to: next.as_str(),
            });
        }

        tracing::debug!(
            attempt_id = %self.id,
            from = self.state.as_str(),
            to = next.as_str(),
            "Sign-in state transition"
        );
        self.state = next;
        Ok(())
    }
}

impl Default for SignInAttempt {
    fn default() -> Self {
        Self::new()
    }
}
