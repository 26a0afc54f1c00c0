pub mod assertion;
pub mod attempt;
pub mod principal;

pub use assertion::{IdentityAssertion, GOOGLE_PROVIDER_ID};
pub use attempt::{SignInAttempt, SignInState};
pub use principal::{CredentialRef, SessionPrincipal, SessionTokens};
