//! Services layer for signin-service.
//!
//! Capability traits for the identity provider and the backend exchange,
//! their Google and Identity Toolkit implementations, and the orchestration
//! that ties them together.

mod credential_exchanger;
pub mod error;
mod google_device;
mod identity_provider;
mod identity_toolkit;
pub mod metrics;
mod sign_in;

pub use credential_exchanger::{CredentialExchanger, MockCredentialExchanger};
pub use error::{ExchangeFailure, ProviderFailure, SignInError, SignInErrorKind};
pub use google_device::GoogleDeviceProvider;
pub use identity_provider::{
    IdentityProviderClient, MockIdentityProvider, VerificationPrompt, VerificationRequest,
};
pub use identity_toolkit::IdentityToolkitExchanger;
pub use sign_in::SignInFlow;
