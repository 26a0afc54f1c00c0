//! Federated sign-in: obtain an identity assertion from an external provider
//! and exchange it for a backend session.

pub mod config;
pub mod models;
pub mod services;

use std::sync::Arc;

use crate::config::Settings;
use crate::services::{
    GoogleDeviceProvider, IdentityToolkitExchanger, SignInFlow, VerificationPrompt,
};

/// Wire the Google device provider and the Identity Toolkit exchanger from
/// startup settings.
pub fn build_sign_in_flow(settings: &Settings, prompt: Arc<dyn VerificationPrompt>) -> SignInFlow {
    let provider = GoogleDeviceProvider::new(&settings.google, prompt);
    let exchanger = IdentityToolkitExchanger::new(&settings.identity_toolkit);

    SignInFlow::new(Arc::new(provider), Arc::new(exchanger))
}
