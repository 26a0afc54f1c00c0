use signin_service::services::{
    MockCredentialExchanger, MockIdentityProvider, SignInError, SignInErrorKind, SignInFlow,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

fn flow(
    provider: &Arc<MockIdentityProvider>,
    exchanger: &Arc<MockCredentialExchanger>,
) -> SignInFlow {
    SignInFlow::new(provider.clone(), exchanger.clone())
}

#[tokio::test]
async fn test_sign_in_returns_principal_for_accepted_assertion() {
    let provider = Arc::new(MockIdentityProvider::issuing("tok-123"));
    let exchanger = Arc::new(MockCredentialExchanger::accepting().with_principal("tok-123", "user-42"));

    let principal = flow(&provider, &exchanger).sign_in().await.unwrap();

    assert_eq!(principal.id, "user-42");
    assert_eq!(principal.credential.provider_id, "google.com");
    assert_eq!(provider.availability_checks(), 1);
    assert_eq!(exchanger.exchanged_tokens(), vec!["tok-123".to_string()]);
}

#[tokio::test]
async fn test_cancellation_skips_exchange() {
    let provider = Arc::new(MockIdentityProvider::cancelling());
    let exchanger = Arc::new(MockCredentialExchanger::accepting());

    let err = flow(&provider, &exchanger).sign_in().await.unwrap_err();

    assert!(matches!(err, SignInError::UserCancelled));
    assert_eq!(exchanger.calls(), 0);
}

#[tokio::test]
async fn test_unavailable_provider_is_not_prompted() {
    let provider = Arc::new(MockIdentityProvider::unavailable("play services missing"));
    let exchanger = Arc::new(MockCredentialExchanger::accepting());

    let err = flow(&provider, &exchanger).sign_in().await.unwrap_err();

    assert_eq!(err.kind(), SignInErrorKind::ProviderUnavailable);
    assert_eq!(provider.assertions_requested(), 0);
    assert_eq!(exchanger.calls(), 0);
}

#[tokio::test]
async fn test_provider_error_is_surfaced() {
    let provider = Arc::new(MockIdentityProvider::failing("network down"));
    let exchanger = Arc::new(MockCredentialExchanger::accepting());

    let err = flow(&provider, &exchanger).sign_in().await.unwrap_err();

    match err {
        SignInError::ProviderError(detail) => assert_eq!(detail, "network down"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(exchanger.calls(), 0);
}

#[tokio::test]
async fn test_empty_assertion_never_reaches_backend() {
    let provider = Arc::new(MockIdentityProvider::issuing(""));
    let exchanger = Arc::new(MockCredentialExchanger::accepting());

    let err = flow(&provider, &exchanger).sign_in().await.unwrap_err();

    assert_eq!(err.kind(), SignInErrorKind::InvalidAssertion);
    assert_eq!(exchanger.calls(), 0);
}

#[tokio::test]
async fn test_backend_rejection_preserves_raw_error() {
    let raw = r#"{"error":{"code":400,"message":"USER_DISABLED"}}"#;
    let provider = Arc::new(MockIdentityProvider::issuing("tok-123"));
    let exchanger = Arc::new(MockCredentialExchanger::rejecting("USER_DISABLED", raw));

    let err = flow(&provider, &exchanger).sign_in().await.unwrap_err();

    match err {
        SignInError::ExchangeRejected { code, raw: preserved } => {
            assert_eq!(code, "USER_DISABLED");
            assert_eq!(preserved, raw);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_exchange_failure_kinds_stay_distinct() {
    let provider = Arc::new(MockIdentityProvider::issuing("tok-123"));

    let invalid = Arc::new(MockCredentialExchanger::invalid_assertion("expired"));
    let err = flow(&provider, &invalid).sign_in().await.unwrap_err();
    assert_eq!(err.kind(), SignInErrorKind::InvalidAssertion);

    let unreachable = Arc::new(MockCredentialExchanger::unreachable("connection refused"));
    let err = flow(&provider, &unreachable).sign_in().await.unwrap_err();
    assert_eq!(err.kind(), SignInErrorKind::BackendUnreachable);
}

#[tokio::test]
async fn test_exchange_is_attempted_once_per_call() {
    let provider = Arc::new(MockIdentityProvider::issuing("tok-123"));
    let exchanger = Arc::new(MockCredentialExchanger::unreachable("timeout"));

    let _ = flow(&provider, &exchanger).sign_in().await;

    assert_eq!(exchanger.calls(), 1);
}

#[tokio::test]
async fn test_sequential_sign_ins_are_independent() {
    let provider = Arc::new(MockIdentityProvider::issuing_sequence("tok"));
    let exchanger = Arc::new(MockCredentialExchanger::accepting());
    let flow = flow(&provider, &exchanger);

    let first = flow.sign_in().await.unwrap();
    let second = flow.sign_in().await.unwrap();

    assert_ne!(first.id, second.id);
    assert_eq!(provider.assertions_requested(), 2);
    // Each assertion was exchanged exactly once.
    assert_eq!(
        exchanger.exchanged_tokens(),
        vec!["tok-1".to_string(), "tok-2".to_string()]
    );
}

#[tokio::test]
async fn test_concurrent_sign_ins_do_not_share_results() {
    let provider = Arc::new(MockIdentityProvider::issuing_sequence("tok"));
    let exchanger =
        Arc::new(MockCredentialExchanger::accepting().with_latency(Duration::from_millis(20)));
    let flow = flow(&provider, &exchanger);

    let (a, b) = tokio::join!(flow.sign_in(), flow.sign_in());
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_ne!(a.id, b.id);
    let ids: HashSet<_> = [a.id.clone(), b.id.clone()].into_iter().collect();
    let expected: HashSet<_> = ["user-for-tok-1".to_string(), "user-for-tok-2".to_string()]
        .into_iter()
        .collect();
    assert_eq!(ids, expected);
    assert_eq!(exchanger.calls(), 2);
}

#[tokio::test]
async fn test_spawned_sign_ins_complete_independently() {
    let provider = Arc::new(MockIdentityProvider::issuing_sequence("tok"));
    let exchanger = Arc::new(MockCredentialExchanger::accepting());
    let flow = flow(&provider, &exchanger);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let flow = flow.clone();
            tokio::spawn(async move { flow.sign_in().await })
        })
        .collect();

    let mut ids = HashSet::new();
    for handle in handles {
        ids.insert(handle.await.unwrap().unwrap().id);
    }

    assert_eq!(ids.len(), 4);
}
