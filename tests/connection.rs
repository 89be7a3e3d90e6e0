use std::time::Duration;

use sentibench::connection::{ConnectionManager, RetryPolicy};
use sentibench::core::{BackendError, BenchError, RunContext};
use sentibench::testutil::{MemoryBackend, RecordingSleeper};

fn policy() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_secs(1), 2.0)
}

#[tokio::test]
async fn test_connects_first_time_without_waiting() {
    let ctx = RunContext::with_id("conn-test");
    let sleeper = RecordingSleeper::new();
    let manager = ConnectionManager::new(policy(), sleeper.clone(), &ctx);
    let backend = MemoryBackend::document();

    manager.acquire(&backend).await.unwrap();

    assert_eq!(backend.connect_calls(), 1);
    assert!(sleeper.sleeps().is_empty());
}

#[tokio::test]
async fn test_recovers_after_transient_failures() {
    let ctx = RunContext::with_id("conn-test");
    let sleeper = RecordingSleeper::new();
    let manager = ConnectionManager::new(policy(), sleeper.clone(), &ctx);
    let backend = MemoryBackend::relational().failing_connects([
        BackendError::Timeout("server selection".into()),
        BackendError::Network("refused".into()),
    ]);

    manager.acquire(&backend).await.unwrap();

    assert_eq!(backend.connect_calls(), 3);
    assert_eq!(
        sleeper.sleeps(),
        vec![Duration::from_secs(1), Duration::from_secs(2)]
    );
}

/// Exhausting the attempts returns the last driver error, not a generic one.
#[tokio::test]
async fn test_gives_up_with_last_cause() {
    let ctx = RunContext::with_id("conn-test");
    let sleeper = RecordingSleeper::new();
    let manager = ConnectionManager::new(policy(), sleeper.clone(), &ctx);
    let backend = MemoryBackend::document().failing_connects([
        BackendError::Timeout("first".into()),
        BackendError::Timeout("second".into()),
        BackendError::Auth("password authentication failed".into()),
        BackendError::Auth("never reached".into()),
    ]);

    let err = manager.acquire(&backend).await.err().unwrap();

    assert_eq!(
        err,
        BenchError::Connection {
            target: "memory://mongodb".into(),
            attempts: 3,
            cause: BackendError::Auth("password authentication failed".into()),
        }
    );
    assert_eq!(backend.connect_calls(), 3);
    let sleeps = sleeper.sleeps();
    assert_eq!(sleeps, policy().schedule());
    assert!(sleeps.windows(2).all(|w| w[0] <= w[1]));
}

/// Independent acquisitions do not share retry state.
#[tokio::test]
async fn test_no_state_between_acquisitions() {
    let ctx = RunContext::with_id("conn-test");
    let sleeper = RecordingSleeper::new();
    let manager = ConnectionManager::new(policy(), sleeper.clone(), &ctx);
    let backend = MemoryBackend::document()
        .failing_connects([BackendError::Network("down".into())]);

    manager.acquire(&backend).await.unwrap();
    manager.acquire(&backend).await.unwrap();

    assert_eq!(backend.connect_calls(), 3);
    assert_eq!(sleeper.sleeps(), vec![Duration::from_secs(1)]);
}

#[tokio::test]
async fn test_scoped_closes_on_success() {
    let ctx = RunContext::with_id("conn-test");
    let manager = ConnectionManager::new(policy(), RecordingSleeper::new(), &ctx);
    let backend = MemoryBackend::document();

    let value = manager
        .scoped(&backend, async |_session| Ok::<_, BenchError>(7))
        .await
        .unwrap();

    assert_eq!(value, 7);
    assert_eq!(backend.closed_sessions(), 1);
    assert_eq!(backend.open_sessions(), 0);
}

#[tokio::test]
async fn test_scoped_closes_on_failure() {
    let ctx = RunContext::with_id("conn-test");
    let manager = ConnectionManager::new(policy(), RecordingSleeper::new(), &ctx);
    let backend = MemoryBackend::document();

    let err = manager
        .scoped(&backend, async |_session| {
            Err::<(), _>(BenchError::InvalidArgument("boom".into()))
        })
        .await
        .unwrap_err();

    assert_eq!(err, BenchError::InvalidArgument("boom".into()));
    assert_eq!(backend.closed_sessions(), 1);
}

#[tokio::test]
async fn test_scoped_body_error_wins_over_close_error() {
    let ctx = RunContext::with_id("conn-test");
    let manager = ConnectionManager::new(policy(), RecordingSleeper::new(), &ctx);
    let backend = MemoryBackend::document().failing_close();

    let err = manager
        .scoped(&backend, async |_session| {
            Err::<(), _>(BenchError::InsufficientData)
        })
        .await
        .unwrap_err();
    assert_eq!(err, BenchError::InsufficientData);

    let err = manager
        .scoped(&backend, async |_session| Ok::<_, BenchError>(()))
        .await
        .unwrap_err();
    assert!(matches!(err, BenchError::Backend(BackendError::Network(_))));
    assert_eq!(backend.closed_sessions(), 2);
}

#[tokio::test]
async fn test_scoped_never_runs_body_without_session() {
    let ctx = RunContext::with_id("conn-test");
    let manager = ConnectionManager::new(
        RetryPolicy::new(1, Duration::ZERO, 1.0),
        RecordingSleeper::new(),
        &ctx,
    );
    let backend = MemoryBackend::relational()
        .failing_connects([BackendError::Auth("denied".into())]);

    let mut ran = false;
    let err = manager
        .scoped(&backend, async |_session| {
            ran = true;
            Ok::<_, BenchError>(())
        })
        .await
        .unwrap_err();

    assert!(!ran);
    assert!(matches!(err, BenchError::Connection { attempts: 1, .. }));
    assert_eq!(backend.closed_sessions(), 0);
}
