//! Contract test: state model & idempotency
//!
//! Constraints verified:
//! - Persisted state equal to the discovered IP short-circuits the run with
//!   no provider calls at all
//! - The provider's duplicate-rule rejection is tolerated, so re-running
//!   after a stale-state crash converges instead of failing
//! - A state-write failure surfaces only after every mutation was applied

mod common;

use common::*;
use sgsync_core::{AuthorizeOutcome, EngineEvent, Error, MemoryStateStore, SyncEngine, SyncOutcome};

#[tokio::test]
async fn unchanged_ip_performs_no_provider_calls() {
    let gateway = ScriptedGateway::new(&[("web-sg", "sg-0web")]);

    let (engine, mut rx) = SyncEngine::new(
        Box::new(StaticIpSource::new("203.0.113.5")),
        Box::new(ScriptedGateway::sharing_recorder_with(&gateway)),
        Box::new(MemoryStateStore::with_cidr("203.0.113.5/32")),
        test_config(&["web-sg"]),
    )
    .expect("engine construction succeeds");

    let outcome = engine.run().await.expect("run succeeds");

    assert_eq!(
        outcome,
        SyncOutcome::NoChange {
            cidr: "203.0.113.5/32".to_string()
        }
    );
    assert!(
        gateway.calls().is_empty(),
        "no describe/revoke/authorize may be issued, got {:?}",
        gateway.calls()
    );

    let events = drain_events(&mut rx);
    assert!(
        events
            .iter()
            .any(|e| matches!(e, EngineEvent::NothingToDo { .. })),
        "the no-op must be reported"
    );
}

#[tokio::test]
async fn duplicate_authorize_is_tolerated() {
    // Simulates the re-run after a crash between mutation and persist: the
    // provider already has the rule and rejects the duplicate.
    let gateway = ScriptedGateway::new(&[("web-sg", "sg-0web")])
        .with_authorize_outcome(AuthorizeOutcome::AlreadyExists);

    let (engine, _rx) = SyncEngine::new(
        Box::new(StaticIpSource::new("203.0.113.5")),
        Box::new(ScriptedGateway::sharing_recorder_with(&gateway)),
        Box::new(MemoryStateStore::new()),
        test_config(&["web-sg"]),
    )
    .expect("engine construction succeeds");

    let outcome = engine.run().await.expect("duplicate rejection must not fail the run");

    match outcome {
        SyncOutcome::Updated { groups, .. } => {
            assert_eq!(groups[0].authorized, Some(AuthorizeOutcome::AlreadyExists));
        }
        other => panic!("expected Updated outcome, got {:?}", other),
    }
}

#[tokio::test]
async fn state_write_failure_surfaces_after_mutations() {
    let gateway = ScriptedGateway::new(&[("web-sg", "sg-0web")]);

    let (engine, _rx) = SyncEngine::new(
        Box::new(StaticIpSource::new("203.0.113.5")),
        Box::new(ScriptedGateway::sharing_recorder_with(&gateway)),
        Box::new(WriteFailingStateStore::new(None)),
        test_config(&["web-sg"]),
    )
    .expect("engine construction succeeds");

    let err = engine.run().await.expect_err("write failure is fatal");
    assert!(matches!(err, Error::Storage(_)), "got {:?}", err);

    // The groups were already reconciled when the write failed; the next
    // run will see stale state and safely re-issue the authorize.
    assert!(
        gateway.calls().iter().any(|c| c.is_authorize()),
        "mutations must precede the state write"
    );
}
