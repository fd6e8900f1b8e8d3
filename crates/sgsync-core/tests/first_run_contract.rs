//! Contract test: first-run behavior
//!
//! With no persisted state, reconciliation must authorize the current IP on
//! every resolved group, must not revoke anything, and must persist the new
//! CIDR afterwards.

mod common;

use common::*;
use sgsync_core::traits::StateStore;
use sgsync_core::{AuthorizeOutcome, EngineEvent, MemoryStateStore, SyncEngine, SyncOutcome};

#[tokio::test]
async fn first_run_authorizes_without_revoking() {
    let gateway = ScriptedGateway::new(&[("web-sg", "sg-0web")]);
    let state = MemoryStateStore::new();

    let (engine, mut rx) = SyncEngine::new(
        Box::new(StaticIpSource::new("203.0.113.5")),
        Box::new(ScriptedGateway::sharing_recorder_with(&gateway)),
        Box::new(state.clone()),
        test_config(&["web-sg"]),
    )
    .expect("engine construction succeeds");

    let outcome = engine.run().await.expect("run succeeds");

    // Exactly one unfiltered describe and one authorize; no revoke at all.
    let calls = gateway.calls();
    assert_eq!(calls.len(), 2, "expected describe + authorize, got {:?}", calls);
    assert_eq!(
        calls[0],
        GatewayCall::Describe {
            names: vec!["web-sg".to_string()],
            filter_cidr: None,
        }
    );
    assert_eq!(
        calls[1],
        GatewayCall::Authorize {
            group_id: "sg-0web".to_string(),
            cidr: "203.0.113.5/32".to_string(),
            port: 22,
        }
    );

    // State now holds the new CIDR.
    assert_eq!(
        state.get_last_cidr().await.unwrap(),
        Some("203.0.113.5/32".to_string())
    );

    match outcome {
        SyncOutcome::Updated {
            previous_cidr,
            new_cidr,
            groups,
        } => {
            assert_eq!(previous_cidr, None);
            assert_eq!(new_cidr, "203.0.113.5/32");
            assert_eq!(groups.len(), 1);
            assert_eq!(groups[0].revoked, None);
            assert_eq!(groups[0].authorized, Some(AuthorizeOutcome::Created));
        }
        other => panic!("expected Updated outcome, got {:?}", other),
    }

    let events = drain_events(&mut rx);
    assert!(
        events
            .iter()
            .any(|e| matches!(e, EngineEvent::StatePersisted { .. })),
        "state persistence should be reported"
    );
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, EngineEvent::RuleRevoked { .. })),
        "no revoke may be reported on first run"
    );
}

#[tokio::test]
async fn first_run_covers_every_resolved_group() {
    let gateway = ScriptedGateway::new(&[("web-sg", "sg-0web"), ("db-sg", "sg-0db")]);
    let state = MemoryStateStore::new();

    let (engine, _rx) = SyncEngine::new(
        Box::new(StaticIpSource::new("203.0.113.5")),
        Box::new(ScriptedGateway::sharing_recorder_with(&gateway)),
        Box::new(state),
        test_config(&["web-sg", "db-sg"]),
    )
    .expect("engine construction succeeds");

    engine.run().await.expect("run succeeds");

    let authorized: Vec<_> = gateway
        .calls()
        .into_iter()
        .filter(|c| c.is_authorize())
        .collect();
    assert_eq!(authorized.len(), 2, "one authorize per configured group");
}
