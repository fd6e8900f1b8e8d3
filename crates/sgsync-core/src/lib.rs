// # sgsync-core
//
// Core library for the security-group ingress synchronizer.
//
// ## Architecture Overview
//
// This library keeps cloud security-group ingress rules pointed at the
// operator's current public IP:
// - **IpSource**: Trait for discovering the current public IP
// - **GroupGateway**: Trait for describing and mutating security groups
// - **StateStore**: Trait for persisting the last authorized CIDR (idempotency)
// - **SyncEngine**: One-shot engine that orchestrates the
//   discover → compare → revoke → authorize → persist flow
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Reconciliation logic is separate from
//    provider and lookup implementations
// 2. **Library-First**: The engine returns typed outcomes and errors; only
//    the CLI decides to print or terminate
// 3. **Idempotency**: Persisted state prevents needless provider calls, and
//    re-issued authorizes after a stale-state crash are tolerated
// 4. **No scheduling**: One invocation is one pass; periodic execution is
//    the job of an external scheduler

pub mod config;
pub mod engine;
pub mod error;
pub mod state;
pub mod traits;

// Re-export core types for convenience
pub use config::{Protocol, SyncConfig};
pub use engine::{EngineEvent, GroupReport, SyncEngine, SyncOutcome};
pub use error::{Error, Result};
pub use state::{FileStateStore, MemoryStateStore};
pub use traits::{
    AuthorizeOutcome, DottedQuad, GroupGateway, IngressRule, IpSource, RevokeOutcome,
    SecurityGroup, StateStore,
};
