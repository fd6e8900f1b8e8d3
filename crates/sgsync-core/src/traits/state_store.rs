// # State Store Trait
//
// Defines the interface for persisting the single piece of state this tool
// owns: the last CIDR it authorized. The stored value is what makes repeated
// invocations idempotent and lets a run revoke exactly the rule a previous
// run created.
//
// ## Implementations
//
// - File-based: whole file content is the CIDR (`state::FileStateStore`)
// - In-memory: tests and embedded use (`state::MemoryStateStore`)

use async_trait::async_trait;

/// Trait for state store implementations
///
/// Invariant: a stored value, when present, is always a CIDR previously
/// accepted as the current IP by some prior run (e.g. `203.0.113.5/32`).
/// Overlapping invocations against the same store are unsupported and may
/// race; no locking is attempted.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Get the last persisted CIDR
    ///
    /// # Returns
    ///
    /// - `Ok(Some(String))`: The CIDR from the previous successful run
    /// - `Ok(None)`: No state yet (first run)
    /// - `Err(Error)`: Storage error
    async fn get_last_cidr(&self) -> Result<Option<String>, crate::Error>;

    /// Persist the CIDR of the current run
    ///
    /// Overwrites any previous value. Called only after all group mutations
    /// have been applied, so a failure here leaves the groups correct and
    /// the state stale; the next run detects the difference and re-issues
    /// the (idempotent) authorize calls.
    async fn set_last_cidr(&self, cidr: &str) -> Result<(), crate::Error>;
}
