// # Memory State Store
//
// In-memory implementation of StateStore.
//
// State is lost when the process exits; the first run afterwards treats the
// current IP as new and re-issues the (idempotent) authorize calls. Useful
// for tests and for embedded callers that manage persistence themselves.

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::state_store::StateStore;
use async_trait::async_trait;

/// In-memory state store implementation
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    inner: Arc<RwLock<Option<String>>>,
}

impl MemoryStateStore {
    /// Create a new empty memory state store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with a CIDR, as if a prior run had persisted it
    pub fn with_cidr(cidr: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Some(cidr.into()))),
        }
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get_last_cidr(&self) -> Result<Option<String>, Error> {
        Ok(self.inner.read().await.clone())
    }

    async fn set_last_cidr(&self, cidr: &str) -> Result<(), Error> {
        *self.inner.write().await = Some(cidr.to_string());
        Ok(())
    }
}
