//! Registry of in-flight operations
//!
//! Every running import or export owns a cancellation token registered under
//! its operation id. Pipelines call [`OperationHandle::checkpoint`] at each
//! stage boundary; a cancelled token turns into [`ReelError::Cancelled`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

use crate::error::{ReelError, ReelResult};
use crate::models::OperationId;

/// Tokens of the operations currently running, keyed by id
#[derive(Debug, Default, Clone)]
pub struct OperationRegistry {
    /// Label used in cancellation messages ("import", "export")
    kind: &'static str,
    active: Arc<Mutex<HashMap<OperationId, CancellationToken>>>,
}

impl OperationRegistry {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            active: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register an operation
    ///
    /// Fails with `OperationInProgress` when the id is already running.
    pub fn begin(&self, id: OperationId) -> ReelResult<OperationHandle> {
        let mut active = self
            .active
            .lock()
            .map_err(|e| ReelError::System(format!("Operation registry poisoned: {}", e)))?;
        if active.contains_key(&id) {
            return Err(ReelError::OperationInProgress(format!("{} {}", self.kind, id)));
        }

        let token = CancellationToken::new();
        active.insert(id, token.clone());
        Ok(OperationHandle {
            id,
            kind: self.kind,
            token,
            registry: self.clone(),
        })
    }

    /// Request cancellation; returns false when the id is not running
    pub fn cancel(&self, id: &OperationId) -> bool {
        let Ok(active) = self.active.lock() else {
            return false;
        };
        match active.get(id) {
            Some(token) => {
                token.cancel();
                tracing::info!(operation_id = %id, kind = self.kind, "Cancellation requested");
                true
            }
            None => false,
        }
    }

    /// Ids of the running operations
    pub fn active_ids(&self) -> Vec<OperationId> {
        self.active
            .lock()
            .map(|active| active.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn is_active(&self, id: &OperationId) -> bool {
        self.active
            .lock()
            .map(|active| active.contains_key(id))
            .unwrap_or(false)
    }

    fn finish(&self, id: &OperationId) {
        if let Ok(mut active) = self.active.lock() {
            active.remove(id);
        }
    }
}

/// A registered operation; unregisters itself when dropped
#[derive(Debug)]
pub struct OperationHandle {
    id: OperationId,
    kind: &'static str,
    token: CancellationToken,
    registry: OperationRegistry,
}

impl OperationHandle {
    pub fn id(&self) -> OperationId {
        self.id
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Yield to the runtime, then fail if cancellation was requested
    pub async fn checkpoint(&self) -> ReelResult<()> {
        tokio::task::yield_now().await;
        self.check()
    }

    /// Fail if cancellation was requested, without yielding
    pub fn check(&self) -> ReelResult<()> {
        if self.token.is_cancelled() {
            return Err(ReelError::Cancelled(format!("{} {}", self.kind, self.id)));
        }
        Ok(())
    }
}

impl Drop for OperationHandle {
    fn drop(&mut self) {
        self.registry.finish(&self.id);
    }
}
