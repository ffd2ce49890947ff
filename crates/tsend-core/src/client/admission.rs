//! Admission limit on concurrently in-flight batches.
//!
//! Each submitted batch holds one permit for its whole family: the permit is
//! shared by every fragment split off it and returns to the pool when the
//! last fragment terminates.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};

/// What `send` does when `max_concurrent_batches` are already in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdmissionPolicy {
    /// Fail `send` with `SendError::Saturated`.
    #[default]
    Reject,
    /// Accept the batch and start it once a slot frees up.
    Queue,
}

/// Permit shared by a batch and all of its fragments.
pub type FamilyPermit = Arc<OwnedSemaphorePermit>;

#[derive(Debug)]
pub struct Admission {
    limit: usize,
    policy: AdmissionPolicy,
    slots: Arc<Semaphore>,
}

impl Admission {
    pub fn new(limit: usize, policy: AdmissionPolicy) -> Self {
        let limit = limit.clamp(1, Semaphore::MAX_PERMITS);
        Self {
            limit,
            policy,
            slots: Arc::new(Semaphore::new(limit)),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn policy(&self) -> AdmissionPolicy {
        self.policy
    }

    /// Families currently holding a slot.
    pub fn in_use(&self) -> usize {
        self.limit - self.slots.available_permits()
    }

    /// Take a slot without waiting. `None` when saturated.
    pub fn try_admit(&self) -> Option<FamilyPermit> {
        match Arc::clone(&self.slots).try_acquire_owned() {
            Ok(p) => Some(Arc::new(p)),
            Err(TryAcquireError::NoPermits) | Err(TryAcquireError::Closed) => None,
        }
    }

    /// Wait for a slot. `None` only if the semaphore was closed.
    pub async fn admit(&self) -> Option<FamilyPermit> {
        Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .ok()
            .map(Arc::new)
    }
}
