use super::StoreError;
use async_trait::async_trait;

/// Bounded set of in-flight download owners.
#[async_trait]
pub trait SlotController: Send + Sync {
    /// Atomically add `owner_id` if the set is below capacity.
    ///
    /// Refreshes the set expiry on success. Returns `false` without touching
    /// the set when it is full.
    async fn try_acquire(&self, owner_id: &str) -> Result<bool, StoreError>;

    /// Remove `owner_id`. Removing a non-member is a no-op.
    async fn release(&self, owner_id: &str) -> Result<(), StoreError>;

    /// Number of slots currently held.
    async fn active(&self) -> Result<usize, StoreError>;
}
