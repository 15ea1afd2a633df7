use async_trait::async_trait;
use hydra_bridge_primitives::operation::{
    BridgeOperation, LedgerKind, NewBridgeOperation, OperationState,
};

use crate::errors::DbResult;

/// Record store for [`BridgeOperation`]s.
///
/// Operations are unique by `(origin, origin_tx_hash, origin_output_index)` and are never deleted.
/// State changes are validated against [`OperationState::can_transition_to`].
#[async_trait]
pub trait OperationDb: Send + Sync {
    /// Records a new `Pending` operation.
    ///
    /// Returns `None` without touching the store if an operation for the same origin already
    /// exists.
    async fn create_operation(&self, op: &NewBridgeOperation) -> DbResult<Option<BridgeOperation>>;

    async fn find_by_origin(
        &self,
        origin: LedgerKind,
        tx_hash: &str,
        output_index: u32,
    ) -> DbResult<Option<BridgeOperation>>;

    async fn get_operation(&self, id: i64) -> DbResult<Option<BridgeOperation>>;

    /// Operations currently in `state`, oldest first.
    async fn operations_in_state(&self, state: OperationState) -> DbResult<Vec<BridgeOperation>>;

    /// Moves operation `id` to `state` and returns the updated record.
    async fn update_state(&self, id: i64, state: OperationState) -> DbResult<BridgeOperation>;

    /// Records the destination transaction and moves the operation to
    /// [`OperationState::Submitted`].
    async fn mark_submitted(
        &self,
        id: i64,
        tx_hash: &str,
        output_index: u32,
    ) -> DbResult<BridgeOperation>;
}
