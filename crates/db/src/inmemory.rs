//! In-memory implementation of [`OperationDb`].

use std::sync::Arc;

use async_trait::async_trait;
use hydra_bridge_primitives::operation::{
    BridgeOperation, LedgerKind, NewBridgeOperation, OperationState,
};
use tokio::sync::RwLock;
use tracing::trace;

use crate::{
    errors::{DbError, DbResult},
    operations::OperationDb,
};

/// In-memory operation store. Ids are assigned sequentially from 1.
#[derive(Debug, Clone, Default)]
pub struct OperationsInMemory {
    /// Operations in creation order; `id - 1` is the index.
    operations: Arc<RwLock<Vec<BridgeOperation>>>,
}

impl OperationsInMemory {
    async fn transition(
        &self,
        id: i64,
        state: OperationState,
        update: impl FnOnce(&mut BridgeOperation) + Send,
    ) -> DbResult<BridgeOperation> {
        let mut operations = self.operations.write().await;
        let op = usize::try_from(id - 1)
            .ok()
            .and_then(|idx| operations.get_mut(idx))
            .ok_or(DbError::NotFound(id))?;

        if !op.state.can_transition_to(state) {
            return Err(DbError::InvalidTransition {
                id,
                from: op.state,
                to: state,
            });
        }

        update(op);
        op.state = state;
        trace!(%id, %state, "operation updated");

        Ok(op.clone())
    }
}

#[async_trait]
impl OperationDb for OperationsInMemory {
    async fn create_operation(&self, op: &NewBridgeOperation) -> DbResult<Option<BridgeOperation>> {
        let mut operations = self.operations.write().await;

        let exists = operations.iter().any(|existing| {
            existing.origin == op.origin
                && existing.origin_tx_hash == op.origin_tx_hash
                && existing.origin_output_index == op.origin_output_index
        });
        if exists {
            return Ok(None);
        }

        let created = BridgeOperation {
            id: operations.len() as i64 + 1,
            origin: op.origin,
            origin_address: op.origin_address.clone(),
            origin_tx_hash: op.origin_tx_hash.clone(),
            origin_output_index: op.origin_output_index,
            amount: op.amount.clone(),
            destination: op.destination(),
            destination_address: op.destination_address.clone(),
            destination_tx_hash: None,
            destination_output_index: 0,
            state: OperationState::Pending,
        };
        operations.push(created.clone());

        Ok(Some(created))
    }

    async fn find_by_origin(
        &self,
        origin: LedgerKind,
        tx_hash: &str,
        output_index: u32,
    ) -> DbResult<Option<BridgeOperation>> {
        Ok(self
            .operations
            .read()
            .await
            .iter()
            .find(|op| {
                op.origin == origin
                    && op.origin_tx_hash == tx_hash
                    && op.origin_output_index == output_index
            })
            .cloned())
    }

    async fn get_operation(&self, id: i64) -> DbResult<Option<BridgeOperation>> {
        let operations = self.operations.read().await;
        Ok(usize::try_from(id - 1)
            .ok()
            .and_then(|idx| operations.get(idx))
            .cloned())
    }

    async fn operations_in_state(&self, state: OperationState) -> DbResult<Vec<BridgeOperation>> {
        Ok(self
            .operations
            .read()
            .await
            .iter()
            .filter(|op| op.state == state)
            .cloned()
            .collect())
    }

    async fn update_state(&self, id: i64, state: OperationState) -> DbResult<BridgeOperation> {
        self.transition(id, state, |_| {}).await
    }

    async fn mark_submitted(
        &self,
        id: i64,
        tx_hash: &str,
        output_index: u32,
    ) -> DbResult<BridgeOperation> {
        let tx_hash = tx_hash.to_string();
        self.transition(id, OperationState::Submitted, move |op| {
            op.destination_tx_hash = Some(tx_hash);
            op.destination_output_index = output_index;
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_suite;

    #[tokio::test]
    async fn behaves_like_an_operation_store() {
        test_suite::exercise(&OperationsInMemory::default()).await;
    }
}
