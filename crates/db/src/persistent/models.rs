//! Row types for the `bridge_operations` table.

use hydra_bridge_primitives::operation::BridgeOperation;

use super::errors::StorageError;

/// A row of `bridge_operations`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(super) struct OperationRow {
    pub(super) id: i64,
    pub(super) origin: String,
    pub(super) origin_address: String,
    pub(super) origin_tx_hash: String,
    pub(super) origin_output_index: i64,

    /// JSON-serialized list of assets, stored as `TEXT`.
    pub(super) amount: String,
    pub(super) destination: String,
    pub(super) destination_address: String,
    pub(super) destination_tx_hash: Option<String>,
    pub(super) destination_output_index: i64,
    pub(super) state: String,
}

fn index(value: i64, column: &str) -> Result<u32, StorageError> {
    u32::try_from(value)
        .map_err(|_| StorageError::MismatchedTypes(format!("{column} out of range: {value}")))
}

impl TryFrom<OperationRow> for BridgeOperation {
    type Error = StorageError;

    fn try_from(row: OperationRow) -> Result<Self, Self::Error> {
        let mismatched = |e: &dyn std::fmt::Display| StorageError::MismatchedTypes(e.to_string());

        Ok(BridgeOperation {
            id: row.id,
            origin: row.origin.parse().map_err(|e| mismatched(&e))?,
            origin_address: row.origin_address,
            origin_tx_hash: row.origin_tx_hash,
            origin_output_index: index(row.origin_output_index, "origin_output_index")?,
            amount: serde_json::from_str(&row.amount)
                .map_err(|e| StorageError::InvalidData(format!("amount: {e}")))?,
            destination: row.destination.parse().map_err(|e| mismatched(&e))?,
            destination_address: row.destination_address,
            destination_tx_hash: row.destination_tx_hash,
            destination_output_index: index(
                row.destination_output_index,
                "destination_output_index",
            )?,
            state: row.state.parse().map_err(|e| mismatched(&e))?,
        })
    }
}
