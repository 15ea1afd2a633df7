use hydra_bridge_primitives::operation::OperationState;
use thiserror::Error;

use crate::persistent::errors::StorageError;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("sqlite: {0}")]
    Storage(#[from] StorageError),

    #[error("operation {0} not found")]
    NotFound(i64),

    #[error("operation {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: i64,
        from: OperationState,
        to: OperationState,
    },
}

pub type DbResult<T> = Result<T, DbError>;
