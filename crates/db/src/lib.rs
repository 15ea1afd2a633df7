//! Storage for bridge operations.
//!
//! [`operations::OperationDb`] is the record store the bridge engine writes to. It is implemented
//! by [`persistent::sqlite::SqliteDb`] for production and by
//! [`inmemory::OperationsInMemory`] for tests and ephemeral runs.

pub mod errors;
pub mod inmemory;
pub mod operations;
pub mod persistent;

#[cfg(test)]
mod test_suite;
