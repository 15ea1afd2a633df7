//! Access to the base ledger through the [Blockfrost](https://blockfrost.io) API.
//!
//! [`blockfrost::BlockfrostClient`] implements [`hydra_bridge_primitives::ledger::Ledger`] so the
//! rest of the bridge can treat L1 and the head alike.

pub mod blockfrost;
pub mod config;
pub mod errors;
