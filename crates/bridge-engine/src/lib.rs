//! The bridge between L1 and the head.
//!
//! Deposits to the bridge address on L1 and burns of the wrapped asset inside the head are turned
//! into [`hydra_bridge_primitives::operation::BridgeOperation`]s by [`detector`]. The
//! [`processor::Processor`] then drives each pending operation to a compensating transaction on
//! the other ledger: a mint of the wrapped asset in the head, or a release of locked funds on L1.
//! [`engine::BridgeEngine`] wires both halves to their event feeds.

pub mod coin_selection;
pub mod config;
pub mod detector;
pub mod engine;
pub mod errors;
pub mod processor;
pub mod tx_builder;
