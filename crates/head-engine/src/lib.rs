//! Lifecycle management for this participant's head.
//!
//! [`engine::HeadEngine`] connects to the head node, initializes a head when none is live, commits
//! funds from L1 and then serves the head as a [`hydra_bridge_primitives::ledger::Ledger`].

pub mod commit;
pub mod config;
pub mod engine;
pub mod errors;
