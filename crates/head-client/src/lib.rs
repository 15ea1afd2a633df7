//! Client for a Hydra head node's websocket API.
//!
//! [`channel::Channel`] keeps one reconnecting socket to a node. [`client::HeadClient`] layers the
//! head protocol on top of it: it tracks the head status and the latest UTxO snapshot, correlates
//! commands with their responses and publishes [`event::HeadEvent`]s.

pub mod channel;
pub mod client;
pub mod config;
mod constants;
pub mod errors;
pub mod event;
pub mod messages;
pub mod pending;
pub mod state_machine;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
