//! Watches the L1 deposit address through a [Kupo](https://cardanosolutions.github.io/kupo)
//! indexer and publishes its unspent outputs whenever they change.

pub mod config;
mod constants;
pub mod errors;
pub mod kupo;
pub mod poller;
