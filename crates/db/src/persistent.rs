//! SQLite-backed storage.

pub mod config;
pub mod constants;
pub mod errors;
mod models;
pub mod sqlite;
