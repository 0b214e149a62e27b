//! Shared board model and client-side sync for Reelboard.
//!
//! Used by the REST backend (types, validation) and the terminal client
//! (board state manager, local store, sync engine, migration).

pub mod board;
pub mod identity;
pub mod local;
pub mod manager;
pub mod migration;
pub mod sync;
pub mod types;
pub mod validate;
