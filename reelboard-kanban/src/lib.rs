//! Reelboard terminal client: the content pipeline board, kept in a local
//! store when signed out and synced to the column API when signed in.
pub mod api;
pub mod config;
pub mod render;
pub mod session;
