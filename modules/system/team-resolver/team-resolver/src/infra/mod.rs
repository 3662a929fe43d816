//! Infrastructure adapters: team caches and the directory client.

pub mod cache;
pub mod directory;
