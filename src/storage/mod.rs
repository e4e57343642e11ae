//! Draft persistence collaborator.

mod database;

pub use database::{Database, DraftStore, PoolConfig, SharedStore};
