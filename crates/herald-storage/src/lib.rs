//! Herald Storage - Database access for the dispatch engine
//!
//! This crate provides the models, repository traits and their
//! PostgreSQL implementations, plus an in-process store that
//! implements the same traits.

pub mod db;
pub mod memory;
pub mod models;
pub mod repository;
pub mod store;

pub use db::DatabasePool;
pub use memory::MemoryStore;
pub use models::*;
pub use repository::*;
pub use store::Store;
