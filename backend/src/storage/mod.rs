//! # Storage Module
//!
//! Persistence of all tracker state as a flat namespace of string keys.
//!
//! ## Key Responsibilities
//!
//! - **Namespace backends**: SQLite (`key_values` table) and in-memory stores
//!   behind the [`KeyValueStore`] trait
//! - **Quota policy**: usage accounting against a fixed per-tier quota
//! - **Failure recovery**: trimming old history and retrying writes that do
//!   not fit
//! - **Backups**: whole-namespace copies taken before destructive imports

pub mod db;
pub mod error;
pub mod keys;
pub mod memory;
pub mod storage_manager;
pub mod traits;

pub use db::{SqliteStore, DEFAULT_DATABASE_URL};
pub use error::StorageError;
pub use memory::MemoryStore;
pub use storage_manager::{NamespaceBackup, StorageManager};
pub use traits::KeyValueStore;
