//! # REST API Interface Layer
//!
//! Each module exposes a `router()` that is nested under `/api` by
//! [`create_router`](crate::create_router):
//!
//! - `/api/export`: download the full snapshot as CSV (or as JSON metadata)
//! - `/api/import`: upload a CSV backup
//! - `/api/storage`: usage status and manual cleanup
//! - `/api/values`: raw access to single keys

pub mod error_mapper;
pub mod export_apis;
pub mod import_apis;
pub mod storage_apis;
pub mod value_apis;

#[cfg(test)]
pub(crate) mod test_utils;
