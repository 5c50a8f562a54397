//! # IO Module
//!
//! HTTP interface over the storage manager and the backup services.
//!
//! ## Key Responsibilities
//!
//! - **API Endpoints**: export, import, storage status and raw key access
//! - **Error Translation**: every domain or storage failure becomes a status
//!   code plus a JSON [`shared::ErrorResponse`]
//! - **Request Logging**: one log line per request and per outcome

pub mod rest;
