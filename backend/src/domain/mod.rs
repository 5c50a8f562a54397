//! # Domain Module
//!
//! Backup and restore of the tracker's durable state.
//!
//! ## Key Responsibilities
//!
//! - **Models**: typed snapshot of every tracker entity (intake goals and
//!   history, workouts, habits, settings)
//! - **CSV Codec**: pure, storage-free conversion between a snapshot and the
//!   flat 12-column CSV backup format
//! - **Export**: read the whole snapshot from storage and render it as a file
//! - **Import**: validate an untrusted file, back up the namespace and write
//!   the parsed snapshot back field by field
//!
//! Services hold no copy of storage contents between calls. Every export
//! reads storage afresh and every import writes to it directly.

pub mod csv_codec;
pub mod export_service;
pub mod import_service;
pub mod models;

pub use csv_codec::{parse_bytes, parse_snapshot, serialize_snapshot, CsvParseError, ParsedCsv};
pub use export_service::ExportService;
pub use import_service::{ImportError, ImportFile, ImportReport, ImportService};
