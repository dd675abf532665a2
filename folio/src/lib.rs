//! # Folio - file-backed JSON document store
//!
//! Folio keeps named collections of schemaless JSON documents. Each
//! collection is held fully in memory and persisted as one JSON file; a
//! manifest lists the collections on disk.
//!
//! ## Key Features
//!
//! - **Serialized writes**: all mutations of a store run one at a time, in
//!   arrival order, and commit memory, cache and disk before the next starts
//! - **Crash-safe files**: every file is replaced through a temp file and an
//!   atomic rename
//! - **Recent access cache**: bounded FIFO cache of document bodies
//! - **Queries**: filtered scans with skip and limit, counts, lazy streams and
//!   a small aggregation pipeline (match, sort, skip, limit, group)
//! - **Backup and restore** of the whole store as one JSON file
//! - **Events**: subscribers are told about inserts, updates and removals
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use folio::Folio;
//! use folio::collection::{Filter, FindOptions};
//! use serde_json::json;
//!
//! # fn main() -> folio::errors::FolioResult<()> {
//! let db = Folio::builder()
//!     .storage_path("./data")
//!     .cache_capacity(500)
//!     .open()?;
//!
//! let users = db.collection("users")?;
//! users.insert_with_id("ada", json!({"name": "Ada", "role": "admin"}))?;
//! users.insert(json!({"name": "Bob", "role": "user"}))?;
//!
//! let admins = users.find(
//!     FindOptions::new().filter(Filter::new(|_, body| body.get("role") == Some(&json!("admin")))),
//! )?;
//! assert_eq!(admins.len(), 1);
//!
//! db.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`collection`] - Documents, collection handles, queries and events
//! - [`common`] - Write serializer, cache, event bus and utilities
//! - [`errors`] - Error types and result definitions
//! - [`folio`] - The store object
//! - [`folio_builder`] / [`folio_config`] - Store construction and settings
//! - [`metadata`] - Store statistics
//! - [`store`] - On-disk layout and persistence

pub mod collection;
pub mod common;
pub mod errors;
pub mod folio;
pub mod folio_builder;
pub mod folio_config;
pub mod metadata;
pub mod store;

pub use crate::folio::Folio;
