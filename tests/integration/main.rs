//! Integration Tests
//!
//! End-to-end tests through the public `pancarte` API:
//! - Ingestion: thresholds, watermark, hf end computation
//! - Reads: range bounds, filters, malformed blocks
//! - Persistence: close/reopen, partition layout on disk, codecs
//! - Concurrency: many writers, readers during ingestion

#[path = "../common/mod.rs"]
mod common;

mod concurrency;
mod ingestion;
mod persistence;
mod reads;
