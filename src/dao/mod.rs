//! Persistence layer: model types, the two stores, and the commit-logged
//! gateway every mutation goes through.

/// Append-only commit log and per-version snapshots.
pub mod commit_log;
/// Versioned persistence gateway wrapping every store mutation.
pub mod gateway;
/// Persisted model definitions.
pub mod models;
/// Configuration overlay store.
pub mod overlay_store;
/// Remote commit-log mirror consumed by sync.
pub mod remote;
/// Schedule document store.
pub mod schedule_store;
/// Storage abstraction layer for durable operations.
pub mod storage;
