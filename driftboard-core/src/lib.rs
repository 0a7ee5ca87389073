//! Offline-first board synchronization engine.
//!
//! Local mutations apply instantly to an in-memory snapshot through a
//! pure reducer, persist to a durable log, and reconcile with the remote
//! store in the background: three-way merges for concurrent edits, an
//! offline queue replayed on reconnect, and bounded undo/redo over whole
//! snapshots.

pub mod backend;
pub mod engine;
pub mod merge;
pub mod queue;
pub mod storage;
pub mod store;
pub mod types;
pub mod undo;
pub mod validate;

pub use engine::{SyncConfig, SyncEngine, SyncReport};
pub use store::{BoardStore, Intent, IntentError};
pub use types::{BoardSnapshot, Card, CardPatch, List, ListPatch};
