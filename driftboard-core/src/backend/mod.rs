//! Backend client: the remote authoritative store consumed by the sync
//! engine and the offline queue.
//!
//! The remote assigns monotonically increasing per-entity versions on
//! write and enforces referential integrity (a card must reference an
//! existing list). All entity-mutating calls are idempotent keyed by the
//! client-assigned id.

pub mod http;
pub mod memory;

use crate::types::{BoardSnapshot, Card, CardPatch, List, ListPatch};

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Transport failure. Recoverable: the next scheduled sync retries.
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response, carrying the response body as detail text.
    #[error("Request failed ({status}): {body}")]
    Http { status: u16, body: String },
}

impl BackendError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Network(_) => None,
        }
    }
}

/// Remote store contract. Update calls return the written entity, or
/// `None` for a 204/no-content response.
#[allow(async_fn_in_trait)]
pub trait BoardBackend: Send + Sync {
    async fn fetch_all(&self) -> Result<BoardSnapshot, BackendError>;

    async fn create_list(&self, list: &List) -> Result<List, BackendError>;
    async fn update_list(&self, id: &str, patch: &ListPatch) -> Result<Option<List>, BackendError>;
    async fn delete_list(&self, id: &str) -> Result<(), BackendError>;

    async fn create_card(&self, card: &Card) -> Result<Card, BackendError>;
    async fn update_card(&self, id: &str, patch: &CardPatch) -> Result<Option<Card>, BackendError>;
    async fn delete_card(&self, id: &str) -> Result<(), BackendError>;

    async fn move_card(
        &self,
        id: &str,
        target_list_id: &str,
        target_index: usize,
    ) -> Result<Option<Card>, BackendError>;
}
