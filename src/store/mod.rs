//! Record store backends.

pub mod memory;

#[cfg(feature = "postgres")]
pub mod postgres;

use async_trait::async_trait;
use crate::types::{FamilyRecord, PersonId, PersonRecord};

/// Trait for genealogical record stores.
///
/// Implementations must guarantee deterministic ordering of results:
/// families ascending by id, children within a family by birth date
/// (exact, then approximate, undated last).
/// The family lookups are batched: one call per traversal frontier.
#[async_trait]
pub trait FamilyStore: Send + Sync {
    /// Error type for store operations.
    type Error: std::error::Error + Send + Sync;

    /// Fetch a person by ID.
    async fn get_person(&self, id: PersonId) -> Result<Option<PersonRecord>, Self::Error>;

    /// Fetch multiple people by ID. Unknown ids are omitted.
    async fn get_people(&self, ids: &[PersonId]) -> Result<Vec<PersonRecord>, Self::Error>;

    /// Fetch every family in which any of `ids` is a child.
    async fn get_families_where_child(&self, ids: &[PersonId]) -> Result<Vec<FamilyRecord>, Self::Error>;

    /// Fetch every family in which any of `ids` is a partner.
    async fn get_families_where_member(&self, ids: &[PersonId]) -> Result<Vec<FamilyRecord>, Self::Error>;

    /// Check if the store is reachable.
    async fn is_healthy(&self) -> bool {
        true
    }
}

pub use memory::InMemoryFamilyStore;

#[cfg(feature = "postgres")]
pub use postgres::PostgresFamilyStore;
