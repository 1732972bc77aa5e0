//! Base repository trait for database operations.
//!
//! A repository is a data access layer for one sqlite table. It provides
//! methods for creating, reading, updating, and deleting entities, as well
//! as listing them through a normalized filter descriptor.

use crate::db::errors::Result;

/// Result of an update: whether a row existed beforehand, and the row as it
/// stands afterwards. Handlers use the flag to pick 204-vs-201 semantics.
#[derive(Debug, Clone)]
pub struct UpdateOutcome<T> {
    pub existed: bool,
    pub row: T,
}

/// Base repository trait providing common database operations.
///
/// This trait has separate associated types for create requests, update
/// requests, and responses, so the storage representation can evolve
/// independently of the API contract.
#[async_trait::async_trait]
pub trait Repository {
    /// The request type for creating entities
    type CreateRequest;

    /// The request type for updating entities
    type UpdateRequest;

    /// The response/DTO type returned by operations
    type Response;

    /// The identifier type for lookups
    type Id: Send + Sync;

    /// The filter type for list operations
    type Filter: Send + Sync;

    /// Create a new entity and return the full created row
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response>;

    /// Get an entity by ID
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>>;

    /// List entities with filtering, ordering, and pagination
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>>;

    /// Partially update an entity by ID, inserting it when absent
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<UpdateOutcome<Self::Response>>;

    /// Delete an entity by ID, reporting whether a row was removed
    async fn delete(&mut self, id: Self::Id) -> Result<bool>;
}
