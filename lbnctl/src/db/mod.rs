//! Database layer for data persistence and access.
//!
//! This module implements the data access layer using SQLx over sqlite.
//! It follows the Repository pattern to provide clean abstractions over
//! database operations.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  (API request handlers)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │ Repositories│  (db::handlers - query construction)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │   Models    │  (db::models - database records)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │   sqlite    │
//! └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`handlers`]: Repository implementations for CRUD and association operations
//! - [`models`]: Database record structures matching table schemas
//! - [`errors`]: Database-specific error types
//!
//! # Repository Pattern
//!
//! Each repository wraps a `&mut SqliteConnection` and encapsulates all
//! database access for one entity type. List queries are built dynamically
//! with `sqlx::QueryBuilder` from a normalized [`Window`] descriptor, so
//! filtering, ordering, and pagination behave identically across entities.
//!
//! [`Window`]: crate::api::models::query::Window
//!
//! # Migrations
//!
//! Database migrations are managed by SQLx and located in the `migrations/`
//! directory. The [`crate::migrator`] function provides access to the
//! migrator:
//!
//! ```ignore
//! lbnctl::migrator().run(&pool).await?;
//! ```

pub mod errors;
pub mod handlers;
pub mod models;
