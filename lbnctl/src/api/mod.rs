//! API layer for HTTP request handling and data models.
//!
//! This module contains the REST API implementation, organized into:
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//!
//! # API Structure
//!
//! The API is divided into several functional areas, all under `/api/v1`:
//!
//! - **Authentication** (`/login`, `/logout`, `/authenticated`)
//! - **Libraries** (`/libraries/*`): library records and IP allowlists
//! - **Notes** (`/notes/*`, `/libraries/{lid}/notes/*`)
//! - **Runs** (`/runs/*`, `/libraries/{lid}/runs/*`)
//! - **Devices** (`/devices/*`, `/libraries/{lid}/devices/*`)
//! - **Users** (`/users/*`)
//!
//! # Response Envelope
//!
//! Every response that carries a body is wrapped in the uniform envelope
//! `{statusCode, status, data}` (see [`models::envelope`]); errors carry a
//! `message` instead of `data`.
//!
//! # OpenAPI Documentation
//!
//! All endpoints are documented with OpenAPI annotations using `utoipa`.
//! API documentation is served at `/api/docs` when the server is running.

pub mod handlers;
pub mod models;
