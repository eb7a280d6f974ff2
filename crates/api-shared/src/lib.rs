//! # API Shared
//!
//! Shared definitions for the portal's outward surfaces.
//!
//! Contains:
//! - Response and request DTOs with OpenAPI schemas (`dto` module)
//! - Shared services like `HealthService`
//! - API key checking
//!
//! Used by `api-rest` and the `portal` CLI so that both present sessions and diaries in
//! the same JSON shape.

pub mod auth;
pub mod dto;
pub mod health;

pub use dto::*;
pub use health::HealthService;
