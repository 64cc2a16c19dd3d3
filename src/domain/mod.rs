//! Domain layer - Pure business abstractions
//!
//! This layer contains NO framework dependencies (no Axum), apart from the
//! SeaORM error conversion in `errors`.
//! Trait definitions, domain error types and the availability and return
//! computations live here.

pub mod availability;
pub mod errors;
pub mod reconciliation;
pub mod repositories;

pub use availability::{DateRange, RequestedLine};
pub use errors::{DomainError, FieldErrors};
pub use repositories::*;
