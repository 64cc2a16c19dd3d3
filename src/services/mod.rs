//! Services Layer
//!
//! Business operations on top of the store, called by the Axum handlers.
//! Each service takes the connection explicitly; writes spanning several
//! tables run in one transaction.

pub mod availability_service;
pub mod directory_service;
pub mod event_service;
pub mod return_service;
