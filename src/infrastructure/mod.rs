//! Infrastructure layer: SeaORM repositories, shared state and the HTTP server

pub mod repositories;
pub mod server;
pub mod state;

pub use repositories::*;
pub use state::AppState;
