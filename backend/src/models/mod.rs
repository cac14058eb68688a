//! Domain models
//!
//! Re-exports the entity and enum types of the shared crate; row types read by
//! the services live next to their service.

pub use shared::models::*;
