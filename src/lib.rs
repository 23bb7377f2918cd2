#[cfg(feature = "postgres-store")]
pub mod db;
pub mod error;
pub mod models;
pub mod openapi;
pub mod rate_limit;
pub mod repo;
pub mod routes;

// Re-export commonly used items for tests / external users
pub use routes::{config, AppState};
