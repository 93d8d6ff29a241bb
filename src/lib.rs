//! Token authentication and user provisioning for the facility reservation API.

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod state;
pub mod store;

pub use error::AuthError;
pub use state::AppState;
