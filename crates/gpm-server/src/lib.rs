//! GPM Server: REST API over the authentication core.
//!
//! Routes are split three ways: public (health, login, password reset),
//! guarded (session + trial gate) and exempt (session only).

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::{AppConfig, ConfigError, load_config};
pub use error::ApiError;
pub use routes::router;
pub use state::AppState;
