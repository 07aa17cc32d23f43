//! Read-only status dashboard
//!
//! Serves archive and runtime state over HTTP. Nothing here writes to the
//! archive or the configuration, and the dashboard holds no scheduling state.

mod error;
pub mod models;
pub mod routes;
mod server;
pub mod state;
pub(crate) mod utils;

pub use error::DashboardError;
pub use server::{router, serve, shutdown_signal};
pub use state::DashboardState;
