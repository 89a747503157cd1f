pub mod client;
pub mod config;
pub mod daemon;
pub mod db;
pub mod error;
pub mod insights;
pub mod models;
pub mod routes;
pub mod store;

pub use crate::client::ChronicleClient;
pub use crate::config::Config;
pub use crate::daemon::{build_router, AppState};
pub use crate::error::{ChronicleError, Result};
pub use crate::store::CareStore;
