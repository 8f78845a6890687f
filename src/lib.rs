pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod notifications;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use sea_orm::DatabaseConnection;

pub use config::Config;
pub use error::{AppError, AppResult};

#[derive(Clone)]
pub struct AppState {
    /// `DatabaseConnection` is not `Clone` when the mock backend is compiled in.
    pub db: Arc<DatabaseConnection>,
    pub config: Config,
    pub notifier: notifications::Notifier,
}
