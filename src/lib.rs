pub mod config;
pub mod data;
pub mod db;
pub mod entities;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod realtime;
pub mod refresh;
pub mod routes;
pub mod session;
pub mod utils;

use sea_orm::DatabaseConnection;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use realtime::ChangeHub;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub changes: ChangeHub,
    pub config: Config,
}
