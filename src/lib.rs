pub mod app;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use app::Application;
pub use config::Config;
pub use error::{ApiError, Result};
