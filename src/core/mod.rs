mod config;
pub use config::AppConfig;
mod error;
pub use error::{ChatError, Notice, Severity};
mod factory;
pub use factory::ChatFactory;
