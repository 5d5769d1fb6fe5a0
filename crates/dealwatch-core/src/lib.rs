pub mod app_config;
pub mod config;
pub mod keyword;
pub mod listing;
pub mod site;

use thiserror::Error;

pub use app_config::{AppConfig, Environment, SmtpConfig};
pub use config::{load_app_config, load_app_config_from_env};
pub use keyword::normalize_keyword;
pub use listing::ListingItem;
pub use site::Site;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
