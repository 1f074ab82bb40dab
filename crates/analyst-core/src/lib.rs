pub mod config;
pub mod credentials;
pub mod error;
pub mod types;

pub use config::AnalystConfig;
pub use credentials::Credentials;
pub use error::{CoreError, Result};
pub use types::*;
