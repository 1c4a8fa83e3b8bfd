pub mod chat;
pub mod config;
pub mod error;
pub mod funnel;

pub use config::AppConfig;
pub use error::{CfoError, CfoResult};
