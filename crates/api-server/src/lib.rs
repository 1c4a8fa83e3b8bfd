#![warn(clippy::unwrap_used)]

pub mod auth;
pub mod chat_rest;
pub mod consult_rest;
pub mod funnel_rest;
pub mod rest;
pub mod server;
pub mod swagger;

pub use rest::AppState;
pub use server::ApiServer;
pub use swagger::ApiDoc;
