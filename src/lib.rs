pub mod config;
pub mod dispatch;
pub mod error;
pub mod models;
pub mod server;

pub use error::{Error, Result};
