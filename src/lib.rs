pub mod closure;
pub mod config;
pub mod domain;
pub mod error;
pub mod geo;
pub mod logging;
pub mod schemas;
pub mod seed;
pub mod server;
pub mod service;
pub mod storage;

#[cfg(feature = "db")]
pub mod db;

pub use error::{DirectoryError, Result};
pub use service::DirectoryService;
