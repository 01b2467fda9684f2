pub mod memory;
pub mod traits;

#[cfg(feature = "db")]
pub mod database;

pub use memory::InMemoryStorage;
pub use traits::Storage;

#[cfg(feature = "db")]
pub use database::DatabaseStorage;
