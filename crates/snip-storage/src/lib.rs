//! Record store implementations.

pub mod memory;
pub mod mysql;

pub use memory::InMemoryRepository;
pub use mysql::MySqlRepository;
pub use snip_core::repository::{NewUrlRecord, ReadRepository, Repository, Result, UrlRecord};
pub use snip_core::StorageError;
