pub mod db;
pub mod gateway;

pub use db::SqliteGateway;
pub use gateway::{MemoryGateway, PersistenceGateway, Snapshot};
