pub mod entity;
pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod query_builder;
pub mod record;
pub mod store;

pub use entity::{Entity, EntityError, EntityMeta, Preload, Relation};
pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use record::Record;
pub use store::{Filter, Page, Query, Search, Store, StoreError};
