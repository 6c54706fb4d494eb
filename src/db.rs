pub mod store;
pub use store::{Store, Transactional, UnitOfWork};
pub mod pg_record;
pub mod postgres;
pub use postgres::PgStore;
pub mod memory;
pub use memory::MemoryStore;
