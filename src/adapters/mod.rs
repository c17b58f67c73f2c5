#[cfg(feature = "api")]
pub mod api_server;
pub mod memory;
pub mod postgres;

#[cfg(feature = "api")]
pub use api_server::start_api_server;
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
