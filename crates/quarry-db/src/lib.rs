pub mod cache;
pub mod config;
pub mod database;

pub use cache::PgResultCache;
pub use config::DatabaseConfig;
pub use database::Database;
