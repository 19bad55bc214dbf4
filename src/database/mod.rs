pub mod connection;

pub use connection::{create_pool, run_migrations, DbPool};
