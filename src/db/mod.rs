//! Database layer
//!
//! SQLite is the default backend (single-file deployment); MySQL is
//! supported for larger installs. The driver is chosen by configuration and
//! hidden behind the [`DatabasePool`] trait.

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};

#[cfg(test)]
pub(crate) mod test_support;
