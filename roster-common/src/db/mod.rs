//! Database initialization and models

pub mod init;
pub mod models;

pub use init::{connect_in_memory, create_schema, init_database};
