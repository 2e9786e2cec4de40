pub mod pg_writer;
pub mod postgres_connection;
pub mod repositories;
pub mod schema;
