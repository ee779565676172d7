pub mod constraint_errors;
pub mod postgres_connection;
pub mod repositories;
