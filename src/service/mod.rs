//! Tenant database administration behind project policy.

mod admin;
mod validation;

pub use admin::{CreateTableRequest, DatabaseAdminService, RowPage, RowQuery, DEFAULT_SCHEMA};
pub use validation::RequestValidator;
