use diesel::result::{DatabaseErrorKind, Error as DieselError};
use domain::errors::RepositoryError;

/// Lifts constraint violations into `RepositoryError` so callers can tell a
/// conflict apart from a storage failure. Everything else passes through.
pub fn map_write_error(err: DieselError) -> anyhow::Error {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            let constraint = info.constraint_name().unwrap_or("unknown").to_string();
            RepositoryError::UniqueViolation(constraint).into()
        }
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
            let constraint = info.constraint_name().unwrap_or("unknown").to_string();
            RepositoryError::ForeignKeyViolation(constraint).into()
        }
        other => other.into(),
    }
}
