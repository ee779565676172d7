use thiserror::Error;

/// Rejections raised while validating or finalizing user and subscription data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("renewal date must be after start date")]
    RenewalNotAfterStart,
    #[error("start date must be before or equal to today")]
    StartDateInFuture,
    #[error("date is out of the supported range")]
    DateOutOfRange,
    #[error("unknown subscription interval: {0}")]
    UnknownInterval(String),
    #[error("unknown currency: {0}")]
    UnknownCurrency(String),
    #[error("unknown category: {0}")]
    UnknownCategory(String),
    #[error("unknown subscription status: {0}")]
    UnknownStatus(String),
    #[error("subscription name must be between 3 and 50 characters long")]
    SubscriptionNameLength,
    #[error("price must be a positive number")]
    NegativePrice,
    #[error("payment method is required")]
    MissingPaymentMethod,
    #[error("user name must be between 2 and 50 characters long")]
    UserNameLength,
    #[error("email address is invalid")]
    InvalidEmail,
    #[error("password must be at least 6 characters long")]
    PasswordTooShort,
}

/// Constraint failures a repository reports in a form use cases can match on.
/// Carried inside `anyhow::Error` and recovered with `downcast_ref`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
    #[error("foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),
}

impl RepositoryError {
    /// Finds a `RepositoryError` anywhere in the error chain.
    pub fn find(err: &anyhow::Error) -> Option<&RepositoryError> {
        err.chain().find_map(|cause| cause.downcast_ref::<RepositoryError>())
    }
}
