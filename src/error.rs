use thiserror::Error;

/// Errors raised before an optimizer starts iterating.
///
/// Divergence and budget exhaustion are not errors: they are reported through
/// [`Status`](crate::math::optimization::Status) on a successful return so the
/// caller keeps the partial history.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A hyperparameter is missing, non-finite or out of its domain.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// A relation between hyperparameters that the algorithm depends on does not hold.
    #[error("constraint violated: {0}")]
    ConstraintViolation(String),

    /// The objective catalog has no function registered under this name.
    #[error("unknown objective function `{0}`")]
    UnknownObjective(String),
}

impl Error {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
