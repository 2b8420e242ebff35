use thiserror::Error;

pub type Result<T> = std::result::Result<T, SurvivalError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SurvivalError {
    #[error("survival input is broken: {message}")]
    InvalidInput { message: String },

    #[error("not enough groups to compare: {message}")]
    InsufficientGroups { message: String },

    #[error("at-risk bookkeeping went wrong: {message}")]
    InconsistentAtRisk { message: String },

    #[error("bad parameter: {parameter} = {value}")]
    InvalidParameter { parameter: String, value: String },

    #[error("numerical issues: {message}")]
    NumericalError { message: String },
}

impl SurvivalError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput { message: message.into() }
    }

    pub fn insufficient_groups(message: impl Into<String>) -> Self {
        Self::InsufficientGroups { message: message.into() }
    }

    pub fn inconsistent_at_risk(message: impl Into<String>) -> Self {
        Self::InconsistentAtRisk { message: message.into() }
    }

    pub fn invalid_parameter(parameter: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            value: value.into(),
        }
    }

    pub fn numerical_error(message: impl Into<String>) -> Self {
        Self::NumericalError { message: message.into() }
    }

    /// true when the caller sent something we can't analyze (4xx territory),
    /// false for internal failures
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput { .. }
                | Self::InsufficientGroups { .. }
                | Self::InvalidParameter { .. }
        )
    }
}
