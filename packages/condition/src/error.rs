use thiserror::Error;

pub type ConditionResult<T> = Result<T, ConditionError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConditionError {
    #[error("Unknown condition operator '{operator}'")]
    UnknownOperator { operator: String },

    #[error("Invalid operand for '{operator}': {message}")]
    InvalidOperand { operator: String, message: String },
}

impl ConditionError {
    pub fn unknown_operator(operator: impl Into<String>) -> Self {
        Self::UnknownOperator {
            operator: operator.into(),
        }
    }

    pub fn invalid_operand(operator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidOperand {
            operator: operator.into(),
            message: message.into(),
        }
    }
}
