use kontext_common::LoopError;
use kontext_condition::ConditionError;
use kontext_dom::DomError;
use kontext_parser::ParseError;
use thiserror::Error;

pub type KontextResult<T> = Result<T, KontextError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum KontextError {
    #[error(transparent)]
    Dom(#[from] DomError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Condition(#[from] ConditionError),

    #[error(transparent)]
    Loop(#[from] LoopError),

    #[error("Extension '{extension}' requires a target")]
    MissingTarget { extension: String },

    #[error("Unknown function '{name}'")]
    UnknownFunction { name: String },

    #[error("Cannot prepare a model from {found}")]
    NotAnObject { found: String },

    #[error("Environment does not support {feature}")]
    Unsupported { feature: String },

    #[error("Invalid configuration: {message}")]
    Config { message: String },
}

impl KontextError {
    pub fn missing_target(extension: impl Into<String>) -> Self {
        Self::MissingTarget {
            extension: extension.into(),
        }
    }

    pub fn unknown_function(name: impl Into<String>) -> Self {
        Self::UnknownFunction { name: name.into() }
    }

    pub fn not_an_object(found: impl Into<String>) -> Self {
        Self::NotAnObject {
            found: found.into(),
        }
    }

    pub fn unsupported(feature: impl Into<String>) -> Self {
        Self::Unsupported {
            feature: feature.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
