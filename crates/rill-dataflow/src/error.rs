//! Typed errors for factory registration and dispatch.
//!
//! These are configuration faults: a process that hits one at startup or
//! at plan dispatch is misassembled, so nothing here is retryable.

use std::fmt;

#[derive(Debug)]
pub enum FactoryError {
    /// Registration used an empty type name.
    EmptyTypeName,
    /// A creator is already registered under this type name.
    DuplicateRegistration(String),
    /// No creator is registered under the descriptor's type name.
    UnknownConnectorType(String),
    /// The settings envelope declares a different type than the creator expects.
    SettingsTypeMismatch {
        type_name: String,
        expected: String,
        actual: String,
    },
    /// The settings payload did not decode as the expected type.
    SettingsDecodeFailure { type_name: String, message: String },
    /// Settings could not be packed into an envelope.
    SettingsEncodeFailure { type_url: String, message: String },
    /// The creator itself failed to build a pair.
    CreatorFailed { type_name: String, message: String },
}

impl fmt::Display for FactoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactoryError::EmptyTypeName => write!(f, "connector type name is empty"),
            FactoryError::DuplicateRegistration(name) => {
                write!(f, "connector type '{}' is already registered", name)
            }
            FactoryError::UnknownConnectorType(name) => {
                write!(f, "unknown connector type '{}'", name)
            }
            FactoryError::SettingsTypeMismatch {
                type_name,
                expected,
                actual,
            } => write!(
                f,
                "'{}' settings are expected to have type {}, but got {}",
                type_name, expected, actual
            ),
            FactoryError::SettingsDecodeFailure { type_name, message } => {
                write!(f, "'{}' settings failed to decode: {}", type_name, message)
            }
            FactoryError::SettingsEncodeFailure { type_url, message } => {
                write!(f, "settings {} failed to encode: {}", type_url, message)
            }
            FactoryError::CreatorFailed { type_name, message } => {
                write!(f, "creator for '{}' failed: {}", type_name, message)
            }
        }
    }
}

impl std::error::Error for FactoryError {}
