use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProtocolError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Order index {index} is out of range for a plan with {len} steps")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Step '{step}' depends on unknown step '{dependency}'")]
    UnknownDependency { step: String, dependency: String },

    #[error("Duplicate step id: {0}")]
    DuplicateStep(String),

    #[error("Step '{0}' depends on itself")]
    SelfDependency(String),

    #[error("{0}")]
    Other(String),
}
