use thiserror::Error;

pub type Result<T> = std::result::Result<T, CheckError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CheckError {
    #[error("Constraint '{constraint}' has an empty range: min {min} > max {max}")]
    InvalidRange {
        constraint: String,
        min: f64,
        max: f64,
    },

    #[error("Constraint '{constraint}' is malformed: {detail}")]
    Malformed { constraint: String, detail: String },

    #[error("Duplicate constraint id: {0}")]
    DuplicateConstraint(String),
}
