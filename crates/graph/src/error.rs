use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Utterance has no segments")]
    Empty,

    #[error("Duplicate segment id: {0}")]
    DuplicateSegment(String),

    #[error("Link {link} references unknown segment '{segment}'")]
    UnknownSegment { link: usize, segment: String },

    #[error("Link {link} has confidence {confidence} outside [0, 1]")]
    InvalidConfidence { link: usize, confidence: String },

    #[error("Relation graph contains a cycle: {}", .path.join(" -> "))]
    Cycle { path: Vec<String> },

    #[error("Segment '{segment}' has salience {salience} outside [0, 1]")]
    InvalidSalience { segment: String, salience: String },
}
