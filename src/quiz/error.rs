use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading the question bank. Fatal at startup.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
    #[error("failed to read question file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse question file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("question bank is empty")]
    Empty,
    #[error("question #{index} has correct answer '{key}' which is not one of its options")]
    MissingCorrectKey { index: usize, key: String },
    #[error("question #{index} has {count} options, at most {max} are supported")]
    TooManyOptions {
        index: usize,
        count: usize,
        max: usize,
    },
}

/// Errors raised by quiz session operations. All of them are recoverable and
/// leave the participant's session untouched.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("'{input}' is not a valid number of questions, choose between 1 and {max}")]
    InvalidCount { input: String, max: usize },
    #[error("no quiz in progress")]
    NoActiveQuestion,
    #[error("no quiz was started for this participant")]
    NoSession,
    #[error("'{0}' is not one of the offered options")]
    UnknownLabel(String),
    #[error("question data is inconsistent: {0}")]
    DataIntegrity(String),
}
