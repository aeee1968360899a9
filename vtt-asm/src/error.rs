//! Assembler errors.

use thiserror::Error;

use crate::bytecode::{DecodeError, EncodeError};

/// An error that stops assembling, parsing or encoding a program.
///
/// Line numbers are 1-based and refer to the input text.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Error {
    #[error("line {line}: syntax error in '{text}': {reason}")]
    Syntax {
        line: usize,
        text: String,
        reason: String,
    },

    #[error("line {line}: unresolved variable '{name}'")]
    UnresolvedVariable { line: usize, name: String },

    #[error("line {line}: unresolved label '#{name}'")]
    UnresolvedLabel { line: usize, name: String },

    #[error("line {line}: label '#{name}' is already defined on line {first}")]
    DuplicateLabel {
        line: usize,
        name: String,
        first: usize,
    },

    #[error("line {line}: malformed jump binding in '{text}': {reason}")]
    MalformedJumpBinding {
        line: usize,
        text: String,
        reason: String,
    },

    #[error("line {line}: jump distance {distance} does not fit in a signed 16-bit word")]
    JumpOutOfRange { line: usize, distance: i64 },

    /// The jump resolver hit its pass limit. This indicates a bug.
    #[error("jump resolution did not converge after {passes} passes")]
    Unconverged { passes: usize },

    #[error("Error decoding bytecode: {0}")]
    Decode(#[from] DecodeError),

    #[error("Error encoding bytecode: {0}")]
    Encode(#[from] EncodeError),
}

impl Error {
    pub(crate) fn syntax(line: usize, text: &str, reason: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            text: text.trim().to_owned(),
            reason: reason.into(),
        }
    }

    pub(crate) fn binding(line: usize, text: &str, reason: impl Into<String>) -> Self {
        Self::MalformedJumpBinding {
            line,
            text: text.trim().to_owned(),
            reason: reason.into(),
        }
    }

    /// Returns the input line the error refers to, if any.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Syntax { line, .. }
            | Self::UnresolvedVariable { line, .. }
            | Self::UnresolvedLabel { line, .. }
            | Self::DuplicateLabel { line, .. }
            | Self::MalformedJumpBinding { line, .. }
            | Self::JumpOutOfRange { line, .. } => Some(*line),
            Self::Unconverged { .. } | Self::Decode(_) | Self::Encode(_) => None,
        }
    }
}
