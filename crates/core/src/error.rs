//! Error types for the annotation engine
//!
//! Every fallible engine operation returns an [`AnnotatorError`]. None of them
//! is fatal to the host: callers inspect the variant and decide whether to
//! ignore it, warn, or skip a persisted entry.

use crate::command::CommandState;

/// Which half of a command's replay protocol failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayOperation {
    Execute,
    Undo,
}

impl std::fmt::Display for ReplayOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReplayOperation::Execute => f.write_str("execute"),
            ReplayOperation::Undo => f.write_str("undo"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AnnotatorError {
    /// A recorded annotation index no longer maps to a live record.
    #[error("annotation index {index} out of range (len={len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// A selection does not intersect any hit-test units.
    #[error("selection {start}..={end} does not intersect any of {available} hit-test units")]
    InvalidRegionRange { start: usize, end: usize, available: usize },

    /// A command failed to execute or undo against the store.
    ///
    /// When raised by the history the command has been dropped and the
    /// history is one entry shorter than before.
    #[error("command {operation} failed: {source}")]
    CommandReplayFailure {
        operation: ReplayOperation,
        #[source]
        source: Box<AnnotatorError>,
    },

    /// Persisted annotation or history data failed structural validation.
    #[error("corrupt persisted state: {0}")]
    CorruptPersistedState(String),

    /// The store rejected a record for a page the document does not have.
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },

    /// A command was asked to execute or undo from a state that does not allow it.
    #[error("cannot {operation} a command that is {state:?}")]
    InvalidCommandState { operation: ReplayOperation, state: CommandState },

    /// A command with no regions has nothing to apply or revert.
    #[error("command has no regions")]
    EmptyCommand,

    /// An external collaborator (text extraction, OCR, output writer) failed.
    #[error("collaborator error: {0}")]
    Collaborator(String),

    #[error("failed to encode session state: {0}")]
    Encode(#[from] serde_json::Error),
}

impl AnnotatorError {
    pub(crate) fn replay(operation: ReplayOperation, source: AnnotatorError) -> Self {
        AnnotatorError::CommandReplayFailure { operation, source: Box::new(source) }
    }

    /// Errors that mean "nothing valid was selected" and should degrade to a
    /// no-op instead of reaching the user.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AnnotatorError::IndexOutOfRange { .. }
                | AnnotatorError::InvalidRegionRange { .. }
                | AnnotatorError::EmptyCommand
        )
    }
}

/// Result type for engine operations
pub type AnnotatorResult<T> = Result<T, AnnotatorError>;
