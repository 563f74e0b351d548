//! Error types for rendering.

use std::fmt;

use cf_style::StyleResolutionError;
use cf_theme::ThemeLoadError;

use crate::block::BlockState;
use crate::plugin::Stage;

/// Error returned by a plugin hook.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Result type of plugin hooks.
pub type HookResult = Result<(), HookError>;

/// Result type of this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error returned by [`Renderer::new`](crate::Renderer::new),
/// [`Renderer::render`](crate::Renderer::render) and block mutations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Malformed block input.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A plugin hook failed.
    #[error("plugin `{plugin}` failed in stage `{stage}`")]
    Plugin {
        /// Name of the failing plugin.
        plugin: String,
        /// Stage the hook was registered for.
        stage: Stage,
        /// Error returned by the hook.
        #[source]
        source: HookError,
    },

    /// A theme could not be loaded.
    #[error(transparent)]
    ThemeLoad(#[from] ThemeLoadError),

    /// Style layers could not be merged.
    #[error(transparent)]
    StyleResolution(#[from] StyleResolutionError),

    /// A mutation was attempted outside the stage that allows it.
    #[error(transparent)]
    State(#[from] StateError),
}

/// Error returned for malformed block input.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ValidationError {
    /// A quoted string, range list or regex in the metadata is not closed.
    #[error("unterminated `{delimiter}` in code block metadata at byte {position}")]
    UnterminatedToken {
        /// Opening delimiter (`"`, `'`, `{` or `/`).
        delimiter: char,
        /// Byte offset of the opening delimiter.
        position: usize,
    },

    /// A line index is past the end of the block.
    #[error("line {line} is out of bounds (block has {line_count} lines)")]
    LineOutOfBounds {
        /// Requested line index.
        line: usize,
        /// Number of lines in the block.
        line_count: usize,
    },

    /// An inline range exceeds its line.
    #[error("range {start}..{end} is out of bounds for line {line} ({len} characters)")]
    RangeOutOfBounds {
        /// Line index.
        line: usize,
        /// Range start (characters).
        start: usize,
        /// Range end (characters).
        end: usize,
        /// Line length (characters).
        len: usize,
    },

    /// An inline range covers no characters.
    #[error("empty range at character {start} of line {line}")]
    EmptyRange {
        /// Line index.
        line: usize,
        /// Range start (characters).
        start: usize,
    },

    /// A group was created without blocks.
    #[error("a block group needs at least one block")]
    EmptyGroup,

    /// Blocks of one group reference different documents.
    #[error("block {index} belongs to a different document than the rest of its group")]
    MixedDocuments {
        /// Index of the first mismatching block.
        index: usize,
    },
}

/// Error returned when a block is mutated outside the stage that allows it.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("cannot {operation} while block is {state}")]
pub struct StateError {
    /// Attempted operation (e.g., "add annotation").
    pub operation: &'static str,
    /// Block state at the time of the attempt.
    pub state: BlockState,
}

impl fmt::Display for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::InStage(stage) => write!(f, "in stage `{stage}`"),
            Self::Finalized => f.write_str("finalized"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plugin_error_message() {
        let err = Error::Plugin {
            plugin: "frames".to_owned(),
            stage: Stage::AnnotateCode,
            source: "boom".into(),
        };
        assert_eq!(
            err.to_string(),
            "plugin `frames` failed in stage `annotate-code`"
        );
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "boom");
    }

    #[test]
    fn test_state_error_message() {
        let err = StateError {
            operation: "add annotation",
            state: BlockState::Finalized,
        };
        assert_eq!(err.to_string(), "cannot add annotation while block is finalized");

        let err = StateError {
            operation: "edit code",
            state: BlockState::InStage(Stage::AnnotateCode),
        };
        assert_eq!(
            err.to_string(),
            "cannot edit code while block is in stage `annotate-code`"
        );
    }

    #[test]
    fn test_validation_error_message() {
        let err = ValidationError::UnterminatedToken {
            delimiter: '"',
            position: 6,
        };
        assert_eq!(
            err.to_string(),
            "unterminated `\"` in code block metadata at byte 6"
        );
    }
}
