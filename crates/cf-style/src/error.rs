//! Error types for style resolution.

use crate::ValueKind;

/// Error returned when style layers cannot be merged.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum StyleResolutionError {
    /// The same key holds different value kinds in two layers.
    #[error(
        "style setting `{key}` is a {existing} in layer `{existing_layer}` but a {found} in layer `{layer}`"
    )]
    KindMismatch {
        /// Dotted key of the conflicting setting.
        key: String,
        /// Kind recorded by the earlier layer.
        existing: ValueKind,
        /// Name of the earlier layer.
        existing_layer: String,
        /// Kind found in the later layer.
        found: ValueKind,
        /// Name of the later layer.
        layer: String,
    },
}
