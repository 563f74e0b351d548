//! Error types for theme loading.

/// Error returned when a theme cannot be loaded or normalized.
///
/// Errors are `Clone` because the theme cache hands the same result to every
/// caller waiting on one fingerprint.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ThemeLoadError {
    /// No built-in theme has this name.
    #[error("unknown built-in theme `{0}`")]
    UnknownBuiltin(String),

    /// A color value could not be parsed.
    #[error("theme `{theme}`: invalid color `{value}` for `{token}`")]
    InvalidColor {
        /// Theme name.
        theme: String,
        /// Color token or rule location.
        token: String,
        /// Offending value.
        value: String,
    },

    /// A required color token is missing.
    #[error("theme `{theme}`: missing required color `{token}`")]
    MissingToken {
        /// Theme name.
        theme: String,
        /// Missing token name.
        token: String,
    },

    /// The input is not a theme object.
    #[error("malformed theme: {0}")]
    Malformed(String),
}
