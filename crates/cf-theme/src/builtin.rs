//! Themes bundled with the crate.

/// Names of the bundled themes.
pub const BUILTIN_THEMES: &[&str] = &["github-dark", "github-light"];

/// Raw JSON of a bundled theme.
pub(crate) fn source(name: &str) -> Option<&'static str> {
    match name {
        "github-dark" => Some(include_str!("../themes/github-dark.json")),
        "github-light" => Some(include_str!("../themes/github-light.json")),
        _ => None,
    }
}
