//! Environment variable expansion for configuration strings.

use std::borrow::Cow;

use crate::ConfigError;

/// Expand `${VAR}` and `${VAR:-default}` references in `value` from the
/// process environment.
///
/// Values without `${` are returned unchanged, so bare `$` in paths is left
/// alone. `field` names the setting in error messages.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    expand_with(value, field, |name| std::env::var(name).ok())
}

/// Expand references using `lookup` to resolve variable names.
fn expand_with<F>(value: &str, field: &str, lookup: F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    shellexpand::env_with_context(value, |name| {
        lookup(name).map(Some).ok_or_else(|| Unset(name.to_owned()))
    })
    .map(Cow::into_owned)
    .map_err(|e| ConfigError::EnvVar {
        field: field.to_owned(),
        message: format!("${{{}}} not set", e.cause.0),
    })
}

struct Unset(String);

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|&(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_expand_theme_dir() {
        let lookup = vars(&[("THEME_DIR", "/opt/themes")]);
        let result = expand_with("${THEME_DIR}/dracula.json", "themes[0]", lookup).unwrap();
        assert_eq!(result, "/opt/themes/dracula.json");
    }

    #[test]
    fn test_default_used_when_unset() {
        let result = expand_with("${THEME_DIR:-themes}/a.json", "themes[0]", vars(&[])).unwrap();
        assert_eq!(result, "themes/a.json");
    }

    #[test]
    fn test_value_preferred_over_default() {
        let lookup = vars(&[("FLAVOR", "mocha")]);
        let result = expand_with("${FLAVOR:-latte}", "themes[1]", lookup).unwrap();
        assert_eq!(result, "mocha");
    }

    #[test]
    fn test_several_references_in_one_value() {
        let lookup = vars(&[("ROOT", "/srv"), ("NAME", "nord")]);
        let result = expand_with("${ROOT}/themes/${NAME}.json", "themes[0]", lookup).unwrap();
        assert_eq!(result, "/srv/themes/nord.json");
    }

    #[test]
    fn test_missing_var_names_field() {
        let err = expand_with("${THEME_DIR}/a.json", "themes[2]", vars(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert_eq!(
            err.to_string(),
            "Environment variable error in themes[2]: ${THEME_DIR} not set"
        );
    }

    #[test]
    fn test_plain_values_untouched() {
        let lookup = vars(&[("HOME", "/root")]);
        assert_eq!(expand_with("github-dark", "themes[0]", &lookup).unwrap(), "github-dark");
        assert_eq!(expand_with("$HOME/a.json", "themes[0]", &lookup).unwrap(), "$HOME/a.json");
    }

    #[test]
    fn test_process_environment_lookup() {
        // cargo sets the manifest dir for test binaries at runtime too.
        let dir = expand_env("${CARGO_MANIFEST_DIR}", "themes[0]").unwrap();
        assert_eq!(dir, env!("CARGO_MANIFEST_DIR"));
    }
}
