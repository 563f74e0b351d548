//! Layer merging and CSS variable generation.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

use sha2::{Digest, Sha256};

use crate::StyleResolutionError;
use crate::layer::{FlatEntry, StyleLayer};
use crate::value::ValueKind;

/// Prefix of every generated CSS custom property.
const CSS_VAR_PREFIX: &str = "--cf-";

/// Resolved leaf value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolvedValue {
    /// Single CSS value.
    Scalar(String),
    /// Concatenated list of CSS values.
    List(Vec<String>),
}

impl ResolvedValue {
    /// Render the value as CSS text. Lists are joined with `, `.
    #[must_use]
    pub fn to_css(&self) -> String {
        match self {
            Self::Scalar(s) => s.clone(),
            Self::List(items) => items.join(", "),
        }
    }
}

/// A resolved setting with its CSS custom property name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedStyle {
    /// Merged value.
    pub value: ResolvedValue,
    /// CSS custom property name (e.g., `--cf-code-font-size`).
    pub css_var: String,
}

/// Flat result of [`resolve`].
///
/// Entries are ordered by dotted key, so serialization is deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedStyles {
    entries: BTreeMap<String, ResolvedStyle>,
    unknown_keys: BTreeSet<String>,
}

impl ResolvedStyles {
    /// Look up a resolved value by dotted key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ResolvedValue> {
        self.entries.get(key).map(|e| &e.value)
    }

    /// Look up a scalar value by dotted key.
    ///
    /// Returns `None` for missing keys and list values.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.get(key)? {
            ResolvedValue::Scalar(s) => Some(s),
            ResolvedValue::List(_) => None,
        }
    }

    /// CSS custom property name of a key.
    #[must_use]
    pub fn css_var(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|e| e.css_var.as_str())
    }

    /// `var(...)` reference to a key's custom property.
    ///
    /// # Example
    ///
    /// ```
    /// use cf_style::{StyleLayer, resolve};
    ///
    /// let resolved = resolve(&[StyleLayer::engine_defaults().with("code.background", "#000")])
    ///     .unwrap();
    /// assert_eq!(
    ///     resolved.var_ref("code.background").as_deref(),
    ///     Some("var(--cf-code-background)")
    /// );
    /// ```
    #[must_use]
    pub fn var_ref(&self, key: &str) -> Option<String> {
        self.css_var(key).map(|name| format!("var({name})"))
    }

    /// Iterate over `(dotted key, resolved setting)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResolvedStyle)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Keys supplied by theme or user layers without a default.
    #[must_use]
    pub fn unknown_keys(&self) -> &BTreeSet<String> {
        &self.unknown_keys
    }

    /// Number of resolved settings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no settings were resolved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// CSS custom property declarations, e.g. `--cf-a:1;--cf-b:2`.
    #[must_use]
    pub fn declarations(&self) -> String {
        let mut out = String::new();
        for entry in self.entries.values() {
            if !out.is_empty() {
                out.push(';');
            }
            let _ = write!(out, "{}:{}", entry.css_var, entry.value.to_css());
        }
        out
    }

    /// Declarations wrapped in a rule for `selector`.
    ///
    /// Returns an empty string when there are no entries.
    #[must_use]
    pub fn to_css_block(&self, selector: &str) -> String {
        if self.entries.is_empty() {
            return String::new();
        }
        format!("{selector}{{{}}}", self.declarations())
    }

    /// Settings whose value differs from `base` (or is missing there).
    ///
    /// Used to emit only the variables an alternate theme changes.
    #[must_use]
    pub fn diff(&self, base: &Self) -> Self {
        let entries = self
            .entries
            .iter()
            .filter(|(key, entry)| base.entries.get(*key) != Some(entry))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Self {
            entries,
            unknown_keys: BTreeSet::new(),
        }
    }

    /// Content fingerprint of the resolved settings.
    ///
    /// SHA-256 hex of the declarations string.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.declarations().as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Merge style layers, given in ascending priority, into flat settings.
///
/// # Errors
///
/// Returns [`StyleResolutionError::KindMismatch`] if one key holds different
/// value kinds in two layers.
pub fn resolve(layers: &[StyleLayer]) -> Result<ResolvedStyles, StyleResolutionError> {
    let mut kinds: BTreeMap<String, (ValueKind, &str)> = BTreeMap::new();
    let mut values: BTreeMap<String, ResolvedValue> = BTreeMap::new();
    let mut known: BTreeSet<String> = BTreeSet::new();
    let mut unknown_keys: BTreeSet<String> = BTreeSet::new();

    for layer in layers {
        for (key, entry) in layer.flatten() {
            let kind = entry.kind();
            if let Some((existing, existing_layer)) = kinds.get(&key)
                && *existing != kind
            {
                return Err(StyleResolutionError::KindMismatch {
                    key,
                    existing: *existing,
                    existing_layer: (*existing_layer).to_owned(),
                    found: kind,
                    layer: layer.name().to_owned(),
                });
            }

            match entry {
                FlatEntry::Map => {}
                FlatEntry::Scalar(value) => {
                    values.insert(key.clone(), ResolvedValue::Scalar(value.to_owned()));
                }
                FlatEntry::List(items) => match values.get_mut(&key) {
                    Some(ResolvedValue::List(existing)) if !layer.replaces(&key) => {
                        existing.extend(items.iter().cloned());
                    }
                    _ => {
                        values.insert(key.clone(), ResolvedValue::List(items.to_vec()));
                    }
                },
            }

            if kind != ValueKind::Map {
                if layer.kind().is_default() {
                    known.insert(key.clone());
                } else if !known.contains(&key) {
                    unknown_keys.insert(key.clone());
                }
            }
            kinds.insert(key, (kind, layer.name()));
        }
    }

    for key in &unknown_keys {
        tracing::warn!(key = %key, "Unknown style setting");
    }

    let entries = values
        .into_iter()
        .map(|(key, value)| {
            let css_var = css_variable_name(&key);
            (key, ResolvedStyle { value, css_var })
        })
        .collect();

    Ok(ResolvedStyles {
        entries,
        unknown_keys,
    })
}

/// CSS custom property name for a dotted key.
///
/// Segments are converted to kebab-case and joined with `-`.
///
/// # Example
///
/// ```
/// use cf_style::css_variable_name;
///
/// assert_eq!(css_variable_name("code.fontFamily"), "--cf-code-font-family");
/// assert_eq!(css_variable_name("frames.shadowColor"), "--cf-frames-shadow-color");
/// ```
#[must_use]
pub fn css_variable_name(key: &str) -> String {
    let mut name = String::with_capacity(CSS_VAR_PREFIX.len() + key.len() + 4);
    name.push_str(CSS_VAR_PREFIX);

    let mut prev_dash = true;
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            if !prev_dash {
                name.push('-');
            }
            name.push(c.to_ascii_lowercase());
            prev_dash = false;
        } else if c.is_ascii_alphanumeric() {
            name.push(c);
            prev_dash = false;
        } else if !prev_dash {
            name.push('-');
            prev_dash = true;
        }
    }

    if name.ends_with('-') && name.len() > CSS_VAR_PREFIX.len() {
        name.pop();
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LayerKind, StyleValue};
    use pretty_assertions::assert_eq;

    fn layers() -> Vec<StyleLayer> {
        vec![
            StyleLayer::engine_defaults()
                .with("code.fontSize", "0.85rem")
                .with("code.fontFamily", StyleValue::list(["ui-monospace"]))
                .with("code.background", "#fff"),
            StyleLayer::plugin_defaults("frames")
                .with("frames.titleColor", "#333")
                .with("code.fontFamily", StyleValue::list(["Menlo"])),
            StyleLayer::theme("github-dark").with("code.background", "#0d1117"),
            StyleLayer::user()
                .with("code.fontSize", "1rem")
                .with("code.fontFamily", StyleValue::list(["Fira Code"])),
        ]
    }

    #[test]
    fn test_scalar_highest_layer_wins() {
        let resolved = resolve(&layers()).unwrap();
        assert_eq!(resolved.get_str("code.fontSize"), Some("1rem"));
        assert_eq!(resolved.get_str("code.background"), Some("#0d1117"));
        assert_eq!(resolved.get_str("frames.titleColor"), Some("#333"));
    }

    #[test]
    fn test_lists_concatenate_in_priority_order() {
        let resolved = resolve(&layers()).unwrap();
        assert_eq!(
            resolved.get("code.fontFamily"),
            Some(&ResolvedValue::List(vec![
                "ui-monospace".to_owned(),
                "Menlo".to_owned(),
                "Fira Code".to_owned(),
            ]))
        );
    }

    #[test]
    fn test_replace_restarts_list() {
        let mut layers = layers();
        layers[3].mark_replace("code.fontFamily");
        layers.push(StyleLayer::new(LayerKind::User, "late").with(
            "code.fontFamily",
            StyleValue::list(["monospace"]),
        ));

        let resolved = resolve(&layers).unwrap();
        assert_eq!(
            resolved.get("code.fontFamily"),
            Some(&ResolvedValue::List(vec![
                "Fira Code".to_owned(),
                "monospace".to_owned(),
            ]))
        );
    }

    #[test]
    fn test_kind_mismatch_scalar_vs_map() {
        let layers = vec![
            StyleLayer::engine_defaults().with("frames.titleColor", "#333"),
            StyleLayer::user().with("frames", "none"),
        ];

        let err = resolve(&layers).unwrap_err();
        assert_eq!(
            err,
            StyleResolutionError::KindMismatch {
                key: "frames".to_owned(),
                existing: ValueKind::Map,
                existing_layer: "engine".to_owned(),
                found: ValueKind::Scalar,
                layer: "user".to_owned(),
            }
        );
    }

    #[test]
    fn test_kind_mismatch_scalar_vs_list() {
        let layers = vec![
            StyleLayer::engine_defaults().with("code.fontFamily", StyleValue::list(["a"])),
            StyleLayer::theme("t").with("code.fontFamily", "b"),
        ];

        let err = resolve(&layers).unwrap_err();
        assert!(err.to_string().contains("`code.fontFamily`"), "{err}");
    }

    #[test]
    fn test_unknown_keys_pass_through() {
        let layers = vec![
            StyleLayer::engine_defaults().with("code.fontSize", "1rem"),
            StyleLayer::user().with("future.setting", "on"),
        ];

        let resolved = resolve(&layers).unwrap();
        assert_eq!(resolved.get_str("future.setting"), Some("on"));
        assert_eq!(
            resolved.unknown_keys().iter().collect::<Vec<_>>(),
            vec!["future.setting"]
        );
    }

    #[test]
    fn test_plugin_defaults_are_known() {
        let resolved = resolve(&layers()).unwrap();
        assert!(resolved.unknown_keys().is_empty());
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let first = resolve(&layers()).unwrap();
        let second = resolve(&layers()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.declarations(), second.declarations());
        assert_eq!(first.fingerprint(), second.fingerprint());
    }

    #[test]
    fn test_insertion_order_does_not_matter() {
        let a = StyleLayer::engine_defaults()
            .with("x.b", "2")
            .with("x.a", "1");
        let b = StyleLayer::engine_defaults()
            .with("x.a", "1")
            .with("x.b", "2");

        assert_eq!(
            resolve(&[a]).unwrap().declarations(),
            resolve(&[b]).unwrap().declarations()
        );
    }

    #[test]
    fn test_declarations() {
        let resolved = resolve(&[StyleLayer::engine_defaults()
            .with("code.fontSize", "1rem")
            .with("code.fontFamily", StyleValue::list(["a", "b"]))])
        .unwrap();

        assert_eq!(
            resolved.declarations(),
            "--cf-code-font-family:a, b;--cf-code-font-size:1rem"
        );
        assert_eq!(
            resolved.to_css_block(":root"),
            ":root{--cf-code-font-family:a, b;--cf-code-font-size:1rem}"
        );
    }

    #[test]
    fn test_empty_css_block() {
        let resolved = ResolvedStyles::default();
        assert_eq!(resolved.to_css_block(":root"), "");
    }

    #[test]
    fn test_diff() {
        let dark = resolve(&[StyleLayer::engine_defaults()
            .with("code.background", "#000")
            .with("code.fontSize", "1rem")])
        .unwrap();
        let light = resolve(&[StyleLayer::engine_defaults()
            .with("code.background", "#fff")
            .with("code.fontSize", "1rem")])
        .unwrap();

        let diff = light.diff(&dark);
        assert_eq!(diff.declarations(), "--cf-code-background:#fff");
    }

    #[test]
    fn test_css_variable_name() {
        assert_eq!(css_variable_name("code.fontSize"), "--cf-code-font-size");
        assert_eq!(css_variable_name("borderRadius"), "--cf-border-radius");
        assert_eq!(css_variable_name("a.b_c"), "--cf-a-b-c");
        assert_eq!(css_variable_name("URL"), "--cf-u-r-l");
        assert_eq!(css_variable_name("trailing."), "--cf-trailing");
    }
}
