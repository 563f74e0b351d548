//! Fingerprint-keyed theme cache.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use sha2::{Digest, Sha256};

use crate::builtin;
use crate::{Theme, ThemeLoadError};

/// Theme input accepted by [`ThemeManager::load`].
#[derive(Clone, Debug)]
pub enum ThemeInput {
    /// Name of a bundled theme (see [`BUILTIN_THEMES`](crate::BUILTIN_THEMES)).
    Builtin(String),
    /// Raw color theme object (VS Code theme JSON).
    Raw(serde_json::Value),
    /// Already normalized theme.
    Normalized(Arc<Theme>),
}

impl ThemeInput {
    /// Create a built-in theme input.
    #[must_use]
    pub fn builtin(name: impl Into<String>) -> Self {
        Self::Builtin(name.into())
    }

    /// Cache key of this input, prefixed with the input kind.
    ///
    /// - Built-in: `builtin:<name>`
    /// - Raw: `raw:` and the SHA-256 hex of the canonical JSON serialization
    /// - Normalized: `normalized:` and the theme's own fingerprint
    #[must_use]
    pub fn fingerprint(&self) -> String {
        match self {
            Self::Builtin(name) => format!("builtin:{name}"),
            Self::Raw(value) => {
                let mut hasher = Sha256::new();
                hasher.update(value.to_string().as_bytes());
                format!("raw:{}", hex::encode(hasher.finalize()))
            }
            Self::Normalized(theme) => format!("normalized:{}", theme.fingerprint()),
        }
    }
}

impl From<&str> for ThemeInput {
    fn from(name: &str) -> Self {
        Self::Builtin(name.to_owned())
    }
}

impl From<serde_json::Value> for ThemeInput {
    fn from(value: serde_json::Value) -> Self {
        Self::Raw(value)
    }
}

impl From<Arc<Theme>> for ThemeInput {
    fn from(theme: Arc<Theme>) -> Self {
        Self::Normalized(theme)
    }
}

type Slot = Arc<OnceLock<Result<Arc<Theme>, ThemeLoadError>>>;

/// Cache of normalized themes keyed by fingerprint.
///
/// Safe to share between threads. The first request for a fingerprint
/// normalizes the theme; concurrent requests for the same fingerprint wait
/// for that computation instead of repeating it. Failures are cached as well,
/// since normalization is a pure function of the input.
///
/// # Example
///
/// ```
/// use cf_theme::{ThemeInput, ThemeKind, ThemeManager};
///
/// let manager = ThemeManager::new();
/// let first = manager.load(&ThemeInput::builtin("github-light")).unwrap();
/// let second = manager.load(&ThemeInput::builtin("github-light")).unwrap();
///
/// assert_eq!(first.kind(), ThemeKind::Light);
/// assert!(std::sync::Arc::ptr_eq(&first, &second));
/// assert_eq!(manager.computations(), 1);
/// ```
#[derive(Debug, Default)]
pub struct ThemeManager {
    slots: Mutex<HashMap<String, Slot>>,
    computations: AtomicUsize,
}

impl ThemeManager {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and normalize a theme, reusing the cached result for its
    /// fingerprint.
    ///
    /// Normalized inputs are returned as is and never enter the cache.
    ///
    /// # Errors
    ///
    /// Returns [`ThemeLoadError`] if the built-in name is unknown or the theme
    /// data is invalid.
    pub fn load(&self, input: &ThemeInput) -> Result<Arc<Theme>, ThemeLoadError> {
        if let ThemeInput::Normalized(theme) = input {
            return Ok(Arc::clone(theme));
        }
        let fingerprint = input.fingerprint();
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(fingerprint.clone()).or_default())
        };

        let mut computed = false;
        let result = slot.get_or_init(|| {
            computed = true;
            self.computations.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(fingerprint = %fingerprint, "Theme cache miss");
            normalize(input, &fingerprint)
        });

        if !computed {
            tracing::debug!(fingerprint = %fingerprint, "Theme cache hit");
        }
        result.clone()
    }

    /// Load several themes in order.
    ///
    /// # Errors
    ///
    /// Returns the first [`ThemeLoadError`] encountered.
    pub fn load_all(&self, inputs: &[ThemeInput]) -> Result<Vec<Arc<Theme>>, ThemeLoadError> {
        inputs.iter().map(|input| self.load(input)).collect()
    }

    /// Drop the cached result for `input`.
    ///
    /// Returns whether an entry was removed. Callers already holding the
    /// theme keep their `Arc`; the next load normalizes again.
    pub fn evict(&self, input: &ThemeInput) -> bool {
        let fingerprint = input.fingerprint();
        let removed = self
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&fingerprint)
            .is_some();
        if removed {
            tracing::debug!(fingerprint = %fingerprint, "Theme evicted");
        }
        removed
    }

    /// Drop every cached theme.
    pub fn clear(&self) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        tracing::debug!(count = slots.len(), "Theme cache cleared");
        slots.clear();
    }

    /// Number of normalizations performed (cache misses).
    #[must_use]
    pub fn computations(&self) -> usize {
        self.computations.load(Ordering::Relaxed)
    }

    /// Number of cached fingerprints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing has been cached yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn normalize(input: &ThemeInput, fingerprint: &str) -> Result<Arc<Theme>, ThemeLoadError> {
    match input {
        ThemeInput::Builtin(name) => {
            let source =
                builtin::source(name).ok_or_else(|| ThemeLoadError::UnknownBuiltin(name.clone()))?;
            let value: serde_json::Value = serde_json::from_str(source)
                .map_err(|e| ThemeLoadError::Malformed(e.to_string()))?;
            Theme::from_json(&value, name, fingerprint).map(Arc::new)
        }
        ThemeInput::Raw(value) => {
            let hash = fingerprint.strip_prefix("raw:").unwrap_or(fingerprint);
            let name = format!("custom-{}", hash.get(..8).unwrap_or(hash));
            Theme::from_json(value, &name, fingerprint).map(Arc::new)
        }
        ThemeInput::Normalized(theme) => Ok(Arc::clone(theme)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;
    use serde_json::json;

    fn raw_theme() -> serde_json::Value {
        json!({
            "name": "raw",
            "colors": { "editor.background": "#202020", "editor.foreground": "#f0f0f0" }
        })
    }

    #[test]
    fn test_builtin_is_cached() {
        let manager = ThemeManager::new();
        let a = manager.load(&"github-dark".into()).unwrap();
        let b = manager.load(&"github-dark".into()).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(manager.computations(), 1);
        assert_eq!(a.fingerprint(), "builtin:github-dark");
    }

    #[test]
    fn test_raw_fingerprint_is_content_hash() {
        let a = ThemeInput::Raw(raw_theme());
        let b = ThemeInput::Raw(raw_theme());
        let mut changed = raw_theme();
        changed["colors"]["editor.background"] = json!("#212121");
        let c = ThemeInput::Raw(changed);

        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert!(a.fingerprint().starts_with("raw:"));
        assert_eq!(a.fingerprint().len(), "raw:".len() + 64);
    }

    #[test]
    fn test_raw_themes_share_cache_entry() {
        let manager = ThemeManager::new();
        let a = manager.load(&ThemeInput::Raw(raw_theme())).unwrap();
        let b = manager.load(&ThemeInput::Raw(raw_theme())).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(manager.computations(), 1);
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_normalized_input_passes_through() {
        let manager = ThemeManager::new();
        let theme = manager.load(&ThemeInput::Raw(raw_theme())).unwrap();
        let again = manager
            .load(&ThemeInput::Normalized(Arc::clone(&theme)))
            .unwrap();

        assert!(Arc::ptr_eq(&theme, &again));
        assert_eq!(manager.computations(), 1);
    }

    #[test]
    fn test_normalized_fingerprint_cannot_shadow_builtin() {
        let manager = ThemeManager::new();
        let impostor =
            Arc::new(Theme::from_json(&raw_theme(), "raw", "builtin:github-dark").unwrap());
        let input = ThemeInput::Normalized(Arc::clone(&impostor));

        assert_eq!(input.fingerprint(), "normalized:builtin:github-dark");
        assert!(Arc::ptr_eq(&manager.load(&input).unwrap(), &impostor));

        let builtin = manager.load(&"github-dark".into()).unwrap();
        assert_eq!(builtin.name(), "github-dark");
        assert!(!manager.is_empty());
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_unnamed_raw_themes_get_distinct_names() {
        let manager = ThemeManager::new();
        let first = ThemeInput::Raw(json!({
            "colors": { "editor.background": "#101010", "editor.foreground": "#fafafa" }
        }));
        let second = ThemeInput::Raw(json!({
            "colors": { "editor.background": "#fafafa", "editor.foreground": "#101010" }
        }));

        let a = manager.load(&first).unwrap();
        let b = manager.load(&second).unwrap();

        assert!(a.name().starts_with("custom-"));
        assert!(b.name().starts_with("custom-"));
        assert_ne!(a.name(), b.name());
        assert_eq!(a.name(), format!("custom-{}", &first.fingerprint()[4..12]));
    }

    #[test]
    fn test_evict_forces_recompute() {
        let manager = ThemeManager::new();
        let input = ThemeInput::Raw(raw_theme());
        let before = manager.load(&input).unwrap();

        assert!(manager.evict(&input));
        assert!(!manager.evict(&input));
        assert!(manager.is_empty());

        let after = manager.load(&input).unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(before, after);
        assert_eq!(manager.computations(), 2);
    }

    #[test]
    fn test_clear() {
        let manager = ThemeManager::new();
        manager
            .load_all(&["github-light".into(), "github-dark".into()])
            .unwrap();
        assert_eq!(manager.len(), 2);

        manager.clear();
        assert!(manager.is_empty());
        manager.load(&"github-light".into()).unwrap();
        assert_eq!(manager.computations(), 3);
    }

    #[test]
    fn test_unknown_builtin() {
        let manager = ThemeManager::new();
        let err = manager.load(&"nope".into()).unwrap_err();
        assert_eq!(err, ThemeLoadError::UnknownBuiltin("nope".to_owned()));
    }

    #[test]
    fn test_errors_are_cached() {
        let manager = ThemeManager::new();
        let bad = ThemeInput::Raw(json!({ "colors": {} }));

        assert!(manager.load(&bad).is_err());
        assert!(manager.load(&bad).is_err());
        assert_eq!(manager.computations(), 1);
    }

    #[test]
    fn test_concurrent_first_loads_compute_once() {
        let manager = ThemeManager::new();
        let input = ThemeInput::Raw(raw_theme());

        let themes: Vec<_> = (0..64)
            .into_par_iter()
            .map(|_| manager.load(&input).unwrap())
            .collect();

        assert_eq!(manager.computations(), 1);
        assert!(themes.iter().all(|t| Arc::ptr_eq(t, &themes[0])));
    }

    #[test]
    fn test_load_all_preserves_order() {
        let manager = ThemeManager::new();
        let themes = manager
            .load_all(&["github-light".into(), "github-dark".into()])
            .unwrap();

        let names: Vec<_> = themes.iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["github-light", "github-dark"]);
    }
}
