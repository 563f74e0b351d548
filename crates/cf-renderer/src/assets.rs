//! Style and script payload collection with deduplication.

use std::collections::HashSet;

/// Ordered, deduplicated style and script payloads.
///
/// Payloads are compared by exact text; the first occurrence keeps its
/// position. Empty payloads are ignored.
#[derive(Clone, Debug, Default)]
pub struct Assets {
    styles: Vec<String>,
    script_modules: Vec<String>,
    seen_styles: HashSet<String>,
    seen_scripts: HashSet<String>,
}

impl Assets {
    /// Create an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a style sheet. Returns `false` if it was already present.
    pub fn add_style(&mut self, css: impl Into<String>) -> bool {
        push_unique(&mut self.styles, &mut self.seen_styles, css.into())
    }

    /// Add a JavaScript module. Returns `false` if it was already present.
    pub fn add_script_module(&mut self, js: impl Into<String>) -> bool {
        push_unique(&mut self.script_modules, &mut self.seen_scripts, js.into())
    }

    /// Style sheets in first-seen order.
    #[must_use]
    pub fn styles(&self) -> &[String] {
        &self.styles
    }

    /// JavaScript modules in first-seen order.
    #[must_use]
    pub fn script_modules(&self) -> &[String] {
        &self.script_modules
    }

    /// Whether a style sheet was already added.
    #[must_use]
    pub fn contains_style(&self, css: &str) -> bool {
        self.seen_styles.contains(css)
    }

    /// Whether a script module was already added.
    #[must_use]
    pub fn contains_script_module(&self, js: &str) -> bool {
        self.seen_scripts.contains(js)
    }

    /// Whether nothing was added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.styles.is_empty() && self.script_modules.is_empty()
    }

    /// Split into style sheets and script modules.
    #[must_use]
    pub fn into_parts(self) -> (Vec<String>, Vec<String>) {
        (self.styles, self.script_modules)
    }
}

fn push_unique(items: &mut Vec<String>, seen: &mut HashSet<String>, item: String) -> bool {
    if item.is_empty() || seen.contains(&item) {
        return false;
    }
    seen.insert(item.clone());
    items.push(item);
    true
}

/// Payloads already emitted across several groups (e.g., one page).
///
/// Pass the same scope to [`Renderer::render_in_scope`](crate::Renderer::render_in_scope)
/// to keep each style sheet and script module out of every group after the
/// first that needed it.
#[derive(Clone, Debug, Default)]
pub struct AssetScope {
    emitted: Assets,
}

impl AssetScope {
    /// Create an empty scope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only payloads not yet emitted in this scope and record them.
    pub(crate) fn claim(&mut self, assets: Assets) -> Assets {
        let (styles, scripts) = assets.into_parts();
        let mut fresh = Assets::new();
        for css in styles {
            if self.emitted.add_style(css.clone()) {
                fresh.add_style(css);
            }
        }
        for js in scripts {
            if self.emitted.add_script_module(js.clone()) {
                fresh.add_script_module(js);
            }
        }
        fresh
    }

    /// All payloads emitted so far.
    #[must_use]
    pub fn emitted(&self) -> &Assets {
        &self.emitted
    }
}
