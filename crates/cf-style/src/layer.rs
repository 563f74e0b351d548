//! Style setting layers.

use std::collections::{BTreeMap, BTreeSet};

use crate::value::{StyleValue, ValueKind};

/// Origin of a [`StyleLayer`].
///
/// Keys first introduced by a non-default layer are reported as unknown
/// during resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayerKind {
    /// Engine defaults (lowest priority).
    EngineDefaults,
    /// Defaults contributed by a plugin.
    PluginDefaults,
    /// Overrides derived from a color theme.
    Theme,
    /// Overrides supplied by the user (highest priority).
    User,
}

impl LayerKind {
    /// Whether keys in this layer define the set of known settings.
    #[must_use]
    pub fn is_default(self) -> bool {
        matches!(self, Self::EngineDefaults | Self::PluginDefaults)
    }
}

/// One layer of style settings.
///
/// Keys are dotted paths (`code.fontSize`); inserting a dotted key creates
/// the intermediate maps.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StyleLayer {
    kind: LayerKind,
    name: String,
    root: BTreeMap<String, StyleValue>,
    replace: BTreeSet<String>,
}

/// A flattened layer entry.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum FlatEntry<'a> {
    Scalar(&'a str),
    List(&'a [String]),
    Map,
}

impl FlatEntry<'_> {
    pub(crate) fn kind(&self) -> ValueKind {
        match self {
            Self::Scalar(_) => ValueKind::Scalar,
            Self::List(_) => ValueKind::List,
            Self::Map => ValueKind::Map,
        }
    }
}

impl StyleLayer {
    /// Create an empty layer.
    #[must_use]
    pub fn new(kind: LayerKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            root: BTreeMap::new(),
            replace: BTreeSet::new(),
        }
    }

    /// Create an empty engine defaults layer.
    #[must_use]
    pub fn engine_defaults() -> Self {
        Self::new(LayerKind::EngineDefaults, "engine")
    }

    /// Create an empty defaults layer for the named plugin.
    #[must_use]
    pub fn plugin_defaults(plugin: &str) -> Self {
        Self::new(LayerKind::PluginDefaults, format!("plugin:{plugin}"))
    }

    /// Create an empty override layer for the named theme.
    #[must_use]
    pub fn theme(theme: &str) -> Self {
        Self::new(LayerKind::Theme, format!("theme:{theme}"))
    }

    /// Create an empty user overrides layer.
    #[must_use]
    pub fn user() -> Self {
        Self::new(LayerKind::User, "user")
    }

    /// Create a layer from an already built settings tree.
    #[must_use]
    pub fn from_map(
        kind: LayerKind,
        name: impl Into<String>,
        root: BTreeMap<String, StyleValue>,
    ) -> Self {
        Self {
            root,
            ..Self::new(kind, name)
        }
    }

    /// Set a value at a dotted key.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<StyleValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Mark a list key so this layer's items replace lower layers' items.
    #[must_use]
    pub fn with_replace(mut self, key: &str) -> Self {
        self.mark_replace(key);
        self
    }

    /// Set a value at a dotted key.
    ///
    /// A non-map value on the way to the key is replaced by a map.
    pub fn insert(&mut self, key: &str, value: impl Into<StyleValue>) {
        let mut segments = key.split('.').filter(|s| !s.is_empty()).peekable();
        let mut map = &mut self.root;

        while let Some(segment) = segments.next() {
            if segments.peek().is_none() {
                map.insert(segment.to_owned(), value.into());
                return;
            }
            let entry = map
                .entry(segment.to_owned())
                .or_insert_with(|| StyleValue::Map(BTreeMap::new()));
            if !matches!(entry, StyleValue::Map(_)) {
                *entry = StyleValue::Map(BTreeMap::new());
            }
            let StyleValue::Map(next) = entry else {
                unreachable!("entry was just made a map");
            };
            map = next;
        }
    }

    /// Mark a list key so this layer's items replace lower layers' items.
    pub fn mark_replace(&mut self, key: &str) {
        self.replace.insert(key.to_owned());
    }

    /// Layer origin.
    #[must_use]
    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    /// Layer name used in diagnostics (e.g., `plugin:frames`).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Top-level settings of this layer.
    #[must_use]
    pub fn root(&self) -> &BTreeMap<String, StyleValue> {
        &self.root
    }

    /// Whether this layer replaces lower layers' items for `key`.
    #[must_use]
    pub fn replaces(&self, key: &str) -> bool {
        self.replace.contains(key)
    }

    /// Whether the layer defines no settings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Flatten the tree into `(dotted key, entry)` pairs.
    ///
    /// Maps are emitted before their children, in key order.
    pub(crate) fn flatten(&self) -> Vec<(String, FlatEntry<'_>)> {
        let mut out = Vec::new();
        flatten_into(&self.root, "", &mut out);
        out
    }
}

fn flatten_into<'a>(
    map: &'a BTreeMap<String, StyleValue>,
    prefix: &str,
    out: &mut Vec<(String, FlatEntry<'a>)>,
) {
    for (key, value) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            StyleValue::Scalar(s) => out.push((path, FlatEntry::Scalar(s))),
            StyleValue::List(items) => out.push((path, FlatEntry::List(items))),
            StyleValue::Map(children) => {
                out.push((path.clone(), FlatEntry::Map));
                flatten_into(children, &path, out);
            }
        }
    }
}
