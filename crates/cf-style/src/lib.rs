//! Layered style settings for codeframe.
//!
//! Style settings are declared as trees of tagged [`StyleValue`]s grouped into
//! [`StyleLayer`]s. [`resolve`] merges the layers, lowest priority first, into
//! a flat [`ResolvedStyles`] map from dotted key to value and CSS custom
//! property name.
//!
//! # Layer order
//!
//! Layers are passed in ascending override priority:
//!
//! 1. Engine defaults
//! 2. Plugin defaults (in plugin registration order)
//! 3. Theme overrides
//! 4. User overrides
//!
//! # Merge rules
//!
//! - Scalars: the highest layer defining the key wins.
//! - Lists: layers concatenate in priority order. A layer that marks the key
//!   as "replace" restarts the list from its own items.
//! - Maps: merged recursively, key by key.
//!
//! A key holding different kinds in two layers (for example a scalar in one
//! layer and a map in another) fails with [`StyleResolutionError`].
//!
//! # Example
//!
//! ```
//! use cf_style::{StyleLayer, StyleValue, resolve};
//!
//! let defaults = StyleLayer::engine_defaults()
//!     .with("code.fontSize", "0.85rem")
//!     .with("code.fontFamily", StyleValue::list(["monospace"]));
//! let user = StyleLayer::user()
//!     .with("code.fontSize", "1rem")
//!     .with("code.fontFamily", StyleValue::list(["Fira Code"]));
//!
//! let resolved = resolve(&[defaults, user]).unwrap();
//! assert_eq!(resolved.get_str("code.fontSize"), Some("1rem"));
//! assert_eq!(resolved.css_var("code.fontSize"), Some("--cf-code-font-size"));
//! assert_eq!(
//!     resolved.get("code.fontFamily").unwrap().to_css(),
//!     "monospace, Fira Code"
//! );
//! ```

mod error;
mod layer;
mod resolve;
mod value;

pub use error::StyleResolutionError;
pub use layer::{LayerKind, StyleLayer};
pub use resolve::{ResolvedStyle, ResolvedStyles, ResolvedValue, css_variable_name, resolve};
pub use value::{StyleValue, ValueKind};
