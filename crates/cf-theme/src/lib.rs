//! Color themes for codeframe.
//!
//! This crate turns theme inputs into normalized [`Theme`]s:
//!
//! - [`ThemeInput`]: a built-in name, a raw VS Code theme object, or an
//!   already normalized theme
//! - [`Theme`]: parsed color tokens, token color rules, light/dark
//!   classification, style overrides and CSS variables
//! - [`ThemeManager`]: fingerprint-keyed cache with at-most-once
//!   normalization per fingerprint
//!
//! # Example
//!
//! ```
//! use cf_theme::{ThemeInput, ThemeKind, ThemeManager};
//! use serde_json::json;
//!
//! let manager = ThemeManager::new();
//! let theme = manager
//!     .load(&ThemeInput::Raw(json!({
//!         "name": "night",
//!         "colors": { "editor.background": "#101010", "editor.foreground": "#eeeeee" }
//!     })))
//!     .unwrap();
//!
//! assert_eq!(theme.name(), "night");
//! assert_eq!(theme.kind(), ThemeKind::Dark);
//! ```

mod builtin;
mod color;
mod error;
mod manager;
mod theme;

pub use builtin::BUILTIN_THEMES;
pub use color::{Color, ParseColorError};
pub use error::ThemeLoadError;
pub use manager::{ThemeInput, ThemeManager};
pub use theme::{FontStyle, REQUIRED_TOKENS, Theme, ThemeKind, TokenRule, TokenStyle};
