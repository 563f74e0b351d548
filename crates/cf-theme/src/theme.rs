//! Normalized color themes.

use std::collections::BTreeMap;
use std::fmt::Write;

use cf_style::{StyleLayer, css_variable_name};
use serde::Deserialize;

use crate::ThemeLoadError;
use crate::color::Color;

/// Color tokens every theme must define (directly or through a scopeless
/// token rule).
pub const REQUIRED_TOKENS: &[&str] = &["editor.background", "editor.foreground"];

/// Light/dark classification of a theme.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ThemeKind {
    /// Light background.
    Light,
    /// Dark background.
    Dark,
}

impl ThemeKind {
    /// Value for the `prefers-color-scheme` media feature.
    #[must_use]
    pub fn color_scheme(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

/// Font style flags of a syntax token.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FontStyle {
    /// Italic text.
    pub italic: bool,
    /// Bold text.
    pub bold: bool,
    /// Underlined text.
    pub underline: bool,
}

impl FontStyle {
    /// Parse a space separated `fontStyle` value (`"italic bold"`).
    ///
    /// Unknown words are ignored; an empty string resets all flags.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let mut style = Self::default();
        for word in s.split_whitespace() {
            match word {
                "italic" => style.italic = true,
                "bold" => style.bold = true,
                "underline" => style.underline = true,
                _ => {}
            }
        }
        style
    }
}

/// Resolved style of a syntax token.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TokenStyle {
    /// Text color (inherits the code foreground when `None`).
    pub foreground: Option<Color>,
    /// Font style (inherits when `None`).
    pub font_style: Option<FontStyle>,
}

impl TokenStyle {
    /// Whether the style changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.foreground.is_none() && self.font_style.is_none()
    }
}

/// A token color rule: scope selectors and the style they apply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenRule {
    /// Dotted scope selectors (e.g., `keyword.control`).
    pub selectors: Vec<String>,
    /// Style applied to matching tokens.
    pub style: TokenStyle,
}

/// A normalized color theme.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Theme {
    name: String,
    kind: ThemeKind,
    fingerprint: String,
    colors: BTreeMap<String, Color>,
    token_rules: Vec<TokenRule>,
}

/// Raw theme JSON (VS Code color theme format).
#[derive(Deserialize)]
struct RawTheme {
    name: Option<String>,
    #[serde(default)]
    colors: BTreeMap<String, Option<String>>,
    #[serde(default, rename = "tokenColors")]
    token_colors: Vec<RawTokenRule>,
}

#[derive(Deserialize)]
struct RawTokenRule {
    #[serde(default)]
    scope: Option<RawScope>,
    #[serde(default)]
    settings: RawTokenSettings,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawScope {
    One(String),
    Many(Vec<String>),
}

#[derive(Default, Deserialize)]
struct RawTokenSettings {
    foreground: Option<String>,
    background: Option<String>,
    #[serde(rename = "fontStyle")]
    font_style: Option<String>,
}

impl RawScope {
    fn selectors(&self) -> Vec<String> {
        let parts: Vec<&str> = match self {
            Self::One(s) => s.split(',').collect(),
            Self::Many(v) => v.iter().flat_map(|s| s.split(',')).collect(),
        };
        parts
            .into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect()
    }
}

impl Theme {
    /// Normalize a raw theme object.
    ///
    /// `fallback_name` is used when the object has no `name`; `fingerprint`
    /// becomes the theme's cache identity.
    ///
    /// # Errors
    ///
    /// Returns [`ThemeLoadError`] if the object is not a theme, a color does
    /// not parse, or a required color token is missing.
    pub fn from_json(
        value: &serde_json::Value,
        fallback_name: &str,
        fingerprint: impl Into<String>,
    ) -> Result<Self, ThemeLoadError> {
        let raw = RawTheme::deserialize(value)
            .map_err(|e| ThemeLoadError::Malformed(e.to_string()))?;
        let name = raw
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| fallback_name.to_owned());

        let parse = |token: &str, value: &str| -> Result<Color, ThemeLoadError> {
            value
                .parse::<Color>()
                .map_err(|_| ThemeLoadError::InvalidColor {
                    theme: name.clone(),
                    token: token.to_owned(),
                    value: value.to_owned(),
                })
        };

        let mut colors = BTreeMap::new();
        for (token, value) in &raw.colors {
            if let Some(value) = value {
                colors.insert(token.clone(), parse(token, value)?);
            }
        }

        let mut token_rules = Vec::new();
        for (i, rule) in raw.token_colors.iter().enumerate() {
            let settings = &rule.settings;
            let foreground = settings
                .foreground
                .as_deref()
                .map(|v| parse(&format!("tokenColors[{i}].foreground"), v))
                .transpose()?;
            let font_style = settings.font_style.as_deref().map(FontStyle::parse);

            match &rule.scope {
                Some(scope) => token_rules.push(TokenRule {
                    selectors: scope.selectors(),
                    style: TokenStyle {
                        foreground,
                        font_style,
                    },
                }),
                None => {
                    // Scopeless rules carry the editor defaults in older themes
                    if let Some(fg) = foreground {
                        colors.entry("editor.foreground".to_owned()).or_insert(fg);
                    }
                    if let Some(bg) = settings.background.as_deref() {
                        let bg = parse(&format!("tokenColors[{i}].background"), bg)?;
                        colors.entry("editor.background".to_owned()).or_insert(bg);
                    }
                }
            }
        }

        for token in REQUIRED_TOKENS {
            if !colors.contains_key(*token) {
                return Err(ThemeLoadError::MissingToken {
                    theme: name,
                    token: (*token).to_owned(),
                });
            }
        }

        let kind = if colors["editor.background"].is_dark() {
            ThemeKind::Dark
        } else {
            ThemeKind::Light
        };

        Ok(Self {
            name,
            kind,
            fingerprint: fingerprint.into(),
            colors,
            token_rules,
        })
    }

    /// Theme name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Light/dark classification derived from the background color.
    #[must_use]
    pub fn kind(&self) -> ThemeKind {
        self.kind
    }

    /// Cache identity of this theme.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Look up a color token (e.g., `editor.background`).
    #[must_use]
    pub fn color(&self, token: &str) -> Option<Color> {
        self.colors.get(token).copied()
    }

    /// All color tokens.
    #[must_use]
    pub fn colors(&self) -> &BTreeMap<String, Color> {
        &self.colors
    }

    /// Token color rules in declaration order.
    #[must_use]
    pub fn token_rules(&self) -> &[TokenRule] {
        &self.token_rules
    }

    /// Code background color.
    #[must_use]
    pub fn background(&self) -> Color {
        self.colors
            .get("editor.background")
            .copied()
            .unwrap_or(Color::BLACK)
    }

    /// Code foreground color.
    #[must_use]
    pub fn foreground(&self) -> Color {
        self.colors
            .get("editor.foreground")
            .copied()
            .unwrap_or(Color::WHITE)
    }

    /// Resolve the style of a token from its scope stack.
    ///
    /// `scopes` is ordered outermost first (e.g., `["source.js",
    /// "keyword.control.js"]`). Each property comes from the innermost scope
    /// matched by a rule setting it. A selector matches a scope equal to it or
    /// starting with it followed by `.`; the longest selector wins and later
    /// rules win ties.
    ///
    /// # Example
    ///
    /// ```
    /// use cf_theme::{Color, ThemeInput, ThemeManager};
    ///
    /// let theme = ThemeManager::new().load(&ThemeInput::builtin("github-dark")).unwrap();
    /// let style = theme.token_style(&["source.rust", "keyword.control.rust"]);
    /// assert_eq!(style.foreground, Some("#ff7b72".parse::<Color>().unwrap()));
    /// ```
    #[must_use]
    pub fn token_style<S: AsRef<str>>(&self, scopes: &[S]) -> TokenStyle {
        let foreground = scopes.iter().rev().find_map(|scope| {
            self.best_rule(scope.as_ref(), |s| s.foreground.is_some())
                .and_then(|r| r.style.foreground)
        });
        let font_style = scopes.iter().rev().find_map(|scope| {
            self.best_rule(scope.as_ref(), |s| s.font_style.is_some())
                .and_then(|r| r.style.font_style)
        });
        TokenStyle {
            foreground,
            font_style,
        }
    }

    fn best_rule(&self, scope: &str, has: impl Fn(&TokenStyle) -> bool) -> Option<&TokenRule> {
        let mut best: Option<(usize, &TokenRule)> = None;
        for rule in self.token_rules.iter().filter(|r| has(&r.style)) {
            for selector in &rule.selectors {
                if !scope_matches(selector, scope) {
                    continue;
                }
                let score = selector.len();
                if best.is_none_or(|(s, _)| score >= s) {
                    best = Some((score, rule));
                }
            }
        }
        best.map(|(_, rule)| rule)
    }

    /// Style overrides derived from this theme's colors.
    ///
    /// Keys match the engine's default style settings.
    #[must_use]
    pub fn style_layer(&self) -> StyleLayer {
        let fg = self.foreground();
        let bg = self.background();
        let color = |token: &str, fallback: Color| self.color(token).unwrap_or(fallback).to_css();

        StyleLayer::theme(&self.name)
            .with("code.background", bg.to_css())
            .with("code.foreground", fg.to_css())
            .with(
                "code.selectionBackground",
                color("editor.selectionBackground", fg.with_alpha(0x33)),
            )
            .with("borderColor", color("editorGroup.border", fg.with_alpha(0x33)))
            .with(
                "ui.background",
                color("editorGroupHeader.tabsBackground", bg),
            )
            .with("ui.foreground", color("tab.activeForeground", fg))
            .with(
                "scrollbarThumbColor",
                color("scrollbarSlider.background", fg.with_alpha(0x44)),
            )
    }

    /// Color tokens as CSS custom properties (`--cf-theme-editor-background`).
    #[must_use]
    pub fn css_variables(&self) -> Vec<(String, String)> {
        self.colors
            .iter()
            .map(|(token, color)| (css_variable_name(&format!("theme.{token}")), color.to_css()))
            .collect()
    }

    /// Color token custom properties wrapped in a rule for `selector`.
    #[must_use]
    pub fn css_variable_block(&self, selector: &str) -> String {
        let mut out = String::new();
        let _ = write!(out, "{selector}{{");
        for (i, (name, value)) in self.css_variables().into_iter().enumerate() {
            if i > 0 {
                out.push(';');
            }
            let _ = write!(out, "{name}:{value}");
        }
        out.push('}');
        out
    }
}

fn scope_matches(selector: &str, scope: &str) -> bool {
    scope
        .strip_prefix(selector)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
}
