//! Theme style sheet generation.

use std::fmt::Write;
use std::sync::Arc;

use cf_style::ResolvedStyles;
use cf_theme::Theme;
use serde::Deserialize;

/// How alternate themes are activated in the page.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThemeSwitching {
    /// Theme selectors, plus a `prefers-color-scheme` media query for the
    /// first theme whose kind differs from the first theme's.
    #[default]
    Auto,
    /// Theme selectors only (`data-theme` attribute).
    Selector,
    /// Only the `prefers-color-scheme` media query.
    MediaQuery,
}

/// Selector applied by an alternate theme.
///
/// Matches blocks under a root element with `data-theme='<name>'` and
/// blocks carrying the attribute themselves.
#[must_use]
pub fn theme_selector(theme_name: &str) -> String {
    let name = escape_css_string(theme_name);
    format!(":root[data-theme='{name}'] .cf,.cf[data-theme='{name}']")
}

/// Style sheet with the variables of every theme and the token color rules.
///
/// The first theme is the default: its variables are declared on `:root`.
/// Alternate themes only declare the style settings that differ from it.
pub(crate) fn theme_css(
    themes: &[Arc<Theme>],
    styles: &[ResolvedStyles],
    switching: ThemeSwitching,
) -> String {
    let mut out = String::new();
    let (Some(base_theme), Some(base_styles)) = (themes.first(), styles.first()) else {
        return out;
    };

    out.push_str(&rule(
        ":root",
        &[base_styles.declarations(), theme_declarations(base_theme)],
    ));
    out.push_str(&token_rule(&[".cf".to_owned()], 0));

    let media_index = match switching {
        ThemeSwitching::Selector => None,
        ThemeSwitching::Auto | ThemeSwitching::MediaQuery => themes
            .iter()
            .position(|theme| theme.kind() != base_theme.kind()),
    };

    for (index, (theme, resolved)) in themes.iter().zip(styles).enumerate().skip(1) {
        let declarations = [
            resolved.diff(base_styles).declarations(),
            theme_declarations(theme),
        ];

        if switching != ThemeSwitching::MediaQuery {
            let selector = theme_selector(theme.name());
            let roots: Vec<String> = selector.split(',').map(str::to_owned).collect();
            out.push_str(&rule(&selector, &declarations));
            out.push_str(&token_rule(&roots, index));
        }

        if media_index == Some(index) {
            let root = ":root:not([data-theme])";
            let _ = write!(
                out,
                "@media (prefers-color-scheme:{}){{{}{}}}",
                theme.kind().color_scheme(),
                rule(root, &declarations),
                token_rule(&[format!("{root} .cf")], index),
            );
        }
    }

    out
}

/// Declarations mapping theme `index`'s token properties to CSS properties.
fn token_rule(roots: &[String], index: usize) -> String {
    let selector = roots
        .iter()
        .map(|root| format!("{root} .cf-tk"))
        .collect::<Vec<_>>()
        .join(",");
    format!(
        "{selector}{{color:var(--{index},inherit);font-style:var(--{index}fs,inherit);\
         font-weight:var(--{index}fw,inherit);text-decoration:var(--{index}td,inherit)}}"
    )
}

fn theme_declarations(theme: &Theme) -> String {
    theme
        .css_variables()
        .into_iter()
        .map(|(name, value)| format!("{name}:{value}"))
        .collect::<Vec<_>>()
        .join(";")
}

fn rule(selector: &str, declarations: &[String]) -> String {
    let body = declarations
        .iter()
        .filter(|d| !d.is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(";");
    if body.is_empty() {
        String::new()
    } else {
        format!("{selector}{{{body}}}")
    }
}

fn escape_css_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}
