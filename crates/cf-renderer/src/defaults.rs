//! Engine default style settings and the base style sheet.

use cf_style::{ResolvedStyles, StyleLayer, StyleValue};

/// Style settings every renderer starts from.
///
/// Theme and user layers may only override these keys (and keys declared by
/// plugin defaults); anything else is reported as unknown.
pub(crate) fn engine_defaults() -> StyleLayer {
    StyleLayer::engine_defaults()
        .with("borderRadius", "0.3rem")
        .with("borderWidth", "1.5px")
        .with("borderColor", "currentColor")
        .with(
            "code.fontFamily",
            StyleValue::list([
                "ui-monospace",
                "SFMono-Regular",
                "Menlo",
                "Monaco",
                "Consolas",
                "'Liberation Mono'",
                "monospace",
            ]),
        )
        .with("code.fontSize", "0.85rem")
        .with("code.fontWeight", "400")
        .with("code.lineHeight", "1.65")
        .with("code.paddingBlock", "1rem")
        .with("code.paddingInline", "1.35rem")
        .with("code.background", "#24292e")
        .with("code.foreground", "#e1e4e8")
        .with("code.selectionBackground", "#3392ff44")
        .with(
            "ui.fontFamily",
            StyleValue::list(["system-ui", "-apple-system", "'Segoe UI'", "sans-serif"]),
        )
        .with("ui.fontSize", "0.9rem")
        .with("ui.background", "transparent")
        .with("ui.foreground", "inherit")
        .with("scrollbarThumbColor", "#8888")
}

/// Base style sheet shared by all blocks.
///
/// Only references custom properties, so one sheet serves every theme.
pub(crate) fn base_css(styles: &ResolvedStyles) -> String {
    let v = |key: &str| styles.var_ref(key).unwrap_or_else(|| "initial".to_owned());

    let rules = [
        format!(
            ".cf{{font-family:{};font-size:{};color:{};background:{}}}",
            v("ui.fontFamily"),
            v("ui.fontSize"),
            v("ui.foreground"),
            v("ui.background"),
        ),
        format!(
            ".cf .cf-block{{margin:0;border:{} solid {};border-radius:{};overflow:hidden}}",
            v("borderWidth"),
            v("borderColor"),
            v("borderRadius"),
        ),
        format!(
            ".cf pre{{margin:0;padding:{} 0;background:{};color:{};overflow-x:auto;\
             scrollbar-color:{} transparent}}",
            v("code.paddingBlock"),
            v("code.background"),
            v("code.foreground"),
            v("scrollbarThumbColor"),
        ),
        format!(
            ".cf code{{display:block;min-width:min-content;font-family:{};font-size:{};\
             font-weight:{};line-height:{}}}",
            v("code.fontFamily"),
            v("code.fontSize"),
            v("code.fontWeight"),
            v("code.lineHeight"),
        ),
        format!(".cf .cf-line{{padding-inline:{}}}", v("code.paddingInline")),
        ".cf .cf-code{white-space:pre}".to_owned(),
        format!(
            ".cf ::selection{{background:{}}}",
            v("code.selectionBackground")
        ),
    ];
    rules.concat()
}
