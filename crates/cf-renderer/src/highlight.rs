//! Syntax highlighting through a pluggable tokenizer.
//!
//! The renderer does not ship a grammar engine. A [`SyntaxBackend`] turns
//! code into scoped [`TokenSpan`]s; [`plugin`] resolves each span's style
//! against every configured theme and attaches [`TokenAnnotation`]s.

use std::ops::Range;
use std::sync::Arc;

use cf_theme::{Theme, TokenStyle};

use crate::annotation::{Annotation, AnnotationContext, AnnotationTarget};
use crate::error::HookError;
use crate::node::{Element, Node};
use crate::plugin::Plugin;

/// Priority of token annotations: below everything plugins normally use, so
/// tokens are always the innermost wrappers.
pub const TOKEN_PRIORITY: i32 = i32::MIN / 2;

/// Class of rendered token spans.
pub const TOKEN_CLASS: &str = "cf-tk";

/// A scoped token of one line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenSpan {
    /// Line index.
    pub line: usize,
    /// Character offsets within the line, end exclusive.
    pub range: Range<usize>,
    /// TextMate scopes, outermost first (`source.js`, `keyword.control.js`).
    pub scopes: Vec<String>,
}

/// A tokenizer.
///
/// Called once per block and theme, with the block's code joined by `\n`.
pub trait SyntaxBackend: Send + Sync {
    /// Tokenize `code` written in `language`.
    ///
    /// # Errors
    ///
    /// Any error aborts the render and is reported as a plugin failure.
    fn tokenize(&self, code: &str, language: &str, theme: &Theme)
    -> Result<Vec<TokenSpan>, HookError>;
}

/// Backend that produces no tokens.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlainTextBackend;

impl SyntaxBackend for PlainTextBackend {
    fn tokenize(&self, _: &str, _: &str, _: &Theme) -> Result<Vec<TokenSpan>, HookError> {
        Ok(Vec::new())
    }
}

/// Colors a token for one theme.
///
/// Renders as `span.cf-tk` with `--<theme>` custom properties. Annotations of
/// several themes over the same segment share one span.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenAnnotation {
    theme_index: usize,
    style: TokenStyle,
}

impl TokenAnnotation {
    /// Create an annotation for the theme at `theme_index`.
    #[must_use]
    pub fn new(theme_index: usize, style: TokenStyle) -> Self {
        Self { theme_index, style }
    }

    /// Inline declarations, e.g. `--0:#ff7b72;--0fs:italic`.
    #[must_use]
    pub fn declarations(&self) -> String {
        let i = self.theme_index;
        let mut decls = Vec::new();
        if let Some(color) = self.style.foreground {
            decls.push(format!("--{i}:{}", color.to_css()));
        }
        if let Some(font) = self.style.font_style {
            let italic = if font.italic { "italic" } else { "normal" };
            let bold = if font.bold { "bold" } else { "normal" };
            let underline = if font.underline { "underline" } else { "none" };
            decls.push(format!("--{i}fs:{italic}"));
            decls.push(format!("--{i}fw:{bold}"));
            decls.push(format!("--{i}td:{underline}"));
        }
        decls.join(";")
    }
}

impl Annotation for TokenAnnotation {
    fn name(&self) -> &str {
        "token"
    }

    fn priority(&self) -> i32 {
        TOKEN_PRIORITY
    }

    fn render(&self, _ctx: &AnnotationContext<'_>, mut nodes: Vec<Node>) -> Vec<Node> {
        if let [Node::Element(el)] = nodes.as_mut_slice()
            && el.has_class(TOKEN_CLASS)
        {
            el.append_style(&self.declarations());
            return nodes;
        }

        let mut span = Element::new("span")
            .with_class(TOKEN_CLASS)
            .with_children(nodes);
        span.append_style(&self.declarations());
        vec![span.into()]
    }
}

/// Highlighting plugin backed by `backend`.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use cf_renderer::Stage;
/// use cf_renderer::highlight::{self, PlainTextBackend};
///
/// let plugin = highlight::plugin(Arc::new(PlainTextBackend));
/// assert_eq!(plugin.stages(), vec![Stage::PerformSyntaxAnalysis]);
/// ```
#[must_use]
pub fn plugin(backend: Arc<dyn SyntaxBackend>) -> Plugin {
    Plugin::new("syntax-highlighting").on_perform_syntax_analysis(move |ctx| {
        let code = ctx.block.code();
        let language = ctx.block.language().to_owned();
        let themes = ctx.themes().to_vec();

        // Later registrations render first: registering the last theme first
        // makes token spans list their themes in index order.
        for (theme_index, theme) in themes.iter().enumerate().rev() {
            let spans = backend.tokenize(&code, &language, theme)?;
            tracing::debug!(
                theme = theme.name(),
                language = %language,
                tokens = spans.len(),
                "Tokenized block"
            );

            for span in spans {
                let style = theme.token_style(&span.scopes);
                if style.is_empty() || span.range.is_empty() {
                    continue;
                }
                ctx.block.add_annotation(
                    AnnotationTarget::Range {
                        line: span.line,
                        range: span.range,
                    },
                    TokenAnnotation::new(theme_index, style),
                )?;
            }
        }
        Ok(())
    })
}
