//! Renderer construction and entry points.

use std::collections::BTreeMap;
use std::sync::Arc;

use cf_style::{ResolvedStyles, StyleLayer, StyleValue};
use cf_theme::{Theme, ThemeInput, ThemeManager};
use rayon::prelude::*;

use crate::assets::{AssetScope, Assets};
use crate::block::{Block, BlockState};
use crate::css::{self, ThemeSwitching};
use crate::defaults;
use crate::error::{Result, StateError};
use crate::group::Group;
use crate::node::Node;
use crate::pipeline::Pipeline;
use crate::plugin::{Env, Plugin};

/// Theme used when no theme is configured.
pub const DEFAULT_THEME: &str = "github-dark";

/// Options for [`Renderer::new`].
#[derive(Clone, Debug)]
pub struct RendererOptions {
    /// Themes in priority order; the first one is the default.
    pub themes: Vec<ThemeInput>,
    /// Plugins in registration order.
    pub plugins: Vec<Plugin>,
    /// User style overrides.
    pub styles: StyleLayer,
    /// How alternate themes are activated.
    pub theme_switching: ThemeSwitching,
    /// Shared theme cache; a private one is created when `None`.
    pub theme_manager: Option<Arc<ThemeManager>>,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            themes: vec![ThemeInput::builtin(DEFAULT_THEME)],
            plugins: Vec::new(),
            styles: StyleLayer::user(),
            theme_switching: ThemeSwitching::default(),
            theme_manager: None,
        }
    }
}

impl RendererOptions {
    /// Default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the theme list.
    #[must_use]
    pub fn with_themes(mut self, themes: impl IntoIterator<Item = ThemeInput>) -> Self {
        self.themes = themes.into_iter().collect();
        self
    }

    /// Append a plugin.
    #[must_use]
    pub fn with_plugin(mut self, plugin: Plugin) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Set a user style override.
    #[must_use]
    pub fn with_style(mut self, key: &str, value: impl Into<StyleValue>) -> Self {
        self.styles.insert(key, value);
        self
    }

    /// Replace the user style layer.
    #[must_use]
    pub fn with_styles(mut self, styles: StyleLayer) -> Self {
        self.styles = styles;
        self
    }

    /// Set the theme switching strategy.
    #[must_use]
    pub fn with_theme_switching(mut self, switching: ThemeSwitching) -> Self {
        self.theme_switching = switching;
        self
    }

    /// Share a theme cache with other renderers.
    #[must_use]
    pub fn with_theme_manager(mut self, manager: Arc<ThemeManager>) -> Self {
        self.theme_manager = Some(manager);
        self
    }
}

/// Summary of a rendered block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockMetadata {
    /// Index within the group.
    pub index: usize,
    /// Normalized language.
    pub language: String,
    /// Locale of the surrounding document.
    pub locale: Option<String>,
    /// Number of rendered lines.
    pub line_count: usize,
    /// Plugin-defined properties.
    pub props: BTreeMap<String, String>,
}

impl BlockMetadata {
    fn from_block(block: &Block) -> Self {
        Self {
            index: block.index(),
            language: block.language().to_owned(),
            locale: block.locale().map(str::to_owned),
            line_count: block.line_count(),
            props: block.props().clone(),
        }
    }
}

/// Result of rendering a group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupOutput {
    /// Replacement subtree for the group.
    pub node: Node,
    /// Style sheets, deduplicated, in first-use order.
    pub styles: Vec<String>,
    /// JavaScript modules, deduplicated, in first-use order.
    pub script_modules: Vec<String>,
    /// Per-block summaries in group order.
    pub blocks: Vec<BlockMetadata>,
}

impl GroupOutput {
    /// Serialized HTML of the group node.
    #[must_use]
    pub fn to_html(&self) -> String {
        self.node.to_html()
    }

    /// All style sheets concatenated.
    #[must_use]
    pub fn style_text(&self) -> String {
        self.styles.concat()
    }
}

/// Long-lived, thread-safe code block renderer.
///
/// Themes and style settings are loaded and resolved once, when the renderer
/// is created. Each [`render`](Self::render) call then runs the plugin
/// pipeline over one group.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use cf_renderer::{
///     BlockInput, Document, Group, GroupPosition, ParentDocument, Renderer, RendererOptions,
/// };
///
/// let renderer = Renderer::new(RendererOptions::new().with_style("code.fontSize", "1rem"))
///     .unwrap();
///
/// let parent = ParentDocument::new(Arc::new(Document::new()), GroupPosition::default());
/// let mut group = Group::new(vec![BlockInput::new("echo hi", "shell", parent)]).unwrap();
/// let output = renderer.render(&mut group).unwrap();
///
/// assert!(output.to_html().starts_with(r#"<div class="cf"><figure class="cf-block""#));
/// assert_eq!(output.styles.len(), 2);
/// assert!(output.style_text().contains("--cf-code-font-size:1rem"));
/// ```
#[derive(Debug)]
pub struct Renderer {
    plugins: Vec<Plugin>,
    theme_manager: Arc<ThemeManager>,
    themes: Vec<Arc<Theme>>,
    styles: Vec<ResolvedStyles>,
    base_style: String,
    theme_style: String,
    block_styles: Vec<String>,
    block_scripts: Vec<String>,
    theme_switching: ThemeSwitching,
}

impl Renderer {
    /// Load themes, resolve style settings and build the shared style sheets.
    ///
    /// An empty theme list falls back to [`DEFAULT_THEME`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::ThemeLoad`](crate::Error::ThemeLoad) if a theme cannot
    /// be loaded and [`Error::StyleResolution`](crate::Error::StyleResolution)
    /// if style layers conflict.
    pub fn new(options: RendererOptions) -> Result<Self> {
        let RendererOptions {
            themes,
            plugins,
            styles: user_styles,
            theme_switching,
            theme_manager,
        } = options;

        let theme_manager = theme_manager.unwrap_or_default();
        let inputs = if themes.is_empty() {
            vec![ThemeInput::builtin(DEFAULT_THEME)]
        } else {
            themes
        };
        let themes = theme_manager.load_all(&inputs)?;

        let mut shared_layers = vec![defaults::engine_defaults()];
        shared_layers.extend(plugins.iter().map(|p| p.default_styles().clone()));

        let styles = themes
            .iter()
            .map(|theme| {
                let mut layers = shared_layers.clone();
                layers.push(theme.style_layer());
                layers.push(user_styles.clone());
                cf_style::resolve(&layers)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let base_style = defaults::base_css(&styles[0]);
        let theme_style = css::theme_css(&themes, &styles, theme_switching);

        let mut block_styles = vec![base_style.clone(), theme_style.clone()];
        block_styles.extend(plugins.iter().flat_map(|p| p.base_styles().iter().cloned()));
        let block_scripts = plugins
            .iter()
            .flat_map(|p| p.script_modules().iter().cloned())
            .collect();

        tracing::info!(
            themes = themes.len(),
            plugins = plugins.len(),
            switching = ?theme_switching,
            "Created renderer"
        );

        Ok(Self {
            plugins,
            theme_manager,
            themes,
            styles,
            base_style,
            theme_style,
            block_styles,
            block_scripts,
            theme_switching,
        })
    }

    /// Loaded themes in configuration order.
    #[must_use]
    pub fn themes(&self) -> &[Arc<Theme>] {
        &self.themes
    }

    /// Resolved style settings of the first theme.
    #[must_use]
    pub fn styles(&self) -> &ResolvedStyles {
        &self.styles[0]
    }

    /// Resolved style settings of the theme at `index`.
    #[must_use]
    pub fn theme_styles(&self, index: usize) -> Option<&ResolvedStyles> {
        self.styles.get(index)
    }

    /// Style sheet shared by all blocks.
    #[must_use]
    pub fn base_style(&self) -> &str {
        &self.base_style
    }

    /// Theme variables and token color rules.
    #[must_use]
    pub fn theme_style(&self) -> &str {
        &self.theme_style
    }

    /// Registered plugins.
    #[must_use]
    pub fn plugins(&self) -> &[Plugin] {
        &self.plugins
    }

    /// Theme cache used by this renderer.
    #[must_use]
    pub fn theme_manager(&self) -> &Arc<ThemeManager> {
        &self.theme_manager
    }

    /// Theme switching strategy.
    #[must_use]
    pub fn theme_switching(&self) -> ThemeSwitching {
        self.theme_switching
    }

    /// Render a group.
    ///
    /// Blocks are finalized afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Plugin`](crate::Error::Plugin) if a hook fails,
    /// [`Error::State`](crate::Error::State) if the group was already rendered
    /// and the errors of any block mutation a hook propagated.
    pub fn render(&self, group: &mut Group) -> Result<GroupOutput> {
        let (node, assets) = self.run(group)?;
        Ok(output(group, node, assets))
    }

    /// Render a group, keeping assets already emitted in `scope` out of the
    /// output.
    ///
    /// # Errors
    ///
    /// See [`render`](Self::render).
    pub fn render_in_scope(&self, group: &mut Group, scope: &mut AssetScope) -> Result<GroupOutput> {
        let (node, assets) = self.run(group)?;
        Ok(output(group, node, scope.claim(assets)))
    }

    /// Render independent groups in parallel.
    ///
    /// Results are returned in input order.
    pub fn render_groups(&self, groups: &mut [Group]) -> Vec<Result<GroupOutput>> {
        groups.par_iter_mut().map(|group| self.render(group)).collect()
    }

    fn run(&self, group: &mut Group) -> Result<(Node, Assets)> {
        if let Some(block) = group
            .blocks()
            .iter()
            .find(|b| b.state() != BlockState::Pending)
        {
            return Err(StateError {
                operation: "render group",
                state: block.state(),
            }
            .into());
        }

        let pipeline = Pipeline {
            plugins: &self.plugins,
            env: Env {
                themes: &self.themes,
                styles: &self.styles,
            },
            block_styles: &self.block_styles,
            block_scripts: &self.block_scripts,
        };
        let result = pipeline.run(group)?;

        tracing::debug!(
            group = group.position().group_index,
            blocks = group.blocks().len(),
            "Rendered block group"
        );
        Ok(result)
    }
}

fn output(group: &Group, node: Node, assets: Assets) -> GroupOutput {
    let (styles, script_modules) = assets.into_parts();
    GroupOutput {
        node,
        styles,
        script_modules,
        blocks: group.blocks().iter().map(BlockMetadata::from_block).collect(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use pretty_assertions::assert_eq;
    use regex::Regex;

    use super::*;
    use crate::annotation::{AnnotationTarget, WrapAnnotation};
    use crate::block::BlockInput;
    use crate::document::{Document, GroupPosition, ParentDocument};
    use crate::error::{Error, HookError};
    use crate::highlight::{self, SyntaxBackend, TokenSpan};
    use crate::plugin::Stage;

    /// Marks `let` and `const` as keywords.
    struct KeywordBackend;

    impl SyntaxBackend for KeywordBackend {
        fn tokenize(
            &self,
            code: &str,
            _language: &str,
            _theme: &Theme,
        ) -> Result<Vec<TokenSpan>, HookError> {
            let re = Regex::new(r"\b(let|const)\b")?;
            let mut spans = Vec::new();
            for (line, text) in code.split('\n').enumerate() {
                for m in re.find_iter(text) {
                    spans.push(TokenSpan {
                        line,
                        range: text[..m.start()].chars().count()..text[..m.end()].chars().count(),
                        scopes: vec!["source.js".to_owned(), "keyword.control.js".to_owned()],
                    });
                }
            }
            Ok(spans)
        }
    }

    fn parent() -> ParentDocument {
        ParentDocument::new(Arc::new(Document::new()), GroupPosition::default())
    }

    fn group(blocks: &[(&str, &str)]) -> Group {
        let parent = parent();
        Group::new(
            blocks
                .iter()
                .map(|(code, lang)| BlockInput::new(*code, *lang, parent.clone()))
                .collect(),
        )
        .unwrap()
    }

    fn highlighting_renderer(themes: &[&str]) -> Renderer {
        Renderer::new(
            RendererOptions::new()
                .with_themes(themes.iter().map(|t| ThemeInput::builtin(*t)))
                .with_plugin(highlight::plugin(Arc::new(KeywordBackend))),
        )
        .unwrap()
    }

    #[test]
    fn test_line_count_preserved() {
        let renderer = highlighting_renderer(&["github-dark"]);
        let mut group = group(&[("let a = 1;\n\nconst b = 2;\n", "js")]);
        let output = renderer.render(&mut group).unwrap();

        assert_eq!(output.blocks[0].line_count, 3);
        let lines = output.node.find_by_class("cf-line");
        let texts: Vec<_> = lines
            .iter()
            .map(|el| Node::Element((*el).clone()).text_content())
            .collect();
        assert_eq!(texts, vec!["let a = 1;", "", "const b = 2;"]);
    }

    #[test]
    fn test_render_is_deterministic() {
        let renderer = highlighting_renderer(&["github-dark", "github-light"]);
        let first = renderer.render(&mut group(&[("let x = 1;", "js")])).unwrap();
        let second = renderer.render(&mut group(&[("let x = 1;", "js")])).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_group_emits_shared_styles_once() {
        let renderer = Renderer::new(RendererOptions::new()).unwrap();
        let mut group = group(&[("let x = 1;", "js"), ("npm install", "shell")]);
        let output = renderer.render(&mut group).unwrap();

        assert_eq!(
            output.styles,
            vec![
                renderer.base_style().to_owned(),
                renderer.theme_style().to_owned()
            ]
        );
        assert_eq!(output.blocks.len(), 2);
        assert_eq!(output.blocks[1].language, "shell");
    }

    #[test]
    fn test_tokens_merge_across_themes() {
        let renderer = highlighting_renderer(&["github-dark", "github-light"]);
        let output = renderer.render(&mut group(&[("let x", "js")])).unwrap();

        assert!(
            output.to_html().contains(
                r#"<div class="cf-code"><span class="cf-tk" style="--0:#ff7b72;--1:#cf222e">let</span> x</div>"#
            ),
            "{}",
            output.to_html()
        );
    }

    #[test]
    fn test_same_priority_annotations_nest_in_plugin_order() {
        // B attaches first (earlier stage), but A is registered first
        let a = Plugin::new("a").on_annotate_code(|ctx| {
            ctx.block.add_annotation(
                AnnotationTarget::Range {
                    line: 0,
                    range: 0..3,
                },
                WrapAnnotation::new("a", "a"),
            )?;
            Ok(())
        });
        let b = Plugin::new("b").on_perform_syntax_analysis(|ctx| {
            ctx.block.add_annotation(
                AnnotationTarget::Range {
                    line: 0,
                    range: 0..3,
                },
                WrapAnnotation::new("b", "b"),
            )?;
            Ok(())
        });
        let renderer =
            Renderer::new(RendererOptions::new().with_plugin(a).with_plugin(b)).unwrap();
        let output = renderer.render(&mut group(&[("abc", "txt")])).unwrap();

        assert!(
            output.to_html().contains(r#"<div class="cf-code"><a><b>abc</b></a></div>"#),
            "{}",
            output.to_html()
        );
    }

    #[test]
    fn test_empty_code_renders_one_line() {
        let renderer = Renderer::new(RendererOptions::new()).unwrap();
        let output = renderer.render(&mut group(&[("", "")])).unwrap();

        assert_eq!(output.blocks[0].line_count, 1);
        assert_eq!(output.node.find_by_class("cf-line").len(), 1);
        assert!(
            !output.to_html().contains("data-language"),
            "{}",
            output.to_html()
        );
    }

    #[test]
    fn test_malformed_meta_runs_no_stage() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let renderer = Renderer::new(RendererOptions::new().with_plugin(
            Plugin::new("count").on_preprocess_metadata(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        ))
        .unwrap();

        let result = Group::new(vec![
            BlockInput::new("x", "js", parent()).with_meta(r#"title="unterminated"#),
        ]);
        assert!(matches!(
            result,
            Err(crate::ValidationError::UnterminatedToken { delimiter: '"', .. })
        ));

        renderer.render(&mut group(&[("x", "js")])).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_annotation_after_finalization_fails() {
        let renderer = Renderer::new(RendererOptions::new()).unwrap();
        let mut group = group(&[("x", "js")]);
        renderer.render(&mut group).unwrap();

        let block = &mut group.blocks_mut()[0];
        assert_eq!(block.state(), BlockState::Finalized);
        let err = block
            .add_annotation(AnnotationTarget::Block, WrapAnnotation::new("late", "div"))
            .unwrap_err();
        assert!(
            matches!(
                err,
                Error::State(StateError {
                    state: BlockState::Finalized,
                    ..
                })
            ),
            "{err}"
        );
    }

    #[test]
    fn test_rendering_twice_fails() {
        let renderer = Renderer::new(RendererOptions::new()).unwrap();
        let mut group = group(&[("x", "js")]);
        renderer.render(&mut group).unwrap();
        assert!(matches!(
            renderer.render(&mut group),
            Err(Error::State(_))
        ));
    }

    #[test]
    fn test_hook_error_names_plugin_and_stage() {
        let renderer = Renderer::new(
            RendererOptions::new()
                .with_plugin(Plugin::new("ok"))
                .with_plugin(
                    Plugin::new("broken").on_annotate_code(|_| Err("cannot annotate".into())),
                ),
        )
        .unwrap();

        let err = renderer.render(&mut group(&[("x", "js")])).unwrap_err();
        match err {
            Error::Plugin {
                plugin,
                stage,
                source,
            } => {
                assert_eq!(plugin, "broken");
                assert_eq!(stage, Stage::AnnotateCode);
                assert_eq!(source.to_string(), "cannot annotate");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_illegal_mutation_in_hook_fails_render() {
        let renderer = Renderer::new(RendererOptions::new().with_plugin(
            Plugin::new("late-edit").on_annotate_code(|ctx| {
                ctx.block.set_code("changed")?;
                Ok(())
            }),
        ))
        .unwrap();

        let err = renderer.render(&mut group(&[("x", "js")])).unwrap_err();
        let Error::Plugin { source, .. } = err else {
            panic!("unexpected error: {err}");
        };
        assert!(source.downcast_ref::<StateError>().is_some());
    }

    #[test]
    fn test_stages_run_stage_major() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (metadata_log, code_log) = (Arc::clone(&log), Arc::clone(&log));
        let plugin = Plugin::new("log")
            .on_preprocess_metadata(move |ctx| {
                metadata_log.lock().unwrap().push(("meta", ctx.block.index()));
                Ok(())
            })
            .on_preprocess_code(move |ctx| {
                code_log.lock().unwrap().push(("code", ctx.block.index()));
                Ok(())
            });
        let renderer = Renderer::new(RendererOptions::new().with_plugin(plugin)).unwrap();
        renderer
            .render(&mut group(&[("a", "js"), ("b", "js")]))
            .unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec![("meta", 0), ("meta", 1), ("code", 0), ("code", 1)]
        );
    }

    #[test]
    fn test_preprocess_code_edits_lines() {
        let plugin = Plugin::new("strip").on_preprocess_code(|ctx| {
            let hidden: Vec<usize> = ctx
                .block
                .lines()
                .iter()
                .enumerate()
                .filter(|(_, line)| line.text().starts_with("# hide"))
                .map(|(i, _)| i)
                .collect();
            for index in hidden.into_iter().rev() {
                ctx.block.remove_line(index)?;
            }
            Ok(())
        });
        let renderer = Renderer::new(RendererOptions::new().with_plugin(plugin)).unwrap();
        let output = renderer
            .render(&mut group(&[("a\n# hide\nb", "sh")]))
            .unwrap();

        assert_eq!(output.blocks[0].line_count, 2);
        assert_eq!(output.node.text_content(), "ab");
    }

    #[test]
    fn test_render_hooks_rewrite_nodes() {
        let plugin = Plugin::new("attrs")
            .on_postprocess_rendered_line(|ctx| {
                if let Some(el) = ctx.node.as_element_mut() {
                    el.set_attr("data-line", (ctx.line_index + 1).to_string());
                }
                Ok(())
            })
            .on_postprocess_rendered_block(|ctx| {
                if let Some(el) = ctx.node.as_element_mut() {
                    el.set_attr("data-lines", ctx.block.line_count().to_string());
                }
                Ok(())
            })
            .on_postprocess_rendered_block_group(|ctx| {
                let count = ctx.blocks.len();
                if let Some(el) = ctx.node.as_element_mut() {
                    el.set_attr("data-blocks", count.to_string());
                }
                Ok(())
            });
        let renderer = Renderer::new(RendererOptions::new().with_plugin(plugin)).unwrap();
        let html = renderer
            .render(&mut group(&[("a\nb", "")]))
            .unwrap()
            .to_html();

        assert_eq!(
            html,
            concat!(
                r#"<div class="cf" data-blocks="1">"#,
                r#"<figure class="cf-block" data-lines="2"><pre tabindex="0"><code>"#,
                r#"<div class="cf-line" data-line="1"><div class="cf-code">a</div></div>"#,
                r#"<div class="cf-line" data-line="2"><div class="cf-code">b</div></div>"#,
                r#"</code></pre></figure></div>"#,
            )
        );
    }

    #[test]
    fn test_inline_styles_set_after_block_render() {
        let plugin = Plugin::new("late-style")
            .on_postprocess_annotations(|ctx| {
                ctx.block.set_inline_style("--cf-early", "0")?;
                Ok(())
            })
            .on_postprocess_rendered_block(|ctx| {
                if let Some(el) = ctx.node.as_element_mut() {
                    el.append_style("color:red");
                }
                ctx.block.set_inline_style("--cf-late", "1")?;
                Ok(())
            });
        let renderer = Renderer::new(RendererOptions::new().with_plugin(plugin)).unwrap();
        let output = renderer.render(&mut group(&[("a", "")])).unwrap();

        let figure = output.node.find_by_class("cf-block")[0];
        assert_eq!(figure.attr("style"), Some("--cf-early:0;--cf-late:1;color:red"));
    }

    #[test]
    fn test_inline_styles_set_in_group_hook() {
        let plugin = Plugin::new("group-style").on_postprocess_rendered_block_group(|ctx| {
            for (i, block) in ctx.blocks.iter_mut().enumerate() {
                block.set_inline_style("--cf-tab", i.to_string())?;
            }
            Ok(())
        });
        let renderer = Renderer::new(RendererOptions::new().with_plugin(plugin)).unwrap();
        let output = renderer
            .render(&mut group(&[("a", "js"), ("b", "css")]))
            .unwrap();

        let styles: Vec<_> = output
            .node
            .find_by_class("cf-block")
            .iter()
            .map(|el| el.attr("style"))
            .collect();
        assert_eq!(styles, vec![Some("--cf-tab:0"), Some("--cf-tab:1")]);
    }

    #[test]
    fn test_plugin_assets_are_deduplicated() {
        let plugin = Plugin::new("copy")
            .with_base_style(".cf .copy{display:none}")
            .with_script_module("export const copy = 1;")
            .on_annotate_code(|ctx| {
                ctx.add_style(".cf .extra{}");
                ctx.add_script_module("export const copy = 1;");
                Ok(())
            });
        let renderer = Renderer::new(RendererOptions::new().with_plugin(plugin)).unwrap();
        let output = renderer
            .render(&mut group(&[("a", "js"), ("b", "js")]))
            .unwrap();

        assert_eq!(output.styles.len(), 4);
        assert_eq!(output.styles[2], ".cf .copy{display:none}");
        assert_eq!(output.styles[3], ".cf .extra{}");
        assert_eq!(output.script_modules, vec!["export const copy = 1;"]);
    }

    #[test]
    fn test_render_in_scope_emits_assets_once() {
        let renderer = Renderer::new(RendererOptions::new()).unwrap();
        let mut scope = AssetScope::new();

        let first = renderer
            .render_in_scope(&mut group(&[("a", "js")]), &mut scope)
            .unwrap();
        let second = renderer
            .render_in_scope(&mut group(&[("b", "js")]), &mut scope)
            .unwrap();

        assert_eq!(first.styles.len(), 2);
        assert!(second.styles.is_empty());
        assert_eq!(scope.emitted().styles().len(), 2);
    }

    #[test]
    fn test_render_groups_in_parallel() {
        let renderer = highlighting_renderer(&["github-dark", "github-light"]);
        let codes: Vec<String> = (0..16).map(|i| format!("let v{i} = {i};")).collect();
        let mut groups: Vec<Group> = codes
            .iter()
            .map(|code| group(&[(code.as_str(), "js")]))
            .collect();
        let expected: Vec<_> = codes
            .iter()
            .map(|code| renderer.render(&mut group(&[(code.as_str(), "js")])).unwrap())
            .collect();

        let results = renderer.render_groups(&mut groups);
        let outputs: Vec<_> = results.into_iter().map(Result::unwrap).collect();
        assert_eq!(outputs, expected);
    }

    #[test]
    fn test_plugin_defaults_and_user_overrides() {
        let plugin = Plugin::new("frames").with_default_style("frames.titleColor", "#333");
        let renderer = Renderer::new(
            RendererOptions::new()
                .with_plugin(plugin)
                .with_style("frames.titleColor", "#444")
                .with_style("code.fontSize", "1rem"),
        )
        .unwrap();

        let styles = renderer.styles();
        assert_eq!(styles.get_str("frames.titleColor"), Some("#444"));
        assert_eq!(styles.get_str("code.fontSize"), Some("1rem"));
        assert_eq!(styles.get_str("code.background"), Some("#0d1117"));
        assert!(styles.unknown_keys().is_empty());
    }

    #[test]
    fn test_theme_overrides_differ_per_theme() {
        let renderer = Renderer::new(
            RendererOptions::new().with_themes([
                ThemeInput::builtin("github-dark"),
                ThemeInput::builtin("github-light"),
            ]),
        )
        .unwrap();
        assert_eq!(
            renderer.theme_styles(1).unwrap().get_str("code.background"),
            Some("#ffffff")
        );
        assert!(renderer.theme_styles(2).is_none());
    }

    #[test]
    fn test_empty_theme_list_uses_default() {
        let renderer = Renderer::new(RendererOptions::new().with_themes(Vec::new())).unwrap();
        assert_eq!(renderer.themes()[0].name(), DEFAULT_THEME);
    }

    #[test]
    fn test_unknown_theme_fails() {
        let err = Renderer::new(RendererOptions::new().with_themes([ThemeInput::builtin("nope")])).unwrap_err();
        assert!(matches!(err, Error::ThemeLoad(_)), "{err}");
    }

    #[test]
    fn test_style_kind_conflict_fails() {
        let err = Renderer::new(RendererOptions::new().with_style("code.fontFamily", "mono"))
            .unwrap_err();
        assert!(matches!(err, Error::StyleResolution(_)), "{err}");
    }

    #[test]
    fn test_shared_theme_manager() {
        let manager = Arc::new(ThemeManager::new());
        for _ in 0..3 {
            Renderer::new(RendererOptions::new().with_theme_manager(Arc::clone(&manager)))
                .unwrap();
        }
        assert_eq!(manager.computations(), 1);
    }

    #[test]
    fn test_props_in_metadata() {
        let plugin = Plugin::new("title").on_preprocess_metadata(|ctx| {
            if let Some(title) = ctx.block.meta().get_string("title") {
                let title = title.to_owned();
                ctx.block.set_prop("title", title)?;
            }
            Ok(())
        });
        let renderer = Renderer::new(RendererOptions::new().with_plugin(plugin)).unwrap();
        let mut group = Group::new(vec![
            BlockInput::new("x", "js", parent())
                .with_meta(r#"title="app.js""#)
                .with_locale("en-US"),
        ])
        .unwrap();
        let output = renderer.render(&mut group).unwrap();

        assert_eq!(output.blocks[0].props.get("title").map(String::as_str), Some("app.js"));
        assert_eq!(output.blocks[0].locale.as_deref(), Some("en-US"));
    }
}
