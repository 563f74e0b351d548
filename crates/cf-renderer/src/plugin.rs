//! Plugins and pipeline stages.

use std::fmt;
use std::sync::Arc;

use cf_style::{ResolvedStyles, StyleLayer, StyleValue};
use cf_theme::Theme;

use crate::assets::Assets;
use crate::block::Block;
use crate::document::{Document, GroupPosition};
use crate::error::HookResult;
use crate::node::Node;

/// A stage of the rendering pipeline, in execution order.
///
/// Every stage runs for every block of a group before the next stage starts.
/// Lines are rendered between [`PostprocessAnnotations`](Self::PostprocessAnnotations)
/// and [`PostprocessRenderedLine`](Self::PostprocessRenderedLine); blocks are
/// rendered before [`PostprocessRenderedBlock`](Self::PostprocessRenderedBlock).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    /// Read or rewrite the metadata string.
    PreprocessMetadata,
    /// Edit code before analysis (e.g., strip markers).
    PreprocessCode,
    /// Tokenize the code.
    PerformSyntaxAnalysis,
    /// Adjust syntax annotations.
    PostprocessAnalyzedCode,
    /// Add feature annotations.
    AnnotateCode,
    /// Rearrange or drop annotations.
    PostprocessAnnotations,
    /// Rewrite each rendered line.
    PostprocessRenderedLine,
    /// Rewrite each rendered block.
    PostprocessRenderedBlock,
    /// Rewrite the rendered group.
    PostprocessRenderedBlockGroup,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 9] = [
        Self::PreprocessMetadata,
        Self::PreprocessCode,
        Self::PerformSyntaxAnalysis,
        Self::PostprocessAnalyzedCode,
        Self::AnnotateCode,
        Self::PostprocessAnnotations,
        Self::PostprocessRenderedLine,
        Self::PostprocessRenderedBlock,
        Self::PostprocessRenderedBlockGroup,
    ];

    /// Stages that run before rendering, with a [`BlockContext`].
    pub const BLOCK_STAGES: [Stage; 6] = [
        Self::PreprocessMetadata,
        Self::PreprocessCode,
        Self::PerformSyntaxAnalysis,
        Self::PostprocessAnalyzedCode,
        Self::AnnotateCode,
        Self::PostprocessAnnotations,
    ];

    /// Kebab-case stage name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::PreprocessMetadata => "preprocess-metadata",
            Self::PreprocessCode => "preprocess-code",
            Self::PerformSyntaxAnalysis => "perform-syntax-analysis",
            Self::PostprocessAnalyzedCode => "postprocess-analyzed-code",
            Self::AnnotateCode => "annotate-code",
            Self::PostprocessAnnotations => "postprocess-annotations",
            Self::PostprocessRenderedLine => "postprocess-rendered-line",
            Self::PostprocessRenderedBlock => "postprocess-rendered-block",
            Self::PostprocessRenderedBlockGroup => "postprocess-rendered-block-group",
        }
    }

    /// Whether code, language, metadata and lines may change.
    #[must_use]
    pub fn allows_structural_edits(self) -> bool {
        matches!(self, Self::PreprocessMetadata | Self::PreprocessCode)
    }

    /// Whether annotations may be added or removed.
    #[must_use]
    pub fn allows_annotations(self) -> bool {
        matches!(
            self,
            Self::PerformSyntaxAnalysis
                | Self::PostprocessAnalyzedCode
                | Self::AnnotateCode
                | Self::PostprocessAnnotations
        )
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Themes and resolved styles shared by all hooks of one render.
#[derive(Debug)]
pub(crate) struct Env<'a> {
    pub themes: &'a [Arc<Theme>],
    pub styles: &'a [ResolvedStyles],
}

macro_rules! context_accessors {
    ($ty:ident) => {
        impl $ty<'_> {
            /// Themes of the renderer, in configuration order.
            #[must_use]
            pub fn themes(&self) -> &[Arc<Theme>] {
                self.env.themes
            }

            /// Resolved styles of the first theme.
            #[must_use]
            pub fn styles(&self) -> &ResolvedStyles {
                &self.env.styles[0]
            }

            /// Resolved styles of the theme at `index`.
            #[must_use]
            pub fn theme_styles(&self, index: usize) -> Option<&ResolvedStyles> {
                self.env.styles.get(index)
            }

            /// Contribute a style sheet to the group output.
            ///
            /// Identical texts are emitted once.
            pub fn add_style(&mut self, css: impl Into<String>) {
                self.assets.add_style(css);
            }

            /// Contribute a JavaScript module to the group output.
            ///
            /// Identical texts are emitted once.
            pub fn add_script_module(&mut self, js: impl Into<String>) {
                self.assets.add_script_module(js);
            }
        }
    };
}

/// Context of the pre-render stages.
pub struct BlockContext<'a> {
    /// Block being processed.
    pub block: &'a mut Block,
    pub(crate) env: &'a Env<'a>,
    pub(crate) assets: &'a mut Assets,
}

/// Context of [`Stage::PostprocessRenderedLine`].
pub struct LineContext<'a> {
    /// Block the line belongs to.
    pub block: &'a mut Block,
    /// Line index.
    pub line_index: usize,
    /// Rendered line.
    pub node: &'a mut Node,
    pub(crate) env: &'a Env<'a>,
    pub(crate) assets: &'a mut Assets,
}

/// Context of [`Stage::PostprocessRenderedBlock`].
pub struct RenderedBlockContext<'a> {
    /// Rendered block.
    pub block: &'a mut Block,
    /// Rendered block element.
    pub node: &'a mut Node,
    pub(crate) env: &'a Env<'a>,
    pub(crate) assets: &'a mut Assets,
}

/// Context of [`Stage::PostprocessRenderedBlockGroup`].
pub struct GroupContext<'a> {
    /// Blocks of the group.
    pub blocks: &'a mut [Block],
    /// Rendered group element.
    pub node: &'a mut Node,
    pub(crate) document: &'a Arc<Document>,
    pub(crate) position: GroupPosition,
    pub(crate) env: &'a Env<'a>,
    pub(crate) assets: &'a mut Assets,
}

context_accessors!(BlockContext);
context_accessors!(LineContext);
context_accessors!(RenderedBlockContext);
context_accessors!(GroupContext);

impl GroupContext<'_> {
    /// Document the group belongs to.
    #[must_use]
    pub fn document(&self) -> &Arc<Document> {
        self.document
    }

    /// Position of the group in its document.
    #[must_use]
    pub fn position(&self) -> GroupPosition {
        self.position
    }
}

/// Hook of the pre-render stages.
pub type BlockHook = Arc<dyn Fn(&mut BlockContext<'_>) -> HookResult + Send + Sync>;
/// Hook of [`Stage::PostprocessRenderedLine`].
pub type LineHook = Arc<dyn Fn(&mut LineContext<'_>) -> HookResult + Send + Sync>;
/// Hook of [`Stage::PostprocessRenderedBlock`].
pub type RenderedBlockHook = Arc<dyn Fn(&mut RenderedBlockContext<'_>) -> HookResult + Send + Sync>;
/// Hook of [`Stage::PostprocessRenderedBlockGroup`].
pub type GroupHook = Arc<dyn Fn(&mut GroupContext<'_>) -> HookResult + Send + Sync>;

#[derive(Clone, Default)]
struct Hooks {
    block: [Option<BlockHook>; 6],
    rendered_line: Option<LineHook>,
    rendered_block: Option<RenderedBlockHook>,
    rendered_group: Option<GroupHook>,
}

/// A named bundle of stage hooks, default styles and assets.
///
/// # Example
///
/// ```
/// use cf_renderer::{Plugin, Stage};
///
/// let plugin = Plugin::new("title")
///     .with_default_style("title.fontWeight", "600")
///     .with_base_style(".cf .title{font-weight:var(--cf-title-font-weight)}")
///     .on_preprocess_metadata(|ctx| {
///         if let Some(title) = ctx.block.meta().get_string("title") {
///             let title = title.to_owned();
///             ctx.block.set_prop("title", title)?;
///         }
///         Ok(())
///     });
///
/// assert_eq!(plugin.name(), "title");
/// assert_eq!(plugin.stages(), vec![Stage::PreprocessMetadata]);
/// ```
#[derive(Clone)]
pub struct Plugin {
    name: String,
    hooks: Hooks,
    default_styles: StyleLayer,
    base_styles: Vec<String>,
    script_modules: Vec<String>,
}

macro_rules! block_hook_setter {
    ($(#[$doc:meta])* $fn:ident, $stage:ident) => {
        $(#[$doc])*
        #[must_use]
        pub fn $fn<F>(mut self, hook: F) -> Self
        where
            F: Fn(&mut BlockContext<'_>) -> HookResult + Send + Sync + 'static,
        {
            self.hooks.block[Stage::$stage as usize] = Some(Arc::new(hook));
            self
        }
    };
}

impl Plugin {
    /// Create a plugin without hooks.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            default_styles: StyleLayer::plugin_defaults(&name),
            name,
            hooks: Hooks::default(),
            base_styles: Vec::new(),
            script_modules: Vec::new(),
        }
    }

    block_hook_setter!(
        /// Register a [`Stage::PreprocessMetadata`] hook.
        on_preprocess_metadata,
        PreprocessMetadata
    );
    block_hook_setter!(
        /// Register a [`Stage::PreprocessCode`] hook.
        on_preprocess_code,
        PreprocessCode
    );
    block_hook_setter!(
        /// Register a [`Stage::PerformSyntaxAnalysis`] hook.
        on_perform_syntax_analysis,
        PerformSyntaxAnalysis
    );
    block_hook_setter!(
        /// Register a [`Stage::PostprocessAnalyzedCode`] hook.
        on_postprocess_analyzed_code,
        PostprocessAnalyzedCode
    );
    block_hook_setter!(
        /// Register a [`Stage::AnnotateCode`] hook.
        on_annotate_code,
        AnnotateCode
    );
    block_hook_setter!(
        /// Register a [`Stage::PostprocessAnnotations`] hook.
        on_postprocess_annotations,
        PostprocessAnnotations
    );

    /// Register a [`Stage::PostprocessRenderedLine`] hook.
    #[must_use]
    pub fn on_postprocess_rendered_line<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut LineContext<'_>) -> HookResult + Send + Sync + 'static,
    {
        self.hooks.rendered_line = Some(Arc::new(hook));
        self
    }

    /// Register a [`Stage::PostprocessRenderedBlock`] hook.
    #[must_use]
    pub fn on_postprocess_rendered_block<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut RenderedBlockContext<'_>) -> HookResult + Send + Sync + 'static,
    {
        self.hooks.rendered_block = Some(Arc::new(hook));
        self
    }

    /// Register a [`Stage::PostprocessRenderedBlockGroup`] hook.
    #[must_use]
    pub fn on_postprocess_rendered_block_group<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut GroupContext<'_>) -> HookResult + Send + Sync + 'static,
    {
        self.hooks.rendered_group = Some(Arc::new(hook));
        self
    }

    /// Declare a default style setting.
    ///
    /// Plugin defaults sit between the engine defaults and theme overrides.
    #[must_use]
    pub fn with_default_style(mut self, key: &str, value: impl Into<StyleValue>) -> Self {
        self.default_styles.insert(key, value);
        self
    }

    /// Add a style sheet emitted with every block.
    #[must_use]
    pub fn with_base_style(mut self, css: impl Into<String>) -> Self {
        self.base_styles.push(css.into());
        self
    }

    /// Add a JavaScript module emitted with every block.
    #[must_use]
    pub fn with_script_module(mut self, js: impl Into<String>) -> Self {
        self.script_modules.push(js.into());
        self
    }

    /// Plugin name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Default style layer.
    #[must_use]
    pub fn default_styles(&self) -> &StyleLayer {
        &self.default_styles
    }

    /// Style sheets emitted with every block.
    #[must_use]
    pub fn base_styles(&self) -> &[String] {
        &self.base_styles
    }

    /// JavaScript modules emitted with every block.
    #[must_use]
    pub fn script_modules(&self) -> &[String] {
        &self.script_modules
    }

    /// Stages this plugin has hooks for, in execution order.
    #[must_use]
    pub fn stages(&self) -> Vec<Stage> {
        Stage::ALL
            .into_iter()
            .filter(|stage| self.has_hook(*stage))
            .collect()
    }

    /// Whether the plugin has a hook for `stage`.
    #[must_use]
    pub fn has_hook(&self, stage: Stage) -> bool {
        match stage {
            Stage::PostprocessRenderedLine => self.hooks.rendered_line.is_some(),
            Stage::PostprocessRenderedBlock => self.hooks.rendered_block.is_some(),
            Stage::PostprocessRenderedBlockGroup => self.hooks.rendered_group.is_some(),
            stage => self.block_hook(stage).is_some(),
        }
    }

    pub(crate) fn block_hook(&self, stage: Stage) -> Option<&BlockHook> {
        self.hooks.block.get(stage as usize)?.as_ref()
    }

    pub(crate) fn line_hook(&self) -> Option<&LineHook> {
        self.hooks.rendered_line.as_ref()
    }

    pub(crate) fn rendered_block_hook(&self) -> Option<&RenderedBlockHook> {
        self.hooks.rendered_block.as_ref()
    }

    pub(crate) fn group_hook(&self) -> Option<&GroupHook> {
        self.hooks.rendered_group.as_ref()
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field("stages", &self.stages())
            .field("default_styles", &self.default_styles)
            .field("base_styles", &self.base_styles.len())
            .field("script_modules", &self.script_modules.len())
            .finish()
    }
}
