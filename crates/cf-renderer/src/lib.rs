//! Plugin-driven code block rendering for codeframe.
//!
//! The renderer turns groups of fenced code blocks into annotated HTML trees
//! plus the style sheets and script modules they need.
//!
//! # Architecture
//!
//! - [`Block`]: code split into [`Line`]s, parsed [`MetaOptions`] and the
//!   [`Annotation`]s plugins attach to the block, its lines or character
//!   ranges
//! - [`Plugin`]: named set of [`Stage`] hooks with default styles and assets
//! - [`Renderer`]: loads themes through a [`ThemeManager`], resolves style
//!   settings per theme and runs the pipeline over a [`Group`]
//! - [`Node`]: output tree handed back to the host, serialized with
//!   [`Node::to_html`]
//!
//! # Pipeline
//!
//! Stages run in [`Stage::ALL`] order. Each stage runs for every block of the
//! group before the next one starts, and within a block hooks run in plugin
//! registration order. Lines are rendered after annotation post-processing,
//! blocks after line post-processing.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use cf_renderer::{
//!     AnnotationTarget, BlockInput, ClassAnnotation, Document, Group, GroupPosition,
//!     ParentDocument, Plugin, Renderer, RendererOptions,
//! };
//!
//! // Mark the lines listed in `{...}`
//! let marker = Plugin::new("mark")
//!     .with_base_style(".cf .cf-mark{background:#ff03}")
//!     .on_annotate_code(|ctx| {
//!         for range in ctx.block.meta().plain_ranges() {
//!             for line in range {
//!                 ctx.block.add_annotation(
//!                     AnnotationTarget::Line(line - 1),
//!                     ClassAnnotation::new("mark", "cf-mark"),
//!                 )?;
//!             }
//!         }
//!         Ok(())
//!     });
//!
//! let renderer = Renderer::new(RendererOptions::new().with_plugin(marker)).unwrap();
//!
//! let parent = ParentDocument::new(Arc::new(Document::new()), GroupPosition::default());
//! let input = BlockInput::new("let a = 1;\nlet b = 2;", "js", parent).with_meta("{2}");
//! let mut group = Group::new(vec![input]).unwrap();
//! let output = renderer.render(&mut group).unwrap();
//!
//! assert!(output.to_html().contains(r#"<div class="cf-line cf-mark"><div class="cf-code">let b = 2;"#));
//! assert_eq!(output.styles.len(), 3);
//! ```

mod annotation;
mod assets;
mod block;
mod css;
mod defaults;
mod document;
mod error;
mod group;
pub mod highlight;
mod markup;
mod meta;
mod node;
mod pipeline;
mod plugin;
mod renderer;

pub use annotation::{
    Annotation, AnnotationContext, AnnotationTarget, AttachedAnnotation, ClassAnnotation,
    InlineAnnotation, RegistrationOrder, WrapAnnotation,
};
pub use assets::{AssetScope, Assets};
pub use block::{Block, BlockInput, BlockState, Line};
pub use cf_style::{ResolvedStyles, StyleLayer, StyleValue};
pub use cf_theme::{Theme, ThemeInput, ThemeKind, ThemeManager};
pub use css::{ThemeSwitching, theme_selector};
pub use document::{Document, GroupPosition, ParentDocument};
pub use error::{Error, HookError, HookResult, Result, StateError, ValidationError};
pub use group::Group;
pub use meta::{MetaOptions, MetaToken, MetaValue};
pub use node::{Element, Node, escape_html};
pub use plugin::{
    BlockContext, BlockHook, GroupContext, GroupHook, LineContext, LineHook, Plugin,
    RenderedBlockContext, RenderedBlockHook, Stage,
};
pub use renderer::{BlockMetadata, DEFAULT_THEME, GroupOutput, Renderer, RendererOptions};
