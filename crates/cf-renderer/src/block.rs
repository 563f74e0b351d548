//! Code blocks and their lifecycle.

use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::Arc;

use crate::annotation::{
    Annotation, AnnotationTarget, AttachedAnnotation, InlineAnnotation, RegistrationOrder,
};
use crate::document::{Document, GroupPosition, ParentDocument};
use crate::error::{Error, StateError, ValidationError};
use crate::meta::MetaOptions;
use crate::plugin::Stage;

/// Raw code block as found in a document.
#[derive(Clone, Debug)]
pub struct BlockInput {
    /// Source code.
    pub code: String,
    /// Language identifier from the fence (may be empty).
    pub language: String,
    /// Metadata string after the language.
    pub meta: String,
    /// Natural language of the surrounding document (e.g., `en-US`).
    pub locale: Option<String>,
    /// Document the block was found in.
    pub parent: ParentDocument,
}

impl BlockInput {
    /// Create an input without metadata or locale.
    #[must_use]
    pub fn new(code: impl Into<String>, language: impl Into<String>, parent: ParentDocument) -> Self {
        Self {
            code: code.into(),
            language: language.into(),
            meta: String::new(),
            locale: None,
            parent,
        }
    }

    /// Set the metadata string.
    #[must_use]
    pub fn with_meta(mut self, meta: impl Into<String>) -> Self {
        self.meta = meta.into();
        self
    }

    /// Set the locale.
    #[must_use]
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }
}

/// Lifecycle state of a [`Block`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockState {
    /// Created, not yet seen by the pipeline.
    Pending,
    /// The pipeline is running the given stage.
    InStage(Stage),
    /// Rendering completed; the block is read-only.
    Finalized,
}

/// A line of code with its annotations.
#[derive(Clone, Debug)]
pub struct Line {
    text: String,
    char_len: usize,
    inline: Vec<InlineAnnotation>,
    annotations: Vec<AttachedAnnotation>,
}

impl Line {
    fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            char_len: text.chars().count(),
            text,
            inline: Vec::new(),
            annotations: Vec::new(),
        }
    }

    /// Line text without the line terminator.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length in characters.
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.char_len
    }

    /// Inline annotations in attachment order.
    #[must_use]
    pub fn inline_annotations(&self) -> &[InlineAnnotation] {
        &self.inline
    }

    /// Line-level annotations in attachment order.
    #[must_use]
    pub fn annotations(&self) -> &[AttachedAnnotation] {
        &self.annotations
    }
}

/// A code block moving through the plugin pipeline.
///
/// Structural edits (code, language, metadata, lines) are allowed until
/// syntax analysis starts. Annotations can only be added from syntax
/// analysis through annotation post-processing. Props and inline styles can
/// change until the block is finalized. Anything else fails with
/// [`StateError`].
#[derive(Clone, Debug)]
pub struct Block {
    index: usize,
    language: String,
    meta: MetaOptions,
    locale: Option<String>,
    parent: ParentDocument,
    lines: Vec<Line>,
    annotations: Vec<AttachedAnnotation>,
    props: BTreeMap<String, String>,
    inline_styles: BTreeMap<String, String>,
    state: BlockState,
    active_plugin: Option<usize>,
    sequence: usize,
}

impl Block {
    /// Create a block from raw input.
    ///
    /// Line endings are normalized to `\n` and one trailing newline is
    /// dropped. Empty code yields a single empty line. The language is
    /// trimmed and lowercased.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnterminatedToken`] for malformed metadata.
    ///
    /// # Example
    ///
    /// ```
    /// use std::sync::Arc;
    /// use cf_renderer::{Block, BlockInput, Document, GroupPosition, ParentDocument};
    ///
    /// let parent = ParentDocument::new(Arc::new(Document::new()), GroupPosition::default());
    /// let block = Block::new(BlockInput::new("a\r\nb\n", " JS ", parent)).unwrap();
    ///
    /// assert_eq!(block.language(), "js");
    /// assert_eq!(block.line_count(), 2);
    /// assert_eq!(block.code(), "a\nb");
    /// ```
    pub fn new(input: BlockInput) -> Result<Self, ValidationError> {
        let meta = MetaOptions::parse(&input.meta)?;
        Ok(Self {
            index: 0,
            language: normalize_language(&input.language),
            meta,
            locale: input.locale,
            parent: input.parent,
            lines: split_lines(&input.code),
            annotations: Vec::new(),
            props: BTreeMap::new(),
            inline_styles: BTreeMap::new(),
            state: BlockState::Pending,
            active_plugin: None,
            sequence: 0,
        })
    }

    /// Index of the block within its group.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    /// Code with lines joined by `\n`.
    #[must_use]
    pub fn code(&self) -> String {
        let mut code = String::new();
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                code.push('\n');
            }
            code.push_str(&line.text);
        }
        code
    }

    /// Normalized language identifier.
    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Parsed metadata.
    #[must_use]
    pub fn meta(&self) -> &MetaOptions {
        &self.meta
    }

    /// Locale of the surrounding document.
    #[must_use]
    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    /// Document the block belongs to.
    #[must_use]
    pub fn document(&self) -> &Arc<Document> {
        &self.parent.document
    }

    /// Position of the block's group in the document.
    #[must_use]
    pub fn position(&self) -> GroupPosition {
        self.parent.position
    }

    /// Lines of code.
    #[must_use]
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// A single line.
    #[must_use]
    pub fn line(&self, index: usize) -> Option<&Line> {
        self.lines.get(index)
    }

    /// Number of lines (at least 1).
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Block-level annotations in attachment order.
    #[must_use]
    pub fn annotations(&self) -> &[AttachedAnnotation] {
        &self.annotations
    }

    /// Plugin-defined properties.
    #[must_use]
    pub fn props(&self) -> &BTreeMap<String, String> {
        &self.props
    }

    /// A plugin-defined property.
    #[must_use]
    pub fn prop(&self, key: &str) -> Option<&str> {
        self.props.get(key).map(String::as_str)
    }

    /// Inline CSS custom properties set on the block element.
    #[must_use]
    pub fn inline_styles(&self) -> &BTreeMap<String, String> {
        &self.inline_styles
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> BlockState {
        self.state
    }

    /// Replace the whole code.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] once syntax analysis has started.
    pub fn set_code(&mut self, code: &str) -> Result<(), StateError> {
        self.ensure_structural("replace code")?;
        self.lines = split_lines(code);
        Ok(())
    }

    /// Change the language.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] once syntax analysis has started.
    pub fn set_language(&mut self, language: &str) -> Result<(), StateError> {
        self.ensure_structural("change language")?;
        self.language = normalize_language(language);
        Ok(())
    }

    /// Replace the metadata string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::State`] once syntax analysis has started and
    /// [`Error::Validation`] for malformed metadata.
    pub fn set_meta(&mut self, meta: &str) -> Result<(), Error> {
        self.ensure_structural("change metadata")?;
        self.meta = MetaOptions::parse(meta)?;
        Ok(())
    }

    /// Replace the text of one line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::State`] once syntax analysis has started and
    /// [`Error::Validation`] for an out-of-bounds index.
    pub fn set_line_text(&mut self, index: usize, text: &str) -> Result<(), Error> {
        self.ensure_structural("edit line")?;
        self.check_line(index)?;
        self.lines[index] = Line::new(text);
        Ok(())
    }

    /// Insert a line before `index` (`index == line_count()` appends).
    ///
    /// # Errors
    ///
    /// Returns [`Error::State`] once syntax analysis has started and
    /// [`Error::Validation`] for an out-of-bounds index.
    pub fn insert_line(&mut self, index: usize, text: &str) -> Result<(), Error> {
        self.ensure_structural("insert line")?;
        if index > self.lines.len() {
            return Err(ValidationError::LineOutOfBounds {
                line: index,
                line_count: self.lines.len(),
            }
            .into());
        }
        self.lines.insert(index, Line::new(text));
        Ok(())
    }

    /// Remove a line, returning its text.
    ///
    /// Removing the only line leaves a single empty line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::State`] once syntax analysis has started and
    /// [`Error::Validation`] for an out-of-bounds index.
    pub fn remove_line(&mut self, index: usize) -> Result<String, Error> {
        self.ensure_structural("remove line")?;
        self.check_line(index)?;
        let removed = self.lines.remove(index);
        if self.lines.is_empty() {
            self.lines.push(Line::new(""));
        }
        Ok(removed.text)
    }

    /// Remove a range of lines, returning their texts.
    ///
    /// Removing every line leaves a single empty line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::State`] once syntax analysis has started and
    /// [`Error::Validation`] if the range does not lie within the block.
    pub fn remove_lines(&mut self, range: Range<usize>) -> Result<Vec<String>, Error> {
        self.ensure_structural("remove lines")?;
        if range.start > range.end || range.end > self.lines.len() {
            return Err(ValidationError::LineOutOfBounds {
                line: range.end.max(range.start),
                line_count: self.lines.len(),
            }
            .into());
        }
        let removed = self.lines.drain(range).map(|line| line.text).collect();
        if self.lines.is_empty() {
            self.lines.push(Line::new(""));
        }
        Ok(removed)
    }

    /// Attach an annotation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::State`] outside the annotation stages and
    /// [`Error::Validation`] if the target is out of bounds.
    pub fn add_annotation(
        &mut self,
        target: AnnotationTarget,
        annotation: impl Annotation + 'static,
    ) -> Result<(), Error> {
        self.add_shared_annotation(target, Arc::new(annotation))
    }

    /// Attach a shared annotation.
    ///
    /// # Errors
    ///
    /// See [`add_annotation`](Self::add_annotation).
    pub fn add_shared_annotation(
        &mut self,
        target: AnnotationTarget,
        annotation: Arc<dyn Annotation>,
    ) -> Result<(), Error> {
        self.ensure_annotating("add annotation")?;

        let order = RegistrationOrder {
            plugin: self.active_plugin.unwrap_or(usize::MAX),
            sequence: self.sequence,
        };
        let attached = AttachedAnnotation::new(annotation, order);

        match target {
            AnnotationTarget::Block => self.annotations.push(attached),
            AnnotationTarget::Line(line) => {
                self.check_line(line)?;
                self.lines[line].annotations.push(attached);
            }
            AnnotationTarget::Range { line, range } => {
                self.check_line(line)?;
                let len = self.lines[line].char_len;
                if range.start > range.end || range.end > len {
                    return Err(ValidationError::RangeOutOfBounds {
                        line,
                        start: range.start,
                        end: range.end,
                        len,
                    }
                    .into());
                }
                if range.is_empty() {
                    return Err(ValidationError::EmptyRange {
                        line,
                        start: range.start,
                    }
                    .into());
                }
                self.lines[line]
                    .inline
                    .push(InlineAnnotation { range, attached });
            }
        }

        self.sequence += 1;
        Ok(())
    }

    /// Remove all annotations (block, line and inline) with the given name.
    ///
    /// Returns the number of removed annotations.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] outside the annotation stages.
    pub fn remove_annotations(&mut self, name: &str) -> Result<usize, StateError> {
        self.ensure_annotating("remove annotations")?;
        let mut removed = 0;
        let mut keep = |a: &AttachedAnnotation| {
            let matches = a.annotation.name() == name;
            removed += usize::from(matches);
            !matches
        };

        self.annotations.retain(&mut keep);
        for line in &mut self.lines {
            line.annotations.retain(&mut keep);
            line.inline.retain(|i| keep(&i.attached));
        }
        Ok(removed)
    }

    /// Set a plugin-defined property.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] once the block is finalized.
    pub fn set_prop(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<(), StateError> {
        self.ensure_mutable("set prop")?;
        self.props.insert(key.into(), value.into());
        Ok(())
    }

    /// Set an inline CSS custom property on the block element.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] once the block is finalized.
    pub fn set_inline_style(
        &mut self,
        property: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), StateError> {
        self.ensure_mutable("set inline style")?;
        self.inline_styles.insert(property.into(), value.into());
        Ok(())
    }

    /// Inline styles as a `style` attribute value.
    #[must_use]
    pub fn inline_style_attr(&self) -> String {
        self.inline_styles
            .iter()
            .map(|(k, v)| format!("{k}:{v}"))
            .collect::<Vec<_>>()
            .join(";")
    }

    pub(crate) fn enter(&mut self, stage: Stage) {
        self.state = BlockState::InStage(stage);
    }

    pub(crate) fn set_active_plugin(&mut self, plugin: Option<usize>) {
        self.active_plugin = plugin;
    }

    pub(crate) fn finalize(&mut self) {
        self.state = BlockState::Finalized;
        self.active_plugin = None;
    }

    fn check_line(&self, line: usize) -> Result<(), ValidationError> {
        if line < self.lines.len() {
            Ok(())
        } else {
            Err(ValidationError::LineOutOfBounds {
                line,
                line_count: self.lines.len(),
            })
        }
    }

    fn ensure_structural(&self, operation: &'static str) -> Result<(), StateError> {
        let allowed = match self.state {
            BlockState::Pending => true,
            BlockState::InStage(stage) => stage.allows_structural_edits(),
            BlockState::Finalized => false,
        };
        self.ensure(allowed, operation)
    }

    fn ensure_annotating(&self, operation: &'static str) -> Result<(), StateError> {
        let allowed = matches!(self.state, BlockState::InStage(stage) if stage.allows_annotations());
        self.ensure(allowed, operation)
    }

    fn ensure_mutable(&self, operation: &'static str) -> Result<(), StateError> {
        self.ensure(self.state != BlockState::Finalized, operation)
    }

    fn ensure(&self, allowed: bool, operation: &'static str) -> Result<(), StateError> {
        if allowed {
            Ok(())
        } else {
            Err(StateError {
                operation,
                state: self.state,
            })
        }
    }
}

fn normalize_language(language: &str) -> String {
    language.trim().to_lowercase()
}

fn split_lines(code: &str) -> Vec<Line> {
    let code = code.replace("\r\n", "\n").replace('\r', "\n");
    let code = code.strip_suffix('\n').unwrap_or(&code);
    code.split('\n').map(Line::new).collect()
}
