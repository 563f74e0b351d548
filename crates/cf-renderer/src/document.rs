//! Source document identity.

use std::any::Any;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The document a group of code blocks was found in.
///
/// Immutable once built and shared between blocks through `Arc`. The host
/// adapter may attach an opaque handle to its own document tree with
/// [`with_root`](Self::with_root); the renderer never inspects it, but
/// plugins can downcast it with [`root`](Self::root).
///
/// # Example
///
/// ```
/// use std::path::Path;
/// use cf_renderer::Document;
///
/// struct PageTree(&'static str);
///
/// let doc = Document::new()
///     .with_source_path("docs/guide.md")
///     .with_root(PageTree("guide"));
///
/// assert_eq!(doc.source_path(), Some(Path::new("docs/guide.md")));
/// assert_eq!(doc.root::<PageTree>().map(|t| t.0), Some("guide"));
/// ```
#[derive(Clone, Default)]
pub struct Document {
    source_path: Option<PathBuf>,
    root: Option<Arc<dyn Any + Send + Sync>>,
}

impl Document {
    /// Create a document without source information.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the source file path.
    #[must_use]
    pub fn with_source_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_path = Some(path.into());
        self
    }

    /// Attach an opaque handle to the host's document tree.
    #[must_use]
    pub fn with_root<T: Any + Send + Sync>(mut self, root: T) -> Self {
        self.root = Some(Arc::new(root));
        self
    }

    /// Source file path (if known).
    #[must_use]
    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    /// Host document root, if one of type `T` was attached.
    #[must_use]
    pub fn root<T: Any>(&self) -> Option<&T> {
        self.root.as_deref()?.downcast_ref()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("source_path", &self.source_path)
            .field("has_root", &self.root.is_some())
            .finish()
    }
}

/// Position of a block group within its document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GroupPosition {
    /// Zero-based index of the group.
    pub group_index: usize,
    /// Number of groups in the document.
    pub total_groups: usize,
}

/// Document reference carried by each block input.
#[derive(Clone, Debug)]
pub struct ParentDocument {
    /// Shared document.
    pub document: Arc<Document>,
    /// Position of the block's group in the document.
    pub position: GroupPosition,
}

impl ParentDocument {
    /// Reference a document at a group position.
    #[must_use]
    pub fn new(document: Arc<Document>, position: GroupPosition) -> Self {
        Self { document, position }
    }
}
