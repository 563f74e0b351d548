//! Groups of blocks rendered together.

use std::sync::Arc;

use crate::block::{Block, BlockInput};
use crate::document::{Document, GroupPosition};
use crate::error::ValidationError;

/// Adjacent code blocks of one document, rendered as a unit.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use cf_renderer::{BlockInput, Document, Group, GroupPosition, ParentDocument};
///
/// let parent = ParentDocument::new(Arc::new(Document::new()), GroupPosition::default());
/// let group = Group::new(vec![
///     BlockInput::new("npm install", "shell", parent.clone()),
///     BlockInput::new("import x from 'x';", "js", parent),
/// ])
/// .unwrap();
///
/// assert_eq!(group.blocks().len(), 2);
/// assert_eq!(group.blocks()[1].index(), 1);
/// ```
#[derive(Clone, Debug)]
pub struct Group {
    document: Arc<Document>,
    position: GroupPosition,
    blocks: Vec<Block>,
}

impl Group {
    /// Create blocks from inputs and group them.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyGroup`] without inputs,
    /// [`ValidationError::MixedDocuments`] if inputs reference different
    /// documents, and metadata errors of individual blocks.
    pub fn new(inputs: Vec<BlockInput>) -> Result<Self, ValidationError> {
        let blocks = inputs
            .into_iter()
            .map(Block::new)
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_blocks(blocks)
    }

    /// Group already created blocks.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyGroup`] or
    /// [`ValidationError::MixedDocuments`].
    pub fn from_blocks(mut blocks: Vec<Block>) -> Result<Self, ValidationError> {
        let first = blocks.first().ok_or(ValidationError::EmptyGroup)?;
        let document = Arc::clone(first.document());
        let position = first.position();

        if let Some(index) = blocks
            .iter()
            .position(|block| !Arc::ptr_eq(block.document(), &document))
        {
            return Err(ValidationError::MixedDocuments { index });
        }

        for (index, block) in blocks.iter_mut().enumerate() {
            block.set_index(index);
        }

        Ok(Self {
            document,
            position,
            blocks,
        })
    }

    /// Document the group belongs to.
    #[must_use]
    pub fn document(&self) -> &Arc<Document> {
        &self.document
    }

    /// Position of the group in its document.
    #[must_use]
    pub fn position(&self) -> GroupPosition {
        self.position
    }

    /// Blocks in document order.
    #[must_use]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Blocks in document order.
    pub fn blocks_mut(&mut self) -> &mut [Block] {
        &mut self.blocks
    }

    pub(crate) fn parts_mut(&mut self) -> (&Arc<Document>, GroupPosition, &mut [Block]) {
        (&self.document, self.position, &mut self.blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::tests::input;
    use crate::document::ParentDocument;

    #[test]
    fn test_empty_group() {
        assert_eq!(Group::new(vec![]).unwrap_err(), ValidationError::EmptyGroup);
    }

    #[test]
    fn test_mixed_documents() {
        // Each helper input gets its own document
        let err = Group::new(vec![input("a"), input("b")]).unwrap_err();
        assert_eq!(err, ValidationError::MixedDocuments { index: 1 });
    }

    #[test]
    fn test_metadata_error_propagates() {
        let err = Group::new(vec![input("a").with_meta("{1")]).unwrap_err();
        assert!(matches!(err, ValidationError::UnterminatedToken { .. }));
    }

    #[test]
    fn test_position_taken_from_first_block() {
        let position = GroupPosition {
            group_index: 2,
            total_groups: 5,
        };
        let parent = ParentDocument::new(Arc::new(Document::new()), position);
        let group = Group::new(vec![BlockInput::new("a", "js", parent)]).unwrap();
        assert_eq!(group.position(), position);
    }
}
