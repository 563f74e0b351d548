//! Line, block and group markup.

use std::sync::Arc;

use cf_theme::Theme;

use crate::annotation::{self, AnnotationContext};
use crate::block::Block;
use crate::node::{Element, Node};

/// Render one line.
///
/// The line text is split at every inline annotation boundary. Each segment
/// is passed through the annotations covering it, so overlapping ranges
/// produce correctly nested markup. Line annotations then transform the
/// `div.cf-line` element.
pub(crate) fn render_line(block: &Block, index: usize, themes: &[Arc<Theme>]) -> Node {
    let line = &block.lines()[index];
    let ctx = AnnotationContext {
        block,
        line_index: Some(index),
        themes,
    };

    let text = line.text();
    let byte_offsets: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();

    let mut bounds = vec![0, line.char_len()];
    for inline in line.inline_annotations() {
        bounds.push(inline.range.start);
        bounds.push(inline.range.end);
    }
    bounds.sort_unstable();
    bounds.dedup();

    let mut children = Vec::new();
    for pair in bounds.windows(2) {
        let (start, end) = (pair[0], pair[1]);
        let segment = &text[byte_offsets[start]..byte_offsets[end]];
        let covering = line
            .inline_annotations()
            .iter()
            .filter(|inline| inline.range.start <= start && end <= inline.range.end)
            .map(|inline| &inline.attached);
        children.extend(annotation::apply(covering, &ctx, vec![Node::text(segment)]));
    }

    let line_el = Element::new("div").with_class("cf-line").with_child(
        Element::new("div")
            .with_class("cf-code")
            .with_children(children),
    );
    Node::from_nodes(annotation::apply(
        line.annotations(),
        &ctx,
        vec![line_el.into()],
    ))
}

/// Render a block around its rendered lines.
pub(crate) fn render_block(block: &Block, lines: Vec<Node>, themes: &[Arc<Theme>]) -> Node {
    let ctx = AnnotationContext {
        block,
        line_index: None,
        themes,
    };

    let pre = Element::new("pre")
        .with_attr("tabindex", "0")
        .with_child(Element::new("code").with_children(lines));
    let content = annotation::apply(block.annotations(), &ctx, vec![pre.into()]);

    let mut figure = Element::new("figure")
        .with_class("cf-block")
        .with_children(content);
    if !block.language().is_empty() {
        figure.set_attr("data-language", block.language());
    }
    let style = block.inline_style_attr();
    if !style.is_empty() {
        figure.set_attr("style", style);
    }
    figure.into()
}

/// Bring `figure.cf-block` style attributes up to date with inline styles
/// set after the block was rendered.
///
/// `styles` holds one `(rendered, current)` pair per block, matched to the
/// `cf-block` elements in document order. Declarations a hook appended to the
/// attribute itself are kept.
pub(crate) fn refresh_block_styles(node: &mut Node, styles: &[(String, String)]) {
    if styles.iter().all(|(rendered, current)| rendered == current) {
        return;
    }
    let mut pending = styles.iter();
    node.for_each_element_mut(&mut |el| {
        if !el.has_class("cf-block") {
            return;
        }
        let Some((rendered, current)) = pending.next() else {
            return;
        };
        if rendered == current {
            return;
        }
        let existing = el.attr("style").unwrap_or_default();
        let extra = existing
            .strip_prefix(rendered.as_str())
            .map_or(existing, |rest| rest.trim_start_matches(';'));
        let style = [current.as_str(), extra]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(";");
        if style.is_empty() {
            el.remove_attr("style");
        } else {
            el.set_attr("style", style);
        }
    });
}

/// Wrap rendered blocks into the group element.
pub(crate) fn render_group(blocks: Vec<Node>) -> Node {
    Element::new("div")
        .with_class("cf")
        .with_children(blocks)
        .into()
}
