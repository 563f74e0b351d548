//! Stage-major execution of plugin hooks over a group.

use crate::assets::Assets;
use crate::block::Block;
use crate::error::{Error, HookError, Result};
use crate::group::Group;
use crate::markup;
use crate::node::Node;
use crate::plugin::{BlockContext, Env, GroupContext, LineContext, Plugin, RenderedBlockContext, Stage};

/// One render of one group.
pub(crate) struct Pipeline<'a> {
    pub plugins: &'a [Plugin],
    pub env: Env<'a>,
    /// Style sheets every block contributes.
    pub block_styles: &'a [String],
    /// Script modules every block contributes.
    pub block_scripts: &'a [String],
}

impl Pipeline<'_> {
    /// Run all stages and render the group.
    ///
    /// Each stage runs for every block, in block order, before the next
    /// stage starts. Within a block, hooks run in plugin registration order.
    pub(crate) fn run(&self, group: &mut Group) -> Result<(Node, Assets)> {
        let mut assets = Assets::new();
        let (document, position, blocks) = group.parts_mut();

        for _ in blocks.iter() {
            for css in self.block_styles {
                assets.add_style(css.clone());
            }
            for js in self.block_scripts {
                assets.add_script_module(js.clone());
            }
        }

        for stage in Stage::BLOCK_STAGES {
            for block in blocks.iter_mut() {
                block.enter(stage);
                for (index, plugin) in self.plugins.iter().enumerate() {
                    let Some(hook) = plugin.block_hook(stage) else {
                        continue;
                    };
                    block.set_active_plugin(Some(index));
                    let mut ctx = BlockContext {
                        block: &mut *block,
                        env: &self.env,
                        assets: &mut assets,
                    };
                    let result = hook(&mut ctx);
                    block.set_active_plugin(None);
                    result.map_err(|source| plugin_error(plugin, stage, source))?;
                }
            }
        }

        let mut line_nodes: Vec<Vec<Node>> = blocks
            .iter()
            .map(|block| {
                (0..block.line_count())
                    .map(|i| markup::render_line(block, i, self.env.themes))
                    .collect()
            })
            .collect();

        let stage = Stage::PostprocessRenderedLine;
        for (block, lines) in blocks.iter_mut().zip(&mut line_nodes) {
            block.enter(stage);
            for (line_index, node) in lines.iter_mut().enumerate() {
                for (index, plugin) in self.plugins.iter().enumerate() {
                    let Some(hook) = plugin.line_hook() else {
                        continue;
                    };
                    block.set_active_plugin(Some(index));
                    let mut ctx = LineContext {
                        block: &mut *block,
                        line_index,
                        node: &mut *node,
                        env: &self.env,
                        assets: &mut assets,
                    };
                    let result = hook(&mut ctx);
                    block.set_active_plugin(None);
                    result.map_err(|source| plugin_error(plugin, stage, source))?;
                }
            }
        }

        let mut block_nodes: Vec<Node> = blocks
            .iter()
            .zip(line_nodes)
            .map(|(block, lines)| markup::render_block(block, lines, self.env.themes))
            .collect();

        let stage = Stage::PostprocessRenderedBlock;
        for (block, node) in blocks.iter_mut().zip(&mut block_nodes) {
            block.enter(stage);
            let rendered_style = block.inline_style_attr();
            for (index, plugin) in self.plugins.iter().enumerate() {
                let Some(hook) = plugin.rendered_block_hook() else {
                    continue;
                };
                block.set_active_plugin(Some(index));
                let mut ctx = RenderedBlockContext {
                    block: &mut *block,
                    node: &mut *node,
                    env: &self.env,
                    assets: &mut assets,
                };
                let result = hook(&mut ctx);
                block.set_active_plugin(None);
                result.map_err(|source| plugin_error(plugin, stage, source))?;
            }
            markup::refresh_block_styles(node, &[(rendered_style, block.inline_style_attr())]);
        }

        let mut group_node = markup::render_group(block_nodes);

        let stage = Stage::PostprocessRenderedBlockGroup;
        blocks.iter_mut().for_each(|block| block.enter(stage));
        let rendered_styles: Vec<String> = blocks.iter().map(Block::inline_style_attr).collect();
        for plugin in self.plugins {
            let Some(hook) = plugin.group_hook() else {
                continue;
            };
            let mut ctx = GroupContext {
                blocks: &mut *blocks,
                node: &mut group_node,
                document,
                position,
                env: &self.env,
                assets: &mut assets,
            };
            hook(&mut ctx).map_err(|source| plugin_error(plugin, stage, source))?;
        }
        let styles: Vec<(String, String)> = rendered_styles
            .into_iter()
            .zip(blocks.iter().map(Block::inline_style_attr))
            .collect();
        markup::refresh_block_styles(&mut group_node, &styles);

        blocks.iter_mut().for_each(Block::finalize);
        Ok((group_node, assets))
    }
}

fn plugin_error(plugin: &Plugin, stage: Stage, source: HookError) -> Error {
    tracing::warn!(plugin = plugin.name(), stage = %stage, error = %source, "Plugin hook failed");
    Error::Plugin {
        plugin: plugin.name().to_owned(),
        stage,
        source,
    }
}
