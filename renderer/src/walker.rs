use std::fmt;
use std::sync::Arc;

use recordmap::{BlockRecord, BlockType, RecordMap};

use crate::context::ContextHandle;
use crate::dispatch::Dispatcher;
use crate::error::{Diagnostics, RenderWarning};
use crate::markup::Markup;
use crate::zoom::ZoomController;

/// Options set at the root call and handed unchanged to every nested block.
#[derive(Debug, Clone, Default)]
pub struct BlockRenderOptions {
    /// Extra class on the root page shell.
    pub class_name: Option<String>,
    /// Extra class on the root page body.
    pub body_class_name: Option<String>,
    /// Appended after the root page body.
    pub footer: Option<Markup>,
    /// Leave out the per-block `notion-block-{id}` classes.
    pub hide_block_id: bool,
    pub zoom: Option<Arc<ZoomController>>,
}

/// One node of the walked document graph.
///
/// `block` is `None` when the id did not resolve (missing record or a cycle);
/// such nodes have no children and render nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderNode<'a> {
    pub block_id: String,
    /// Depth from the root, which is level 0.
    pub level: usize,
    pub block: Option<&'a BlockRecord>,
    pub children: Vec<RenderNode<'a>>,
}

impl RenderNode<'_> {
    pub fn is_resolved(&self) -> bool {
        self.block.is_some()
    }

    /// Number of nodes in this subtree, unresolved ones included.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(RenderNode::count).sum::<usize>()
    }

    /// Block ids in depth-first pre-order.
    pub fn preorder_ids(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        self.collect_ids(&mut ids);
        ids
    }

    fn collect_ids<'s>(&'s self, out: &mut Vec<&'s str>) {
        out.push(&self.block_id);
        for child in &self.children {
            child.collect_ids(out);
        }
    }
}

impl fmt::Display for RenderNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let indent = "  ".repeat(self.level);
        match self.block {
            Some(block) => writeln!(f, "{}{} ({})", indent, self.block_id, block.block_type)?,
            None => writeln!(f, "{}{} (missing)", indent, self.block_id)?,
        }
        for child in &self.children {
            write!(f, "{}", child)?;
        }
        Ok(())
    }
}

/// Deepest level the walker resolves. Blocks nested further become empty
/// nodes with a [`RenderWarning::DepthLimit`], which keeps both passes within
/// a bounded stack.
pub const MAX_DEPTH: usize = 128;

/// Whether a block at `level` renders its `content`. Nested pages render as
/// links, and leaf or unsupported types never show children.
pub fn shows_children(block_type: &BlockType, level: usize) -> bool {
    match block_type {
        BlockType::Page => level == 0,
        BlockType::Text
        | BlockType::BulletedList
        | BlockType::NumberedList
        | BlockType::ToDo
        | BlockType::Toggle
        | BlockType::Callout
        | BlockType::CollectionView
        | BlockType::CollectionViewPage => true,
        _ => false,
    }
}

/// Resolve the id a pass starts from: the explicit root, or else the first
/// block id in the record map's insertion order.
pub fn root_block_id<'a>(record_map: &'a RecordMap, root: Option<&'a str>) -> &'a str {
    root.filter(|id| !id.is_empty())
        .or_else(|| record_map.block.first_id())
        .unwrap_or_default()
}

/// Walk the block graph from `root`.
///
/// Child order is the order of each block's `content`, untouched. Only blocks
/// that show their children are descended into. An id that does not resolve,
/// that is already one of its own ancestors, or that sits below [`MAX_DEPTH`]
/// becomes an empty leaf and a warning; its siblings carry on.
pub fn walk<'a>(
    record_map: &'a RecordMap,
    root: Option<&'a str>,
    diagnostics: &mut Diagnostics,
) -> RenderNode<'a> {
    let root_id = root_block_id(record_map, root);
    let mut ancestors = Vec::new();
    walk_node(record_map, root_id, 0, &mut ancestors, diagnostics)
}

fn walk_node<'a>(
    record_map: &'a RecordMap,
    block_id: &str,
    level: usize,
    ancestors: &mut Vec<String>,
    diagnostics: &mut Diagnostics,
) -> RenderNode<'a> {
    let unresolved = |block_id: &str| RenderNode {
        block_id: block_id.to_string(),
        level,
        block: None,
        children: Vec::new(),
    };

    if ancestors.iter().any(|id| id == block_id) {
        diagnostics.warn(RenderWarning::CyclicReference {
            block_id: block_id.to_string(),
        });
        return unresolved(block_id);
    }

    if level > MAX_DEPTH {
        diagnostics.warn(RenderWarning::DepthLimit {
            block_id: block_id.to_string(),
            max_depth: MAX_DEPTH,
        });
        return unresolved(block_id);
    }

    let Some(block) = record_map.block(block_id) else {
        diagnostics.warn(RenderWarning::MissingNode {
            block_id: block_id.to_string(),
        });
        return unresolved(block_id);
    };

    if !shows_children(&block.block_type, level) {
        return RenderNode {
            block_id: block_id.to_string(),
            level,
            block: Some(block),
            children: Vec::new(),
        };
    }

    ancestors.push(block_id.to_string());
    let children = block
        .children()
        .iter()
        .map(|child_id| walk_node(record_map, child_id, level + 1, ancestors, diagnostics))
        .collect();
    ancestors.pop();

    RenderNode {
        block_id: block_id.to_string(),
        level,
        block: Some(block),
        children,
    }
}

/// Result of one render pass.
#[derive(Debug)]
pub struct RenderPass<'a> {
    pub root: RenderNode<'a>,
    pub markup: Markup,
    /// Warnings in the order they were raised; empty in production mode.
    pub warnings: Vec<RenderWarning>,
}

/// Run one full pass against a published snapshot: walk the graph, then
/// dispatch every resolved node to its block behaviour.
pub fn render<'a>(
    ctx: &'a ContextHandle,
    root: Option<&'a str>,
    options: &BlockRenderOptions,
) -> RenderPass<'a> {
    let mut diagnostics = Diagnostics::new(ctx.config().build_mode);
    let root_id = root_block_id(ctx.record_map(), root);
    tracing::debug!(
        root = root_id,
        generation = ctx.generation(),
        "render pass started"
    );

    let tree = walk(ctx.record_map(), Some(root_id), &mut diagnostics);
    let markup = Dispatcher::new(ctx, options, &mut diagnostics).render_node(&tree);

    tracing::debug!(
        nodes = tree.count(),
        warnings = diagnostics.warnings().len(),
        "render pass finished"
    );
    RenderPass {
        root: tree,
        markup,
        warnings: diagnostics.into_warnings(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BuildMode;
    use recordmap::BlockType;

    fn text(id: &str) -> BlockRecord {
        BlockRecord::new(id, BlockType::Text).with_title(id)
    }

    #[test]
    fn default_root_is_first_inserted() {
        let map = RecordMap::new()
            .with_block(text("B"))
            .with_block(text("A"))
            .with_block(text("C"));
        let mut diagnostics = Diagnostics::new(BuildMode::Development);
        let tree = walk(&map, None, &mut diagnostics);
        assert_eq!(tree.block_id, "B");
        assert_eq!(tree.level, 0);
    }

    #[test]
    fn empty_root_falls_back_to_first() {
        let map = RecordMap::new().with_block(text("only"));
        assert_eq!(root_block_id(&map, Some("")), "only");
        assert_eq!(root_block_id(&RecordMap::new(), None), "");
    }

    #[test]
    fn missing_child_is_an_empty_leaf() {
        let map = RecordMap::new()
            .with_block(BlockRecord::new("p", BlockType::Page).with_content(["a", "gone", "b"]))
            .with_block(text("a"))
            .with_block(text("b"));
        let mut diagnostics = Diagnostics::new(BuildMode::Development);
        let tree = walk(&map, Some("p"), &mut diagnostics);
        let resolved: Vec<bool> = tree.children.iter().map(RenderNode::is_resolved).collect();
        assert_eq!(resolved, [true, false, true]);
        assert_eq!(
            diagnostics.warnings(),
            [RenderWarning::MissingNode {
                block_id: "gone".into()
            }]
        );
    }

    #[test]
    fn levels_grow_by_one_per_edge() {
        let map = RecordMap::new()
            .with_block(BlockRecord::new("p", BlockType::Page).with_content(["t"]))
            .with_block(BlockRecord::new("t", BlockType::Toggle).with_content(["x"]))
            .with_block(text("x"));
        let mut diagnostics = Diagnostics::new(BuildMode::Development);
        let tree = walk(&map, Some("p"), &mut diagnostics);
        assert_eq!(tree.children[0].level, 1);
        assert_eq!(tree.children[0].children[0].level, 2);
        assert_eq!(tree.preorder_ids(), ["p", "t", "x"]);
    }

    #[test]
    fn cycles_are_cut_at_the_repeat() {
        let map = RecordMap::new()
            .with_block(BlockRecord::new("a", BlockType::Toggle).with_content(["b"]))
            .with_block(BlockRecord::new("b", BlockType::Toggle).with_content(["a"]));
        let mut diagnostics = Diagnostics::new(BuildMode::Development);
        let tree = walk(&map, Some("a"), &mut diagnostics);
        assert_eq!(tree.count(), 3);
        assert!(!tree.children[0].children[0].is_resolved());
        assert_eq!(
            diagnostics.warnings(),
            [RenderWarning::CyclicReference {
                block_id: "a".into()
            }]
        );
    }

    #[test]
    fn shared_children_render_at_each_reference() {
        let map = RecordMap::new()
            .with_block(BlockRecord::new("p", BlockType::Page).with_content(["s", "s"]))
            .with_block(text("s"));
        let mut diagnostics = Diagnostics::new(BuildMode::Development);
        let tree = walk(&map, Some("p"), &mut diagnostics);
        assert_eq!(tree.preorder_ids(), ["p", "s", "s"]);
        assert!(diagnostics.warnings().is_empty());
    }

    #[test]
    fn nested_pages_and_leaves_are_not_descended() {
        let map = RecordMap::new()
            .with_block(BlockRecord::new("p", BlockType::Page).with_content(["sub", "h", "u"]))
            .with_block(BlockRecord::new("sub", BlockType::Page).with_content(["unloaded"]))
            .with_block(BlockRecord::new("h", BlockType::Header).with_content(["gone"]))
            .with_block(BlockRecord::new("u", "carousel".into()).with_content(["lost"]));
        let mut diagnostics = Diagnostics::new(BuildMode::Development);
        let tree = walk(&map, Some("p"), &mut diagnostics);
        assert_eq!(tree.preorder_ids(), ["p", "sub", "h", "u"]);
        assert!(diagnostics.warnings().is_empty());
    }

    #[test]
    fn deep_chains_stop_at_the_depth_limit() {
        let depth = MAX_DEPTH + 50;
        let mut map = RecordMap::new()
            .with_block(BlockRecord::new("p", BlockType::Page).with_content(["t1"]));
        for i in 1..=depth {
            let next = format!("t{}", i + 1);
            map.insert_block(
                BlockRecord::new(format!("t{i}"), BlockType::Toggle).with_content([next.as_str()]),
            );
        }
        let mut diagnostics = Diagnostics::new(BuildMode::Development);
        let tree = walk(&map, Some("p"), &mut diagnostics);
        assert_eq!(tree.count(), MAX_DEPTH + 2);
        assert_eq!(
            diagnostics.warnings(),
            [RenderWarning::DepthLimit {
                block_id: format!("t{}", MAX_DEPTH + 1),
                max_depth: MAX_DEPTH,
            }]
        );
    }

    #[test]
    fn outline_marks_missing_nodes() {
        let map = RecordMap::new()
            .with_block(BlockRecord::new("p", BlockType::Page).with_content(["x"]));
        let mut diagnostics = Diagnostics::new(BuildMode::Production);
        let tree = walk(&map, None, &mut diagnostics);
        assert_eq!(tree.to_string(), "p (page)\n  x (missing)\n");
    }
}
