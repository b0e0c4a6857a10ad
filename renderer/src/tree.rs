use std::sync::{Arc, OnceLock};

use recordmap::RecordMap;

use crate::config::{Configuration, RenderOptions};
use crate::context::{ContextHandle, ContextProvider};
use crate::error::RenderWarning;
use crate::markup::Markup;
use crate::walker::{self, BlockRenderOptions};
use crate::zoom::{ZoomController, ZoomOptions};

/// A mounted renderer: one published context, one optional zoom controller,
/// any number of render passes.
#[derive(Debug)]
pub struct RenderTree {
    provider: ContextProvider,
    block_options: BlockRenderOptions,
    viewport_width: Option<u32>,
    zoom: OnceLock<Arc<ZoomController>>,
}

/// Owned result of [`RenderTree::render`].
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedTree {
    /// Id the pass started from (empty when the record map has no blocks).
    pub root_id: String,
    pub markup: Markup,
    pub diagnostics: Vec<RenderWarning>,
    /// Indented outline of the walked graph.
    pub outline: String,
    /// Generation of the snapshot the pass read.
    pub generation: u64,
}

impl RenderedTree {
    pub fn to_html(&self) -> String {
        self.markup.to_string()
    }
}

impl RenderTree {
    /// Mount a tree: merge `options` over the defaults and publish the first
    /// snapshot.
    pub fn new(record_map: RecordMap, options: RenderOptions) -> Self {
        let provider =
            ContextProvider::new(Configuration::from_options(options), Arc::new(record_map));
        RenderTree {
            provider,
            block_options: BlockRenderOptions::default(),
            viewport_width: None,
            zoom: OnceLock::new(),
        }
    }

    pub fn with_block_options(mut self, block_options: BlockRenderOptions) -> Self {
        self.block_options = block_options;
        self
    }

    /// Enables image zoom. The controller itself is built on the first pass.
    pub fn with_viewport_width(mut self, width: u32) -> Self {
        self.viewport_width = Some(width);
        self
    }

    /// The latest published snapshot.
    pub fn context(&self) -> ContextHandle {
        self.provider.current()
    }

    /// Republish with new options, keeping the current document.
    pub fn update(&self, options: RenderOptions) -> ContextHandle {
        let record_map = self.context().shared_record_map();
        self.provider
            .publish(Configuration::from_options(options), record_map)
    }

    /// Republish with a new document and new options.
    pub fn replace(&self, record_map: RecordMap, options: RenderOptions) -> ContextHandle {
        self.provider
            .publish(Configuration::from_options(options), Arc::new(record_map))
    }

    pub fn zoom(&self) -> Option<&Arc<ZoomController>> {
        let width = self.viewport_width?;
        Some(
            self.zoom
                .get_or_init(|| Arc::new(ZoomController::new(ZoomOptions::for_viewport(width)))),
        )
    }

    /// Run one pass from `root` (or the first block) against the snapshot
    /// current at the start of the pass.
    pub fn render(&self, root: Option<&str>) -> RenderedTree {
        let ctx = self.context();
        let mut block_options = self.block_options.clone();
        if block_options.zoom.is_none() {
            block_options.zoom = self.zoom().cloned();
        }

        let pass = walker::render(&ctx, root, &block_options);
        RenderedTree {
            root_id: pass.root.block_id.clone(),
            outline: pass.root.to_string(),
            markup: pass.markup,
            diagnostics: pass.warnings,
            generation: ctx.generation(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BuildMode;
    use recordmap::{BlockRecord, BlockType};

    fn document() -> RecordMap {
        RecordMap::new()
            .with_block(BlockRecord::new("p", BlockType::Page).with_content(["i"]))
            .with_block(
                BlockRecord::new("i", BlockType::Image)
                    .with_property("source", recordmap::RichText::plain("data:image/png;base64,AA")),
            )
    }

    fn dev() -> RenderOptions {
        RenderOptions {
            build_mode: Some(BuildMode::Development),
            ..RenderOptions::default()
        }
    }

    #[test]
    fn update_bumps_generation() {
        let tree = RenderTree::new(document(), dev());
        assert_eq!(tree.render(None).generation, 1);
        tree.update(RenderOptions {
            dark_mode: Some(true),
            ..dev()
        });
        let rendered = tree.render(None);
        assert_eq!(rendered.generation, 2);
        assert!(rendered.to_html().contains("dark-mode"));
    }

    #[test]
    fn zoom_only_with_viewport() {
        let tree = RenderTree::new(document(), dev());
        assert!(tree.zoom().is_none());
        assert!(!tree.render(None).to_html().contains("data-zoomable"));

        let tree = RenderTree::new(document(), dev()).with_viewport_width(1024);
        let html = tree.render(None).to_html();
        assert!(html.contains("data-zoomable"));
        let zoom = tree.zoom().expect("viewport set");
        assert!(zoom.is_attached("i"));
        assert!(Arc::ptr_eq(zoom, tree.zoom().expect("viewport set")));
    }

    #[test]
    fn replace_swaps_document() {
        let tree = RenderTree::new(document(), dev());
        tree.replace(
            RecordMap::new().with_block(BlockRecord::new("q", BlockType::Divider)),
            dev(),
        );
        let rendered = tree.render(None);
        assert_eq!(rendered.root_id, "q");
        assert_eq!(rendered.outline, "q (divider)\n");
    }
}
