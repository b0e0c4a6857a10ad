//! Per-type block behaviour.
//!
//! Every resolved node goes through [`Dispatcher::dispatch`], which picks
//! exactly one behaviour from the block's type tag. Capability slots come from
//! the pass configuration (override, default or stub); asset URLs come from
//! the pass URL mappers. Nothing here mutates the record map.

use recordmap::block::id::compact_id;
use recordmap::{BlockRecord, BlockType, RichText};

use crate::components::{Capability, ComponentProps};
use crate::config::Configuration;
use crate::context::ContextHandle;
use crate::error::{Diagnostics, RenderWarning};
use crate::markup::{Element, Markup};
use crate::walker::{BlockRenderOptions, RenderNode};

pub struct Dispatcher<'p> {
    ctx: &'p ContextHandle,
    options: &'p BlockRenderOptions,
    diagnostics: &'p mut Diagnostics,
}

impl<'p> Dispatcher<'p> {
    pub fn new(
        ctx: &'p ContextHandle,
        options: &'p BlockRenderOptions,
        diagnostics: &'p mut Diagnostics,
    ) -> Self {
        Dispatcher {
            ctx,
            options,
            diagnostics,
        }
    }

    fn config(&self) -> &'p Configuration {
        self.ctx.config()
    }

    /// Render a node and, on demand, its subtree. Unresolved nodes render
    /// nothing (the walker already reported them).
    pub fn render_node(&mut self, node: &RenderNode<'_>) -> Markup {
        match node.block {
            Some(block) => self.dispatch(node, block),
            None => Markup::Empty,
        }
    }

    fn render_children(&mut self, node: &RenderNode<'_>) -> Vec<Markup> {
        node.children
            .iter()
            .map(|child| self.render_node(child))
            .filter(|m| !m.is_empty())
            .collect()
    }

    pub fn dispatch(&mut self, node: &RenderNode<'_>, block: &BlockRecord) -> Markup {
        match &block.block_type {
            BlockType::Page if node.level == 0 => self.root_page(node, block),
            BlockType::Page => self.page_link(block),
            BlockType::Text => self.text(node, block),
            BlockType::Header => self.heading(block, "h2", "notion-h1"),
            BlockType::SubHeader => self.heading(block, "h3", "notion-h2"),
            BlockType::SubSubHeader => self.heading(block, "h4", "notion-h3"),
            BlockType::BulletedList => self.list_item(node, block, "ul", "notion-list-disc"),
            BlockType::NumberedList => self.list_item(node, block, "ol", "notion-list-numbered"),
            BlockType::ToDo => self.to_do(node, block),
            BlockType::Toggle => self.toggle(node, block),
            BlockType::Quote => Element::new("blockquote")
                .class(self.block_class("notion-quote", block))
                .child(rich_text(block.title()))
                .into(),
            BlockType::Callout => self.callout(node, block),
            BlockType::Divider => Element::new("hr")
                .class(self.block_class("notion-hr", block))
                .into(),
            BlockType::Code => self.capability(Capability::Code, ComponentProps::new(block)),
            BlockType::Equation => {
                self.capability(Capability::Equation, ComponentProps::new(block))
            }
            BlockType::Image => self.image(block),
            BlockType::Video => self.video(block),
            BlockType::File => self.file(block),
            BlockType::Pdf => self.pdf(block),
            BlockType::Tweet => {
                let props = ComponentProps::new(block).href(source_of(block));
                self.capability(Capability::Tweet, props)
            }
            BlockType::Bookmark => self.bookmark(block),
            BlockType::CollectionView | BlockType::CollectionViewPage => {
                let children = self.render_children(node);
                let props = ComponentProps::new(block)
                    .class_name(self.block_class("notion-collection", block))
                    .children(children);
                self.capability(Capability::Collection, props)
            }
            BlockType::Other(tag) => {
                self.diagnostics.warn(RenderWarning::UnsupportedBlockType {
                    block_id: block.id.clone(),
                    block_type: tag.clone(),
                });
                Markup::Empty
            }
        }
    }

    fn capability(&mut self, capability: Capability, props: ComponentProps<'_>) -> Markup {
        self.config()
            .components
            .render(capability, &props, self.diagnostics)
    }

    /// `base` plus the per-block id class unless ids are hidden.
    fn block_class(&self, base: &str, block: &BlockRecord) -> String {
        if self.options.hide_block_id {
            base.to_string()
        } else {
            format!("{} notion-block-{}", base, compact_id(&block.id))
        }
    }

    /// Resolved URL for an asset block, warning when there is none.
    fn asset_url(&mut self, block: &BlockRecord) -> Option<String> {
        let url = self
            .config()
            .url_mappers
            .resolve_asset_url(self.ctx.record_map(), block);
        if url.is_none() {
            self.diagnostics.warn(RenderWarning::MissingAsset {
                block_id: block.id.clone(),
                block_type: block.block_type.to_string(),
            });
        }
        url
    }

    fn root_page(&mut self, node: &RenderNode<'_>, block: &BlockRecord) -> Markup {
        let config = self.config();
        let mode = if config.dark_mode {
            "dark-mode"
        } else {
            "light-mode"
        };
        let children = self.render_children(node);

        let mut page = Element::new("div")
            .class(self.block_class("notion-page", block))
            .class(if config.full_page {
                "notion-full-page"
            } else {
                "notion-page-no-header"
            });

        if config.full_page && config.display_page_header {
            page = page.child(self.page_header(block));
        }
        if block.parent_table.as_deref() == Some("collection") {
            let row = self.capability(Capability::CollectionRow, ComponentProps::new(block));
            page = page.child(row);
        }
        page = page.child(
            Element::new("div")
                .class("notion-page-content")
                .class(self.options.body_class_name.as_deref().unwrap_or_default())
                .children(children),
        );

        let mut shell = Element::new("div")
            .class("notion notion-app")
            .class(mode)
            .class(self.options.class_name.as_deref().unwrap_or_default());
        if config.full_page {
            shell = shell.child(self.page_cover(block));
            if config.show_table_of_contents {
                shell = shell.child(self.table_of_contents(node));
            }
        }
        shell
            .child(page)
            .child(self.options.footer.clone().unwrap_or_default())
            .into()
    }

    fn page_header(&self, block: &BlockRecord) -> Markup {
        let icon = block
            .format_str("page_icon")
            .map(str::to_string)
            .or_else(|| self.config().default_page_icon.clone());
        Element::new("div")
            .class("notion-page-header")
            .child(icon.map(page_icon).unwrap_or_default())
            .child(
                Element::new("h1")
                    .class("notion-title")
                    .child(title_or(block.title(), "Untitled")),
            )
            .into()
    }

    fn page_cover(&self, block: &BlockRecord) -> Markup {
        let config = self.config();
        let cover = block
            .format_str("page_cover")
            .map(str::to_string)
            .or_else(|| config.default_page_cover.clone());
        let Some(src) = cover.and_then(|cover| config.url_mappers.image.map(&cover, block)) else {
            return Markup::Empty;
        };
        let position = block
            .format_f64("page_cover_position")
            .unwrap_or(config.default_page_cover_position);
        Element::new("img")
            .class("notion-page-cover")
            .attr("src", src)
            .attr("alt", "")
            .attr(
                "style",
                format!("object-position: center {}%", (1.0 - position) * 100.0),
            )
            .into()
    }

    /// Headers directly under the root page, listed once there are enough.
    fn table_of_contents(&self, node: &RenderNode<'_>) -> Markup {
        let entries: Vec<(&BlockRecord, usize)> = node
            .children
            .iter()
            .filter_map(|child| child.block)
            .filter_map(|block| match block.block_type {
                BlockType::Header => Some((block, 0)),
                BlockType::SubHeader => Some((block, 1)),
                BlockType::SubSubHeader => Some((block, 2)),
                _ => None,
            })
            .collect();
        if entries.len() < self.config().min_table_of_contents_items {
            return Markup::Empty;
        }
        Element::new("aside")
            .class("notion-aside")
            .child(
                Element::new("div")
                    .class("notion-table-of-contents")
                    .children(entries.into_iter().map(|(block, indent)| {
                        Markup::from(
                            Element::new("a")
                                .class("notion-table-of-contents-item")
                                .class(format!(
                                    "notion-table-of-contents-item-indent-level-{}",
                                    indent
                                ))
                                .attr("href", format!("#{}", compact_id(&block.id)))
                                .child(rich_text(block.title())),
                        )
                    })),
            )
            .into()
    }

    /// Nested pages render as a link holding the title only.
    fn page_link(&mut self, block: &BlockRecord) -> Markup {
        let href = self.config().url_mappers.page_url(&block.id);
        let icon = block.format_str("page_icon").map(|icon| page_icon(icon.to_string()));
        let summary = Element::new("span")
            .class("notion-page-title")
            .child(icon.unwrap_or_default())
            .child(
                Element::new("span")
                    .class("notion-page-title-text")
                    .child(title_or(block.title(), "Untitled")),
            );
        let props = ComponentProps::new(block)
            .class_name(self.block_class("notion-page-link", block))
            .href(Some(href))
            .summary(summary.into());
        self.capability(Capability::PageLink, props)
    }

    fn text(&mut self, node: &RenderNode<'_>, block: &BlockRecord) -> Markup {
        let children = self.render_children(node);
        if block.title().is_none() && children.is_empty() {
            return Element::new("div")
                .class(self.block_class("notion-blank", block))
                .child(Markup::text("\u{a0}"))
                .into();
        }
        let text = Element::new("div")
            .class(self.block_class("notion-text", block))
            .child(rich_text(block.title()));
        if children.is_empty() {
            return text.into();
        }
        Markup::fragment([
            Markup::from(text),
            Markup::from(
                Element::new("div")
                    .class("notion-text-children")
                    .children(children),
            ),
        ])
    }

    fn heading(&self, block: &BlockRecord, tag: &str, class: &str) -> Markup {
        Element::new(tag)
            .class(self.block_class(&format!("notion-h {}", class), block))
            .attr("id", compact_id(&block.id))
            .child(rich_text(block.title()))
            .into()
    }

    fn list_item(
        &mut self,
        node: &RenderNode<'_>,
        block: &BlockRecord,
        list_tag: &str,
        list_class: &str,
    ) -> Markup {
        let children = self.render_children(node);
        let item = Element::new("li").child(rich_text(block.title()));
        let item = if children.is_empty() {
            item
        } else {
            item.child(
                Element::new(list_tag)
                    .class("notion-list")
                    .class(list_class)
                    .children(children),
            )
        };
        Element::new(list_tag)
            .class(self.block_class(&format!("notion-list {}", list_class), block))
            .child(item)
            .into()
    }

    fn to_do(&mut self, node: &RenderNode<'_>, block: &BlockRecord) -> Markup {
        let checked = block.is_checked();
        let checkbox = self.capability(
            Capability::Checkbox,
            ComponentProps::new(block).checked(checked),
        );
        let body = Element::new("div")
            .class("notion-to-do-body")
            .class(if checked { "notion-to-do-checked" } else { "" })
            .child(rich_text(block.title()));
        let children = self.render_children(node);
        Element::new("div")
            .class(self.block_class("notion-to-do", block))
            .child(
                Element::new("div")
                    .class("notion-to-do-item")
                    .child(checkbox)
                    .child(body),
            )
            .child(
                Element::new("div")
                    .class("notion-to-do-children")
                    .children(children),
            )
            .into()
    }

    fn toggle(&mut self, node: &RenderNode<'_>, block: &BlockRecord) -> Markup {
        let children = self.render_children(node);
        let props = ComponentProps::new(block)
            .summary(rich_text(block.title()))
            .children(children);
        self.capability(Capability::Details, props)
    }

    fn callout(&mut self, node: &RenderNode<'_>, block: &BlockRecord) -> Markup {
        let icon = block.format_str("page_icon").map(|icon| page_icon(icon.to_string()));
        let children = self.render_children(node);
        Element::new("div")
            .class(self.block_class("notion-callout", block))
            .child(icon.unwrap_or_default())
            .child(
                Element::new("div")
                    .class("notion-callout-text")
                    .child(rich_text(block.title()))
                    .children(children),
            )
            .into()
    }

    fn image(&mut self, block: &BlockRecord) -> Markup {
        let source = self
            .config()
            .url_mappers
            .resolve_asset_url(self.ctx.record_map(), block)
            .or_else(|| source_of(block));
        let src = source.and_then(|source| self.config().url_mappers.image.map(&source, block));
        if src.is_none() {
            self.diagnostics.warn(RenderWarning::MissingAsset {
                block_id: block.id.clone(),
                block_type: block.block_type.to_string(),
            });
        }

        let caption = block.property("caption").filter(|c| !c.is_blank());
        let mut img = Element::new("img")
            .attr("alt", caption.map(RichText::plain_text).unwrap_or_default())
            .attr_opt("src", src.clone());
        if let (Some(zoom), Some(_)) = (&self.options.zoom, &src) {
            zoom.attach(&block.id);
            img = img.attr("data-zoomable", "true");
        }
        Element::new("figure")
            .class(self.block_class("notion-asset-wrapper notion-asset-wrapper-image", block))
            .child(img)
            .child(
                caption
                    .map(|c| {
                        Markup::from(
                            Element::new("figcaption")
                                .class("notion-image-caption")
                                .child(rich_text(Some(c))),
                        )
                    })
                    .unwrap_or_default(),
            )
            .into()
    }

    fn video(&mut self, block: &BlockRecord) -> Markup {
        let source = source_of(block);
        if let Some(source) = source.as_deref().filter(|s| is_youtube(s)) {
            let props = ComponentProps::new(block)
                .class_name(self.block_class("notion-asset-wrapper notion-asset-wrapper-video", block))
                .href(Some(source.to_string()));
            return self.capability(Capability::Youtube, props);
        }
        let src = self.asset_url(block);
        Element::new("div")
            .class(self.block_class("notion-asset-wrapper notion-asset-wrapper-video", block))
            .child(Element::new("video").attr("controls", "").attr_opt("src", src))
            .into()
    }

    fn file(&mut self, block: &BlockRecord) -> Markup {
        let href = self.asset_url(block);
        let mut info = Element::new("div").class("notion-file-info").child(
            Element::new("div")
                .class("notion-file-title")
                .child(title_or(block.title(), "File")),
        );
        if let Some(size) = block.property("size").filter(|s| !s.is_blank()) {
            info = info.child(
                Element::new("div")
                    .class("notion-file-size")
                    .child(rich_text(Some(size))),
            );
        }
        let summary = Markup::fragment([
            Markup::from(Element::new("span").class("notion-file-icon")),
            Markup::from(info),
        ]);
        let class_name = if href.is_some() {
            "notion-file-link"
        } else {
            "notion-file-link notion-file-link-disabled"
        };
        let link = self.capability(
            Capability::Link,
            ComponentProps::new(block)
                .class_name(class_name)
                .href(href)
                .summary(summary),
        );
        Element::new("div")
            .class(self.block_class("notion-file", block))
            .child(link)
            .into()
    }

    fn pdf(&mut self, block: &BlockRecord) -> Markup {
        let href = self.asset_url(block);
        let props = ComponentProps::new(block)
            .class_name(self.block_class("notion-asset-wrapper notion-asset-wrapper-pdf", block))
            .href(href);
        self.capability(Capability::Pdf, props)
    }

    fn bookmark(&mut self, block: &BlockRecord) -> Markup {
        let link = block.property("link").map(RichText::plain_text);
        let title = match (block.title(), &link) {
            (Some(title), _) => rich_text(Some(title)),
            (None, Some(link)) => Markup::text(link.clone()),
            (None, None) => Markup::Empty,
        };
        let summary = Element::new("div")
            .class("notion-bookmark-title")
            .child(title);
        let description = block
            .property("description")
            .filter(|d| !d.is_blank())
            .map(|d| {
                Markup::from(
                    Element::new("div")
                        .class("notion-bookmark-description")
                        .child(rich_text(Some(d))),
                )
            })
            .unwrap_or_default();
        let props = ComponentProps::new(block)
            .class_name(self.block_class("notion-bookmark", block))
            .href(link)
            .summary(Markup::fragment([Markup::from(summary), description]));
        self.capability(Capability::Link, props)
    }
}

/// Plain source URL of an embed-like block: `properties.source`, then
/// `format.display_source`.
fn source_of(block: &BlockRecord) -> Option<String> {
    block
        .property("source")
        .map(RichText::plain_text)
        .filter(|s| !s.is_empty())
        .or_else(|| block.format_str("display_source").map(str::to_string))
}

fn is_youtube(url: &str) -> bool {
    url.contains("youtube.com/") || url.contains("youtu.be/")
}

fn page_icon(icon: String) -> Markup {
    if icon.starts_with("http") || icon.starts_with('/') {
        Element::new("img")
            .class("notion-page-icon")
            .attr("src", icon)
            .attr("alt", "")
            .into()
    } else {
        Element::new("span")
            .class("notion-page-icon")
            .child(Markup::text(icon))
            .into()
    }
}

/// Title text, or a literal single-run fallback when it is absent.
fn title_or(title: Option<&RichText>, fallback: &str) -> Markup {
    match title {
        Some(title) => rich_text(Some(title)),
        None => rich_text(Some(&RichText::plain(fallback))),
    }
}

/// Minimal rich-text output: text runs, with `a` formats as links.
/// Other decorations are left to a dedicated text renderer.
fn rich_text(text: Option<&RichText>) -> Markup {
    let Some(text) = text else {
        return Markup::Empty;
    };
    Markup::fragment(text.decorations().iter().map(|run| match run.link() {
        Some(href) => Element::new("a")
            .class("notion-link")
            .attr("href", href)
            .child(Markup::text(run.text.clone()))
            .into(),
        None if run.text.is_empty() => Markup::Empty,
        None => Markup::text(run.text.clone()),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sources_prefer_properties() {
        let block = BlockRecord::new("v", BlockType::Video)
            .with_property("source", RichText::plain("https://youtu.be/abc"))
            .with_format(serde_json::json!({"display_source": "https://other"}));
        assert_eq!(source_of(&block).as_deref(), Some("https://youtu.be/abc"));
        let bare = BlockRecord::new("v", BlockType::Video)
            .with_format(serde_json::json!({"display_source": "https://other"}));
        assert_eq!(source_of(&bare).as_deref(), Some("https://other"));
    }

    #[test]
    fn youtube_detection() {
        assert!(is_youtube("https://www.youtube.com/watch?v=1"));
        assert!(is_youtube("https://youtu.be/1"));
        assert!(!is_youtube("https://vimeo.com/1"));
    }

    #[test]
    fn fallback_title_is_single_run() {
        assert_eq!(title_or(None, "File").to_string(), "File");
        let title = RichText::plain("Report.pdf");
        assert_eq!(title_or(Some(&title), "File").to_string(), "Report.pdf");
    }

    #[test]
    fn emoji_and_url_icons() {
        assert_eq!(
            page_icon("🚀".into()).to_string(),
            r#"<span class="notion-page-icon">🚀</span>"#
        );
        assert_eq!(
            page_icon("https://x/i.png".into()).to_string(),
            r#"<img class="notion-page-icon" src="https://x/i.png" alt="" />"#
        );
    }
}
