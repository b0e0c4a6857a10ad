//! URL indirection for pages, images and signed assets.
//!
//! Each mapper is chosen once per render pass and applied uniformly to every
//! block in that pass.

use std::fmt;
use std::sync::Arc;

use recordmap::block::id::compact_id;
use recordmap::{BlockRecord, RecordMap};

type PageFn = dyn Fn(&str) -> String + Send + Sync;
type ImageFn = dyn Fn(&str, &BlockRecord) -> Option<String> + Send + Sync;
type AssetFn = dyn Fn(Option<&str>, &BlockRecord) -> Option<String> + Send + Sync;

/// Maps a page id to the href used for links to it.
#[derive(Clone)]
pub struct PageUrlMapper(Arc<PageFn>);

impl PageUrlMapper {
    pub fn new<F>(map: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        PageUrlMapper(Arc::new(map))
    }

    /// Links within the same document: `/{compact id}`, or `/` for the root.
    pub fn same_document(root_page_id: Option<String>) -> Self {
        let root = root_page_id.map(|id| compact_id(&id));
        PageUrlMapper::new(move |page_id| {
            let page_id = compact_id(page_id);
            match &root {
                Some(root) if *root == page_id => "/".to_string(),
                _ => format!("/{}", page_id),
            }
        })
    }

    pub fn map(&self, page_id: &str) -> String {
        (self.0)(page_id)
    }
}

impl fmt::Debug for PageUrlMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PageUrlMapper(..)")
    }
}

/// Maps an image source to a displayable URL.
#[derive(Clone)]
pub struct ImageUrlMapper(Arc<ImageFn>);

impl ImageUrlMapper {
    pub fn new<F>(map: F) -> Self
    where
        F: Fn(&str, &BlockRecord) -> Option<String> + Send + Sync + 'static,
    {
        ImageUrlMapper(Arc::new(map))
    }

    /// Route through the Notion image proxy, leaving inline and Unsplash
    /// images alone.
    pub fn notion_proxy() -> Self {
        ImageUrlMapper::new(notion_image_url)
    }

    pub fn map(&self, url: &str, block: &BlockRecord) -> Option<String> {
        (self.0)(url, block)
    }
}

impl fmt::Debug for ImageUrlMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ImageUrlMapper(..)")
    }
}

const NOTION_ORIGIN: &str = "https://www.notion.so";

fn notion_image_url(url: &str, block: &BlockRecord) -> Option<String> {
    if url.is_empty() {
        return None;
    }
    if url.starts_with("data:") || url.starts_with("https://images.unsplash.com") {
        return Some(url.to_string());
    }
    if url.starts_with("/images") {
        return Some(format!("{}{}", NOTION_ORIGIN, url));
    }
    let table = match block.parent_table.as_deref() {
        None | Some("space") | Some("collection") => "block",
        Some(other) => other,
    };
    Some(format!(
        "{}/image/{}?table={}&id={}&cache=v2",
        NOTION_ORIGIN,
        urlencoding::encode(url),
        table,
        block.id
    ))
}

/// Maps a signed URL (if any) for an asset block to its final URL.
#[derive(Clone)]
pub struct AssetUrlMapper(Arc<AssetFn>);

impl AssetUrlMapper {
    pub fn new<F>(map: F) -> Self
    where
        F: Fn(Option<&str>, &BlockRecord) -> Option<String> + Send + Sync + 'static,
    {
        AssetUrlMapper(Arc::new(map))
    }

    /// Pass the signed URL through untouched; absent stays absent.
    pub fn identity() -> Self {
        AssetUrlMapper::new(|signed_url, _| signed_url.map(str::to_string))
    }

    pub fn map(&self, signed_url: Option<&str>, block: &BlockRecord) -> Option<String> {
        (self.0)(signed_url, block)
    }
}

impl fmt::Debug for AssetUrlMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AssetUrlMapper(..)")
    }
}

/// The three mappers in effect for one render pass.
#[derive(Debug, Clone)]
pub struct UrlMappers {
    pub page: PageUrlMapper,
    pub image: ImageUrlMapper,
    pub asset: AssetUrlMapper,
}

impl Default for UrlMappers {
    fn default() -> Self {
        UrlMappers {
            page: PageUrlMapper::same_document(None),
            image: ImageUrlMapper::notion_proxy(),
            asset: AssetUrlMapper::identity(),
        }
    }
}

impl UrlMappers {
    /// Final URL for an asset block: its signed URL run through the asset
    /// mapper. Empty results count as absent.
    pub fn resolve_asset_url(&self, record_map: &RecordMap, block: &BlockRecord) -> Option<String> {
        let signed_url = record_map.signed_url(&block.id);
        self.asset
            .map(signed_url, block)
            .filter(|url| !url.is_empty())
    }

    pub fn page_url(&self, page_id: &str) -> String {
        self.page.map(page_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recordmap::BlockType;

    #[test]
    fn signed_url_passes_through() {
        let record_map = RecordMap::new().with_signed_url("x", "https://cdn/x.bin");
        let mappers = UrlMappers::default();
        let x = BlockRecord::new("x", BlockType::File);
        let y = BlockRecord::new("y", BlockType::File);
        assert_eq!(
            mappers.resolve_asset_url(&record_map, &x).as_deref(),
            Some("https://cdn/x.bin")
        );
        assert_eq!(mappers.resolve_asset_url(&record_map, &y), None);
    }

    #[test]
    fn custom_asset_mapper_applies_to_every_block() {
        let record_map = RecordMap::new().with_signed_url("x", "https://cdn/x.bin");
        let mappers = UrlMappers {
            asset: AssetUrlMapper::new(|signed, block| {
                Some(signed.map_or_else(
                    || format!("/fallback/{}", block.id),
                    |url| format!("{url}?proxied"),
                ))
            }),
            ..UrlMappers::default()
        };
        let x = BlockRecord::new("x", BlockType::Pdf);
        let y = BlockRecord::new("y", BlockType::File);
        assert_eq!(
            mappers.resolve_asset_url(&record_map, &x).as_deref(),
            Some("https://cdn/x.bin?proxied")
        );
        assert_eq!(
            mappers.resolve_asset_url(&record_map, &y).as_deref(),
            Some("/fallback/y")
        );
    }

    #[test]
    fn page_links_special_case_root() {
        let mapper = PageUrlMapper::same_document(Some("AB-cd".into()));
        assert_eq!(mapper.map("abcd"), "/");
        assert_eq!(mapper.map("ef-01"), "/ef01");
        assert_eq!(PageUrlMapper::same_document(None).map("abcd"), "/abcd");
    }

    #[test]
    fn image_proxy_rules() {
        let block = BlockRecord::new("img", BlockType::Image);
        let mapper = ImageUrlMapper::notion_proxy();
        assert_eq!(
            mapper.map("data:image/png;base64,AA", &block).as_deref(),
            Some("data:image/png;base64,AA")
        );
        assert_eq!(
            mapper.map("/images/page-cover/a.jpg", &block).as_deref(),
            Some("https://www.notion.so/images/page-cover/a.jpg")
        );
        assert_eq!(
            mapper.map("https://s3.test/a b.png", &block).as_deref(),
            Some(
                "https://www.notion.so/image/https%3A%2F%2Fs3.test%2Fa%20b.png?table=block&id=img&cache=v2"
            )
        );
        assert_eq!(mapper.map("", &block), None);
    }
}
