pub mod id;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::rich_text::RichText;

/// One node of the document graph.
/// Owned by the record map; renderers only ever borrow it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub block_type: BlockType,
    /// Named rich-text properties (`title`, `size`, `source`, ...).
    #[serde(default)]
    pub properties: BTreeMap<String, RichText>,
    /// Child block ids in display order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<String>>,
    /// Free-form presentation settings (icons, covers, display sources).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_table: Option<String>,
}

impl BlockRecord {
    pub fn new(id: impl Into<String>, block_type: BlockType) -> Self {
        BlockRecord {
            id: id.into(),
            block_type,
            properties: BTreeMap::new(),
            content: None,
            format: None,
            parent_table: None,
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: RichText) -> Self {
        self.properties.insert(name.into(), value);
        self
    }

    pub fn with_title(self, title: impl Into<String>) -> Self {
        self.with_property("title", RichText::plain(title))
    }

    pub fn with_content<I, S>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.content = Some(children.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_format(mut self, format: Value) -> Self {
        self.format = Some(format);
        self
    }

    pub fn property(&self, name: &str) -> Option<&RichText> {
        self.properties.get(name)
    }

    /// The `title` property, absent when missing or blank.
    pub fn title(&self) -> Option<&RichText> {
        self.property("title").filter(|t| !t.is_blank())
    }

    pub fn children(&self) -> &[String] {
        self.content.as_deref().unwrap_or(&[])
    }

    pub fn format_str(&self, key: &str) -> Option<&str> {
        self.format.as_ref()?.get(key)?.as_str()
    }

    pub fn format_f64(&self, key: &str) -> Option<f64> {
        self.format.as_ref()?.get(key)?.as_f64()
    }

    /// A to-do is checked when its `checked` property reads "Yes".
    pub fn is_checked(&self) -> bool {
        self.property("checked")
            .is_some_and(|checked| checked.plain_text() == "Yes")
    }
}

/// The block type tag. Unknown tags are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BlockType {
    Page,
    Text,
    Header,
    SubHeader,
    SubSubHeader,
    BulletedList,
    NumberedList,
    ToDo,
    Toggle,
    Quote,
    Callout,
    Divider,
    Code,
    Equation,
    Image,
    Video,
    File,
    Pdf,
    Tweet,
    Bookmark,
    CollectionView,
    CollectionViewPage,
    Other(String),
}

impl BlockType {
    pub fn as_str(&self) -> &str {
        match self {
            BlockType::Page => "page",
            BlockType::Text => "text",
            BlockType::Header => "header",
            BlockType::SubHeader => "sub_header",
            BlockType::SubSubHeader => "sub_sub_header",
            BlockType::BulletedList => "bulleted_list",
            BlockType::NumberedList => "numbered_list",
            BlockType::ToDo => "to_do",
            BlockType::Toggle => "toggle",
            BlockType::Quote => "quote",
            BlockType::Callout => "callout",
            BlockType::Divider => "divider",
            BlockType::Code => "code",
            BlockType::Equation => "equation",
            BlockType::Image => "image",
            BlockType::Video => "video",
            BlockType::File => "file",
            BlockType::Pdf => "pdf",
            BlockType::Tweet => "tweet",
            BlockType::Bookmark => "bookmark",
            BlockType::CollectionView => "collection_view",
            BlockType::CollectionViewPage => "collection_view_page",
            BlockType::Other(tag) => tag,
        }
    }

    /// Types whose display URL goes through the asset/image mappers.
    pub fn is_asset(&self) -> bool {
        matches!(
            self,
            BlockType::Image | BlockType::Video | BlockType::File | BlockType::Pdf
        )
    }
}

impl From<String> for BlockType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "page" => BlockType::Page,
            "text" => BlockType::Text,
            "header" => BlockType::Header,
            "sub_header" => BlockType::SubHeader,
            "sub_sub_header" => BlockType::SubSubHeader,
            "bulleted_list" => BlockType::BulletedList,
            "numbered_list" => BlockType::NumberedList,
            "to_do" => BlockType::ToDo,
            "toggle" => BlockType::Toggle,
            "quote" => BlockType::Quote,
            "callout" => BlockType::Callout,
            "divider" => BlockType::Divider,
            "code" => BlockType::Code,
            "equation" => BlockType::Equation,
            "image" => BlockType::Image,
            "video" => BlockType::Video,
            "file" => BlockType::File,
            "pdf" => BlockType::Pdf,
            "tweet" => BlockType::Tweet,
            "bookmark" => BlockType::Bookmark,
            "collection_view" => BlockType::CollectionView,
            "collection_view_page" => BlockType::CollectionViewPage,
            _ => BlockType::Other(tag),
        }
    }
}

impl From<&str> for BlockType {
    fn from(tag: &str) -> Self {
        BlockType::from(tag.to_string())
    }
}

impl From<BlockType> for String {
    fn from(block_type: BlockType) -> Self {
        match block_type {
            BlockType::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tags_survive_verbatim() {
        let block: BlockRecord =
            serde_json::from_str(r#"{"id":"a","type":"synced_block"}"#).expect("valid block");
        assert_eq!(block.block_type, BlockType::Other("synced_block".into()));
        assert_eq!(block.block_type.to_string(), "synced_block");
    }

    #[test]
    fn known_tags_parse() {
        assert_eq!(BlockType::from("sub_sub_header"), BlockType::SubSubHeader);
        assert_eq!(String::from(BlockType::CollectionViewPage), "collection_view_page");
        assert!(BlockType::Pdf.is_asset());
        assert!(!BlockType::Text.is_asset());
    }

    #[test]
    fn blank_title_counts_as_absent() {
        let block = BlockRecord::new("f", BlockType::File).with_title("");
        assert!(block.title().is_none());
        assert!(block.children().is_empty());
    }

    #[test]
    fn checked_reads_yes() {
        let block = BlockRecord::new("t", BlockType::ToDo)
            .with_property("checked", RichText::plain("Yes"));
        assert!(block.is_checked());
        assert!(!BlockRecord::new("u", BlockType::ToDo).is_checked());
    }
}
