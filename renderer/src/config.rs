//! The configuration registry: built-in defaults and the merge that layers a
//! caller's options over them.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::asset::{AssetUrlMapper, ImageUrlMapper, PageUrlMapper, UrlMappers};
use crate::components::{Capability, Component, ComponentOverride, ComponentTable};
use crate::error::BuildMode;

/// Options supplied by the embedding caller for one render invocation.
///
/// Every field is optional; `None` means "not specified" and the registry
/// default survives the merge. Scalars can be loaded from TOML or JSON,
/// renderers and URL mappers are set in code.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderOptions {
    #[serde(skip)]
    pub components: BTreeMap<Capability, ComponentOverride>,
    #[serde(skip)]
    pub map_page_url: Option<PageUrlMapper>,
    #[serde(skip)]
    pub map_image_url: Option<ImageUrlMapper>,
    #[serde(skip)]
    pub map_asset_url: Option<AssetUrlMapper>,

    pub root_page_id: Option<String>,
    pub root_domain: Option<String>,

    pub full_page: Option<bool>,
    pub dark_mode: Option<bool>,
    pub preview_images: Option<bool>,
    pub show_collection_view_dropdown: Option<bool>,
    pub show_table_of_contents: Option<bool>,
    pub min_table_of_contents_items: Option<usize>,

    pub default_page_icon: Option<String>,
    pub default_page_cover: Option<String>,
    pub default_page_cover_position: Option<f64>,

    pub display_page_header: Option<bool>,
    pub build_mode: Option<BuildMode>,
}

impl RenderOptions {
    pub fn component(mut self, capability: Capability, component: Component) -> Self {
        self.components
            .insert(capability, ComponentOverride::Render(component));
        self
    }

    /// Switch a capability off entirely, even if a default exists.
    pub fn disable(mut self, capability: Capability) -> Self {
        self.components
            .insert(capability, ComponentOverride::Disabled);
        self
    }

    pub fn map_page_url(mut self, mapper: PageUrlMapper) -> Self {
        self.map_page_url = Some(mapper);
        self
    }

    pub fn map_image_url(mut self, mapper: ImageUrlMapper) -> Self {
        self.map_image_url = Some(mapper);
        self
    }

    pub fn map_asset_url(mut self, mapper: AssetUrlMapper) -> Self {
        self.map_asset_url = Some(mapper);
        self
    }

    /// Fill every unset field of `self` from `fallback`.
    /// Used to stack command-line flags over a config file.
    pub fn or(self, fallback: RenderOptions) -> RenderOptions {
        let mut components = fallback.components;
        components.extend(self.components);
        RenderOptions {
            components,
            map_page_url: self.map_page_url.or(fallback.map_page_url),
            map_image_url: self.map_image_url.or(fallback.map_image_url),
            map_asset_url: self.map_asset_url.or(fallback.map_asset_url),
            root_page_id: self.root_page_id.or(fallback.root_page_id),
            root_domain: self.root_domain.or(fallback.root_domain),
            full_page: self.full_page.or(fallback.full_page),
            dark_mode: self.dark_mode.or(fallback.dark_mode),
            preview_images: self.preview_images.or(fallback.preview_images),
            show_collection_view_dropdown: self
                .show_collection_view_dropdown
                .or(fallback.show_collection_view_dropdown),
            show_table_of_contents: self
                .show_table_of_contents
                .or(fallback.show_table_of_contents),
            min_table_of_contents_items: self
                .min_table_of_contents_items
                .or(fallback.min_table_of_contents_items),
            default_page_icon: self.default_page_icon.or(fallback.default_page_icon),
            default_page_cover: self.default_page_cover.or(fallback.default_page_cover),
            default_page_cover_position: self
                .default_page_cover_position
                .or(fallback.default_page_cover_position),
            display_page_header: self.display_page_header.or(fallback.display_page_header),
            build_mode: self.build_mode.or(fallback.build_mode),
        }
    }
}

/// Fully resolved configuration for a render pass.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub components: ComponentTable,
    pub url_mappers: UrlMappers,

    pub root_page_id: Option<String>,
    pub root_domain: Option<String>,

    pub full_page: bool,
    pub dark_mode: bool,
    pub preview_images: bool,
    pub show_collection_view_dropdown: bool,
    pub show_table_of_contents: bool,
    pub min_table_of_contents_items: usize,

    pub default_page_icon: Option<String>,
    pub default_page_cover: Option<String>,
    /// Vertical focus of page covers, 0.0 (bottom) to 1.0 (top).
    pub default_page_cover_position: f64,

    pub display_page_header: bool,
    pub build_mode: BuildMode,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            components: ComponentTable::defaults(),
            url_mappers: UrlMappers::default(),
            root_page_id: None,
            root_domain: None,
            full_page: false,
            dark_mode: false,
            preview_images: false,
            show_collection_view_dropdown: true,
            show_table_of_contents: false,
            min_table_of_contents_items: 3,
            default_page_icon: None,
            default_page_cover: None,
            default_page_cover_position: 0.5,
            display_page_header: true,
            build_mode: BuildMode::default(),
        }
    }
}

impl Configuration {
    /// Layer `overrides` over `defaults`, key by key.
    ///
    /// The page mapper is rebuilt around the merged root page id unless the
    /// caller supplied one.
    pub fn merge(defaults: Configuration, overrides: RenderOptions) -> Configuration {
        let root_page_id = overrides.root_page_id.or(defaults.root_page_id);
        let url_mappers = UrlMappers {
            page: overrides
                .map_page_url
                .unwrap_or_else(|| PageUrlMapper::same_document(root_page_id.clone())),
            image: overrides
                .map_image_url
                .unwrap_or(defaults.url_mappers.image),
            asset: overrides
                .map_asset_url
                .unwrap_or(defaults.url_mappers.asset),
        };

        Configuration {
            components: defaults.components.with_overrides(&overrides.components),
            url_mappers,
            root_page_id,
            root_domain: overrides.root_domain.or(defaults.root_domain),
            full_page: overrides.full_page.unwrap_or(defaults.full_page),
            dark_mode: overrides.dark_mode.unwrap_or(defaults.dark_mode),
            preview_images: overrides.preview_images.unwrap_or(defaults.preview_images),
            show_collection_view_dropdown: overrides
                .show_collection_view_dropdown
                .unwrap_or(defaults.show_collection_view_dropdown),
            show_table_of_contents: overrides
                .show_table_of_contents
                .unwrap_or(defaults.show_table_of_contents),
            min_table_of_contents_items: overrides
                .min_table_of_contents_items
                .unwrap_or(defaults.min_table_of_contents_items),
            default_page_icon: overrides.default_page_icon.or(defaults.default_page_icon),
            default_page_cover: overrides.default_page_cover.or(defaults.default_page_cover),
            default_page_cover_position: overrides
                .default_page_cover_position
                .unwrap_or(defaults.default_page_cover_position),
            display_page_header: overrides
                .display_page_header
                .unwrap_or(defaults.display_page_header),
            build_mode: overrides.build_mode.unwrap_or(defaults.build_mode),
        }
    }

    /// Merge caller options over the built-in defaults.
    pub fn from_options(options: RenderOptions) -> Configuration {
        Configuration::merge(Configuration::default(), options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Slot;

    #[test]
    fn unspecified_options_take_defaults() {
        let config = Configuration::from_options(RenderOptions::default());
        assert!(!config.full_page);
        assert!(!config.dark_mode);
        assert!(!config.preview_images);
        assert!(config.show_collection_view_dropdown);
        assert!(!config.show_table_of_contents);
        assert_eq!(config.min_table_of_contents_items, 3);
        assert_eq!(config.default_page_cover_position, 0.5);
        assert!(config.display_page_header);
    }

    #[test]
    fn specified_options_win() {
        let options = RenderOptions {
            dark_mode: Some(true),
            min_table_of_contents_items: Some(5),
            display_page_header: Some(false),
            ..RenderOptions::default()
        };
        let config = Configuration::from_options(options);
        assert!(config.dark_mode);
        assert_eq!(config.min_table_of_contents_items, 5);
        assert!(!config.display_page_header);
        assert!(config.show_collection_view_dropdown);
    }

    #[test]
    fn disabled_differs_from_unspecified() {
        let config = Configuration::from_options(RenderOptions::default().disable(Capability::Link));
        assert!(config.components.slot(Capability::Link).is_disabled());
        assert!(matches!(
            config.components.slot(Capability::PageLink),
            Slot::Render(_)
        ));
        assert!(config.components.slot(Capability::Code).is_stub());
    }

    #[test]
    fn page_mapper_follows_root_page_id() {
        let options = RenderOptions {
            root_page_id: Some("root-1".into()),
            ..RenderOptions::default()
        };
        let config = Configuration::from_options(options);
        assert_eq!(config.url_mappers.page_url("root1"), "/");
        assert_eq!(config.url_mappers.page_url("other"), "/other");
    }

    #[test]
    fn deserializes_with_unset_keys_left_none() {
        let options: RenderOptions =
            serde_json::from_str(r#"{"dark_mode": true, "build_mode": "production"}"#)
                .expect("valid options");
        assert_eq!(options.dark_mode, Some(true));
        assert_eq!(options.full_page, None);
        assert_eq!(options.build_mode, Some(BuildMode::Production));
    }

    #[test]
    fn flags_stack_over_file_options() {
        let file = RenderOptions {
            dark_mode: Some(true),
            full_page: Some(false),
            ..RenderOptions::default()
        };
        let flags = RenderOptions {
            full_page: Some(true),
            ..RenderOptions::default()
        }
        .disable(Capability::Tweet);
        let merged = flags.or(file);
        assert_eq!(merged.dark_mode, Some(true));
        assert_eq!(merged.full_page, Some(true));
        assert!(merged.components.contains_key(&Capability::Tweet));
    }
}
