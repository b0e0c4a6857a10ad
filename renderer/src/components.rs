use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use recordmap::BlockRecord;
use recordmap::block::id::compact_id;

use crate::error::{Diagnostics, RenderWarning};
use crate::markup::{Element, Markup};

/// A named rendering slot that callers may replace or switch off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Capability {
    Link,
    PageLink,
    Checkbox,
    Code,
    Equation,
    Collection,
    CollectionRow,
    Pdf,
    Tweet,
    Modal,
    Youtube,
    Details,
}

impl Capability {
    pub const ALL: [Capability; 12] = [
        Capability::Link,
        Capability::PageLink,
        Capability::Checkbox,
        Capability::Code,
        Capability::Equation,
        Capability::Collection,
        Capability::CollectionRow,
        Capability::Pdf,
        Capability::Tweet,
        Capability::Modal,
        Capability::Youtube,
        Capability::Details,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Capability::Link => "link",
            Capability::PageLink => "pageLink",
            Capability::Checkbox => "checkbox",
            Capability::Code => "code",
            Capability::Equation => "equation",
            Capability::Collection => "collection",
            Capability::CollectionRow => "collectionRow",
            Capability::Pdf => "pdf",
            Capability::Tweet => "tweet",
            Capability::Modal => "modal",
            Capability::Youtube => "youtube",
            Capability::Details => "details",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything a capability renderer gets to work with.
#[derive(Debug, Clone)]
pub struct ComponentProps<'a> {
    pub block: &'a BlockRecord,
    pub class_name: Option<String>,
    pub href: Option<String>,
    pub checked: bool,
    /// Label content: toggle summaries, link bodies.
    pub summary: Markup,
    pub children: Vec<Markup>,
}

impl<'a> ComponentProps<'a> {
    pub fn new(block: &'a BlockRecord) -> Self {
        ComponentProps {
            block,
            class_name: None,
            href: None,
            checked: false,
            summary: Markup::Empty,
            children: Vec::new(),
        }
    }

    pub fn class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    pub fn href(mut self, href: Option<String>) -> Self {
        self.href = href;
        self
    }

    pub fn checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }

    pub fn summary(mut self, summary: Markup) -> Self {
        self.summary = summary;
        self
    }

    pub fn children(mut self, children: Vec<Markup>) -> Self {
        self.children = children;
        self
    }
}

type RenderFn = dyn Fn(&ComponentProps<'_>) -> Markup + Send + Sync;

/// A capability renderer supplied by the defaults or by a caller.
#[derive(Clone)]
pub struct Component(Arc<RenderFn>);

impl Component {
    pub fn new<F>(render: F) -> Self
    where
        F: Fn(&ComponentProps<'_>) -> Markup + Send + Sync + 'static,
    {
        Component(Arc::new(render))
    }

    pub fn render(&self, props: &ComponentProps<'_>) -> Markup {
        (self.0)(props)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Component(..)")
    }
}

/// A caller's choice for one capability. Leaving a capability out of the
/// override map keeps the default; `Disabled` renders nothing even when a
/// default exists.
#[derive(Debug, Clone)]
pub enum ComponentOverride {
    Render(Component),
    Disabled,
}

/// How a capability resolved after merging overrides over defaults.
#[derive(Debug, Clone)]
pub enum Slot {
    Render(Component),
    Disabled,
    /// Nothing registered: warn and render nothing.
    Stub,
}

impl Slot {
    pub fn is_stub(&self) -> bool {
        matches!(self, Slot::Stub)
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self, Slot::Disabled)
    }
}

/// Lookup table from capability to its resolved renderer.
#[derive(Debug, Clone)]
pub struct ComponentTable {
    slots: BTreeMap<Capability, Slot>,
}

impl Default for ComponentTable {
    fn default() -> Self {
        Self::defaults()
    }
}

impl ComponentTable {
    /// Built-in renderers. Capabilities without one resolve to a stub;
    /// `youtube` starts out disabled.
    pub fn defaults() -> Self {
        let mut slots: BTreeMap<Capability, Slot> =
            Capability::ALL.into_iter().map(|c| (c, Slot::Stub)).collect();
        slots.insert(Capability::Link, Slot::Render(Component::new(default_link)));
        slots.insert(
            Capability::PageLink,
            Slot::Render(Component::new(default_page_link)),
        );
        slots.insert(
            Capability::Checkbox,
            Slot::Render(Component::new(default_checkbox)),
        );
        slots.insert(
            Capability::Details,
            Slot::Render(Component::new(default_details)),
        );
        slots.insert(Capability::Youtube, Slot::Disabled);
        ComponentTable { slots }
    }

    /// Layer caller overrides on top of this table.
    pub fn with_overrides(&self, overrides: &BTreeMap<Capability, ComponentOverride>) -> Self {
        let mut slots = self.slots.clone();
        for (capability, choice) in overrides {
            let slot = match choice {
                ComponentOverride::Render(component) => Slot::Render(component.clone()),
                ComponentOverride::Disabled => Slot::Disabled,
            };
            slots.insert(*capability, slot);
        }
        ComponentTable { slots }
    }

    pub fn slot(&self, capability: Capability) -> &Slot {
        self.slots.get(&capability).unwrap_or(&Slot::Stub)
    }

    /// Render through the resolved slot. Never fails: disabled slots and stubs
    /// produce `Markup::Empty`, stubs also record a warning.
    pub fn render(
        &self,
        capability: Capability,
        props: &ComponentProps<'_>,
        diagnostics: &mut Diagnostics,
    ) -> Markup {
        match self.slot(capability) {
            Slot::Render(component) => component.render(props),
            Slot::Disabled => Markup::Empty,
            Slot::Stub => {
                diagnostics.warn(RenderWarning::UnregisteredCapability {
                    capability: capability.name(),
                });
                Markup::Empty
            }
        }
    }
}

fn default_link(props: &ComponentProps<'_>) -> Markup {
    Element::new("a")
        .attr("target", "_blank")
        .attr("rel", "noopener noreferrer")
        .class(props.class_name.as_deref().unwrap_or_default())
        .attr_opt("href", props.href.clone())
        .child(props.summary.clone())
        .children(props.children.iter().cloned())
        .into()
}

fn default_page_link(props: &ComponentProps<'_>) -> Markup {
    Element::new("a")
        .class(props.class_name.as_deref().unwrap_or_default())
        .attr_opt("href", props.href.clone())
        .child(props.summary.clone())
        .children(props.children.iter().cloned())
        .into()
}

fn default_checkbox(props: &ComponentProps<'_>) -> Markup {
    let state = if props.checked {
        "notion-property-checkbox-checked"
    } else {
        "notion-property-checkbox-unchecked"
    };
    Element::new("span")
        .class("notion-property-checkbox")
        .child(Element::new("span").class(state))
        .into()
}

fn default_details(props: &ComponentProps<'_>) -> Markup {
    Element::new("details")
        .class("notion-toggle")
        .class(compact_id(&props.block.id))
        .class(props.class_name.as_deref().unwrap_or_default())
        .child(Element::new("summary").child(props.summary.clone()))
        .child(Element::new("div").children(props.children.iter().cloned()))
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BuildMode;
    use recordmap::BlockType;

    fn block() -> BlockRecord {
        BlockRecord::new("abc-123", BlockType::Toggle)
    }

    #[test]
    fn names_round_trip() {
        for capability in Capability::ALL {
            assert_eq!(Capability::from_name(capability.name()), Some(capability));
        }
        assert_eq!(Capability::from_name("carousel"), None);
    }

    #[test]
    fn defaults_resolve_three_ways() {
        let table = ComponentTable::defaults();
        assert!(matches!(table.slot(Capability::Link), Slot::Render(_)));
        assert!(table.slot(Capability::Code).is_stub());
        assert!(table.slot(Capability::Youtube).is_disabled());
    }

    #[test]
    fn stub_warns_once_per_call() {
        let table = ComponentTable::defaults();
        let block = block();
        let mut diagnostics = Diagnostics::new(BuildMode::Development);
        let out = table.render(Capability::Tweet, &ComponentProps::new(&block), &mut diagnostics);
        assert!(out.is_empty());
        assert_eq!(
            diagnostics.warnings(),
            [RenderWarning::UnregisteredCapability { capability: "tweet" }]
        );
    }

    #[test]
    fn disabled_override_beats_default() {
        let overrides = BTreeMap::from([(Capability::Link, ComponentOverride::Disabled)]);
        let table = ComponentTable::defaults().with_overrides(&overrides);
        let block = block();
        let mut diagnostics = Diagnostics::new(BuildMode::Development);
        let props = ComponentProps::new(&block).href(Some("https://x".into()));
        assert!(table.render(Capability::Link, &props, &mut diagnostics).is_empty());
        assert!(diagnostics.warnings().is_empty());
    }

    #[test]
    fn override_replaces_stub() {
        let overrides = BTreeMap::from([(
            Capability::Code,
            ComponentOverride::Render(Component::new(|props| {
                Markup::text(format!("code:{}", props.block.id))
            })),
        )]);
        let table = ComponentTable::defaults().with_overrides(&overrides);
        let block = block();
        let mut diagnostics = Diagnostics::new(BuildMode::Development);
        let out = table.render(Capability::Code, &ComponentProps::new(&block), &mut diagnostics);
        assert_eq!(out.to_string(), "code:abc-123");
    }

    #[test]
    fn default_details_carries_block_id() {
        let table = ComponentTable::defaults();
        let block = block();
        let mut diagnostics = Diagnostics::new(BuildMode::Development);
        let props = ComponentProps::new(&block)
            .summary(Markup::text("More"))
            .children(vec![Markup::text("inside")]);
        let out = table.render(Capability::Details, &props, &mut diagnostics);
        assert_eq!(
            out.to_string(),
            r#"<details class="notion-toggle abc123"><summary>More</summary><div>inside</div></details>"#
        );
    }
}
