use std::fmt;

/// Output of a render pass: a host-agnostic element tree.
/// `Display` writes it as HTML.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Markup {
    /// Renders nothing.
    #[default]
    Empty,
    Text(String),
    Element(Element),
    Fragment(Vec<Markup>),
}

impl Markup {
    pub fn text(text: impl Into<String>) -> Self {
        Markup::Text(text.into())
    }

    /// Wrap a sequence, dropping empty entries.
    pub fn fragment(items: impl IntoIterator<Item = Markup>) -> Self {
        let items: Vec<Markup> = items.into_iter().filter(|m| !m.is_empty()).collect();
        if items.is_empty() {
            Markup::Empty
        } else {
            Markup::Fragment(items)
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Markup::Empty => true,
            Markup::Fragment(items) => items.iter().all(Markup::is_empty),
            Markup::Text(_) | Markup::Element(_) => false,
        }
    }

    /// Depth-first search for the first element carrying `class`.
    pub fn find_class(&self, class: &str) -> Option<&Element> {
        match self {
            Markup::Element(element) => {
                if element.has_class(class) {
                    return Some(element);
                }
                element.children.iter().find_map(|c| c.find_class(class))
            }
            Markup::Fragment(items) => items.iter().find_map(|c| c.find_class(class)),
            Markup::Empty | Markup::Text(_) => None,
        }
    }

    /// Concatenated text content.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Markup::Text(text) => out.push_str(text),
            Markup::Element(element) => {
                for child in &element.children {
                    child.collect_text(out);
                }
            }
            Markup::Fragment(items) => {
                for item in items {
                    item.collect_text(out);
                }
            }
            Markup::Empty => {}
        }
    }
}

impl From<Element> for Markup {
    fn from(element: Element) -> Self {
        Markup::Element(element)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: String,
    /// Attributes in insertion order.
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Markup>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Element {
            tag: tag.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Set an attribute, replacing an earlier value of the same name.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
        self
    }

    pub fn attr_opt(self, name: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.attr(name, value),
            None => self,
        }
    }

    /// Append class names; blank input is ignored.
    pub fn class(mut self, class: impl AsRef<str>) -> Self {
        let class = class.as_ref().trim();
        if class.is_empty() {
            return self;
        }
        match self.attributes.iter_mut().find(|(n, _)| n == "class") {
            Some(slot) => {
                slot.1.push(' ');
                slot.1.push_str(class);
            }
            None => self.attributes.push(("class".to_string(), class.to_string())),
        }
        self
    }

    pub fn child(mut self, child: impl Into<Markup>) -> Self {
        let child = child.into();
        if !child.is_empty() {
            self.children.push(child);
        }
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Markup>) -> Self {
        self.children
            .extend(children.into_iter().filter(|c| !c.is_empty()));
        self
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.get_attr("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    fn is_void(&self) -> bool {
        matches!(self.tag.as_str(), "img" | "hr" | "br" | "input")
    }
}

fn write_escaped(f: &mut fmt::Formatter<'_>, text: &str, in_attribute: bool) -> fmt::Result {
    for c in text.chars() {
        match c {
            '&' => f.write_str("&amp;")?,
            '<' => f.write_str("&lt;")?,
            '>' => f.write_str("&gt;")?,
            '"' if in_attribute => f.write_str("&quot;")?,
            _ => write!(f, "{}", c)?,
        }
    }
    Ok(())
}

impl fmt::Display for Markup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Markup::Empty => Ok(()),
            Markup::Text(text) => write_escaped(f, text, false),
            Markup::Element(element) => write!(f, "{}", element),
            Markup::Fragment(items) => {
                for item in items {
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.tag)?;
        for (name, value) in &self.attributes {
            write!(f, " {}=\"", name)?;
            write_escaped(f, value, true)?;
            write!(f, "\"")?;
        }
        if self.is_void() {
            return write!(f, " />");
        }
        write!(f, ">")?;
        for child in &self.children {
            write!(f, "{}", child)?;
        }
        write!(f, "</{}>", self.tag)
    }
}
