//! Inline style layers and the chains they form.
//!
//! A formatted run of text is a stack of single-child wrapper elements ending in
//! text. Each wrapper is one [`StyleOption`]; the stack, outermost first, is an
//! [`OptionChain`].

use std::fmt;

use crate::error::ToggleError;
use crate::markup::{Attributes, CSS_CONTAINER_TAG, Element, Markup, NodeId, NodeKind, TagName};

/// A style requested by a UI control. The variant is chosen by the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StyleRequest {
    Tag { name: String, attributes: Attributes },
    Css { property: String, value: String },
}

impl StyleRequest {
    pub fn tag(name: impl Into<String>) -> Self {
        StyleRequest::Tag {
            name: name.into(),
            attributes: Attributes::new(),
        }
    }

    pub fn tag_with(name: impl Into<String>, attributes: Attributes) -> Self {
        StyleRequest::Tag {
            name: name.into(),
            attributes,
        }
    }

    pub fn css(property: impl Into<String>, value: impl Into<String>) -> Self {
        StyleRequest::Css {
            property: property.into(),
            value: value.into(),
        }
    }
}

/// A single `property:value` pair.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CssDeclaration {
    property: String,
    value: String,
}

impl CssDeclaration {
    /// Property names are lowercased; surrounding whitespace is dropped from both parts.
    pub fn new(property: &str, value: &str) -> Self {
        Self {
            property: property.trim().to_ascii_lowercase(),
            value: value.trim().to_string(),
        }
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Inline style attribute text, e.g. `font-style:italic;`.
    pub fn to_style_attribute(&self) -> String {
        self.to_string()
    }

    /// Parses a single declaration. Returns `None` unless `style` holds exactly one.
    pub fn parse_single(style: &str) -> Option<Self> {
        let mut declarations = parse_declarations(style);
        if declarations.len() == 1 {
            declarations.pop()
        } else {
            None
        }
    }
}

impl fmt::Display for CssDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{};", self.property, self.value)
    }
}

/// Splits an inline style attribute into declarations, skipping empty or
/// malformed entries.
pub fn parse_declarations(style: &str) -> Vec<CssDeclaration> {
    style
        .split(';')
        .filter_map(|entry| {
            let (property, value) = entry.split_once(':')?;
            let declaration = CssDeclaration::new(property, value);
            if declaration.property.is_empty() || declaration.value.is_empty() {
                None
            } else {
                Some(declaration)
            }
        })
        .collect()
}

/// One inline style layer.
#[derive(Clone, Debug)]
pub enum StyleOption {
    Tag { name: TagName, attributes: Attributes },
    Css(CssDeclaration),
}

impl StyleOption {
    pub fn tag(name: TagName, attributes: Attributes) -> Self {
        StyleOption::Tag { name, attributes }
    }

    pub fn css(property: &str, value: &str) -> Self {
        StyleOption::Css(CssDeclaration::new(property, value))
    }

    /// Element name this layer materializes as.
    pub fn tag_name(&self) -> &TagName {
        match self {
            StyleOption::Tag { name, .. } => name,
            StyleOption::Css(_) => &CSS_CONTAINER_TAG,
        }
    }

    /// Attributes this layer materializes with.
    pub fn attributes(&self) -> Attributes {
        match self {
            StyleOption::Tag { attributes, .. } => attributes.clone(),
            StyleOption::Css(declaration) => {
                Attributes::new().with("style", declaration.to_style_attribute())
            }
        }
    }

    pub fn is_css(&self) -> bool {
        matches!(self, StyleOption::Css(_))
    }

    /// Reads the layer an existing element represents.
    ///
    /// A `span` whose only attribute is a single-declaration `style` becomes a
    /// CSS layer; anything else is a tag layer with its attributes copied as-is.
    pub fn from_element(element: &Element) -> Self {
        if element.tag == CSS_CONTAINER_TAG
            && element.attributes.len() == 1
            && let Some(style) = element.attributes.get("style")
            && let Some(declaration) = CssDeclaration::parse_single(style)
        {
            return StyleOption::Css(declaration);
        }
        StyleOption::Tag {
            name: element.tag.clone(),
            attributes: element.attributes.clone(),
        }
    }

    /// Creates a detached element for this layer, optionally holding `text`.
    pub fn materialize(&self, markup: &mut Markup, text: Option<&str>) -> NodeId {
        let element = Element::with_attributes(self.tag_name().clone(), self.attributes());
        let node = markup.create_element(element);
        if let Some(text) = text
            && !text.is_empty()
        {
            let text_node = markup.create_text(text);
            markup.append_child(node, text_node);
        }
        node
    }
}

impl PartialEq for StyleOption {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (StyleOption::Css(a), StyleOption::Css(b)) => a == b,
            _ => self.tag_name() == other.tag_name() && self.attributes() == other.attributes(),
        }
    }
}

impl Eq for StyleOption {}

impl fmt::Display for StyleOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StyleOption::Css(declaration) => write!(f, "{declaration}"),
            StyleOption::Tag { name, attributes } => {
                write!(f, "<{name}")?;
                for (key, value) in attributes.iter() {
                    write!(f, " {key}=\"{value}\"")?;
                }
                write!(f, ">")
            }
        }
    }
}

impl TryFrom<&StyleRequest> for StyleOption {
    type Error = ToggleError;

    fn try_from(request: &StyleRequest) -> Result<Self, Self::Error> {
        match request {
            StyleRequest::Tag { name, attributes } => {
                if !TagName::is_valid(name) {
                    return Err(ToggleError::InvalidStyleRequest(format!(
                        "'{name}' is not a valid tag name"
                    )));
                }
                // Read like loaded markup, so a styled span request equals its CSS layer.
                let element = Element::with_attributes(TagName::new(name), attributes.clone());
                Ok(StyleOption::from_element(&element))
            }
            StyleRequest::Css { property, value } => {
                let declaration = CssDeclaration::new(property, value);
                let bad = |part: &str| part.is_empty() || part.contains([';', ':', '"']);
                if bad(&declaration.property) || bad(&declaration.value) {
                    return Err(ToggleError::InvalidStyleRequest(format!(
                        "'{property}: {value}' is not a single CSS declaration"
                    )));
                }
                Ok(StyleOption::Css(declaration))
            }
        }
    }
}

/// Nested style layers, outermost first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OptionChain(Vec<StyleOption>);

impl OptionChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn options(&self) -> &[StyleOption] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, option: &StyleOption) -> bool {
        self.0.contains(option)
    }

    pub fn contains_tag(&self, tag: &TagName) -> bool {
        self.0.iter().any(|option| option.tag_name() == tag)
    }

    pub fn push(&mut self, option: StyleOption) {
        self.0.push(option);
    }

    pub fn retain(&mut self, keep: impl FnMut(&StyleOption) -> bool) {
        self.0.retain(keep);
    }

    /// Reads the wrapper chain starting at `root` (an element or a fragment).
    ///
    /// Every level must hold either exactly one element or only text; empty text
    /// nodes are ignored. Anything else is rejected as a branching subtree.
    pub fn decompose(markup: &Markup, root: NodeId) -> Result<Self, ToggleError> {
        let mut chain = Self::new();
        let mut current = root;
        loop {
            if let Some(element) = markup.element(current) {
                chain.push(StyleOption::from_element(element));
            }
            match sole_element_child(markup, current)? {
                Some(child) => current = child,
                None => return Ok(chain),
            }
        }
    }

    /// Builds nested elements for the chain around `text`. An empty chain
    /// yields a bare text node.
    pub fn recompose(&self, markup: &mut Markup, text: &str) -> NodeId {
        let Some((first, rest)) = self.0.split_first() else {
            return markup.create_text(text);
        };
        let outer = first.materialize(markup, None);
        let mut current = outer;
        for option in rest {
            let node = option.materialize(markup, None);
            markup.append_child(current, node);
            current = node;
        }
        let leaf = markup.create_text(text);
        markup.append_child(current, leaf);
        outer
    }
}

impl FromIterator<StyleOption> for OptionChain {
    fn from_iter<I: IntoIterator<Item = StyleOption>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn sole_element_child(markup: &Markup, id: NodeId) -> Result<Option<NodeId>, ToggleError> {
    let significant: Vec<NodeId> = markup
        .children(id)
        .iter()
        .copied()
        .filter(|child| !matches!(markup.kind(*child), NodeKind::Text(text) if text.is_empty()))
        .collect();
    let elements = significant
        .iter()
        .filter(|child| !markup.is_text(**child))
        .count();

    match (elements, significant.len()) {
        (0, _) => Ok(None),
        (1, 1) => Ok(significant.first().copied()),
        _ => {
            let label = markup
                .element(id)
                .map(|element| format!("<{}>", element.tag))
                .unwrap_or_else(|| "selection".to_string());
            Err(ToggleError::MalformedSubtree(format!(
                "{label} holds {} nodes of which {elements} are elements",
                significant.len()
            )))
        }
    }
}
