//! HTML serialization and parsing for [`Markup`] trees.
//!
//! The serializer always writes explicit end tags, so everything it emits can be
//! read back by the XML tokenizer without loss.

use std::fmt;

use quick_xml::escape::{escape, partial_escape, unescape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use super::{Attributes, Element, Markup, NodeId, NodeKind, TagName};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MarkupError {
    Syntax { position: u64, message: String },
    Encoding(String),
    InvalidTagName(String),
    UnknownEntity(String),
    UnexpectedEnd(String),
    Unclosed(TagName),
}

impl fmt::Display for MarkupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkupError::Syntax { position, message } => {
                write!(f, "markup syntax error at byte {position}: {message}")
            }
            MarkupError::Encoding(message) => write!(f, "markup encoding error: {message}"),
            MarkupError::InvalidTagName(name) => write!(f, "invalid tag name '{name}'"),
            MarkupError::UnknownEntity(entity) => write!(f, "unknown entity '{entity}'"),
            MarkupError::UnexpectedEnd(name) => write!(f, "unexpected end tag '{name}'"),
            MarkupError::Unclosed(tag) => write!(f, "element '{tag}' is never closed"),
        }
    }
}

impl std::error::Error for MarkupError {}

/// Serializes the children of `id`.
pub fn inner_html(markup: &Markup, id: NodeId) -> String {
    let mut out = String::new();
    for child in markup.children(id) {
        write_node(markup, *child, &mut out);
    }
    out
}

/// Serializes `id` itself, including its own tag for elements.
pub fn outer_html(markup: &Markup, id: NodeId) -> String {
    let mut out = String::new();
    write_node(markup, id, &mut out);
    out
}

fn write_node(markup: &Markup, id: NodeId, out: &mut String) {
    match markup.kind(id) {
        NodeKind::Text(text) => out.push_str(&partial_escape(text.as_str())),
        NodeKind::Fragment => {
            for child in markup.children(id) {
                write_node(markup, *child, out);
            }
        }
        NodeKind::Element(element) => {
            out.push('<');
            out.push_str(element.tag.as_str());
            for (key, value) in element.attributes.iter() {
                out.push(' ');
                out.push_str(key);
                out.push_str("=\"");
                out.push_str(&escape(value));
                out.push('"');
            }
            out.push('>');
            for child in markup.children(id) {
                write_node(markup, *child, out);
            }
            out.push_str("</");
            out.push_str(element.tag.as_str());
            out.push('>');
        }
    }
}

/// Parses `html` into a new detached fragment. On failure the partial
/// result is freed again.
pub fn parse_fragment(markup: &mut Markup, html: &str) -> Result<NodeId, MarkupError> {
    let fragment = markup.create_fragment();
    if let Err(err) = parse_children(markup, fragment, html) {
        markup.release(fragment);
        return Err(err);
    }
    Ok(fragment)
}

fn parse_children(markup: &mut Markup, fragment: NodeId, html: &str) -> Result<(), MarkupError> {
    let mut reader = Reader::from_str(html);
    reader.config_mut().trim_text(false);
    let mut stack: Vec<NodeId> = vec![fragment];

    loop {
        let event = reader.read_event().map_err(|err| MarkupError::Syntax {
            position: reader.buffer_position() as u64,
            message: err.to_string(),
        })?;
        let top = stack.last().copied().unwrap_or(fragment);
        match event {
            Event::Start(start) => {
                let element = element_from_start(&reader, &start)?;
                let node = markup.create_element(element);
                markup.append_child(top, node);
                stack.push(node);
            }
            Event::Empty(start) => {
                let element = element_from_start(&reader, &start)?;
                let node = markup.create_element(element);
                markup.append_child(top, node);
            }
            Event::End(end) => {
                let name = decode_str(&reader, end.name().as_ref())?;
                let tag = TagName::new(&name);
                let open = markup.element(top).map(|element| element.tag.clone());
                if stack.len() <= 1 || open.as_ref() != Some(&tag) {
                    return Err(MarkupError::UnexpectedEnd(name));
                }
                stack.pop();
            }
            Event::Text(text) => {
                let decoded = text
                    .decode()
                    .map_err(|err| MarkupError::Encoding(format!("{err:?}")))?;
                append_text(markup, top, &decoded);
            }
            Event::CData(data) => {
                let decoded = decode_str(&reader, &data)?;
                append_text(markup, top, &decoded);
            }
            Event::GeneralRef(reference) => {
                let name = reference
                    .decode()
                    .map_err(|err| MarkupError::Encoding(format!("{err:?}")))?;
                let entity = format!("&{name};");
                let resolved =
                    unescape(&entity).map_err(|_| MarkupError::UnknownEntity(entity.clone()))?;
                append_text(markup, top, &resolved);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if stack.len() > 1
        && let Some(open) = stack.last().and_then(|id| markup.element(*id))
    {
        return Err(MarkupError::Unclosed(open.tag.clone()));
    }

    Ok(())
}

/// Parses `html` and appends the result to `parent`. Nothing is attached when
/// parsing fails.
pub fn parse_into(markup: &mut Markup, parent: NodeId, html: &str) -> Result<(), MarkupError> {
    let fragment = parse_fragment(markup, html)?;
    markup.append_child(parent, fragment);
    markup.release(fragment);
    Ok(())
}

fn append_text(markup: &mut Markup, parent: NodeId, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(last) = markup.children(parent).last().copied()
        && let Some(existing) = markup.text_mut(last)
    {
        existing.push_str(text);
        return;
    }
    let node = markup.create_text(text);
    markup.append_child(parent, node);
}

fn decode_str(reader: &Reader<&[u8]>, bytes: &[u8]) -> Result<String, MarkupError> {
    reader
        .decoder()
        .decode(bytes)
        .map(|decoded| decoded.into_owned())
        .map_err(|err| MarkupError::Encoding(format!("{err:?}")))
}

fn element_from_start(
    reader: &Reader<&[u8]>,
    start: &BytesStart<'_>,
) -> Result<Element, MarkupError> {
    let name = decode_str(reader, start.name().as_ref())?;
    if !TagName::is_valid(&name) {
        return Err(MarkupError::InvalidTagName(name));
    }

    let mut attributes = Attributes::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|err| MarkupError::Syntax {
            position: reader.buffer_position() as u64,
            message: format!("{err:?}"),
        })?;
        let key = decode_str(reader, attr.key.as_ref())?;
        let raw = decode_str(reader, &attr.value)?;
        let value = unescape(&raw).map_err(|_| MarkupError::UnknownEntity(raw.clone()))?;
        attributes.set(key, value.into_owned());
    }

    Ok(Element::with_attributes(TagName::new(&name), attributes))
}
