//! Storing a region's markup as a single opaque string.
//!
//! The stored form is standard base64 over the UTF-8 bytes of the region's
//! inner markup, so it survives any text-only transport unchanged.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::debug;

use crate::error::PersistError;
use crate::markup::html::{inner_html, parse_fragment};
use crate::markup::{Markup, NodeId};

/// Encodes the children of `region`.
pub fn store(markup: &Markup, region: NodeId) -> String {
    let html = inner_html(markup, region);
    debug!("storing {} bytes of markup", html.len());
    STANDARD.encode(html.as_bytes())
}

/// Replaces the children of `region` with decoded content.
///
/// The region keeps its previous children when decoding or parsing fails.
pub fn restore(markup: &mut Markup, region: NodeId, stored: &str) -> Result<(), PersistError> {
    let html = decode(stored)?;
    let fragment = parse_fragment(markup, &html)?;
    markup.clear_children(region);
    markup.append_child(region, fragment);
    markup.release(fragment);
    debug!("restored {} bytes of markup", html.len());
    Ok(())
}

/// Decodes stored content back to markup text without touching any tree.
pub fn decode(stored: &str) -> Result<String, PersistError> {
    let bytes = STANDARD.decode(stored.trim())?;
    Ok(String::from_utf8(bytes)?)
}
