//! The editing widget: one editable region plus a caret and an optional
//! selection, both kept as character offsets into the region's text.

use log::debug;

use crate::error::{PersistError, ToggleError};
use crate::markup::html::{inner_html, parse_into};
use crate::markup::{Element, Markup, MarkupError, NodeId, TagName, byte_index};
use crate::menu::MenuAction;
use crate::option::{OptionChain, StyleRequest};
use crate::persist;
use crate::selection::{Affinity, SelectionRange, boundary_at_offset};
use crate::toggle::{TargetResolver, ToggleEngine, ToggleOutcome};

const REGION_TAG: &str = "div";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EditorOptions {
    /// Tab inserts a tab character instead of being left to the host.
    pub use_tab: bool,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self { use_tab: true }
    }
}

#[derive(Clone, Debug)]
pub struct Editor {
    markup: Markup,
    region: NodeId,
    engine: ToggleEngine,
    options: EditorOptions,
    cursor: usize,
    anchor: Option<usize>,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorOptions::default())
    }
}

impl Editor {
    pub fn new(options: EditorOptions) -> Self {
        Self::with_engine(ToggleEngine::default(), options)
    }

    pub fn with_engine(engine: ToggleEngine, options: EditorOptions) -> Self {
        let mut markup = Markup::new();
        let region = markup.create_element(Element::new(TagName::new(REGION_TAG)));
        Self {
            markup,
            region,
            engine,
            options,
            cursor: 0,
            anchor: None,
        }
    }

    /// Creates an editor whose region holds `html`.
    pub fn from_html(html: &str, options: EditorOptions) -> Result<Self, MarkupError> {
        let mut editor = Self::new(options);
        parse_into(&mut editor.markup, editor.region, html)?;
        Ok(editor)
    }

    pub fn markup(&self) -> &Markup {
        &self.markup
    }

    pub fn region(&self) -> NodeId {
        self.region
    }

    pub fn options(&self) -> EditorOptions {
        self.options
    }

    pub fn engine(&self) -> &ToggleEngine {
        &self.engine
    }

    /// Serialized content of the region.
    pub fn html(&self) -> String {
        inner_html(&self.markup, self.region)
    }

    pub fn text(&self) -> String {
        self.markup.text_content(self.region)
    }

    pub fn char_len(&self) -> usize {
        self.text().chars().count()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Ordered, non-empty selected offsets.
    pub fn selection(&self) -> Option<(usize, usize)> {
        let anchor = self.anchor?;
        match anchor.cmp(&self.cursor) {
            std::cmp::Ordering::Less => Some((anchor, self.cursor)),
            std::cmp::Ordering::Greater => Some((self.cursor, anchor)),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn has_selection(&self) -> bool {
        self.selection().is_some()
    }

    pub fn selection_range(&self) -> Option<SelectionRange> {
        let (start, end) = self.selection()?;
        Some(SelectionRange::from_text_offsets(
            &self.markup,
            self.region,
            start,
            end,
        ))
    }

    /// Moves the caret. With `extend` the selection grows from where the
    /// caret was; otherwise any selection is dropped.
    pub fn set_cursor(&mut self, offset: usize, extend: bool) {
        if extend {
            self.anchor.get_or_insert(self.cursor);
        } else {
            self.anchor = None;
        }
        self.cursor = offset.min(self.char_len());
    }

    pub fn move_left(&mut self, extend: bool) -> bool {
        if !extend && let Some((start, _)) = self.selection() {
            self.set_cursor(start, false);
            return true;
        }
        if self.cursor == 0 {
            return false;
        }
        self.set_cursor(self.cursor - 1, extend);
        true
    }

    pub fn move_right(&mut self, extend: bool) -> bool {
        if !extend && let Some((_, end)) = self.selection() {
            self.set_cursor(end, false);
            return true;
        }
        if self.cursor >= self.char_len() {
            return false;
        }
        self.set_cursor(self.cursor + 1, extend);
        true
    }

    pub fn move_to_start(&mut self, extend: bool) {
        self.set_cursor(0, extend);
    }

    pub fn move_to_end(&mut self, extend: bool) {
        self.set_cursor(self.char_len(), extend);
    }

    /// Selects `[start, end)`, leaving the caret at `end`.
    pub fn select(&mut self, start: usize, end: usize) {
        self.set_cursor(start, false);
        self.set_cursor(end, true);
    }

    pub fn select_all(&mut self) {
        self.select(0, self.char_len());
    }

    pub fn clear_selection(&mut self) {
        self.anchor = None;
    }

    /// Toggles `request` on the current selection.
    ///
    /// The selected text does not change, so the selection stays on it.
    /// Adjacent text is merged afterwards, which may free `outcome.node` when
    /// it is a bare text node.
    pub fn toggle_style<R>(
        &mut self,
        request: &StyleRequest,
        resolver: &mut R,
    ) -> Result<ToggleOutcome, ToggleError>
    where
        R: TargetResolver + ?Sized,
    {
        let mut range = self.selection_range();
        let outcome = self.engine.toggle_style(
            &mut self.markup,
            self.region,
            range.as_mut(),
            request,
            resolver,
        )?;
        self.markup.normalize(self.region);
        Ok(outcome)
    }

    pub fn apply_action<R>(
        &mut self,
        action: MenuAction,
        resolver: &mut R,
    ) -> Result<ToggleOutcome, ToggleError>
    where
        R: TargetResolver + ?Sized,
    {
        debug!("menu action {}", action.label());
        self.toggle_style(&action.request(), resolver)
    }

    /// Style layers of the current selection, or `None` when there is no
    /// selection or it spans mixed formatting.
    pub fn active_styles(&self) -> Option<OptionChain> {
        let range = self.selection_range()?;
        self.engine
            .active_options(&self.markup, self.region, &range)
            .ok()
    }

    pub fn insert_char(&mut self, ch: char) -> bool {
        let mut buf = [0u8; 4];
        self.insert_text(ch.encode_utf8(&mut buf))
    }

    /// Replaces the selection (if any) with `text` and places the caret after it.
    /// New text joins the formatting of the text before the caret.
    pub fn insert_text(&mut self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        if let Some((start, end)) = self.selection() {
            self.remove_range(start, end);
        }

        let at = boundary_at_offset(&self.markup, self.region, self.cursor, Affinity::Backward);
        match self.markup.text_mut(at.node) {
            Some(existing) => {
                let idx = byte_index(existing, at.offset);
                existing.insert_str(idx, text);
            }
            None => {
                let node = self.markup.create_text(text);
                self.markup.insert_child(at.node, at.offset, node);
            }
        }
        self.set_cursor(self.cursor + text.chars().count(), false);
        true
    }

    /// Inserts a tab at the start of the selection, collapsing it after the tab.
    pub fn insert_tab(&mut self) -> bool {
        if !self.options.use_tab {
            return false;
        }
        if let Some((start, _)) = self.selection() {
            self.set_cursor(start, false);
        }
        self.insert_text("\t")
    }

    pub fn backspace(&mut self) -> bool {
        if let Some((start, end)) = self.selection() {
            self.remove_range(start, end);
            return true;
        }
        if self.cursor == 0 {
            return false;
        }
        self.remove_range(self.cursor - 1, self.cursor);
        true
    }

    pub fn delete(&mut self) -> bool {
        if let Some((start, end)) = self.selection() {
            self.remove_range(start, end);
            return true;
        }
        if self.cursor >= self.char_len() {
            return false;
        }
        self.remove_range(self.cursor, self.cursor + 1);
        true
    }

    fn remove_range(&mut self, start: usize, end: usize) {
        let mut range = SelectionRange::from_text_offsets(&self.markup, self.region, start, end);
        let removed = range.extract_contents(&mut self.markup);
        self.markup.release(removed);
        self.markup.prune_empty_elements(self.region);
        self.markup.normalize(self.region);
        self.set_cursor(start, false);
    }

    /// Encoded region content, see [`persist::store`].
    pub fn save(&self) -> String {
        persist::store(&self.markup, self.region)
    }

    /// Replaces the content with previously saved data. On failure the
    /// current content is kept.
    pub fn load(&mut self, stored: &str) -> Result<(), PersistError> {
        persist::restore(&mut self.markup, self.region, stored)?;
        self.cursor = 0;
        self.anchor = None;
        Ok(())
    }
}

#[cfg(test)]
#[path = "editor_tests.rs"]
mod editor_tests;
