use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
};
use unicode_width::UnicodeWidthChar;

use crate::markup::{Element, Markup, NodeId, NodeKind};
use crate::option::{CssDeclaration, parse_declarations};
use crate::theme::Theme;

const TAB_WIDTH: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CursorVisualPosition {
    pub line: usize,
    pub column: u16,
}

#[derive(Debug)]
pub struct RenderResult {
    pub lines: Vec<Line<'static>>,
    pub cursor: Option<CursorVisualPosition>,
    pub total_lines: usize,
    /// Visual position of every character offset of the region, plus the end.
    pub offset_map: Vec<(usize, CursorVisualPosition)>,
}

impl RenderResult {
    pub fn position_of(&self, offset: usize) -> Option<CursorVisualPosition> {
        self.offset_map
            .iter()
            .find(|(candidate, _)| *candidate == offset)
            .map(|(_, position)| *position)
    }

    /// The offset on `line` whose column is closest to `column`.
    pub fn offset_near(&self, line: usize, column: u16) -> Option<usize> {
        self.offset_map
            .iter()
            .filter(|(_, position)| position.line == line)
            .min_by_key(|(_, position)| position.column.abs_diff(column))
            .map(|(offset, _)| *offset)
    }
}

/// What to draw besides the markup itself.
#[derive(Clone, Copy, Debug, Default)]
pub struct RenderState {
    /// Character offset of the caret.
    pub cursor: usize,
    /// Selected character range, start inclusive and end exclusive.
    pub selection: Option<(usize, usize)>,
}

pub fn render_region(
    markup: &Markup,
    region: NodeId,
    width: usize,
    state: RenderState,
    theme: &Theme,
) -> RenderResult {
    let mut renderer = Renderer::new(width.max(1), state, theme);
    renderer.collect(markup, region, Style::default());
    renderer.finish()
}

struct Renderer<'a> {
    wrap_width: usize,
    state: RenderState,
    theme: &'a Theme,
    next_offset: usize,
    fragments: Vec<FragmentItem>,
    builder: Option<TokenBuilder>,
    pending_events: Vec<TextEvent>,
}

impl<'a> Renderer<'a> {
    fn new(wrap_width: usize, state: RenderState, theme: &'a Theme) -> Self {
        Self {
            wrap_width,
            state,
            theme,
            next_offset: 0,
            fragments: Vec::new(),
            builder: None,
            pending_events: Vec::new(),
        }
    }

    fn collect(&mut self, markup: &Markup, id: NodeId, style: Style) {
        match markup.kind(id) {
            NodeKind::Text(text) => self.tokenize_text(text, style),
            NodeKind::Element(element) => {
                let style = element_style(style, element, self.theme);
                for child in markup.children(id) {
                    self.collect(markup, *child, style);
                }
            }
            NodeKind::Fragment => {
                for child in markup.children(id) {
                    self.collect(markup, *child, style);
                }
            }
        }
    }

    fn is_selected(&self, offset: usize) -> bool {
        matches!(self.state.selection, Some((start, end)) if start <= offset && offset < end)
    }

    fn tokenize_text(&mut self, text: &str, style: Style) {
        let mut buffer: Vec<char> = Vec::with_capacity(TAB_WIDTH);
        for ch in text.chars() {
            let offset = self.next_offset;
            self.next_offset += 1;
            self.pending_events.push(TextEvent { offset: 0, char_offset: offset });

            if ch == '\r' {
                continue;
            }
            if ch == '\n' {
                self.flush_token();
                self.fragments.push(FragmentItem::LineBreak);
                continue;
            }

            let style = if self.is_selected(offset) {
                style.patch(self.theme.selection_style())
            } else {
                style
            };
            buffer.clear();
            if ch == '\t' {
                buffer.extend_from_slice(&[' '; TAB_WIDTH]);
            } else {
                buffer.push(ch);
            }

            for actual in &buffer {
                let is_whitespace = actual.is_whitespace();
                if let Some(current) = self.builder.as_mut()
                    && current.matches(is_whitespace, style)
                {
                    current.add_events(&mut self.pending_events);
                    current.push_char(*actual);
                    continue;
                }
                if let Some(existing) = self.builder.take() {
                    self.fragments.push(FragmentItem::Token(existing.finish()));
                }
                let mut new_builder = TokenBuilder::new(style, is_whitespace);
                new_builder.add_events(&mut self.pending_events);
                new_builder.push_char(*actual);
                self.builder = Some(new_builder);
            }
        }
    }

    /// Closes the current token, attaching pending events at its end.
    fn flush_token(&mut self) {
        if let Some(mut token) = self.builder.take() {
            token.add_events(&mut self.pending_events);
            self.fragments.push(FragmentItem::Token(token.finish()));
        } else if !self.pending_events.is_empty() {
            self.fragments.push(FragmentItem::Token(Fragment {
                text: String::new(),
                style: Style::default(),
                kind: FragmentKind::Word,
                width: 0,
                events: self.pending_events.drain(..).collect(),
            }));
        }
    }

    fn finish(mut self) -> RenderResult {
        self.pending_events.push(TextEvent {
            offset: 0,
            char_offset: self.next_offset,
        });
        self.flush_token();

        let mut lines = Vec::new();
        let mut offset_map = Vec::new();
        for (line_index, output) in wrap_fragments(&self.fragments, self.wrap_width)
            .into_iter()
            .enumerate()
        {
            let spans: Vec<Span<'static>> = output
                .spans
                .into_iter()
                .map(|segment| Span::styled(segment.text, segment.style))
                .collect();
            for event in output.events {
                offset_map.push((
                    event.char_offset,
                    CursorVisualPosition {
                        line: line_index,
                        column: event.column,
                    },
                ));
            }
            lines.push(Line::from(spans));
        }
        offset_map.sort_by_key(|(offset, _)| *offset);

        let cursor = offset_map
            .iter()
            .find(|(offset, _)| *offset == self.state.cursor)
            .map(|(_, position)| *position);
        let total_lines = lines.len();
        RenderResult {
            lines,
            cursor,
            total_lines,
            offset_map,
        }
    }
}

/// Terminal style for the content of `element`.
pub fn element_style(base: Style, element: &Element, theme: &Theme) -> Style {
    match element.tag.as_str() {
        "b" | "strong" => base.add_modifier(Modifier::BOLD),
        "i" | "em" => base.add_modifier(Modifier::ITALIC),
        "u" | "ins" => base.add_modifier(Modifier::UNDERLINED),
        "s" | "strike" | "del" => base.add_modifier(Modifier::CROSSED_OUT),
        "code" => base.add_modifier(Modifier::DIM),
        "a" => base.patch(theme.link_style()),
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => base.patch(theme.heading_style()),
        _ => match element.attributes.get("style") {
            Some(style) => parse_declarations(style)
                .iter()
                .fold(base, |style, declaration| css_style(style, declaration)),
            None => base,
        },
    }
}

fn css_style(base: Style, declaration: &CssDeclaration) -> Style {
    match (declaration.property(), declaration.value()) {
        ("font-weight", "bold" | "bolder" | "600" | "700" | "800" | "900") => {
            base.add_modifier(Modifier::BOLD)
        }
        ("font-style", "italic" | "oblique") => base.add_modifier(Modifier::ITALIC),
        ("text-decoration" | "text-decoration-line", value) => {
            value
                .split_whitespace()
                .fold(base, |style, part| match part {
                    "underline" => style.add_modifier(Modifier::UNDERLINED),
                    "line-through" => style.add_modifier(Modifier::CROSSED_OUT),
                    _ => style,
                })
        }
        _ => base,
    }
}

#[derive(Clone)]
struct LineSegment {
    text: String,
    style: Style,
}

#[derive(Clone)]
struct LineOutput {
    spans: Vec<LineSegment>,
    events: Vec<LocatedEvent>,
}

#[derive(Clone, Copy)]
struct LocatedEvent {
    column: u16,
    char_offset: usize,
}

#[derive(Clone)]
struct Fragment {
    text: String,
    style: Style,
    kind: FragmentKind,
    width: usize,
    events: Vec<TextEvent>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum FragmentKind {
    Word,
    Whitespace,
}

#[derive(Clone)]
enum FragmentItem {
    Token(Fragment),
    LineBreak,
}

/// A character offset anchored at a column inside a token.
#[derive(Clone, Copy)]
struct TextEvent {
    offset: usize,
    char_offset: usize,
}

struct TokenBuilder {
    text: String,
    style: Style,
    kind: FragmentKind,
    width: usize,
    events: Vec<TextEvent>,
}

impl TokenBuilder {
    fn new(style: Style, is_whitespace: bool) -> Self {
        Self {
            text: String::new(),
            style,
            kind: if is_whitespace {
                FragmentKind::Whitespace
            } else {
                FragmentKind::Word
            },
            width: 0,
            events: Vec::new(),
        }
    }

    fn matches(&self, is_whitespace: bool, style: Style) -> bool {
        self.style == style
            && matches!(
                (self.kind, is_whitespace),
                (FragmentKind::Whitespace, true) | (FragmentKind::Word, false)
            )
    }

    fn add_events(&mut self, pending: &mut Vec<TextEvent>) {
        for mut event in pending.drain(..) {
            event.offset = self.width;
            self.events.push(event);
        }
    }

    fn push_char(&mut self, ch: char) {
        self.text.push(ch);
        self.width += UnicodeWidthChar::width(ch).unwrap_or(0);
    }

    fn finish(self) -> Fragment {
        Fragment {
            text: self.text,
            style: self.style,
            kind: self.kind,
            width: self.width,
            events: self.events,
        }
    }
}

fn wrap_fragments(fragments: &[FragmentItem], width: usize) -> Vec<LineOutput> {
    let mut outputs = Vec::new();
    let mut builder = LineBuilder::new();
    let mut pending_whitespace: Vec<Fragment> = Vec::new();

    for fragment in fragments {
        match fragment {
            FragmentItem::LineBreak => {
                builder.consume_pending(&mut pending_whitespace);
                outputs.push(builder.build_line());
                builder = LineBuilder::new();
            }
            FragmentItem::Token(token) => match token.kind {
                FragmentKind::Whitespace => {
                    pending_whitespace.push(token.clone());
                }
                FragmentKind::Word => {
                    let whitespace_width: usize =
                        pending_whitespace.iter().map(|item| item.width).sum();
                    if builder.width > 0
                        && !pending_whitespace.is_empty()
                        && builder.width + whitespace_width + token.width > width
                    {
                        builder.consume_pending(&mut pending_whitespace);
                        outputs.push(builder.build_line());
                        builder = LineBuilder::new();
                    }

                    builder.consume_pending(&mut pending_whitespace);
                    builder.append_token(token.clone());
                }
            },
        }
    }

    builder.consume_pending(&mut pending_whitespace);
    outputs.push(builder.build_line());
    outputs
}

struct LineBuilder {
    segments: Vec<LineSegment>,
    events: Vec<LocatedEvent>,
    width: usize,
}

impl LineBuilder {
    fn new() -> Self {
        Self {
            segments: Vec::new(),
            events: Vec::new(),
            width: 0,
        }
    }

    fn consume_pending(&mut self, pending_whitespace: &mut Vec<Fragment>) {
        for fragment in pending_whitespace.drain(..) {
            self.append_token(fragment);
        }
    }

    fn append_token(&mut self, fragment: Fragment) {
        let start = self.width;
        if !fragment.text.is_empty() {
            self.width += fragment.width;
            self.segments.push(LineSegment {
                text: fragment.text,
                style: fragment.style,
            });
        }

        for event in fragment.events {
            self.events.push(LocatedEvent {
                column: (start + event.offset).min(u16::MAX as usize) as u16,
                char_offset: event.char_offset,
            });
        }
    }

    fn build_line(mut self) -> LineOutput {
        if self.segments.is_empty() {
            self.segments.push(LineSegment {
                text: String::new(),
                style: Style::default(),
            });
        }
        LineOutput {
            spans: self.segments,
            events: self.events,
        }
    }
}

pub fn visible_width(text: &str) -> usize {
    text.chars()
        .map(|ch| UnicodeWidthChar::width(ch).unwrap_or(0))
        .sum()
}
