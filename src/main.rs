use std::{
    env, fs, io,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::Modifier,
    text::{Line, Span, Text},
    widgets::{
        Block, Borders, Clear, List, ListItem, ListState, Paragraph, Scrollbar,
        ScrollbarOrientation, ScrollbarState, Wrap,
    },
};

use pure_markup::editor::{Editor, EditorOptions};
use pure_markup::menu::{
    ContextMenuState, MenuAction, MenuEntry, build_context_menu_entries, is_context_menu_shortcut,
};
use pure_markup::render::{RenderResult, RenderState, render_region, visible_width};
use pure_markup::theme::Theme;
use pure_markup::toggle::NoPrompt;

const STATUS_TIMEOUT: Duration = Duration::from_secs(4);
const DEMO_CONTENT: &str = "Select text with Shift and the arrow keys, then press Esc for the \
style menu. Styles such as <b>bold</b> or <span style=\"font-style:italic;\">italic</span> \
toggle on and off without disturbing each other.";

fn main() -> Result<()> {
    run()
}

fn run() -> Result<()> {
    let mut args = env::args().skip(1);
    let Some(path_arg) = args.next() else {
        eprintln!("Usage: pure-markup <file>");
        return Ok(());
    };
    let path = PathBuf::from(path_arg);

    let (editor, initial_status) = load_editor(&path)?;
    let mut app = App::new(editor, path, initial_status);

    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().ok();

    let res = run_app(&mut terminal, &mut app).context("application error");

    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();

    res
}

/// Opens the stored content at `path`, or the demo text for a new file.
fn load_editor(path: &Path) -> Result<(Editor, Option<String>)> {
    if !path.exists() {
        let editor = Editor::from_html(DEMO_CONTENT, EditorOptions::default())
            .context("failed to build demo content")?;
        return Ok((editor, Some("New file".to_string())));
    }

    let stored = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let mut editor = Editor::default();
    match editor.load(&stored) {
        Ok(()) => Ok((editor, None)),
        Err(err) => {
            let message = format!("Load error: {err}. Starting with empty content.");
            Ok((editor, Some(message)))
        }
    }
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    while !app.should_quit() {
        terminal
            .draw(|frame| app.draw(frame))
            .context("failed to draw frame")?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout).context("event poll failed")? {
            let evt = event::read().context("failed to read event")?;
            app.handle_event(evt)?;
        }

        if last_tick.elapsed() >= tick_rate {
            app.on_tick();
            last_tick = Instant::now();
        }
    }

    Ok(())
}

/// Text typed into the link target prompt.
struct LinkPrompt {
    input: String,
}

struct App {
    editor: Editor,
    file_path: PathBuf,
    theme: Theme,
    scroll_top: usize,
    last_view_height: usize,
    should_quit: bool,
    dirty: bool,
    status_message: Option<(String, Instant)>,
    last_render: Option<RenderResult>,
    preferred_column: Option<u16>,
    context_menu: Option<ContextMenuState>,
    link_prompt: Option<LinkPrompt>,
}

impl App {
    fn new(editor: Editor, path: PathBuf, initial_status: Option<String>) -> Self {
        Self {
            editor,
            file_path: path,
            theme: Theme::default(),
            scroll_top: 0,
            last_view_height: 1,
            should_quit: false,
            dirty: false,
            status_message: initial_status.map(|msg| (msg, Instant::now())),
            last_render: None,
            preferred_column: None,
            context_menu: None,
            link_prompt: None,
        }
    }

    fn should_quit(&self) -> bool {
        self.should_quit
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        if area.height == 0 || area.width == 0 {
            return;
        }

        let status_height = if area.height > 1 { 2 } else { 1 };
        let vertical = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(status_height)])
            .split(area);

        let editor_area = vertical[0];
        let status_area = vertical[1];

        let horizontal = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(editor_area);
        let text_area = horizontal[0];
        let scrollbar_area = horizontal[1];

        let state = RenderState {
            cursor: self.editor.cursor(),
            selection: self.editor.selection(),
        };
        let render = render_region(
            self.editor.markup(),
            self.editor.region(),
            text_area.width.max(1) as usize,
            state,
            &self.theme,
        );
        if self.preferred_column.is_none() {
            self.preferred_column = render.cursor.map(|p| p.column);
        }

        let viewport_height = text_area.height as usize;
        self.last_view_height = viewport_height.max(1);
        self.adjust_scroll(&render, viewport_height);

        let paragraph = Paragraph::new(Text::from(render.lines.clone()))
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::NONE))
            .scroll((self.scroll_top as u16, 0));
        frame.render_widget(paragraph, text_area);

        let mut scrollbar_state = ScrollbarState::new(render.total_lines).position(self.scroll_top);
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight);
        frame.render_stateful_widget(scrollbar, scrollbar_area, &mut scrollbar_state);

        if let Some(cursor) = render.cursor
            && cursor.line >= self.scroll_top
            && cursor.line < self.scroll_top + viewport_height
        {
            let cursor_y = text_area.y + (cursor.line - self.scroll_top) as u16;
            let cursor_x = text_area.x + cursor.column.min(text_area.width.saturating_sub(1));
            frame.set_cursor_position(Position::new(cursor_x, cursor_y));
        }

        let anchor_line = self
            .editor
            .selection()
            .and_then(|(start, _)| render.position_of(start))
            .or(render.cursor)
            .map(|position| position.line.saturating_sub(self.scroll_top) as u16);
        self.last_render = Some(render);

        let status_line = self.status_line();
        let status_widget = Paragraph::new(status_line)
            .style(self.theme.status_bar_style())
            .block(Block::default().borders(Borders::TOP));
        frame.render_widget(status_widget, status_area);

        if self.context_menu.is_some() {
            self.render_context_menu(frame, text_area, anchor_line);
        }
        if self.link_prompt.is_some() {
            self.render_link_prompt(frame, area);
        }
    }

    /// Draws the menu just below the selection, or above it when there is no room.
    fn render_context_menu(&self, frame: &mut Frame, area: Rect, anchor_line: Option<u16>) {
        let Some(menu) = &self.context_menu else {
            return;
        };

        if area.width < 3 || area.height < 3 {
            return;
        }

        let mut max_label_width = 0usize;
        let mut max_section_width = 0usize;
        for entry in menu.entries() {
            match entry {
                MenuEntry::Item(item) => {
                    max_label_width = max_label_width.max(visible_width(item.label));
                }
                MenuEntry::Section(title) => {
                    max_section_width = max_section_width.max(title.chars().count());
                }
                MenuEntry::Separator => {}
            }
        }

        // "✓ " + label + gap + shortcut
        let item_width = 2 + max_label_width + 2 + 1;
        let content_width = item_width.max(max_section_width) as u16;
        let width = (content_width + 4).min(area.width).max(10.min(area.width));
        let height = (menu.entries().len() as u16 + 2).min(area.height).max(3.min(area.height));

        let below = anchor_line.map(|line| area.y + line + 1).unwrap_or(area.y);
        let y = if below + height <= area.y + area.height {
            below
        } else {
            anchor_line
                .map(|line| (area.y + line).saturating_sub(height))
                .unwrap_or(area.y)
                .max(area.y)
        };
        let popup_area = Rect::new(
            area.x + (area.width.saturating_sub(width)) / 2,
            y,
            width,
            height,
        );

        frame.render_widget(Clear, popup_area);

        let separator_width = popup_area.width.saturating_sub(4).max(4) as usize;
        let popup_style = self.theme.menu_style();

        let mut items = Vec::new();
        for (idx, entry) in menu.entries().iter().enumerate() {
            match entry {
                MenuEntry::Section(title) => {
                    items.push(ListItem::new(Line::from(Span::styled(
                        *title,
                        popup_style.add_modifier(Modifier::BOLD),
                    ))));
                }
                MenuEntry::Separator => {
                    items.push(ListItem::new(Line::from(Span::styled(
                        "─".repeat(separator_width),
                        self.theme.menu_disabled_style(),
                    ))));
                }
                MenuEntry::Item(item) => {
                    let mark = if item.checked { "✓" } else { " " };
                    let shortcut = item.shortcut.map(|s| s.key()).unwrap_or(' ');
                    let padding = max_label_width.saturating_sub(visible_width(item.label));
                    let content = format!(
                        "{mark} {label}{pad}  {shortcut}",
                        label = item.label,
                        pad = " ".repeat(padding),
                    );
                    let selected = idx == menu.selected_index();
                    let style = match (item.is_enabled(), selected) {
                        (true, true) => self.theme.menu_selected_style(),
                        (true, false) => popup_style,
                        (false, true) => self.theme.menu_selected_disabled_style(),
                        (false, false) => self.theme.menu_disabled_style(),
                    };
                    items.push(ListItem::new(Line::from(Span::styled(content, style))));
                }
            }
        }

        let mut state = ListState::default();
        state.select(Some(menu.selected_index()));

        let list = List::new(items).style(popup_style).block(
            Block::default()
                .title("Style")
                .borders(Borders::ALL)
                .style(popup_style),
        );

        frame.render_stateful_widget(list, popup_area, &mut state);
    }

    fn render_link_prompt(&self, frame: &mut Frame, area: Rect) {
        let Some(prompt) = &self.link_prompt else {
            return;
        };
        let width = 60.min(area.width);
        let height = 3.min(area.height);
        let popup_area = Rect::new(
            area.x + (area.width.saturating_sub(width)) / 2,
            area.y + (area.height.saturating_sub(height)) / 2,
            width,
            height,
        );
        frame.render_widget(Clear, popup_area);
        let input = Paragraph::new(prompt.input.as_str())
            .style(self.theme.menu_style())
            .block(
                Block::default()
                    .title("Link target (Enter to apply, Esc for none)")
                    .borders(Borders::ALL)
                    .style(self.theme.menu_style()),
            );
        frame.render_widget(input, popup_area);

        let column = visible_width(&prompt.input) as u16;
        if popup_area.width > 2 && popup_area.height > 2 {
            let x = popup_area.x + 1 + column.min(popup_area.width - 3);
            frame.set_cursor_position(Position::new(x, popup_area.y + 1));
        }
    }

    fn open_context_menu(&mut self) {
        let active = self.editor.active_styles();
        let entries = build_context_menu_entries(self.editor.has_selection(), active.as_ref());
        self.context_menu = Some(ContextMenuState::new(entries));
    }

    fn close_context_menu(&mut self) {
        self.context_menu = None;
    }

    fn handle_context_menu_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> bool {
        if self.context_menu.is_none() {
            return false;
        }

        match code {
            KeyCode::Esc => {
                self.close_context_menu();
                true
            }
            KeyCode::Up => {
                if let Some(menu) = self.context_menu.as_mut() {
                    menu.move_selection(-1);
                }
                true
            }
            KeyCode::Down => {
                if let Some(menu) = self.context_menu.as_mut() {
                    menu.move_selection(1);
                }
                true
            }
            KeyCode::Enter => {
                if let Some(action) = self
                    .context_menu
                    .as_ref()
                    .and_then(|menu| menu.current_action())
                {
                    self.close_context_menu();
                    self.execute_menu_action(action);
                }
                true
            }
            KeyCode::Char(' ') if modifiers.contains(KeyModifiers::CONTROL) => {
                self.close_context_menu();
                true
            }
            KeyCode::Char(_) => {
                if let Some(menu) = self.context_menu.as_mut() {
                    let (handled, action) = menu.shortcut_action(code, modifiers);
                    if handled {
                        if let Some(action) = action {
                            self.close_context_menu();
                            self.execute_menu_action(action);
                        }
                        return true;
                    }
                }
                false
            }
            _ => false,
        }
    }

    /// Runs a menu action. Adding a link first asks for its target.
    fn execute_menu_action(&mut self, action: MenuAction) {
        if action == MenuAction::Link {
            let has_link = self
                .editor
                .active_styles()
                .is_some_and(|chain| action.is_active(&chain));
            if !has_link && self.editor.has_selection() {
                self.link_prompt = Some(LinkPrompt {
                    input: String::new(),
                });
                return;
            }
        }
        let result = self.editor.apply_action(action, &mut NoPrompt);
        self.report_toggle(action, result.map(|outcome| outcome.applied));
    }

    fn handle_link_prompt_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> bool {
        let Some(prompt) = self.link_prompt.as_mut() else {
            return false;
        };
        match code {
            KeyCode::Enter | KeyCode::Esc => {
                let target = (code == KeyCode::Enter).then(|| prompt.input.trim().to_string());
                self.link_prompt = None;
                let result = self
                    .editor
                    .apply_action(MenuAction::Link, &mut || target.clone());
                self.report_toggle(MenuAction::Link, result.map(|outcome| outcome.applied));
            }
            KeyCode::Backspace => {
                prompt.input.pop();
            }
            KeyCode::Char(ch) if !modifiers.contains(KeyModifiers::CONTROL) => {
                prompt.input.push(ch);
            }
            _ => {}
        }
        true
    }

    fn report_toggle<E: std::fmt::Display>(&mut self, action: MenuAction, result: Result<bool, E>) {
        let message = match result {
            Ok(applied) => {
                self.mark_dirty();
                format!(
                    "{} {}",
                    action.label().trim_end_matches('…'),
                    if applied { "on" } else { "off" }
                )
            }
            Err(err) => format!("Cannot apply {}: {err}", action.label().trim_end_matches('…')),
        };
        self.status_message = Some((message, Instant::now()));
    }

    fn status_line(&mut self) -> Line<'static> {
        self.prune_status_message();
        let cursor_details = self.cursor_status_text();
        let mut spans = vec![Span::raw(format!("{cursor_details} | "))];

        if let Some((message, _)) = &self.status_message {
            spans.push(Span::raw(message.clone()));
            return Line::from(spans);
        }

        if let Some(chain) = self.editor.active_styles()
            && !chain.is_empty()
        {
            let labels: Vec<String> = chain.options().iter().map(|o| o.to_string()).collect();
            spans.push(Span::styled(
                labels.join(" "),
                self.theme.active_styles_style(),
            ));
            spans.push(Span::raw(" | "));
        }

        let marker = if self.dirty { "*" } else { "" };
        spans.push(Span::styled(
            format!("{}{}", self.file_path.display(), marker),
            self.theme.filename_style(),
        ));
        spans.push(Span::raw(" | Esc menu | Ctrl-S save | Ctrl-Q quit"));
        Line::from(spans)
    }

    fn prune_status_message(&mut self) {
        if let Some((_, instant)) = &self.status_message
            && instant.elapsed() > STATUS_TIMEOUT
        {
            self.status_message = None;
        }
    }

    fn adjust_scroll(&mut self, render: &RenderResult, viewport_height: usize) {
        let viewport = viewport_height.max(1);
        let max_scroll = render
            .total_lines
            .saturating_sub(viewport)
            .min(render.total_lines);
        if self.scroll_top > max_scroll {
            self.scroll_top = max_scroll;
        }
        if let Some(cursor) = &render.cursor {
            if cursor.line < self.scroll_top {
                self.scroll_top = cursor.line;
            } else if cursor.line >= self.scroll_top + viewport_height {
                let target = cursor.line.saturating_add(1);
                self.scroll_top = target.saturating_sub(viewport);
            }
        }
        if self.scroll_top > max_scroll {
            self.scroll_top = max_scroll;
        }
    }

    fn move_cursor_vertical(&mut self, delta: i32, extend: bool) {
        let Some(render) = &self.last_render else {
            return;
        };
        let Some(current) = render.position_of(self.editor.cursor()) else {
            return;
        };

        let desired_column = self.preferred_column.unwrap_or(current.column);
        let max_line = render.total_lines.saturating_sub(1) as i32;
        let target_line = (current.line as i32 + delta).clamp(0, max_line) as usize;

        if let Some(offset) = render.offset_near(target_line, desired_column) {
            self.editor.set_cursor(offset, extend);
            self.preferred_column = Some(desired_column);
        }
    }

    /// Moves to the first (or last) offset on the caret's visual line.
    fn move_to_visual_line_edge(&mut self, end: bool, extend: bool) {
        self.preferred_column = None;
        let Some(render) = &self.last_render else {
            return;
        };
        let Some(current) = render.position_of(self.editor.cursor()) else {
            return;
        };
        let on_line = render
            .offset_map
            .iter()
            .filter(|(_, position)| position.line == current.line)
            .map(|(offset, _)| *offset);
        let target = if end { on_line.max() } else { on_line.min() };
        if let Some(offset) = target {
            self.editor.set_cursor(offset, extend);
        }
    }

    fn handle_event(&mut self, event: Event) -> Result<()> {
        if let Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            ..
        }) = event
        {
            if self.handle_link_prompt_key(code, modifiers) {
                return Ok(());
            }

            if self.handle_context_menu_key(code, modifiers) {
                return Ok(());
            }

            if self.context_menu.is_some() {
                return Ok(());
            }

            if is_context_menu_shortcut(code, modifiers) {
                self.open_context_menu();
                return Ok(());
            }

            let extend = modifiers.contains(KeyModifiers::SHIFT);
            match (code, modifiers) {
                (KeyCode::Char('q'), m) if m.contains(KeyModifiers::CONTROL) => {
                    self.should_quit = true;
                }
                (KeyCode::Char('c'), m) if m.contains(KeyModifiers::CONTROL) => {
                    self.should_quit = true;
                }
                (KeyCode::Char('s'), m) if m.contains(KeyModifiers::CONTROL) => {
                    self.save()?;
                }
                (KeyCode::Char('a'), m) if m.contains(KeyModifiers::CONTROL) => {
                    self.editor.select_all();
                }
                (KeyCode::Left, _) => {
                    if self.editor.move_left(extend) {
                        self.preferred_column = None;
                    }
                }
                (KeyCode::Right, _) => {
                    if self.editor.move_right(extend) {
                        self.preferred_column = None;
                    }
                }
                (KeyCode::Up, _) => self.move_cursor_vertical(-1, extend),
                (KeyCode::Down, _) => self.move_cursor_vertical(1, extend),
                (KeyCode::Home, _) => self.move_to_visual_line_edge(false, extend),
                (KeyCode::End, _) => self.move_to_visual_line_edge(true, extend),
                (KeyCode::PageUp, _) => {
                    self.scroll_top = self.scroll_top.saturating_sub(self.last_view_height.max(1));
                }
                (KeyCode::PageDown, _) => {
                    self.scroll_top += self.last_view_height.max(1);
                }
                (KeyCode::Backspace, _) => {
                    if self.editor.backspace() {
                        self.mark_dirty();
                    }
                }
                (KeyCode::Delete, _) => {
                    if self.editor.delete() {
                        self.mark_dirty();
                    }
                }
                (KeyCode::Enter, _) => {
                    if self.editor.insert_char('\n') {
                        self.mark_dirty();
                    }
                }
                (KeyCode::Tab, _) => {
                    if self.editor.insert_tab() {
                        self.mark_dirty();
                    }
                }
                (KeyCode::Char(ch), m)
                    if !m.contains(KeyModifiers::CONTROL) && !m.contains(KeyModifiers::ALT) =>
                {
                    if self.editor.insert_char(ch) {
                        self.mark_dirty();
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn on_tick(&mut self) {
        self.prune_status_message();
    }

    fn save(&mut self) -> Result<()> {
        fs::write(&self.file_path, self.editor.save())
            .with_context(|| format!("failed to write {}", self.file_path.display()))?;

        self.dirty = false;
        self.status_message = Some(("Saved".to_string(), Instant::now()));
        Ok(())
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
        self.preferred_column = None;
    }

    fn cursor_status_text(&self) -> String {
        let position = self
            .last_render
            .as_ref()
            .and_then(|render| render.position_of(self.editor.cursor()));
        let mut text = match position {
            Some(position) => format!("[{},{}]", position.line + 1, position.column + 1),
            None => "[?,?]".to_string(),
        };
        if let Some((start, end)) = self.editor.selection() {
            text.push_str(&format!(" sel {}", end - start));
        }
        text
    }
}
