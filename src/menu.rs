//! Context menu model: the fixed style actions and their keyboard shortcuts.

use crossterm::event::{KeyCode, KeyModifiers};

use crate::markup::TagName;
use crate::option::{OptionChain, StyleOption, StyleRequest};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuAction {
    Bold,
    Italic,
    Strikethrough,
    Underline,
    Heading2,
    Heading3,
    Link,
}

impl MenuAction {
    pub const ALL: [MenuAction; 7] = [
        MenuAction::Bold,
        MenuAction::Italic,
        MenuAction::Strikethrough,
        MenuAction::Underline,
        MenuAction::Heading2,
        MenuAction::Heading3,
        MenuAction::Link,
    ];

    /// The style request this action toggles.
    pub fn request(self) -> StyleRequest {
        match self {
            MenuAction::Bold => StyleRequest::tag("b"),
            MenuAction::Italic => StyleRequest::css("font-style", "italic"),
            MenuAction::Strikethrough => StyleRequest::css("text-decoration-line", "line-through"),
            MenuAction::Underline => StyleRequest::css("text-decoration-line", "underline"),
            MenuAction::Heading2 => StyleRequest::tag("h2"),
            MenuAction::Heading3 => StyleRequest::tag("h3"),
            MenuAction::Link => StyleRequest::tag("a"),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MenuAction::Bold => "Bold",
            MenuAction::Italic => "Italic",
            MenuAction::Strikethrough => "Strikethrough",
            MenuAction::Underline => "Underline",
            MenuAction::Heading2 => "Heading 2",
            MenuAction::Heading3 => "Heading 3",
            MenuAction::Link => "Link…",
        }
    }

    pub fn shortcut(self) -> MenuShortcut {
        match self {
            MenuAction::Bold => MenuShortcut::new('b'),
            MenuAction::Italic => MenuShortcut::new('i'),
            MenuAction::Strikethrough => MenuShortcut::with_shift('X'),
            MenuAction::Underline => MenuShortcut::new('u'),
            MenuAction::Heading2 => MenuShortcut::new('2'),
            MenuAction::Heading3 => MenuShortcut::new('3'),
            MenuAction::Link => MenuShortcut::new('k'),
        }
    }

    /// Whether the chain already carries this action's style.
    pub fn is_active(self, chain: &OptionChain) -> bool {
        if self == MenuAction::Link {
            return chain.contains_tag(&TagName::new("a"));
        }
        StyleOption::try_from(&self.request())
            .map(|option| chain.contains(&option))
            .unwrap_or(false)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MenuShortcut {
    key: char,
    requires_shift: bool,
}

impl MenuShortcut {
    pub const fn new(key: char) -> Self {
        Self {
            key,
            requires_shift: false,
        }
    }

    pub const fn with_shift(key: char) -> Self {
        Self {
            key,
            requires_shift: true,
        }
    }

    pub fn key(&self) -> char {
        self.key
    }

    pub fn matches(&self, code: KeyCode, modifiers: KeyModifiers) -> bool {
        match code {
            KeyCode::Char(ch) if ch == self.key => {
                if self.requires_shift {
                    modifiers == KeyModifiers::SHIFT
                } else {
                    modifiers.is_empty()
                }
            }
            _ => false,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct MenuItem {
    pub label: &'static str,
    pub action: Option<MenuAction>,
    pub shortcut: Option<MenuShortcut>,
    /// The style is already applied to the selection.
    pub checked: bool,
}

impl MenuItem {
    fn for_action(action: MenuAction, enabled: bool, checked: bool) -> Self {
        Self {
            label: action.label(),
            action: enabled.then_some(action),
            shortcut: Some(action.shortcut()),
            checked,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.action.is_some()
    }
}

#[derive(Clone, Debug)]
pub enum MenuEntry {
    Section(&'static str),
    Separator,
    Item(MenuItem),
}

#[derive(Clone, Debug)]
pub struct ContextMenuState {
    entries: Vec<MenuEntry>,
    selected_index: usize,
}

impl ContextMenuState {
    pub fn new(entries: Vec<MenuEntry>) -> Self {
        let selected_index = entries
            .iter()
            .enumerate()
            .find(|(_, entry)| matches!(entry, MenuEntry::Item(item) if item.is_enabled()))
            .map(|(idx, _)| idx)
            .unwrap_or(0);
        Self {
            entries,
            selected_index,
        }
    }

    pub fn move_selection(&mut self, delta: i32) {
        if self.entries.is_empty() {
            return;
        }

        let len = self.entries.len() as i32;
        let mut idx = self.selected_index as i32;

        for _ in 0..len {
            idx = (idx + delta).rem_euclid(len);
            if matches!(self.entries[idx as usize], MenuEntry::Item(_)) {
                self.selected_index = idx as usize;
                break;
            }
        }
    }

    pub fn current_item(&self) -> Option<&MenuItem> {
        match self.entries.get(self.selected_index) {
            Some(MenuEntry::Item(item)) => Some(item),
            _ => None,
        }
    }

    pub fn current_action(&self) -> Option<MenuAction> {
        self.current_item().and_then(|item| item.action)
    }

    pub fn entries(&self) -> &[MenuEntry] {
        &self.entries
    }

    pub fn selected_index(&self) -> usize {
        self.selected_index
    }

    /// Looks up the item bound to a key. The first value reports whether any
    /// item matched, the second its action when that item is enabled.
    pub fn shortcut_action(
        &mut self,
        code: KeyCode,
        modifiers: KeyModifiers,
    ) -> (bool, Option<MenuAction>) {
        for (idx, entry) in self.entries.iter().enumerate() {
            if let MenuEntry::Item(item) = entry
                && let Some(shortcut) = item.shortcut
                && shortcut.matches(code, modifiers)
            {
                self.selected_index = idx;
                return (true, item.action);
            }
        }
        (false, None)
    }
}

/// Menu entries for the current selection. Without a selection every style
/// item is shown disabled; `active` marks styles the selection already has.
pub fn build_context_menu_entries(
    has_selection: bool,
    active: Option<&OptionChain>,
) -> Vec<MenuEntry> {
    let item = |action: MenuAction| {
        let checked = active.is_some_and(|chain| action.is_active(chain));
        MenuEntry::Item(MenuItem::for_action(action, has_selection, checked))
    };
    vec![
        MenuEntry::Section("Inline style"),
        item(MenuAction::Bold),
        item(MenuAction::Italic),
        item(MenuAction::Strikethrough),
        item(MenuAction::Underline),
        MenuEntry::Separator,
        MenuEntry::Section("Heading"),
        item(MenuAction::Heading2),
        item(MenuAction::Heading3),
        MenuEntry::Separator,
        MenuEntry::Section("Hyperlink"),
        item(MenuAction::Link),
    ]
}

pub fn is_context_menu_shortcut(code: KeyCode, modifiers: KeyModifiers) -> bool {
    match code {
        KeyCode::Esc => modifiers.is_empty(),
        KeyCode::Char(' ') => modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}
