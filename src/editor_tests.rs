use std::cell::Cell;

use super::*;
use crate::toggle::NoPrompt;

fn editor(html: &str) -> Editor {
    Editor::from_html(html, EditorOptions::default()).unwrap()
}

fn select_word(editor: &mut Editor, word: &str) {
    let text = editor.text();
    let byte = text.find(word).unwrap();
    let start = text[..byte].chars().count();
    editor.select(start, start + word.chars().count());
}

#[test]
fn typing_builds_plain_text() {
    let mut editor = Editor::default();
    for ch in "hi <there>".chars() {
        assert!(editor.insert_char(ch));
    }
    assert_eq!(editor.html(), "hi &lt;there&gt;");
    assert_eq!(editor.cursor(), 10);
}

#[test]
fn typed_text_joins_preceding_format() {
    let mut editor = editor("<b>bold</b> plain");
    editor.set_cursor(4, false);
    editor.insert_text("er");
    assert_eq!(editor.html(), "<b>bolder</b> plain");
    assert_eq!(editor.cursor(), 6);
}

#[test]
fn typing_replaces_the_selection() {
    let mut editor = editor("say hello there");
    select_word(&mut editor, "hello");
    editor.insert_text("bye");
    assert_eq!(editor.html(), "say bye there");
    assert!(!editor.has_selection());
}

#[test]
fn tab_goes_to_selection_start() {
    let mut editor = editor("say hello");
    select_word(&mut editor, "hello");
    assert!(editor.insert_tab());
    assert_eq!(editor.text(), "say \thello");
    assert_eq!(editor.cursor(), 5);
    assert!(!editor.has_selection());
}

#[test]
fn tab_can_be_disabled() {
    let mut editor = Editor::from_html("x", EditorOptions { use_tab: false }).unwrap();
    assert!(!editor.insert_tab());
    assert_eq!(editor.text(), "x");
}

#[test]
fn menu_actions_toggle_styles() {
    let mut editor = editor("say hello there");
    select_word(&mut editor, "hello");

    editor.apply_action(MenuAction::Bold, &mut NoPrompt).unwrap();
    assert_eq!(editor.html(), "say <b>hello</b> there");

    editor.apply_action(MenuAction::Underline, &mut NoPrompt).unwrap();
    assert_eq!(
        editor.html(),
        "say <b><span style=\"text-decoration-line:underline;\">hello</span></b> there"
    );

    editor.apply_action(MenuAction::Bold, &mut NoPrompt).unwrap();
    editor.apply_action(MenuAction::Underline, &mut NoPrompt).unwrap();
    assert_eq!(editor.html(), "say hello there");
    assert_eq!(editor.selection(), Some((4, 9)));
}

#[test]
fn strikethrough_and_underline_coexist() {
    let mut editor = editor("word");
    editor.select_all();
    editor
        .apply_action(MenuAction::Strikethrough, &mut NoPrompt)
        .unwrap();
    editor.apply_action(MenuAction::Underline, &mut NoPrompt).unwrap();
    let chain = editor.active_styles().unwrap();
    assert_eq!(chain.len(), 2);
    assert!(MenuAction::Strikethrough.is_active(&chain));
    assert!(MenuAction::Underline.is_active(&chain));
}

#[test]
fn heading_actions_replace_each_other() {
    let mut editor = editor("title");
    editor.select_all();
    editor.apply_action(MenuAction::Heading2, &mut NoPrompt).unwrap();
    editor.apply_action(MenuAction::Heading3, &mut NoPrompt).unwrap();
    assert_eq!(editor.html(), "<h3>title</h3>");
}

#[test]
fn link_prompts_only_when_adding() {
    let mut editor = editor("go here");
    select_word(&mut editor, "here");
    let asked = Cell::new(0);
    let mut prompt = || {
        asked.set(asked.get() + 1);
        Some("https://example.com".to_string())
    };

    let outcome = editor.apply_action(MenuAction::Link, &mut prompt).unwrap();
    assert!(outcome.applied);
    assert_eq!(editor.html(), "go <a href=\"https://example.com\">here</a>");

    let outcome = editor.apply_action(MenuAction::Link, &mut prompt).unwrap();
    assert!(!outcome.applied);
    assert_eq!(editor.html(), "go here");
    assert_eq!(asked.get(), 1);
}

#[test]
fn toggling_without_selection_fails() {
    let mut editor = editor("hello");
    editor.set_cursor(2, false);
    let err = editor
        .apply_action(MenuAction::Bold, &mut NoPrompt)
        .unwrap_err();
    assert_eq!(err, ToggleError::NoActiveSelection);
    assert!(editor.active_styles().is_none());
}

#[test]
fn mixed_selection_reports_and_keeps_content() {
    let mut editor = editor("say <b>hello</b> there");
    editor.select(2, 6);
    let err = editor
        .apply_action(MenuAction::Italic, &mut NoPrompt)
        .unwrap_err();
    assert!(matches!(err, ToggleError::MalformedSubtree(_)));
    assert_eq!(editor.html(), "say <b>hello</b> there");
    assert!(editor.active_styles().is_none());
}

#[test]
fn shift_movement_extends_selection() {
    let mut editor = editor("abcdef");
    editor.set_cursor(4, false);
    assert!(editor.move_left(true));
    assert!(editor.move_left(true));
    assert_eq!(editor.selection(), Some((2, 4)));

    assert!(editor.move_right(false));
    assert_eq!(editor.cursor(), 4);
    assert!(!editor.has_selection());

    editor.move_to_end(false);
    assert!(!editor.move_right(false));
    editor.move_to_start(true);
    assert_eq!(editor.selection(), Some((0, 6)));
}

#[test]
fn backspace_across_formatting() {
    let mut editor = editor("say <b>hello</b> there");
    editor.select(2, 6);
    assert!(editor.backspace());
    assert_eq!(editor.html(), "sa<b>llo</b> there");
    assert_eq!(editor.cursor(), 2);
}

#[test]
fn deleting_a_whole_run_drops_its_wrapper() {
    let mut editor = editor("a<b>b</b>c");
    editor.set_cursor(1, false);
    assert!(editor.delete());
    assert_eq!(editor.html(), "ac");
    assert!(editor.backspace());
    assert_eq!(editor.html(), "c");
    assert!(!editor.backspace());
}

#[test]
fn save_and_load_round_trip() {
    let mut source = editor("say hello there");
    select_word(&mut source, "hello");
    source.apply_action(MenuAction::Italic, &mut NoPrompt).unwrap();
    let stored = source.save();

    let mut target = Editor::default();
    target.load(&stored).unwrap();
    assert_eq!(target.html(), source.html());
    assert_eq!(target.cursor(), 0);
}

#[test]
fn failed_load_keeps_content() {
    let mut editor = editor("kept");
    assert!(editor.load("%%%").is_err());
    assert_eq!(editor.html(), "kept");
}

#[test]
fn toggle_back_then_whole_run_removes_outer_style() {
    let mut editor = editor("<span style=\"font-style:italic;\">hello</span>");
    editor.select(0, 3);
    editor.apply_action(MenuAction::Bold, &mut NoPrompt).unwrap();
    editor.apply_action(MenuAction::Bold, &mut NoPrompt).unwrap();
    assert_eq!(
        editor.html(),
        "<span style=\"font-style:italic;\">hello</span>"
    );

    editor.select_all();
    let outcome = editor
        .apply_action(MenuAction::Italic, &mut NoPrompt)
        .unwrap();
    assert!(!outcome.applied);
    assert_eq!(editor.html(), "hello");
}

#[test]
fn editing_session_keeps_node_count_bounded() {
    let mut editor = editor("hello");
    let before = editor.markup().node_count();
    for _ in 0..200 {
        editor.select(1, 4);
        editor.apply_action(MenuAction::Bold, &mut NoPrompt).unwrap();
        editor.apply_action(MenuAction::Bold, &mut NoPrompt).unwrap();
        editor.set_cursor(5, false);
        editor.insert_char('!');
        assert!(editor.backspace());
    }
    assert_eq!(editor.html(), "hello");
    assert_eq!(editor.markup().node_count(), before);
}
