// End-to-end toggle scenarios driven through the public editor API.

use pure_markup::menu::MenuAction;
use pure_markup::render::{RenderState, render_region};
use pure_markup::theme::Theme;
use pure_markup::{Editor, EditorOptions, NoPrompt, StyleRequest, ToggleError};

fn editor(html: &str) -> Editor {
    Editor::from_html(html, EditorOptions::default()).unwrap()
}

fn select_word(editor: &mut Editor, word: &str) {
    let text = editor.text();
    let byte = text.find(word).unwrap();
    let start = text[..byte].chars().count();
    editor.select(start, start + word.chars().count());
}

fn toggle(editor: &mut Editor, request: StyleRequest) {
    editor.toggle_style(&request, &mut NoPrompt).unwrap();
}

#[test]
fn bold_on_off_then_italic_inside_bold() {
    let mut editor = editor("hello");
    editor.select_all();

    toggle(&mut editor, StyleRequest::tag("B"));
    insta::assert_snapshot!(editor.html(), @"<b>hello</b>");

    toggle(&mut editor, StyleRequest::tag("B"));
    insta::assert_snapshot!(editor.html(), @"hello");

    toggle(&mut editor, StyleRequest::tag("B"));
    toggle(&mut editor, StyleRequest::css("font-style", "italic"));
    insta::assert_snapshot!(editor.html(), @r#"<b><span style="font-style:italic;">hello</span></b>"#);
}

#[test]
fn toggle_pairs_restore_identical_markup() {
    let original = "one <i>two</i> three";
    let requests = [
        StyleRequest::tag("b"),
        StyleRequest::tag("h2"),
        StyleRequest::css("text-decoration-line", "underline"),
        StyleRequest::css("font-weight", "bold"),
    ];
    for request in requests {
        let mut editor = editor(original);
        select_word(&mut editor, "three");
        toggle(&mut editor, request.clone());
        toggle(&mut editor, request);
        assert_eq!(editor.html(), original);
    }
}

#[test]
fn unrelated_layers_survive_a_new_layer() {
    let mut editor = editor("<i><u>hello</u></i>");
    editor.select_all();
    toggle(&mut editor, StyleRequest::tag("b"));
    insta::assert_snapshot!(editor.html(), @"<i><u><b>hello</b></u></i>");
}

#[test]
fn heading_three_replaces_heading_two() {
    let mut editor = editor("<h2>hello</h2>");
    editor.select_all();
    toggle(&mut editor, StyleRequest::tag("h3"));
    insta::assert_snapshot!(editor.html(), @"<h3>hello</h3>");
}

#[test]
fn css_layers_are_independent() {
    let mut editor = editor("hello");
    editor.select_all();
    toggle(&mut editor, StyleRequest::css("font-weight", "bold"));
    toggle(&mut editor, StyleRequest::css("font-style", "italic"));
    insta::assert_snapshot!(
        editor.html(),
        @r#"<span style="font-weight:bold;"><span style="font-style:italic;">hello</span></span>"#
    );

    toggle(&mut editor, StyleRequest::css("font-weight", "bold"));
    insta::assert_snapshot!(editor.html(), @r#"<span style="font-style:italic;">hello</span>"#);
}

#[test]
fn outer_layer_comes_off_after_partial_toggle_pair() {
    let mut editor = editor(r#"<span style="font-style:italic;">hello</span>"#);
    editor.select(0, 3);
    toggle(&mut editor, StyleRequest::tag("b"));
    insta::assert_snapshot!(
        editor.html(),
        @r#"<span style="font-style:italic;"><b>hel</b>lo</span>"#
    );
    toggle(&mut editor, StyleRequest::tag("b"));
    insta::assert_snapshot!(editor.html(), @r#"<span style="font-style:italic;">hello</span>"#);

    editor.select_all();
    toggle(&mut editor, StyleRequest::css("font-style", "italic"));
    insta::assert_snapshot!(editor.html(), @"hello");
}

#[test]
fn second_link_toggle_removes_the_link() {
    let mut editor = editor("see hello");
    select_word(&mut editor, "hello");
    editor
        .apply_action(MenuAction::Link, &mut || Some("http://a".to_string()))
        .unwrap();
    insta::assert_snapshot!(editor.html(), @r#"see <a href="http://a">hello</a>"#);

    editor
        .apply_action(MenuAction::Link, &mut || Some("http://b".to_string()))
        .unwrap();
    insta::assert_snapshot!(editor.html(), @"see hello");
}

#[test]
fn stored_content_round_trips() {
    let mut source = editor("hello world");
    select_word(&mut source, "hello");
    toggle(&mut source, StyleRequest::tag("b"));
    select_word(&mut source, "world");
    toggle(&mut source, StyleRequest::css("font-style", "italic"));

    let stored = source.save();
    insta::assert_snapshot!(
        stored,
        @"PGI+aGVsbG88L2I+IDxzcGFuIHN0eWxlPSJmb250LXN0eWxlOml0YWxpYzsiPndvcmxkPC9zcGFuPg=="
    );

    let mut restored = Editor::default();
    restored.load(&stored).unwrap();
    assert_eq!(restored.html(), source.html());
}

#[test]
fn mixed_selection_is_refused() {
    let mut editor = editor("say <b>hello</b> there");
    editor.select(2, 6);
    let err = editor
        .toggle_style(&StyleRequest::tag("i"), &mut NoPrompt)
        .unwrap_err();
    assert!(matches!(err, ToggleError::MalformedSubtree(_)));
    insta::assert_snapshot!(editor.html(), @"say <b>hello</b> there");
}

#[test]
fn rendered_lines_follow_the_text() {
    let mut editor = editor("<b>first</b>");
    editor.move_to_end(false);
    editor.insert_text("\nsecond");
    let render = render_region(
        editor.markup(),
        editor.region(),
        80,
        RenderState {
            cursor: editor.cursor(),
            selection: None,
        },
        &Theme::default(),
    );
    let text: Vec<String> = render
        .lines
        .iter()
        .map(|line| line.spans.iter().map(|span| span.content.as_ref()).collect())
        .collect();
    insta::assert_snapshot!(text.join("\n"), @r"
    first
    second
    ");
    insta::assert_snapshot!(editor.html(), @"<b>first\nsecond</b>");
}
