//! Formatting commands applied to the editor's content and selection.

use quillcore::{parse_fragment, BlockKind, BlockPath, Marks, Span};

use crate::editor::Editor;
use crate::error::EditError;
use crate::selection::Selection;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatCommand {
    Bold,
    Italic,
    Underline,
    /// Block tag such as `h1` or `<blockquote>`
    FormatBlock(String),
    InsertUnorderedList,
    InsertOrderedList,
    InsertLink { url: String, text: String },
    /// HTML fragment, sanitized before it touches the document
    InsertHtml(String),
    FontName(String),
    RemoveFormat,
    SelectAll,
    Undo,
    Redo,
}

/// What a successful command did, so the caller knows which debounce
/// channels to arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandEffect {
    ContentChanged,
    /// Selection or pending marks changed, content did not.
    SelectionChanged,
    Unchanged,
}

impl CommandEffect {
    pub fn changes_content(self) -> bool {
        self == Self::ContentChanged
    }
}

pub fn apply(editor: &mut Editor, command: FormatCommand) -> Result<CommandEffect, EditError> {
    let result = execute(editor, &command);
    if let Err(e) = &result {
        log::debug!("Rejected {:?}: {}", command, e);
    }
    result
}

fn execute(editor: &mut Editor, command: &FormatCommand) -> Result<CommandEffect, EditError> {
    match command {
        FormatCommand::Bold => Ok(toggle_mark(editor, |m| m.bold, |m, on| m.bold = on)),
        FormatCommand::Italic => Ok(toggle_mark(editor, |m| m.italic, |m, on| m.italic = on)),
        FormatCommand::Underline => Ok(toggle_mark(editor, |m| m.underline, |m, on| {
            m.underline = on
        })),
        FormatCommand::FormatBlock(tag) => {
            let kind = BlockKind::from_tag(tag)
                .ok_or_else(|| EditError::InvalidCommand(format!("unknown block tag '{}'", tag)))?;
            Ok(set_touched_kind(editor, |_| kind))
        }
        FormatCommand::InsertUnorderedList => Ok(toggle_list(editor, BlockKind::BulletItem)),
        FormatCommand::InsertOrderedList => Ok(toggle_list(editor, BlockKind::OrderedItem)),
        FormatCommand::InsertLink { url, text } => insert_link(editor, url, text),
        FormatCommand::InsertHtml(html) => {
            let spans = parse_fragment(html);
            if spans.iter().all(|span| span.text.is_empty()) {
                return Err(EditError::InvalidCommand(
                    "fragment has no content after sanitizing".to_string(),
                ));
            }
            Ok(replace_selection_with(editor, spans))
        }
        FormatCommand::FontName(family) => {
            let family = quillcore::sanitize::clean_font_family(family);
            if family.is_empty() {
                return Err(EditError::InvalidCommand("empty font family".to_string()));
            }
            Ok(update_marks(editor, move |m| m.font = Some(family.clone())))
        }
        FormatCommand::RemoveFormat => Ok(update_marks(editor, |m| *m = m.cleared())),
        FormatCommand::SelectAll => {
            let before = editor.selection();
            editor.select_all();
            Ok(if editor.selection() == before {
                CommandEffect::Unchanged
            } else {
                CommandEffect::SelectionChanged
            })
        }
        FormatCommand::Undo => Ok(history_effect(editor.undo())),
        FormatCommand::Redo => Ok(history_effect(editor.redo())),
    }
}

fn history_effect(moved: bool) -> CommandEffect {
    if moved {
        CommandEffect::ContentChanged
    } else {
        CommandEffect::Unchanged
    }
}

/// Marks the next typed character would get at a collapsed caret.
fn pending_marks(editor: &Editor) -> Marks {
    editor
        .sticky_marks()
        .cloned()
        .unwrap_or_else(|| editor.marks_at(editor.selection().start()))
}

fn toggle_mark(
    editor: &mut Editor,
    get: fn(&Marks) -> bool,
    set: fn(&mut Marks, bool),
) -> CommandEffect {
    let selection = editor.selection();
    if selection.is_collapsed() {
        let mut marks = pending_marks(editor);
        let on = !get(&marks);
        set(&mut marks, on);
        editor.set_sticky_marks(marks);
        return CommandEffect::SelectionChanged;
    }

    let (start, end) = (selection.start(), selection.end());
    let on = !editor.content().all_marked(start, end, get);
    editor
        .content_mut()
        .update_marks(start, end, |marks| set(marks, on));
    commit(editor, selection)
}

fn update_marks(editor: &mut Editor, update: impl Fn(&mut Marks)) -> CommandEffect {
    let selection = editor.selection();
    if selection.is_collapsed() {
        let mut marks = pending_marks(editor);
        update(&mut marks);
        editor.set_sticky_marks(marks);
        return CommandEffect::SelectionChanged;
    }
    editor
        .content_mut()
        .update_marks(selection.start(), selection.end(), update);
    commit(editor, selection)
}

fn commit(editor: &mut Editor, selection: Selection) -> CommandEffect {
    if editor.commit(selection) {
        CommandEffect::ContentChanged
    } else {
        CommandEffect::Unchanged
    }
}

fn touched_paths(editor: &Editor) -> Vec<BlockPath> {
    let selection = editor.selection();
    let projection = editor.content().projection();
    projection
        .touched(selection.start(), selection.end())
        .into_iter()
        .map(|idx| projection.segments()[idx].path.clone())
        .collect()
}

/// Re-kind every block the selection touches. Text and document order are
/// unchanged, so the selection stays where it is.
fn set_touched_kind(editor: &mut Editor, kind_for: impl Fn(BlockKind) -> BlockKind) -> CommandEffect {
    let selection = editor.selection();
    let paths = touched_paths(editor);
    // Later paths first: lifting a toggle body shifts the siblings after it.
    for path in paths.iter().rev() {
        let Some(current) = editor.content().block(path).map(|block| block.kind) else {
            continue;
        };
        editor.content_mut().set_block_kind(path, kind_for(current));
    }
    commit(editor, selection)
}

fn toggle_list(editor: &mut Editor, list: BlockKind) -> CommandEffect {
    let all_listed = touched_paths(editor)
        .iter()
        .all(|path| editor.content().block(path).map(|block| block.kind) == Some(list));
    let target = if all_listed { BlockKind::Paragraph } else { list };
    set_touched_kind(editor, |_| target)
}

fn insert_link(editor: &mut Editor, url: &str, text: &str) -> Result<CommandEffect, EditError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(EditError::InvalidCommand("empty link url".to_string()));
    }
    let text = if text.trim().is_empty() { url } else { text };
    let marks = Marks {
        link: Some(url.to_string()),
        ..pending_marks(editor)
    };
    Ok(replace_selection_with(editor, vec![Span::marked(text, marks)]))
}

fn replace_selection_with(editor: &mut Editor, spans: Vec<Span>) -> CommandEffect {
    let selection = editor.selection();
    let cursor = editor
        .content_mut()
        .replace_range(selection.start(), selection.end(), spans);
    commit(editor, Selection::caret(cursor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quillcore::{Block, ContentTree};

    fn editor_with(blocks: Vec<Block>) -> Editor {
        let mut editor = Editor::default();
        editor.set_content(ContentTree::from_blocks(blocks));
        editor
    }

    fn paragraph(text: &str) -> Block {
        Block::with_text(BlockKind::Paragraph, text)
    }

    fn kinds(editor: &Editor) -> Vec<BlockKind> {
        editor.content().blocks().iter().map(|block| block.kind).collect()
    }

    #[test]
    fn test_bold_toggles_across_selection() {
        let mut editor = editor_with(vec![paragraph("Hello world")]);
        editor.set_selection(Selection::new(0, 5));

        assert_eq!(apply(&mut editor, FormatCommand::Bold), Ok(CommandEffect::ContentChanged));
        assert!(editor.content().all_marked(0, 5, |m| m.bold));
        assert!(!editor.content().all_marked(5, 11, |m| m.bold));

        apply(&mut editor, FormatCommand::Bold).unwrap();
        assert!(!editor.content().all_marked(0, 1, |m| m.bold));
        assert_eq!(editor.content().blocks()[0].spans.len(), 1);
    }

    #[test]
    fn test_partially_bold_selection_becomes_bold() {
        let mut editor = editor_with(vec![paragraph("abcdef")]);
        editor.set_selection(Selection::new(0, 3));
        apply(&mut editor, FormatCommand::Bold).unwrap();

        editor.set_selection(Selection::new(0, 6));
        apply(&mut editor, FormatCommand::Bold).unwrap();
        assert!(editor.content().all_marked(0, 6, |m| m.bold));
    }

    #[test]
    fn test_collapsed_italic_is_sticky() {
        let mut editor = editor_with(vec![paragraph("ab")]);
        editor.set_selection(Selection::caret(2));

        assert_eq!(
            apply(&mut editor, FormatCommand::Italic),
            Ok(CommandEffect::SelectionChanged)
        );
        assert!(!editor.is_modified());

        editor.insert_text("cd");
        let spans = &editor.content().blocks()[0].spans;
        assert_eq!(spans[1].text, "cd");
        assert!(spans[1].marks.italic);
    }

    #[test]
    fn test_format_block_applies_to_touched_blocks() {
        let mut editor = editor_with(vec![paragraph("one"), paragraph("two"), paragraph("three")]);
        editor.set_selection(Selection::new(1, 5));

        apply(&mut editor, FormatCommand::FormatBlock("<H2>".to_string())).unwrap();
        assert_eq!(
            kinds(&editor),
            vec![BlockKind::Heading2, BlockKind::Heading2, BlockKind::Paragraph]
        );
        assert_eq!(editor.selection(), Selection::new(1, 5));
    }

    #[test]
    fn test_format_block_collapsed_uses_caret_block() {
        let mut editor = editor_with(vec![paragraph("one"), paragraph("two")]);
        editor.set_selection(Selection::caret(5));
        apply(&mut editor, FormatCommand::FormatBlock("pre".to_string())).unwrap();
        assert_eq!(kinds(&editor), vec![BlockKind::Paragraph, BlockKind::CodeBlock]);
    }

    #[test]
    fn test_unknown_block_tag_is_rejected_without_change() {
        let mut editor = editor_with(vec![paragraph("one")]);
        let result = apply(&mut editor, FormatCommand::FormatBlock("table".to_string()));
        assert!(matches!(result, Err(EditError::InvalidCommand(_))));
        assert!(!editor.is_modified());
        assert!(!editor.can_undo());
    }

    #[test]
    fn test_list_commands_toggle() {
        let mut editor = editor_with(vec![paragraph("a"), paragraph("b")]);
        editor.set_selection(Selection::new(0, 3));

        apply(&mut editor, FormatCommand::InsertUnorderedList).unwrap();
        assert_eq!(kinds(&editor), vec![BlockKind::BulletItem, BlockKind::BulletItem]);

        apply(&mut editor, FormatCommand::InsertOrderedList).unwrap();
        assert_eq!(kinds(&editor), vec![BlockKind::OrderedItem, BlockKind::OrderedItem]);

        apply(&mut editor, FormatCommand::InsertOrderedList).unwrap();
        assert_eq!(kinds(&editor), vec![BlockKind::Paragraph, BlockKind::Paragraph]);
    }

    #[test]
    fn test_insert_link() {
        let mut editor = editor_with(vec![paragraph("see ")]);
        editor.set_selection(Selection::caret(4));
        apply(
            &mut editor,
            FormatCommand::InsertLink {
                url: "https://example.com".to_string(),
                text: String::new(),
            },
        )
        .unwrap();

        let block = &editor.content().blocks()[0];
        assert_eq!(block.text(), "see https://example.com");
        assert_eq!(block.spans[1].marks.link.as_deref(), Some("https://example.com"));
        assert_eq!(editor.selection(), Selection::caret(23));
    }

    #[test]
    fn test_insert_link_requires_url() {
        let mut editor = editor_with(vec![paragraph("x")]);
        let result = apply(
            &mut editor,
            FormatCommand::InsertLink {
                url: "  ".to_string(),
                text: "label".to_string(),
            },
        );
        assert!(matches!(result, Err(EditError::InvalidCommand(_))));
        assert_eq!(editor.content().plain_text(), "x");
    }

    #[test]
    fn test_insert_html_is_sanitized() {
        let mut editor = editor_with(vec![paragraph("")]);
        apply(
            &mut editor,
            FormatCommand::InsertHtml("<b>safe</b><script>alert(1)</script>".to_string()),
        )
        .unwrap();
        assert_eq!(editor.content().plain_text(), "safe");
        assert!(editor.content().blocks()[0].spans[0].marks.bold);

        let result = apply(
            &mut editor,
            FormatCommand::InsertHtml("<script>alert(1)</script>".to_string()),
        );
        assert!(matches!(result, Err(EditError::InvalidCommand(_))));
    }

    #[test]
    fn test_font_name_and_remove_format() {
        let mut editor = editor_with(vec![paragraph("styled text")]);
        editor.set_selection(Selection::new(0, 6));
        apply(&mut editor, FormatCommand::FontName("Georgia, serif".to_string())).unwrap();
        apply(&mut editor, FormatCommand::Underline).unwrap();
        assert_eq!(
            editor.content().blocks()[0].spans[0].marks.font.as_deref(),
            Some("Georgia, serif")
        );

        editor.select_all();
        apply(&mut editor, FormatCommand::RemoveFormat).unwrap();
        assert_eq!(editor.content().blocks()[0].spans.len(), 1);
        assert!(editor.content().blocks()[0].spans[0].marks.is_plain());
    }

    #[test]
    fn test_remove_format_keeps_links() {
        let mut editor = editor_with(vec![paragraph("")]);
        apply(
            &mut editor,
            FormatCommand::InsertHtml(r#"<a href="https://a.example"><b>link</b></a>"#.to_string()),
        )
        .unwrap();
        editor.select_all();
        apply(&mut editor, FormatCommand::RemoveFormat).unwrap();

        let marks = &editor.content().blocks()[0].spans[0].marks;
        assert!(!marks.bold);
        assert_eq!(marks.link.as_deref(), Some("https://a.example"));
    }

    #[test]
    fn test_select_all_adds_no_history() {
        let mut editor = editor_with(vec![paragraph("abc")]);
        assert_eq!(
            apply(&mut editor, FormatCommand::SelectAll),
            Ok(CommandEffect::SelectionChanged)
        );
        assert_eq!(editor.selection(), Selection::new(0, 3));
        assert!(!editor.can_undo());
    }

    #[test]
    fn test_undo_redo_commands() {
        let mut editor = editor_with(vec![paragraph("abc")]);
        assert_eq!(apply(&mut editor, FormatCommand::Undo), Ok(CommandEffect::Unchanged));

        editor.select_all();
        apply(&mut editor, FormatCommand::Bold).unwrap();
        assert_eq!(apply(&mut editor, FormatCommand::Undo), Ok(CommandEffect::ContentChanged));
        assert!(!editor.content().all_marked(0, 3, |m| m.bold));

        assert_eq!(apply(&mut editor, FormatCommand::Redo), Ok(CommandEffect::ContentChanged));
        assert!(editor.content().all_marked(0, 3, |m| m.bold));
    }
}
