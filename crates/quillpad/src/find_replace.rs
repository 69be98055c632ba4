//! Case-insensitive literal search over the text projection.
//!
//! Matching folds each character to lowercase on its own, so folded and
//! original text stay aligned char for char. A match never crosses a block
//! boundary.

use quillcore::{Projection, Span};

use crate::editor::Editor;
use crate::error::EditError;
use crate::selection::Selection;

pub type Match = (usize, usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaceOutcome {
    pub replaced: bool,
    pub next: Option<Match>,
}

fn fold(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

fn fold_str(text: &str) -> Vec<char> {
    text.chars().map(fold).collect()
}

/// Every non-overlapping match, left to right.
pub fn find_matches(projection: &Projection, query: &str) -> Vec<Match> {
    let needle = fold_str(query);
    if needle.is_empty() {
        return Vec::new();
    }
    let haystack = fold_str(projection.text());

    let mut matches = Vec::new();
    for segment in projection.segments() {
        let mut at = segment.start;
        while at + needle.len() <= segment.end() {
            if haystack[at..at + needle.len()] == needle[..] {
                matches.push((at, at + needle.len()));
                at += needle.len();
            } else {
                at += 1;
            }
        }
    }
    matches
}

/// Select the first match at or after the selection's end, wrapping to the
/// top of the document when there is none. Leaves the selection alone when
/// nothing matches.
pub fn find_next(editor: &mut Editor, query: &str) -> Result<Option<Match>, EditError> {
    if query.is_empty() {
        return Err(EditError::EmptyQuery);
    }
    let from = editor.selection().end();
    let matches = find_matches(&editor.content().projection(), query);
    let found = matches
        .iter()
        .find(|(start, _)| *start >= from)
        .or_else(|| matches.first())
        .copied();

    match found {
        Some((start, end)) => editor.set_selection(Selection::new(start, end)),
        None => log::debug!("No match for '{}'", query),
    }
    Ok(found)
}

/// Replace the selection if it is a match for `query`, then move on to the
/// next match. A selection that no longer matches is never replaced.
pub fn replace_selection(
    editor: &mut Editor,
    query: &str,
    replacement: &str,
) -> Result<ReplaceOutcome, EditError> {
    if query.is_empty() {
        return Err(EditError::EmptyQuery);
    }
    let selection = editor.selection();
    let replaced = !selection.is_collapsed() && fold_str(&editor.selected_text()) == fold_str(query);
    if replaced {
        let spans = replacement_spans(editor, selection.start(), replacement);
        let cursor = editor
            .content_mut()
            .replace_range(selection.start(), selection.end(), spans);
        editor.commit(Selection::caret(cursor));
    }
    let next = find_next(editor, query)?;
    Ok(ReplaceOutcome { replaced, next })
}

/// Replace every match and return how many were replaced. Replacement text
/// is never searched again.
pub fn replace_all(editor: &mut Editor, query: &str, replacement: &str) -> Result<usize, EditError> {
    if query.is_empty() {
        return Err(EditError::EmptyQuery);
    }
    let matches = find_matches(&editor.content().projection(), query);
    if matches.is_empty() {
        return Ok(0);
    }

    // Back to front so earlier offsets stay valid.
    for &(start, end) in matches.iter().rev() {
        let spans = replacement_spans(editor, start, replacement);
        editor.content_mut().replace_range(start, end, spans);
    }
    let caret = editor.selection().start();
    editor.commit(Selection::caret(caret));
    log::debug!("Replaced {} occurrence(s) of '{}'", matches.len(), query);
    Ok(matches.len())
}

/// The replacement inherits the marks of the first character it replaces.
fn replacement_spans(editor: &Editor, start: usize, replacement: &str) -> Vec<Span> {
    if replacement.is_empty() {
        return Vec::new();
    }
    vec![Span::marked(replacement, editor.marks_at(start + 1))]
}

#[cfg(test)]
mod tests {
    use super::*;
    use quillcore::{Block, BlockKind, ContentTree, Marks};

    fn editor_with(texts: &[&str]) -> Editor {
        let mut editor = Editor::default();
        editor.set_content(ContentTree::from_blocks(
            texts
                .iter()
                .map(|text| Block::with_text(BlockKind::Paragraph, text))
                .collect(),
        ));
        editor
    }

    #[test]
    fn test_find_next_wraps_around() {
        let mut editor = editor_with(&["abc abc"]);

        assert_eq!(find_next(&mut editor, "abc"), Ok(Some((0, 3))));
        assert_eq!(find_next(&mut editor, "abc"), Ok(Some((4, 7))));
        assert_eq!(find_next(&mut editor, "abc"), Ok(Some((0, 3))));
        assert_eq!(editor.selection(), Selection::new(0, 3));
    }

    #[test]
    fn test_find_is_case_insensitive() {
        let mut editor = editor_with(&["Hello WORLD"]);
        assert_eq!(find_next(&mut editor, "world"), Ok(Some((6, 11))));
        assert_eq!(editor.selected_text(), "WORLD");
    }

    #[test]
    fn test_find_without_match_keeps_selection() {
        let mut editor = editor_with(&["abc"]);
        editor.set_selection(Selection::new(1, 2));
        assert_eq!(find_next(&mut editor, "zzz"), Ok(None));
        assert_eq!(editor.selection(), Selection::new(1, 2));
    }

    #[test]
    fn test_matches_stay_inside_blocks() {
        let editor = editor_with(&["abc", "def"]);
        let projection = editor.content().projection();
        assert!(find_matches(&projection, "c\nd").is_empty());
        assert_eq!(find_matches(&projection, "def"), vec![(4, 7)]);
    }

    #[test]
    fn test_empty_query_is_rejected() {
        let mut editor = editor_with(&["abc"]);
        assert_eq!(find_next(&mut editor, ""), Err(EditError::EmptyQuery));
        assert_eq!(replace_all(&mut editor, "", "x"), Err(EditError::EmptyQuery));
        assert!(replace_selection(&mut editor, "", "x").is_err());
        assert_eq!(editor.content().plain_text(), "abc");
    }

    #[test]
    fn test_replace_all_is_literal() {
        let mut editor = editor_with(&["a.b a.b axb"]);
        assert_eq!(replace_all(&mut editor, "a.b", "X"), Ok(2));
        assert_eq!(editor.content().plain_text(), "X X axb");
    }

    #[test]
    fn test_replace_all_does_not_rescan() {
        let mut editor = editor_with(&["aa", "AA"]);
        assert_eq!(replace_all(&mut editor, "a", "aa"), Ok(4));
        assert_eq!(editor.content().plain_text(), "aaaa\naaaa");
        assert!(editor.undo());
        assert_eq!(editor.content().plain_text(), "aa\nAA");
    }

    #[test]
    fn test_replace_selection_then_advances() {
        let mut editor = editor_with(&["cat Cat cat"]);
        find_next(&mut editor, "cat").unwrap();

        let outcome = replace_selection(&mut editor, "cat", "dog").unwrap();
        assert!(outcome.replaced);
        assert_eq!(outcome.next, Some((4, 7)));
        assert_eq!(editor.content().plain_text(), "dog Cat cat");
    }

    #[test]
    fn test_stale_selection_is_not_replaced() {
        let mut editor = editor_with(&["one cat"]);
        editor.set_selection(Selection::new(0, 3));

        let outcome = replace_selection(&mut editor, "cat", "dog").unwrap();
        assert!(!outcome.replaced);
        assert_eq!(outcome.next, Some((4, 7)));
        assert_eq!(editor.content().plain_text(), "one cat");
    }

    #[test]
    fn test_replacement_keeps_marks() {
        let bold = Marks {
            bold: true,
            ..Marks::default()
        };
        let mut editor = Editor::default();
        editor.set_content(ContentTree::from_blocks(vec![Block::with_spans(
            BlockKind::Paragraph,
            vec![Span::plain("say "), Span::marked("hi", bold.clone())],
        )]));

        replace_all(&mut editor, "HI", "hello").unwrap();
        assert_eq!(
            editor.content().blocks()[0].spans,
            vec![Span::plain("say "), Span::marked("hello", bold)]
        );
    }
}
