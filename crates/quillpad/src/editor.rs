use quillcore::{ContentTree, Marks, Span};

use crate::selection::Selection;

/// What the last history entry was produced by. Consecutive typing (or
/// consecutive backspacing) extends one entry instead of adding new ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EditKind {
    Typing,
    Deleting,
}

#[derive(Clone)]
pub struct Editor {
    content: ContentTree,
    selection: Selection,
    /// Marks for the next typed text, set by formatting a collapsed selection
    sticky: Option<Marks>,
    /// History entry matching what was last saved
    saved_index: Option<usize>,
    // Undo/Redo support
    history: Vec<EditorState>,
    history_index: usize,
    history_limit: usize,
    last_edit: Option<EditKind>,
}

#[derive(Clone)]
struct EditorState {
    content: ContentTree,
    selection: Selection,
}

impl Editor {
    pub fn new(history_limit: usize) -> Self {
        let content = ContentTree::new();
        Self {
            history: vec![EditorState {
                content: content.clone(),
                selection: Selection::default(),
            }],
            content,
            selection: Selection::default(),
            sticky: None,
            saved_index: Some(0),
            history_index: 0,
            history_limit: history_limit.max(1),
            last_edit: None,
        }
    }

    /// Replace the whole document, e.g. after loading. Resets history.
    pub fn set_content(&mut self, content: ContentTree) {
        self.content = content;
        self.selection = Selection::default();
        self.sticky = None;
        self.saved_index = Some(0);
        self.last_edit = None;
        self.history = vec![EditorState {
            content: self.content.clone(),
            selection: self.selection,
        }];
        self.history_index = 0;
    }

    pub fn content(&self) -> &ContentTree {
        &self.content
    }

    pub(crate) fn content_mut(&mut self) -> &mut ContentTree {
        &mut self.content
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// False again once undo/redo lands back on the saved state.
    pub fn is_modified(&self) -> bool {
        self.saved_index != Some(self.history_index)
    }

    /// Typing after a save starts a new history entry, so the saved one is
    /// never overwritten.
    pub fn mark_saved(&mut self) {
        self.saved_index = Some(self.history_index);
        self.last_edit = None;
    }

    pub fn sticky_marks(&self) -> Option<&Marks> {
        self.sticky.as_ref()
    }

    pub(crate) fn set_sticky_marks(&mut self, marks: Marks) {
        self.sticky = Some(marks);
    }

    /// Move the selection. Pending sticky marks belong to the old caret and
    /// are dropped when it moves.
    pub fn set_selection(&mut self, selection: Selection) {
        let selection = selection.clamped(self.content.projection().len());
        if selection != self.selection {
            self.sticky = None;
            self.last_edit = None;
        }
        self.selection = selection;
    }

    pub fn select_all(&mut self) {
        let len = self.content.projection().len();
        self.set_selection(Selection::new(0, len));
    }

    pub fn selected_text(&self) -> String {
        self.content
            .projection()
            .slice(self.selection.start(), self.selection.end())
    }

    /// Marks that text typed at `offset` picks up from its surroundings.
    pub fn marks_at(&self, offset: usize) -> Marks {
        let projection = self.content.projection();
        projection
            .locate(offset)
            .and_then(|(idx, local)| {
                let path = &projection.segments()[idx].path;
                self.content.block(path).map(|block| block.marks_at(local))
            })
            .unwrap_or_default()
    }

    /// Type `text` over the selection.
    pub fn insert_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let (start, end) = (self.selection.start(), self.selection.end());
        let marks = match self.sticky.take() {
            Some(marks) => marks,
            None if start < end => self.marks_at(start + 1),
            None => self.marks_at(start),
        };
        let cursor = self
            .content
            .replace_range(start, end, vec![Span::marked(text, marks)]);
        self.selection = Selection::caret(cursor);
        self.record(EditKind::Typing);
    }

    /// Backspace: remove the selection, or the character before the caret.
    /// At a block start this joins the block onto the previous one.
    pub fn delete_backward(&mut self) -> bool {
        let (start, end) = (self.selection.start(), self.selection.end());
        let start = if start == end {
            if start == 0 {
                return false;
            }
            start - 1
        } else {
            start
        };
        let cursor = self.content.replace_range(start, end, Vec::new());
        self.selection = Selection::caret(cursor);
        self.sticky = None;
        self.record(EditKind::Deleting);
        true
    }

    /// Finish a structural mutation made through [`Editor::content_mut`]:
    /// place the selection and push one history entry. Returns false when
    /// the content ended up unchanged.
    pub(crate) fn commit(&mut self, selection: Selection) -> bool {
        self.selection = selection.clamped(self.content.projection().len());
        self.sticky = None;
        self.last_edit = None;
        let changed = self
            .history
            .get(self.history_index)
            .map_or(true, |state| state.content != self.content);
        if changed {
            self.save_state();
        }
        changed
    }

    fn record(&mut self, kind: EditKind) {
        let unchanged = self
            .history
            .get(self.history_index)
            .is_some_and(|state| state.content == self.content);
        if unchanged {
            self.last_edit = None;
            return;
        }
        let extends = self.last_edit == Some(kind)
            && self.history_index > 0
            && self.history_index + 1 == self.history.len()
            && self.saved_index != Some(self.history_index);
        if extends {
            self.history[self.history_index] = EditorState {
                content: self.content.clone(),
                selection: self.selection,
            };
        } else {
            self.save_state();
        }
        self.last_edit = Some(kind);
    }

    pub fn save_state(&mut self) {
        let current_state = EditorState {
            content: self.content.clone(),
            selection: self.selection,
        };

        // Don't save if the content hasn't changed from current history state
        if let Some(last_state) = self.history.get(self.history_index) {
            if last_state.content == current_state.content {
                return;
            }
        }

        // Remove any states after current index (if we're not at the end)
        self.history.truncate(self.history_index + 1);
        if self.saved_index.is_some_and(|saved| saved > self.history_index) {
            self.saved_index = None;
        }

        self.history.push(current_state);
        self.history_index += 1;

        if self.history.len() > self.history_limit + 1 {
            self.history.remove(0);
            self.history_index -= 1;
            self.saved_index = self.saved_index.and_then(|saved| saved.checked_sub(1));
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history_index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.history_index + 1 < self.history.len()
    }

    pub fn undo(&mut self) -> bool {
        if self.history_index > 0 {
            self.history_index -= 1;
            self.restore();
            true
        } else {
            false
        }
    }

    pub fn redo(&mut self) -> bool {
        if self.history_index + 1 < self.history.len() {
            self.history_index += 1;
            self.restore();
            true
        } else {
            false
        }
    }

    fn restore(&mut self) {
        let state = &self.history[self.history_index];
        self.content = state.content.clone();
        self.selection = state.selection;
        self.sticky = None;
        self.last_edit = None;
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(100)
    }
}
