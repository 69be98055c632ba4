//! Range editing over the text projection.

use crate::model::{Block, BlockKind, ContentTree, Marks, Span};

impl ContentTree {
    /// Replace projection range `[start, end)` with `spans` and return the
    /// offset just past the inserted text.
    ///
    /// When the range crosses blocks the first block absorbs the tail of the
    /// last one and every block in between goes away.
    pub fn replace_range(&mut self, start: usize, end: usize, spans: Vec<Span>) -> usize {
        let projection = self.projection();
        let start = start.min(projection.len());
        let end = end.min(projection.len());
        let (start, end) = (start.min(end), start.max(end));
        let inserted: usize = spans.iter().map(Span::char_len).sum();

        let (Some((first, first_local)), Some((last, last_local))) =
            (projection.locate(start), projection.locate(end))
        else {
            return start;
        };
        let segments = projection.segments();

        if first == last {
            if let Some(block) = self.block_mut(&segments[first].path) {
                block.remove_range(first_local, last_local);
                block.insert_spans(first_local, spans);
            }
            return start + inserted;
        }

        let tail = match self.block_mut(&segments[last].path) {
            Some(block) => block.split_off(last_local),
            None => Vec::new(),
        };
        // Reverse order keeps the paths of earlier segments valid.
        for segment in segments[first + 1..=last].iter().rev() {
            self.dissolve(&segment.path);
        }
        if let Some(block) = self.block_mut(&segments[first].path) {
            block.split_off(first_local);
            let at = block.char_len();
            let mut joined = spans;
            joined.extend(tail);
            block.insert_spans(at, joined);
        }
        start + inserted
    }

    /// Default line submission: split the block under `offset` and return
    /// the offset at the start of the new line.
    pub fn split_block_at(&mut self, offset: usize) -> usize {
        let projection = self.projection();
        let Some((idx, local)) = projection.locate(offset) else {
            return offset;
        };
        let path = projection.segments()[idx].path.clone();
        let Some(block) = self.block_mut(&path) else {
            return offset;
        };

        if block.kind.is_list_item() && block.is_empty() {
            block.set_kind(BlockKind::Paragraph);
            return offset;
        }

        let tail = block.split_off(local);
        let new_path = if block.kind == BlockKind::Toggle {
            block.children.insert(0, Block::with_spans(BlockKind::Paragraph, tail));
            let mut inside = path.clone();
            inside.push(0);
            Some(inside)
        } else {
            let kind = if block.kind.is_list_item() {
                block.kind
            } else {
                BlockKind::Paragraph
            };
            self.insert_after(&path, Block::with_spans(kind, tail))
        };

        new_path
            .and_then(|path| self.projection().offset_of(&path, 0))
            .unwrap_or(offset)
    }

    /// Change the kind of the block at `path`. When a toggle turns into
    /// something else its body moves out to follow it.
    pub fn set_block_kind(&mut self, path: &[usize], kind: BlockKind) -> bool {
        let Some(block) = self.block_mut(path) else {
            return false;
        };
        let body = block.set_kind(kind);
        if !body.is_empty() {
            self.insert_many_after(path, body);
        }
        true
    }

    /// Run `update` over the marks of every character in `[start, end)`.
    pub fn update_marks(&mut self, start: usize, end: usize, update: impl Fn(&mut Marks)) {
        let (start, end) = (start.min(end), start.max(end));
        for segment in self.projection().segments() {
            let lo = start.max(segment.start);
            let hi = end.min(segment.end());
            if lo >= hi {
                continue;
            }
            if let Some(block) = self.block_mut(&segment.path) {
                block.update_marks(lo - segment.start, hi - segment.start, &update);
            }
        }
    }

    /// Whether every character in `[start, end)` satisfies `predicate`.
    /// An empty range never does.
    pub fn all_marked(&self, start: usize, end: usize, predicate: impl Fn(&Marks) -> bool) -> bool {
        let (start, end) = (start.min(end), start.max(end));
        let mut seen = false;
        for segment in self.projection().segments() {
            let lo = start.max(segment.start);
            let hi = end.min(segment.end());
            if lo >= hi {
                continue;
            }
            seen = true;
            let Some(block) = self.block(&segment.path) else {
                continue;
            };
            if !block.all_marked(lo - segment.start, hi - segment.start, &predicate) {
                return false;
            }
        }
        seen
    }
}
