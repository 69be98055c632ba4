use serde::{Deserialize, Serialize};

/// Index path from the root container down to a block. `[2]` is the third
/// top-level block, `[2, 0]` the first block inside that block's toggle body.
pub type BlockPath = Vec<usize>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockKind {
    Paragraph,
    Heading1,
    Heading2,
    Heading3,
    Blockquote,
    CodeBlock,
    BulletItem,
    OrderedItem,
    Toggle,
}

impl BlockKind {
    /// Resolve a `formatBlock` style tag such as `"<h1>"`, `"pre"` or `"P"`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let name = tag
            .trim()
            .trim_start_matches('<')
            .trim_end_matches('>')
            .trim()
            .to_ascii_lowercase();
        match name.as_str() {
            "p" | "div" => Some(Self::Paragraph),
            "h1" => Some(Self::Heading1),
            "h2" => Some(Self::Heading2),
            "h3" => Some(Self::Heading3),
            "blockquote" => Some(Self::Blockquote),
            "pre" => Some(Self::CodeBlock),
            _ => None,
        }
    }

    pub fn is_list_item(self) -> bool {
        matches!(self, Self::BulletItem | Self::OrderedItem)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marks {
    #[serde(default, skip_serializing_if = "is_false")]
    pub bold: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub italic: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub underline: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Marks {
    pub fn is_plain(&self) -> bool {
        *self == Self::default()
    }

    /// Marks left over after "remove formatting": only the link survives.
    pub fn cleared(&self) -> Self {
        Self {
            link: self.link.clone(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub text: String,
    #[serde(default, skip_serializing_if = "Marks::is_plain")]
    pub marks: Marks,
}

impl Span {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: Marks::default(),
        }
    }

    pub fn marked(text: impl Into<String>, marks: Marks) -> Self {
        Self {
            text: text.into(),
            marks,
        }
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

pub(crate) fn byte_index(text: &str, char_idx: usize) -> usize {
    text.char_indices()
        .nth(char_idx)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub kind: BlockKind,
    #[serde(default)]
    pub spans: Vec<Span>,
    /// Toggle body. Always empty for other kinds.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Block>,
}

impl Block {
    pub fn new(kind: BlockKind) -> Self {
        let children = if kind == BlockKind::Toggle {
            vec![Self::paragraph()]
        } else {
            Vec::new()
        };
        Self {
            kind,
            spans: Vec::new(),
            children,
        }
    }

    pub fn paragraph() -> Self {
        Self::new(BlockKind::Paragraph)
    }

    pub fn with_spans(kind: BlockKind, spans: Vec<Span>) -> Self {
        let mut block = Self::new(kind);
        block.spans = spans;
        block.normalize();
        block
    }

    pub fn with_text(kind: BlockKind, text: &str) -> Self {
        Self::with_spans(kind, vec![Span::plain(text)])
    }

    pub fn text(&self) -> String {
        self.spans.iter().map(|span| span.text.as_str()).collect()
    }

    pub fn char_len(&self) -> usize {
        self.spans.iter().map(Span::char_len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.iter().all(|span| span.text.is_empty())
    }

    /// Change the block kind. Leaving a toggle hands back its body so the
    /// caller can re-home it; entering one starts an empty body.
    pub fn set_kind(&mut self, kind: BlockKind) -> Vec<Block> {
        let previous = std::mem::replace(&mut self.kind, kind);
        if previous == kind {
            return Vec::new();
        }
        if kind == BlockKind::Toggle {
            self.children = vec![Self::paragraph()];
            Vec::new()
        } else {
            std::mem::take(&mut self.children)
        }
    }

    /// Make sure a span boundary falls on char offset `at` and return the
    /// index of the first span starting there.
    fn split_spans_at(&mut self, at: usize) -> usize {
        let mut offset = 0;
        for idx in 0..self.spans.len() {
            if at == offset {
                return idx;
            }
            let len = self.spans[idx].char_len();
            if at < offset + len {
                let byte = byte_index(&self.spans[idx].text, at - offset);
                let tail = self.spans[idx].text.split_off(byte);
                let marks = self.spans[idx].marks.clone();
                self.spans.insert(idx + 1, Span::marked(tail, marks));
                return idx + 1;
            }
            offset += len;
        }
        self.spans.len()
    }

    /// Cut the inline content at `at`, returning everything after it.
    pub fn split_off(&mut self, at: usize) -> Vec<Span> {
        let idx = self.split_spans_at(at);
        let tail = self.spans.split_off(idx);
        self.normalize();
        tail
    }

    pub fn remove_range(&mut self, start: usize, end: usize) {
        if start >= end {
            return;
        }
        let first = self.split_spans_at(start);
        let last = self.split_spans_at(end);
        self.spans.drain(first..last);
        self.normalize();
    }

    pub fn insert_spans(&mut self, at: usize, spans: Vec<Span>) {
        let idx = self.split_spans_at(at);
        self.spans.splice(idx..idx, spans);
        self.normalize();
    }

    /// Remove the first `count` characters, keeping the marks of the rest.
    pub fn strip_prefix_chars(&mut self, count: usize) -> Vec<Span> {
        let rest = self.split_off(count);
        std::mem::replace(&mut self.spans, rest)
    }

    pub fn update_marks(&mut self, start: usize, end: usize, update: impl Fn(&mut Marks)) {
        if start >= end {
            return;
        }
        let first = self.split_spans_at(start);
        let last = self.split_spans_at(end);
        for span in &mut self.spans[first..last] {
            update(&mut span.marks);
        }
        self.normalize();
    }

    /// Whether every character in `[start, end)` satisfies `predicate`.
    pub fn all_marked(&self, start: usize, end: usize, predicate: impl Fn(&Marks) -> bool) -> bool {
        let mut offset = 0;
        for span in &self.spans {
            let len = span.char_len();
            let overlaps = offset < end && offset + len > start;
            if overlaps && !predicate(&span.marks) {
                return false;
            }
            offset += len;
        }
        true
    }

    /// Marks a character typed at `at` would inherit.
    pub fn marks_at(&self, at: usize) -> Marks {
        let mut offset = 0;
        for span in &self.spans {
            let len = span.char_len();
            if at > offset && at <= offset + len {
                return span.marks.clone();
            }
            offset += len;
        }
        self.spans
            .first()
            .map(|span| span.marks.clone())
            .unwrap_or_default()
    }

    pub fn normalize(&mut self) {
        let mut merged: Vec<Span> = Vec::with_capacity(self.spans.len());
        for span in self.spans.drain(..) {
            if span.text.is_empty() {
                continue;
            }
            match merged.last_mut() {
                Some(last) if last.marks == span.marks => last.text.push_str(&span.text),
                _ => merged.push(span),
            }
        }
        self.spans = merged;
    }
}

/// A block's slot in the text projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub path: BlockPath,
    pub start: usize,
    pub len: usize,
}

impl Segment {
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

/// The content tree flattened to plain text: every block's own text in
/// document order, joined with `\n`. Offsets are char offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    text: String,
    segments: Vec<Segment>,
    len: usize,
}

impl Projection {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Map a projection offset to `(segment index, offset inside the block)`.
    /// An offset equal to a segment's end belongs to that segment.
    pub fn locate(&self, offset: usize) -> Option<(usize, usize)> {
        let offset = offset.min(self.len);
        let idx = self
            .segments
            .iter()
            .position(|segment| offset <= segment.end())?;
        Some((idx, offset - self.segments[idx].start))
    }

    pub fn segment_for_path(&self, path: &[usize]) -> Option<&Segment> {
        self.segments.iter().find(|segment| segment.path == path)
    }

    pub fn offset_of(&self, path: &[usize], local: usize) -> Option<usize> {
        self.segment_for_path(path)
            .map(|segment| segment.start + local.min(segment.len))
    }

    /// Indices of the segments a selection touches. A range that merely
    /// ends at a block's start or starts at a block's end does not touch it.
    pub fn touched(&self, start: usize, end: usize) -> Vec<usize> {
        let (start, end) = (start.min(end), start.max(end));
        let (Some((mut first, first_local)), Some((mut last, last_local))) =
            (self.locate(start), self.locate(end))
        else {
            return Vec::new();
        };
        if start < end {
            if first < last && first_local == self.segments[first].len {
                first += 1;
            }
            if last > first && last_local == 0 {
                last -= 1;
            }
        }
        (first..=last).collect()
    }

    pub fn slice(&self, start: usize, end: usize) -> String {
        let (start, end) = (start.min(end), start.max(end));
        self.text.chars().skip(start).take(end - start).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentTree {
    pub(crate) blocks: Vec<Block>,
}

impl Default for ContentTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentTree {
    pub fn new() -> Self {
        Self {
            blocks: vec![Block::paragraph()],
        }
    }

    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        if blocks.is_empty() {
            return Self::new();
        }
        Self { blocks }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let tree: Self = serde_json::from_str(json)?;
        Ok(Self::from_blocks(tree.blocks))
    }

    /// Rebuild a tree from a persisted `content` string: the JSON block
    /// array written by [`ContentTree::to_json`], or HTML from older records.
    pub fn from_stored(content: &str) -> Self {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Self::new();
        }
        if trimmed.starts_with('[') {
            if let Ok(tree) = Self::from_json(trimmed) {
                return tree;
            }
        }
        crate::markup::parse_html(trimmed)
    }

    pub fn projection(&self) -> Projection {
        let mut projection = Projection {
            text: String::new(),
            segments: Vec::new(),
            len: 0,
        };
        let mut prefix = Vec::new();
        collect_segments(&self.blocks, &mut prefix, &mut projection);
        projection
    }

    pub fn plain_text(&self) -> String {
        self.projection().text
    }

    /// True when the document has no visible text at all.
    pub fn is_blank(&self) -> bool {
        self.plain_text().trim().is_empty()
    }

    pub fn block(&self, path: &[usize]) -> Option<&Block> {
        let (first, rest) = path.split_first()?;
        let mut block = self.blocks.get(*first)?;
        for idx in rest {
            block = block.children.get(*idx)?;
        }
        Some(block)
    }

    pub fn block_mut(&mut self, path: &[usize]) -> Option<&mut Block> {
        let (first, rest) = path.split_first()?;
        let mut block = self.blocks.get_mut(*first)?;
        for idx in rest {
            block = block.children.get_mut(*idx)?;
        }
        Some(block)
    }

    pub(crate) fn container_mut(&mut self, parent: &[usize]) -> Option<&mut Vec<Block>> {
        if parent.is_empty() {
            Some(&mut self.blocks)
        } else {
            self.block_mut(parent).map(|block| &mut block.children)
        }
    }

    pub fn replace_block(&mut self, path: &[usize], block: Block) -> bool {
        match self.block_mut(path) {
            Some(slot) => {
                *slot = block;
                true
            }
            None => false,
        }
    }

    /// Insert `block` as the next sibling of the block at `path`.
    pub fn insert_after(&mut self, path: &[usize], block: Block) -> Option<BlockPath> {
        let (idx, parent) = path.split_last()?;
        let container = self.container_mut(parent)?;
        let at = (*idx + 1).min(container.len());
        container.insert(at, block);
        let mut inserted = parent.to_vec();
        inserted.push(at);
        Some(inserted)
    }

    /// Insert blocks right after `path`, in order.
    pub(crate) fn insert_many_after(&mut self, path: &[usize], blocks: Vec<Block>) {
        let Some((idx, parent)) = path.split_last() else {
            return;
        };
        if let Some(container) = self.container_mut(parent) {
            let at = (*idx + 1).min(container.len());
            container.splice(at..at, blocks);
        }
    }

    /// Remove the block at `path`. A toggle that still has a body is replaced
    /// by that body instead of taking it along.
    pub(crate) fn dissolve(&mut self, path: &[usize]) {
        let Some((idx, parent)) = path.split_last() else {
            return;
        };
        let Some(container) = self.container_mut(parent) else {
            return;
        };
        if *idx >= container.len() {
            return;
        }
        let removed = container.remove(*idx);
        if !removed.children.is_empty() {
            container.splice(*idx..*idx, removed.children);
        }
        if self.blocks.is_empty() {
            self.blocks.push(Block::paragraph());
        }
    }
}

fn collect_segments(blocks: &[Block], prefix: &mut Vec<usize>, projection: &mut Projection) {
    for (idx, block) in blocks.iter().enumerate() {
        prefix.push(idx);
        if !projection.segments.is_empty() {
            projection.text.push('\n');
            projection.len += 1;
        }
        let own = block.text();
        let len = own.chars().count();
        projection.segments.push(Segment {
            path: prefix.clone(),
            start: projection.len,
            len,
        });
        projection.text.push_str(&own);
        projection.len += len;
        collect_segments(&block.children, prefix, projection);
        prefix.pop();
    }
}
