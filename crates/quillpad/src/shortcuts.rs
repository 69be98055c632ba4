//! Markdown-style line shortcuts: a paragraph starting with `\h1 `,
//! `\toggle ` and friends turns into that block when the line is submitted.

use quillcore::{Block, BlockKind};

use crate::editor::Editor;
use crate::selection::Selection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    Heading1,
    Heading2,
    Heading3,
    Toggle,
    BulletPoint,
    Code,
    Quote,
}

impl Shortcut {
    /// Checked in this order.
    pub const ALL: [Shortcut; 7] = [
        Self::Heading1,
        Self::Heading2,
        Self::Heading3,
        Self::Toggle,
        Self::BulletPoint,
        Self::Code,
        Self::Quote,
    ];

    pub fn prefix(self) -> &'static str {
        match self {
            Self::Heading1 => "\\h1 ",
            Self::Heading2 => "\\h2 ",
            Self::Heading3 => "\\h3 ",
            Self::Toggle => "\\toggle ",
            Self::BulletPoint => "\\bulletpoint ",
            Self::Code => "\\code ",
            Self::Quote => "\\quote ",
        }
    }

    pub fn block_kind(self) -> BlockKind {
        match self {
            Self::Heading1 => BlockKind::Heading1,
            Self::Heading2 => BlockKind::Heading2,
            Self::Heading3 => BlockKind::Heading3,
            Self::Toggle => BlockKind::Toggle,
            Self::BulletPoint => BlockKind::BulletItem,
            Self::Code => BlockKind::CodeBlock,
            Self::Quote => BlockKind::Blockquote,
        }
    }

    pub fn detect(line: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|shortcut| line.starts_with(shortcut.prefix()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ShortcutState {
    #[default]
    Idle,
    Matched(Shortcut),
    Transformed(Shortcut),
}

#[derive(Debug, Default)]
pub struct ShortcutTransformer {
    state: ShortcutState,
}

impl ShortcutTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ShortcutState {
        self.state
    }

    /// Handle Enter. Either rewrites the current paragraph into the block its
    /// prefix names and opens a fresh paragraph after it, or falls back to a
    /// plain block split. Returns the shortcut that fired, if any.
    pub fn on_line_submit(&mut self, editor: &mut Editor) -> Option<Shortcut> {
        self.state = ShortcutState::Idle;

        let selection = editor.selection();
        let mut caret = selection.start();
        if !selection.is_collapsed() {
            caret = editor
                .content_mut()
                .replace_range(selection.start(), selection.end(), Vec::new());
        }

        let projection = editor.content().projection();
        let path = projection
            .locate(caret)
            .map(|(idx, _)| projection.segments()[idx].path.clone());
        // code blocks hold literal text
        let matched = path.as_ref().and_then(|path| {
            let block = editor.content().block(path)?;
            if block.kind == BlockKind::CodeBlock {
                return None;
            }
            Shortcut::detect(&block.text())
        });

        let (Some(path), Some(shortcut)) = (path, matched) else {
            let cursor = editor.content_mut().split_block_at(caret);
            editor.commit(Selection::caret(cursor));
            return None;
        };
        self.state = ShortcutState::Matched(shortcut);
        log::debug!("Shortcut {:?} matched", shortcut);

        let content = editor.content_mut();
        if let Some(block) = content.block_mut(&path) {
            block.strip_prefix_chars(shortcut.prefix().chars().count());
        }
        content.set_block_kind(&path, shortcut.block_kind());
        let cursor = content
            .insert_after(&path, Block::paragraph())
            .and_then(|follow| content.projection().offset_of(&follow, 0))
            .unwrap_or(caret);
        editor.commit(Selection::caret(cursor));

        self.state = ShortcutState::Transformed(shortcut);
        Some(shortcut)
    }
}
