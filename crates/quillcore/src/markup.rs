use lazy_static::lazy_static;
use regex::Regex;

use crate::model::{Block, BlockKind, ContentTree, Marks, Span};
use crate::sanitize::{clean_font_family, sanitize_fragment, sanitize_html};

lazy_static! {
    // quoted attribute values may contain `>`
    static ref TAG: Regex =
        Regex::new(r#"<(/?)([a-zA-Z][a-zA-Z0-9]*)((?:"[^"]*"|'[^']*'|[^'">])*)>"#)
            .expect("Invalid TAG regex pattern");
    static ref HREF: Regex = Regex::new(r#"href="([^"]*)""#)
        .expect("Invalid HREF regex pattern");
    static ref FONT_FAMILY: Regex = Regex::new(r#"font-family:\s*([^;"]+)"#)
        .expect("Invalid FONT_FAMILY regex pattern");
}

pub fn render_html(tree: &ContentTree) -> String {
    let mut html = String::new();
    render_blocks(tree.blocks(), &mut html);
    sanitize_html(&html)
}

fn render_blocks(blocks: &[Block], out: &mut String) {
    let mut open_list: Option<BlockKind> = None;
    for block in blocks {
        let list = block.kind.is_list_item().then_some(block.kind);
        if open_list != list {
            if let Some(kind) = open_list {
                out.push_str(list_tag(kind, true));
            }
            if let Some(kind) = list {
                out.push_str(list_tag(kind, false));
            }
            open_list = list;
        }

        match block.kind {
            BlockKind::Paragraph => render_wrapped("p", block, out),
            BlockKind::Heading1 => render_wrapped("h1", block, out),
            BlockKind::Heading2 => render_wrapped("h2", block, out),
            BlockKind::Heading3 => render_wrapped("h3", block, out),
            BlockKind::Blockquote => render_wrapped("blockquote", block, out),
            BlockKind::BulletItem | BlockKind::OrderedItem => render_wrapped("li", block, out),
            BlockKind::CodeBlock => {
                out.push_str("<pre><code>");
                render_spans(&block.spans, out);
                out.push_str("</code></pre>");
            }
            BlockKind::Toggle => {
                out.push_str("<details><summary>");
                render_spans(&block.spans, out);
                out.push_str("</summary>");
                render_blocks(&block.children, out);
                out.push_str("</details>");
            }
        }
    }
    if let Some(kind) = open_list {
        out.push_str(list_tag(kind, true));
    }
}

fn list_tag(kind: BlockKind, close: bool) -> &'static str {
    match (kind, close) {
        (BlockKind::OrderedItem, false) => "<ol>",
        (BlockKind::OrderedItem, true) => "</ol>",
        (_, false) => "<ul>",
        (_, true) => "</ul>",
    }
}

fn render_wrapped(tag: &str, block: &Block, out: &mut String) {
    out.push('<');
    out.push_str(tag);
    out.push('>');
    if block.is_empty() {
        out.push_str("<br>");
    } else {
        render_spans(&block.spans, out);
    }
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

fn render_spans(spans: &[Span], out: &mut String) {
    for span in spans {
        let mut html = escape_html(&span.text);
        let marks = &span.marks;
        if let Some(font) = &marks.font {
            html = format!(
                r#"<span style="font-family: {}">{}</span>"#,
                escape_html(&clean_font_family(font)),
                html
            );
        }
        if marks.underline {
            html = format!("<u>{}</u>", html);
        }
        if marks.italic {
            html = format!("<em>{}</em>", html);
        }
        if marks.bold {
            html = format!("<strong>{}</strong>", html);
        }
        if let Some(url) = &marks.link {
            html = format!(r#"<a href="{}">{}</a>"#, escape_html(url), html);
        }
        out.push_str(&html);
    }
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", "\u{a0}")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Convert an HTML fragment into inline spans. Only inline markup survives
/// sanitization; line breaks become spaces.
pub fn parse_fragment(html: &str) -> Vec<Span> {
    let clean = sanitize_fragment(html);
    let mut reader = HtmlReader::default();
    reader.read(&clean);

    let mut spans = Vec::new();
    for block in reader.finish() {
        if !spans.is_empty() && !block.spans.is_empty() {
            spans.push(Span::plain(" "));
        }
        spans.extend(block.spans);
    }
    Block::with_spans(BlockKind::Paragraph, spans).spans
}

/// Import an HTML document (the format older records stored) as a tree.
pub fn parse_html(html: &str) -> ContentTree {
    let clean = sanitize_html(html);
    let mut reader = HtmlReader::default();
    reader.read(&clean);
    ContentTree::from_blocks(reader.finish())
}

#[derive(Default)]
struct HtmlReader {
    blocks: Vec<Block>,
    toggles: Vec<Block>,
    current: Option<Block>,
    lists: Vec<BlockKind>,
    in_summary: bool,
    bold: usize,
    italic: usize,
    underline: usize,
    links: Vec<Option<String>>,
    fonts: Vec<Option<String>>,
}

impl HtmlReader {
    fn read(&mut self, html: &str) {
        let mut last = 0;
        for caps in TAG.captures_iter(html) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            self.text(&html[last..whole.start()]);
            last = whole.end();

            let closing = &caps[1] == "/";
            let name = caps[2].to_ascii_lowercase();
            let attrs = caps.get(3).map(|m| m.as_str()).unwrap_or("");
            if closing {
                self.close(&name);
            } else {
                self.open(&name, attrs);
            }
        }
        self.text(&html[last..]);
    }

    fn open(&mut self, name: &str, attrs: &str) {
        match name {
            "p" | "div" => self.start_block(BlockKind::Paragraph),
            "h1" => self.start_block(BlockKind::Heading1),
            "h2" => self.start_block(BlockKind::Heading2),
            "h3" | "h4" | "h5" | "h6" => self.start_block(BlockKind::Heading3),
            "blockquote" => self.start_block(BlockKind::Blockquote),
            "pre" => self.start_block(BlockKind::CodeBlock),
            "li" => {
                let kind = self.lists.last().copied().unwrap_or(BlockKind::BulletItem);
                self.start_block(kind);
            }
            "ul" => {
                self.flush();
                self.lists.push(BlockKind::BulletItem);
            }
            "ol" => {
                self.flush();
                self.lists.push(BlockKind::OrderedItem);
            }
            "details" => {
                self.flush();
                let mut toggle = Block::new(BlockKind::Toggle);
                toggle.children.clear();
                self.toggles.push(toggle);
            }
            "summary" => {
                self.flush();
                self.in_summary = !self.toggles.is_empty();
            }
            "br" => self.line_break(),
            "b" | "strong" => self.bold += 1,
            "i" | "em" => self.italic += 1,
            "u" => self.underline += 1,
            "a" => {
                let href = HREF.captures(attrs).map(|c| decode_entities(&c[1]));
                self.links.push(href);
            }
            "span" => {
                // quotes inside the value arrive as `&quot;`
                let font = FONT_FAMILY
                    .captures(attrs)
                    .map(|c| clean_font_family(&decode_entities(&c[1])))
                    .filter(|font| !font.is_empty());
                self.fonts.push(font);
            }
            _ => {}
        }
    }

    fn close(&mut self, name: &str) {
        match name {
            "p" | "div" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "blockquote" | "pre"
            | "li" => self.flush(),
            "ul" | "ol" => {
                self.flush();
                self.lists.pop();
            }
            "summary" => self.in_summary = false,
            "details" => {
                self.flush();
                self.in_summary = false;
                if let Some(mut toggle) = self.toggles.pop() {
                    if toggle.children.is_empty() {
                        toggle.children.push(Block::paragraph());
                    }
                    self.push_block(toggle);
                }
            }
            "b" | "strong" => self.bold = self.bold.saturating_sub(1),
            "i" | "em" => self.italic = self.italic.saturating_sub(1),
            "u" => self.underline = self.underline.saturating_sub(1),
            "a" => {
                self.links.pop();
            }
            "span" => {
                self.fonts.pop();
            }
            _ => {}
        }
    }

    fn marks(&self) -> Marks {
        Marks {
            bold: self.bold > 0,
            italic: self.italic > 0,
            underline: self.underline > 0,
            font: self.fonts.iter().rev().find_map(|font| font.clone()),
            link: self.links.iter().rev().find_map(|link| link.clone()),
        }
    }

    fn text(&mut self, raw: &str) {
        if raw.is_empty() {
            return;
        }
        // whitespace between block tags is layout, not content
        if raw.trim().is_empty() && raw.contains('\n') {
            return;
        }
        let span = Span::marked(decode_entities(raw), self.marks());
        if self.in_summary {
            if let Some(toggle) = self.toggles.last_mut() {
                toggle.spans.push(span);
                toggle.normalize();
                return;
            }
        }
        let block = self.current.get_or_insert_with(Block::paragraph);
        block.spans.push(span);
        block.normalize();
    }

    fn line_break(&mut self) {
        if self.in_summary {
            return;
        }
        match self.current.as_mut() {
            Some(block) if block.kind == BlockKind::CodeBlock => {
                block.spans.push(Span::plain("\n"));
                block.normalize();
            }
            Some(block) if !block.is_empty() => {
                let kind = block.kind;
                self.flush();
                self.current = Some(Block::new(kind));
            }
            _ => {}
        }
    }

    fn start_block(&mut self, kind: BlockKind) {
        self.flush();
        self.current = Some(Block::new(kind));
    }

    fn flush(&mut self) {
        if let Some(block) = self.current.take() {
            self.push_block(block);
        }
    }

    fn push_block(&mut self, block: Block) {
        match self.toggles.last_mut() {
            Some(toggle) => toggle.children.push(block),
            None => self.blocks.push(block),
        }
    }

    fn finish(mut self) -> Vec<Block> {
        self.flush();
        while let Some(mut toggle) = self.toggles.pop() {
            if toggle.children.is_empty() {
                toggle.children.push(Block::paragraph());
            }
            self.push_block(toggle);
        }
        self.blocks
    }
}
