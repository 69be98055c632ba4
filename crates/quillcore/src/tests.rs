#[cfg(test)]
mod unit_tests {
    use super::super::*;

    fn bold(text: &str) -> Span {
        Span::marked(
            text,
            Marks {
                bold: true,
                ..Marks::default()
            },
        )
    }

    #[test]
    fn test_sanitize_html_removes_scripts() {
        let html = r#"<p>Hello</p><script>alert('XSS')</script><p>World</p>"#;
        let sanitized = sanitize::sanitize_html(html);
        assert!(!sanitized.contains("<script"));
        assert!(!sanitized.contains("alert"));
        assert!(sanitized.contains("Hello"));
        assert!(sanitized.contains("World"));
    }

    #[test]
    fn test_sanitize_fragment_keeps_inline_only() {
        let sanitized = sanitize::sanitize_fragment("<h1>Big <b>bold</b></h1><img src=x onerror=alert(1)>");
        assert!(!sanitized.contains("<h1"));
        assert!(!sanitized.contains("<img"));
        assert!(!sanitized.contains("onerror"));
        assert!(sanitized.contains("<b>bold</b>"));
    }

    #[test]
    fn test_clean_font_family() {
        assert_eq!(
            sanitize::clean_font_family(r#""Segoe UI"; color: red"#),
            r#""Segoe UI" color: red"#
        );
        assert_eq!(sanitize::clean_font_family("Arial}</style>"), "Arial/style");
    }

    #[test]
    fn test_quoted_font_names_survive_rendering() {
        let family = r#"Inter, "Segoe UI", sans-serif"#;
        let tree = ContentTree::from_blocks(vec![Block::with_spans(
            BlockKind::Paragraph,
            vec![Span::marked(
                "styled",
                Marks {
                    font: Some(family.to_string()),
                    ..Marks::default()
                },
            )],
        )]);

        let html = render_html(&tree);
        assert!(html.contains("&quot;Segoe UI&quot;"));

        let parsed = parse_html(&html);
        assert_eq!(parsed.blocks()[0].spans[0].marks.font.as_deref(), Some(family));
    }

    #[test]
    fn test_angle_bracket_inside_attribute() {
        let spans = parse_fragment(r#"<a href="https://e.com/?q=a>b">link</a>"#);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "link");
        assert_eq!(spans[0].marks.link.as_deref(), Some("https://e.com/?q=a>b"));

        let tree = parse_html(r#"<p title="1 > 0">kept <b>bold</b></p>"#);
        assert_eq!(tree.blocks().len(), 1);
        assert_eq!(tree.blocks()[0].spans, vec![Span::plain("kept "), bold("bold")]);
    }

    #[test]
    fn test_parse_fragment_inline_marks() {
        let spans = parse_fragment("<b>Hi</b> there<script>alert(1)</script>");
        assert_eq!(spans, vec![bold("Hi"), Span::plain(" there")]);
    }

    #[test]
    fn test_parse_fragment_drops_javascript_links() {
        let spans = parse_fragment(r#"<a href="javascript:alert(1)">x</a>"#);
        assert_eq!(spans, vec![Span::plain("x")]);

        let spans = parse_fragment(r#"<a href="https://example.com">site</a>"#);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].marks.link.as_deref(), Some("https://example.com"));
    }

    #[test]
    fn test_parse_html_legacy_document() {
        let html = concat!(
            "<h1>Title</h1>",
            "<div>Body <strong>bold</strong></div>",
            "<ul><li>one</li><li>two</li></ul>",
            "<details><summary>More</summary><div>inside</div></details>",
        );
        let tree = parse_html(html);
        let blocks = tree.blocks();

        assert_eq!(blocks.len(), 5);
        assert_eq!(blocks[0].kind, BlockKind::Heading1);
        assert_eq!(blocks[1].spans, vec![Span::plain("Body "), bold("bold")]);
        assert_eq!(blocks[2].kind, BlockKind::BulletItem);
        assert_eq!(blocks[3].text(), "two");
        assert_eq!(blocks[4].kind, BlockKind::Toggle);
        assert_eq!(blocks[4].text(), "More");
        assert_eq!(blocks[4].children[0].text(), "inside");
    }

    #[test]
    fn test_from_stored_falls_back_to_html() {
        let tree = ContentTree::from_stored("<p>Hello</p><p>World</p>");
        assert_eq!(tree.plain_text(), "Hello\nWorld");
    }

    #[test]
    fn test_render_html_basic() {
        let tree = ContentTree::from_blocks(vec![
            Block::with_text(BlockKind::Heading1, "Title"),
            Block::with_spans(
                BlockKind::Paragraph,
                vec![Span::plain("Hello "), bold("world")],
            ),
        ]);
        insta::assert_snapshot!(render_html(&tree), @"<h1>Title</h1><p>Hello <strong>world</strong></p>");
    }

    #[test]
    fn test_render_html_groups_lists() {
        let tree = ContentTree::from_blocks(vec![
            Block::with_text(BlockKind::BulletItem, "a"),
            Block::with_text(BlockKind::BulletItem, "b"),
            Block::with_text(BlockKind::OrderedItem, "c"),
        ]);
        let html = render_html(&tree);
        assert_eq!(html, "<ul><li>a</li><li>b</li></ul><ol><li>c</li></ol>");
    }

    #[test]
    fn test_render_html_escapes_text() {
        let tree = ContentTree::from_blocks(vec![Block::with_text(
            BlockKind::Paragraph,
            "<script>alert(1)</script>",
        )]);
        let html = render_html(&tree);
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script"));
    }

    #[test]
    fn test_render_then_parse_keeps_structure() {
        let mut toggle = Block::with_text(BlockKind::Toggle, "Details");
        toggle.children = vec![Block::with_text(BlockKind::CodeBlock, "let x = 1;")];
        let tree = ContentTree::from_blocks(vec![
            Block::with_text(BlockKind::Blockquote, "quoted"),
            toggle,
        ]);

        let restored = parse_html(&render_html(&tree));
        assert_eq!(restored, tree);
    }
}
