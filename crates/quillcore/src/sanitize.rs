use ammonia::Builder;
use std::collections::HashSet;

const INLINE_TAGS: &[&str] = &[
    "a", "b", "br", "code", "em", "i", "span", "strong", "u",
];

pub fn sanitize_html(html: &str) -> String {
    // ammonia's defaults already drop scripts, handlers and javascript: URLs
    create_document_sanitizer().clean(html).to_string()
}

/// Sanitize a pasted/inserted fragment down to inline markup only. Block
/// tags are unwrapped, their text kept.
pub fn sanitize_fragment(html: &str) -> String {
    let tags: HashSet<&str> = INLINE_TAGS.iter().copied().collect();
    create_document_sanitizer().tags(tags).clean(html).to_string()
}

fn create_document_sanitizer() -> Builder<'static> {
    let mut builder = Builder::new();
    // font marks render as `<span style="font-family: ...">`
    builder.add_tag_attributes("span", &["style"]);
    builder
}

/// Keep a font family from escaping its `font-family` declaration. Quoted
/// names survive; the renderer escapes them for the attribute.
pub fn clean_font_family(family: &str) -> String {
    family
        .chars()
        .filter(|c| !matches!(c, ';' | '{' | '}' | '<' | '>' | '\\'))
        .collect::<String>()
        .trim()
        .to_string()
}
