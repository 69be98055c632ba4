use quillcore::ContentTree;

use crate::storage::DocumentRecord;

pub const DEFAULT_TITLE: &str = "Untitled Document";

pub const DEFAULT_FONT_FAMILY: &str =
    r#"Inter, -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, "Helvetica Neue", Arial, sans-serif"#;

/// Blank titles count as the placeholder too.
pub fn is_default_title(title: &str) -> bool {
    let title = title.trim();
    title.is_empty() || title == DEFAULT_TITLE
}

/// The document a session edits. `id` stays `None` until the first save.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: Option<String>,
    pub title: String,
    pub content: ContentTree,
    pub font_family: String,
    /// Millis since the epoch of the last successful save.
    pub last_modified: Option<i64>,
}

impl Document {
    pub fn new(font_family: &str) -> Self {
        Self {
            id: None,
            title: DEFAULT_TITLE.to_string(),
            content: ContentTree::new(),
            font_family: font_family.to_string(),
            last_modified: None,
        }
    }

    pub fn has_default_title(&self) -> bool {
        is_default_title(&self.title)
    }

    /// Hydrate from storage. Records without a font get `default_font`.
    pub fn from_record(record: &DocumentRecord, default_font: &str) -> Self {
        let font_family = if record.font_family.trim().is_empty() {
            default_font.to_string()
        } else {
            record.font_family.clone()
        };
        Self {
            id: Some(record.id.clone()),
            title: record.title.clone(),
            content: ContentTree::from_stored(&record.content),
            font_family,
            last_modified: Some(record.last_modified),
        }
    }
}

impl From<&DocumentRecord> for Document {
    fn from(record: &DocumentRecord) -> Self {
        Self::from_record(record, DEFAULT_FONT_FAMILY)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new(DEFAULT_FONT_FAMILY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_document_defaults() {
        let doc = Document::default();
        assert!(doc.id.is_none());
        assert!(doc.has_default_title());
        assert!(doc.content.is_blank());
        assert!(doc.font_family.starts_with("Inter"));
    }

    #[test]
    fn test_from_record_imports_legacy_html() {
        let record = DocumentRecord {
            id: "1700000000000".to_string(),
            title: "Old".to_string(),
            content: "<h1>Hi</h1><p>there</p>".to_string(),
            last_modified: 1_700_000_000_000,
            font_family: "Georgia, serif".to_string(),
        };
        let doc = Document::from(&record);
        assert_eq!(doc.id.as_deref(), Some("1700000000000"));
        assert_eq!(doc.content.plain_text(), "Hi\nthere");
        assert_eq!(doc.last_modified, Some(1_700_000_000_000));
    }

    #[test]
    fn test_record_without_font_gets_default() {
        let record = DocumentRecord {
            id: "legacy".to_string(),
            title: "Old".to_string(),
            content: "<p>hi</p>".to_string(),
            last_modified: 5,
            font_family: String::new(),
        };
        assert_eq!(Document::from(&record).font_family, DEFAULT_FONT_FAMILY);
        assert_eq!(
            Document::from_record(&record, "Georgia, serif").font_family,
            "Georgia, serif"
        );
    }

    #[test]
    fn test_custom_title_is_not_default() {
        let mut doc = Document::default();
        doc.title = "Notes".to_string();
        assert!(!doc.has_default_title());
        doc.title = "   ".to_string();
        assert!(doc.has_default_title());
    }
}
