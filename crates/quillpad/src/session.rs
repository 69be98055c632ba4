//! One open document: the editor, the shortcut transformer and the
//! debounced background work, bridged to a [`DocumentStore`].

use std::sync::Arc;
use std::time::Duration;

use quillcore::{render_html, ContentTree};
use tokio::sync::watch;

use crate::autosave::{AutosaveCoordinator, SaveSnapshot, SaveState};
use crate::commands::{self, CommandEffect, FormatCommand};
use crate::config::{Config, EditorConfig};
use crate::document::{is_default_title, Document};
use crate::editor::Editor;
use crate::error::{EditError, StorageError};
use crate::find_replace::{self, Match, ReplaceOutcome};
use crate::metrics::{SelectionStats, StatsSnapshot};
use crate::selection::Selection;
use crate::shortcuts::{Shortcut, ShortcutTransformer};
use crate::status::{MessageType, StatusManager, StatusMessage};
use crate::storage::{DocumentRecord, DocumentStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(DocumentRecord),
    /// The title is still the placeholder; ask for one and call
    /// [`DocumentSession::save_with_title`].
    TitleRequired,
    Failed(String),
}

pub struct DocumentSession {
    title: String,
    font_family: String,
    editor: Editor,
    shortcuts: ShortcutTransformer,
    autosave: AutosaveCoordinator,
    editor_config: EditorConfig,
    stats_expanded: bool,
    /// Bumped on every change worth saving
    version: u64,
    status: StatusManager,
}

impl DocumentSession {
    pub fn new(store: Arc<dyn DocumentStore>, config: &Config) -> Self {
        Self::from_document(store, config, Document::new(&config.editor.default_font))
    }

    /// Load a stored document and compute its initial stats.
    pub async fn open(
        store: Arc<dyn DocumentStore>,
        config: &Config,
        id: &str,
    ) -> Result<Self, StorageError> {
        let record = store.load(id).await?;
        log::info!("Opened document '{}' ({})", record.title, record.id);
        let mut session = Self::from_document(
            store,
            config,
            Document::from_record(&record, &config.editor.default_font),
        );
        session.arm_metrics();
        Ok(session)
    }

    fn from_document(store: Arc<dyn DocumentStore>, config: &Config, document: Document) -> Self {
        let mut editor = Editor::new(config.editor.history_limit);
        editor.set_content(document.content);
        Self {
            title: document.title,
            font_family: document.font_family,
            editor,
            shortcuts: ShortcutTransformer::new(),
            autosave: AutosaveCoordinator::new(
                store,
                config.autosave.clone(),
                document.id,
                document.last_modified,
            ),
            editor_config: config.editor.clone(),
            stats_expanded: config.stats.expanded,
            version: 0,
            status: StatusManager::new(),
        }
    }

    // --- editing ---

    pub fn apply(&mut self, command: FormatCommand) -> Result<CommandEffect, EditError> {
        let before = self.editor.selection();
        let effect = commands::apply(&mut self.editor, command)?;
        if effect.changes_content() {
            self.content_changed(self.autosave.config().save_delay());
        } else {
            self.arm_metrics();
        }
        self.selection_moved_from(before);
        Ok(effect)
    }

    pub fn insert_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let before = self.editor.selection();
        self.editor.insert_text(text);
        self.content_changed(self.autosave.config().save_delay());
        self.selection_moved_from(before);
    }

    pub fn delete_backward(&mut self) -> bool {
        let before = self.editor.selection();
        if !self.editor.delete_backward() {
            return false;
        }
        self.content_changed(self.autosave.config().save_delay());
        self.selection_moved_from(before);
        true
    }

    /// Enter key: run the shortcut transformer on the current line.
    pub fn submit_line(&mut self) -> Option<Shortcut> {
        let before = self.editor.selection();
        let shortcut = self.shortcuts.on_line_submit(&mut self.editor);
        if let Some(shortcut) = shortcut {
            self.status
                .post(MessageType::Info, format!("Converted to {:?}", shortcut.block_kind()));
        }
        self.content_changed(self.autosave.config().save_delay());
        self.selection_moved_from(before);
        shortcut
    }

    pub fn set_selection(&mut self, selection: Selection) {
        let before = self.editor.selection();
        self.editor.set_selection(selection);
        self.selection_moved_from(before);
    }

    pub fn find_next(&mut self, query: &str) -> Result<Option<Match>, EditError> {
        let before = self.editor.selection();
        let found = find_replace::find_next(&mut self.editor, query)?;
        self.selection_moved_from(before);
        Ok(found)
    }

    pub fn replace_selection(
        &mut self,
        query: &str,
        replacement: &str,
    ) -> Result<ReplaceOutcome, EditError> {
        let before = self.editor.selection();
        let outcome = find_replace::replace_selection(&mut self.editor, query, replacement)?;
        if outcome.replaced {
            self.content_changed(self.autosave.config().save_delay());
        }
        self.selection_moved_from(before);
        Ok(outcome)
    }

    pub fn replace_all(&mut self, query: &str, replacement: &str) -> Result<usize, EditError> {
        let count = find_replace::replace_all(&mut self.editor, query, replacement)?;
        if count > 0 {
            self.content_changed(self.autosave.config().save_delay());
        }
        Ok(count)
    }

    /// Title edits are saved with the next content save or a manual save.
    pub fn set_title(&mut self, title: &str) {
        self.title = title.trim().to_string();
        self.version += 1;
    }

    /// Switch the document font (a catalog name or a raw family stack). A
    /// non-collapsed selection also gets the font as a mark.
    pub fn change_font(&mut self, font: &str) -> Result<(), EditError> {
        let family = quillcore::sanitize::clean_font_family(&self.editor_config.resolve_font(font));
        if family.is_empty() {
            return Err(EditError::InvalidCommand("empty font family".to_string()));
        }
        if !self.editor.selection().is_collapsed() {
            commands::apply(&mut self.editor, FormatCommand::FontName(family.clone()))?;
            self.arm_metrics();
        }
        self.font_family = family;
        self.version += 1;
        self.schedule_save(self.autosave.config().font_save_delay());
        Ok(())
    }

    pub fn set_stats_expanded(&mut self, expanded: bool) {
        self.stats_expanded = expanded;
        if expanded {
            self.arm_metrics();
        }
    }

    // --- saving ---

    /// Explicit save. Skips the debounce, but a document still carrying the
    /// placeholder title needs one first.
    pub async fn save_now(&mut self) -> SaveOutcome {
        if is_default_title(&self.title) {
            self.status.post(MessageType::Warning, "Add a title before saving");
            return SaveOutcome::TitleRequired;
        }
        self.persist_now().await
    }

    pub async fn save_with_title(&mut self, title: &str) -> SaveOutcome {
        if is_default_title(title) {
            self.status.post(MessageType::Warning, "Add a title before saving");
            return SaveOutcome::TitleRequired;
        }
        self.set_title(title);
        self.persist_now().await
    }

    async fn persist_now(&mut self) -> SaveOutcome {
        let snapshot = match self.snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => return SaveOutcome::Failed(e.to_string()),
        };
        match self.autosave.save_now(snapshot).await {
            Ok(record) => {
                self.editor.mark_saved();
                SaveOutcome::Saved(record)
            }
            Err(e) => SaveOutcome::Failed(e.to_string()),
        }
    }

    /// Stop all pending timers. A save already running finishes on its own.
    pub fn close(&mut self) {
        self.autosave.cancel_all();
        log::debug!("Session for '{}' closed", self.title);
    }

    /// Turn finished saves into notices and expire old ones.
    pub fn update_status(&mut self) -> Option<&StatusMessage> {
        let state = self.autosave.save_state();
        self.status.observe_save(&state);
        self.status.current()
    }

    fn content_changed(&mut self, save_delay: Duration) {
        self.version += 1;
        self.arm_metrics();
        self.schedule_save(save_delay);
    }

    fn selection_moved_from(&mut self, before: Selection) {
        if self.editor.selection() != before {
            self.autosave.arm_selection(self.editor.selected_text());
        }
    }

    fn arm_metrics(&mut self) {
        let text = self.editor.content().plain_text();
        self.autosave.arm_metrics(text, self.stats_expanded);
    }

    fn schedule_save(&mut self, delay: Duration) {
        if self.editor.content().is_blank() {
            // a timer armed before the clear would save the deleted text
            self.autosave.cancel_save();
            log::debug!("Skipping autosave of a blank document");
            return;
        }
        match self.snapshot() {
            Ok(snapshot) => self.autosave.arm_save(snapshot, delay),
            Err(e) => log::error!("Failed to serialize document: {}", e),
        }
    }

    fn snapshot(&self) -> anyhow::Result<SaveSnapshot> {
        Ok(SaveSnapshot {
            title: self.title.clone(),
            content: self.editor.content().to_json()?,
            font_family: self.font_family.clone(),
            version: self.version,
        })
    }

    // --- accessors ---

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn font_family(&self) -> &str {
        &self.font_family
    }

    pub fn id(&self) -> Option<String> {
        self.autosave.save_state().id
    }

    pub fn last_saved(&self) -> Option<i64> {
        self.autosave.save_state().last_saved
    }

    pub fn save_state(&self) -> SaveState {
        self.autosave.save_state()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.version > self.autosave.save_state().saved_version
    }

    pub fn has_pending_save(&self) -> bool {
        self.autosave.has_pending_save()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.autosave.stats()
    }

    pub fn stats_expanded(&self) -> bool {
        self.stats_expanded
    }

    pub fn selection_stats(&self) -> Option<SelectionStats> {
        self.autosave.selection_stats()
    }

    pub fn subscribe_stats(&self) -> watch::Receiver<StatsSnapshot> {
        self.autosave.subscribe_stats()
    }

    pub fn subscribe_save_state(&self) -> watch::Receiver<SaveState> {
        self.autosave.subscribe_save_state()
    }

    pub fn content(&self) -> &ContentTree {
        self.editor.content()
    }

    pub fn selection(&self) -> Selection {
        self.editor.selection()
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    pub fn render_html(&self) -> String {
        render_html(self.editor.content())
    }

    pub fn document(&self) -> Document {
        let state = self.autosave.save_state();
        Document {
            id: state.id,
            title: self.title.clone(),
            content: self.editor.content().clone(),
            font_family: self.font_family.clone(),
            last_modified: state.last_saved,
        }
    }
}

impl Drop for DocumentSession {
    fn drop(&mut self) {
        self.autosave.cancel_all();
    }
}
