// Quillpad library exports

pub mod autosave;
pub mod command_processor;
pub mod commands;
pub mod config;
pub mod document;
pub mod editor;
pub mod error;
pub mod find_replace;
pub mod metrics;
pub mod selection;
pub mod session;
pub mod shortcuts;
pub mod status;
pub mod storage;

pub use autosave::{AutosaveCoordinator, SaveState, SaveStatus};
pub use commands::{CommandEffect, FormatCommand};
pub use config::Config;
pub use document::Document;
pub use editor::Editor;
pub use error::{EditError, StorageError};
pub use selection::Selection;
pub use session::{DocumentSession, SaveOutcome};
pub use shortcuts::Shortcut;
pub use storage::{DocumentRecord, DocumentStore, FileStore, MemoryStore};
