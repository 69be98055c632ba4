use std::sync::Arc;

use anyhow::Result;

use crate::commands::FormatCommand;
use crate::config::Config;
use crate::selection::Selection;
use crate::session::{DocumentSession, SaveOutcome};
use crate::shortcuts::Shortcut;
use crate::storage::DocumentStore;

/// Vim-style `:` commands for driving a [`DocumentSession`] from a line
/// oriented front end.
pub struct CommandProcessor {
    store: Arc<dyn DocumentStore>,
    config: Config,
}

impl CommandProcessor {
    pub fn new(store: Arc<dyn DocumentStore>, config: Config) -> Self {
        Self { store, config }
    }

    /// Plain input: type the line, then press Enter so shortcuts get a
    /// chance to fire. The session posts a notice when one does.
    pub fn type_line(&self, line: &str, session: &mut DocumentSession) -> Option<Shortcut> {
        session.insert_text(line);
        session.submit_line()
    }

    pub async fn execute_command(
        &self,
        command: &str,
        session: &mut DocumentSession,
        should_quit: &mut bool,
    ) -> Result<String> {
        let cmd = command.trim();

        if cmd.is_empty() {
            return Ok(String::new());
        }

        // Search and replace take the rest of the line verbatim
        if let Some(query) = cmd.strip_prefix('/') {
            return match session.find_next(query)? {
                Some((start, end)) => Ok(format!("Match at {}-{}", start, end)),
                None => Ok(format!("Pattern not found: {}", query)),
            };
        }
        if let Some(rest) = cmd.strip_prefix("%s/") {
            let (query, replacement) = split_substitution(rest)?;
            let count = session.replace_all(query, replacement)?;
            return Ok(format!("{} substitution(s)", count));
        }
        if let Some(rest) = cmd.strip_prefix("s/") {
            let (query, replacement) = split_substitution(rest)?;
            let outcome = session.replace_selection(query, replacement)?;
            return Ok(match (outcome.replaced, outcome.next) {
                (true, _) => "Replaced 1 occurrence".to_string(),
                (false, Some(_)) => "Selected next match".to_string(),
                (false, None) => format!("Pattern not found: {}", query),
            });
        }

        let parts: Vec<&str> = cmd.split_whitespace().collect();
        let arg = cmd[parts[0].len()..].trim();

        match parts[0] {
            "w" => {
                // :w [title]
                let outcome = if arg.is_empty() {
                    session.save_now().await
                } else {
                    session.save_with_title(arg).await
                };
                describe_save(outcome)
            }
            "q" => {
                if session.has_unsaved_changes() {
                    Ok("No write since last change (use :q! to override)".to_string())
                } else {
                    session.close();
                    *should_quit = true;
                    Ok("Quitting".to_string())
                }
            }
            "q!" => {
                session.close();
                *should_quit = true;
                Ok("Force quitting".to_string())
            }
            "wq" => {
                let result = describe_save(session.save_now().await)?;
                session.close();
                *should_quit = true;
                Ok(format!("{} - Quitting", result))
            }
            "e" => {
                if arg.is_empty() {
                    return Err(anyhow::anyhow!("E471: Argument required"));
                }
                if session.has_unsaved_changes() {
                    return Ok("No write since last change (use :w first)".to_string());
                }
                let opened = DocumentSession::open(self.store.clone(), &self.config, arg).await?;
                *session = opened;
                Ok(format!("Opened \"{}\"", session.title()))
            }
            "new" => {
                if session.has_unsaved_changes() {
                    return Ok("No write since last change (use :w first)".to_string());
                }
                *session = DocumentSession::new(self.store.clone(), &self.config);
                Ok("New document".to_string())
            }
            "ls" => {
                let documents = self.store.list().await?;
                if documents.is_empty() {
                    return Ok("No documents".to_string());
                }
                let current = session.id();
                let mut output = String::new();
                for document in documents {
                    let marker = if current.as_deref() == Some(document.id.as_str()) {
                        "%"
                    } else {
                        " "
                    };
                    output.push_str(&format!("{} {} {}\n", marker, document.id, document.title));
                }
                Ok(output.trim_end().to_string())
            }
            "rm" => {
                if arg.is_empty() {
                    return Err(anyhow::anyhow!("E471: Argument required"));
                }
                if session.id().as_deref() == Some(arg) {
                    return Err(anyhow::anyhow!("Cannot delete the open document"));
                }
                self.store.delete(arg).await?;
                Ok(format!("Deleted {}", arg))
            }
            "title" => {
                if arg.is_empty() {
                    return Ok(session.title().to_string());
                }
                session.set_title(arg);
                Ok(format!("Title set to \"{}\"", session.title()))
            }
            "show" => Ok(session.render_html()),
            "text" => Ok(session.content().plain_text()),
            "stats" => {
                if arg == "more" || arg == "less" {
                    session.set_stats_expanded(arg == "more");
                }
                let stats = session.stats();
                let mut output = format!(
                    "{} words, {} chars, {} min read",
                    stats.words, stats.chars, stats.reading_time_minutes
                );
                if session.stats_expanded() {
                    output.push_str(&format!(
                        ", {} paragraphs, {} sentences, avg word {:.1}, avg sentence {:.1}",
                        stats.paragraphs,
                        stats.sentences,
                        stats.avg_word_length,
                        stats.avg_sentence_length
                    ));
                }
                if let Some(selection) = session.selection_stats() {
                    output.push_str(&format!(
                        " | selection: {} words, {} chars",
                        selection.words, selection.chars
                    ));
                }
                Ok(output)
            }
            "sel" => {
                if parts.len() < 3 {
                    return Err(anyhow::anyhow!("Usage: sel <anchor> <head>"));
                }
                let anchor: usize = parts[1].parse()?;
                let head: usize = parts[2].parse()?;
                session.set_selection(Selection::new(anchor, head));
                let selection = session.selection();
                Ok(format!("Selected {}-{}", selection.start(), selection.end()))
            }
            "font" => {
                if arg.is_empty() {
                    return Ok(session.font_family().to_string());
                }
                session.change_font(arg)?;
                Ok(format!("Font set to {}", session.font_family()))
            }
            name => {
                let command = format_command(name, arg)
                    .ok_or_else(|| anyhow::anyhow!("E492: Not an editor command: {}", name))?;
                let effect = session.apply(command)?;
                Ok(format!("{:?}", effect))
            }
        }
    }
}

fn format_command(name: &str, arg: &str) -> Option<FormatCommand> {
    let command = match name {
        "b" => FormatCommand::Bold,
        "i" => FormatCommand::Italic,
        "u" => FormatCommand::Underline,
        "h1" | "h2" | "h3" | "p" => FormatCommand::FormatBlock(name.to_string()),
        "quote" => FormatCommand::FormatBlock("blockquote".to_string()),
        "code" => FormatCommand::FormatBlock("pre".to_string()),
        "ul" => FormatCommand::InsertUnorderedList,
        "ol" => FormatCommand::InsertOrderedList,
        "link" => {
            let (url, text) = arg.split_once(' ').unwrap_or((arg, ""));
            FormatCommand::InsertLink {
                url: url.to_string(),
                text: text.trim().to_string(),
            }
        }
        "html" => FormatCommand::InsertHtml(arg.to_string()),
        "clear" => FormatCommand::RemoveFormat,
        "all" => FormatCommand::SelectAll,
        "undo" => FormatCommand::Undo,
        "redo" => FormatCommand::Redo,
        _ => return None,
    };
    Some(command)
}

/// `query/replacement`, with an optional trailing slash.
fn split_substitution(rest: &str) -> Result<(&str, &str)> {
    let rest = rest.strip_suffix('/').unwrap_or(rest);
    rest.split_once('/')
        .ok_or_else(|| anyhow::anyhow!("Usage: s/pattern/replacement/"))
}

fn describe_save(outcome: SaveOutcome) -> Result<String> {
    match outcome {
        SaveOutcome::Saved(record) => Ok(format!("\"{}\" saved ({})", record.title, record.id)),
        SaveOutcome::TitleRequired => Err(anyhow::anyhow!("Title required (use :w <title>)")),
        SaveOutcome::Failed(reason) => Err(anyhow::anyhow!("保存に失敗しました: {}", reason)),
    }
}
