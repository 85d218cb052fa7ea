//! Export and import of the whole data set as one JSON document.
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{write_atomic, ImportSummary, Note, Notepad, NotepadError, Result, Settings, Todo};

/// Everything the app stores, plus when it was exported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub notes: Vec<Note>,
    pub todos: Vec<Todo>,
    pub settings: Settings,
    pub export_date: DateTime<Utc>,
}

/// Shape accepted on import; every key is optional.
#[derive(Debug, Default, Deserialize)]
struct ImportDocument {
    #[serde(default)]
    notes: Option<Vec<Note>>,
    #[serde(default)]
    todos: Option<Vec<Todo>>,
    #[serde(default)]
    settings: Option<Map<String, Value>>,
}

/// File name used for exports taken at `unix_ms`.
pub fn export_file_name(unix_ms: i64) -> String {
    format!("notepad-backup-{}.json", unix_ms)
}

impl Notepad {
    /// Snapshot of every collection, stamped with the current time.
    pub fn export_document(&self) -> ExportDocument {
        ExportDocument {
            notes: self.notes().to_vec(),
            todos: self.todos().to_vec(),
            settings: self.settings().clone(),
            export_date: self.now(),
        }
    }

    /// Serializes the export document as pretty JSON.
    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.export_document())?)
    }

    /// Writes a backup file into `dir` and returns its path.
    pub fn export_to_dir(&self, dir: &Path) -> Result<PathBuf> {
        let document = self.export_document();
        let path = dir.join(export_file_name(document.export_date.timestamp_millis()));
        write_atomic(&path, &serde_json::to_string_pretty(&document)?)?;

        info!(
            "Exported {} notes and {} todos to {}",
            document.notes.len(),
            document.todos.len(),
            path.display()
        );
        Ok(path)
    }

    /// Applies an exported document.
    ///
    /// `notes` and `todos` replace the current collections when present and
    /// are left alone when absent. `settings` is merged key by key over the
    /// current settings. Nothing changes if the document does not parse.
    pub fn import_json(&mut self, json: &str) -> Result<ImportSummary> {
        let document: ImportDocument = serde_json::from_str(json).map_err(|e| {
            warn!("Rejected import: {}", e);
            NotepadError::Parse {
                message: e.to_string(),
            }
        })?;

        let settings = match &document.settings {
            Some(patch) => Some(self.settings().merged_with(patch)?),
            None => None,
        };

        let summary = ImportSummary {
            notes_imported: document.notes.as_ref().map(Vec::len),
            todos_imported: document.todos.as_ref().map(Vec::len),
            settings_merged: settings.is_some(),
        };

        if let Some(notes) = document.notes {
            self.store.notes = notes;
        }
        if let Some(todos) = document.todos {
            self.store.todos = todos;
        }
        if let Some(settings) = settings {
            self.store.settings = settings;
        }
        self.store.save_all()?;

        info!("Import complete: {:?}", summary);
        Ok(summary)
    }

    /// Reads and imports a backup file.
    pub fn import_file(&mut self, path: &Path) -> Result<ImportSummary> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            warn!("Cannot read import file {}: {}", path.display(), e);
            NotepadError::Io(e)
        })?;
        self.import_json(&json)
    }
}
