use std::{
    collections::HashMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use log::{debug, error, info, trace, warn};
use serde::{de::DeserializeOwned, Serialize};

use crate::{write_atomic, Note, NotepadError, Result, Settings, Todo};

/// Key holding the notes collection.
pub const NOTES_KEY: &str = "notes";
/// Key holding the todos collection.
pub const TODOS_KEY: &str = "todos";
/// Key holding the settings record.
pub const SETTINGS_KEY: &str = "settings";

const STORE_KEYS: [&str; 3] = [NOTES_KEY, TODOS_KEY, SETTINGS_KEY];

/// A string-keyed store of string values.
///
/// Every `set` replaces the whole value for the key; a reader never sees a
/// half-written value.
pub trait StorageBackend: Send {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn clear(&mut self) -> Result<()>;
}

/// Keeps one `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Opens (and creates, if needed) the data directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.exists() {
            debug!("Data directory does not exist, creating: {}", dir.display());
            fs::create_dir_all(&dir).map_err(|e| {
                error!("Failed to create data directory {}: {}", dir.display(), e);
                NotepadError::Storage {
                    message: format!("cannot create {}: {}", dir.display(), e),
                }
            })?;
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl StorageBackend for FileBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key);
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => {
                error!("Failed to read {}: {}", path.display(), e);
                Err(NotepadError::Io(e))
            }
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        write_atomic(&self.key_path(key), value)
    }

    fn clear(&mut self) -> Result<()> {
        for key in STORE_KEYS {
            let path = self.key_path(key);
            match fs::remove_file(&path) {
                Ok(()) => debug!("Removed {}", path.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(NotepadError::Io(e)),
            }
        }
        Ok(())
    }
}

/// In-memory backend. Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.values.lock().map_err(|_| NotepadError::Storage {
            message: "memory backend lock poisoned".to_string(),
        })
    }
}

impl StorageBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values()?.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.values()?.clear();
        Ok(())
    }
}

/// In-memory mirror of the three persisted collections.
pub struct Store {
    backend: Box<dyn StorageBackend>,
    pub(crate) notes: Vec<Note>,
    pub(crate) todos: Vec<Todo>,
    pub(crate) settings: Settings,
}

impl Store {
    /// Loads all collections from `backend`.
    ///
    /// Never fails: a missing, unreadable or malformed value is replaced
    /// by an empty collection or the default settings.
    pub fn load(backend: impl StorageBackend + 'static) -> Self {
        let backend: Box<dyn StorageBackend> = Box::new(backend);
        let notes: Vec<Note> = load_or_default(backend.as_ref(), NOTES_KEY);
        let todos: Vec<Todo> = load_or_default(backend.as_ref(), TODOS_KEY);
        let settings: Settings = load_or_default(backend.as_ref(), SETTINGS_KEY);

        info!("Loaded {} notes and {} todos", notes.len(), todos.len());
        Self {
            backend,
            notes,
            todos,
            settings,
        }
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn todos(&self) -> &[Todo] {
        &self.todos
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn save_notes(&mut self) -> Result<()> {
        persist(self.backend.as_mut(), NOTES_KEY, &self.notes)
    }

    pub fn save_todos(&mut self) -> Result<()> {
        persist(self.backend.as_mut(), TODOS_KEY, &self.todos)
    }

    pub fn save_settings(&mut self) -> Result<()> {
        persist(self.backend.as_mut(), SETTINGS_KEY, &self.settings)
    }

    pub fn save_all(&mut self) -> Result<()> {
        self.save_notes()?;
        self.save_todos()?;
        self.save_settings()
    }

    /// Wipes the backend and resets every collection to its default.
    ///
    /// The in-memory copy is only reset once the backend has been wiped.
    pub fn clear(&mut self) -> Result<()> {
        self.backend.clear()?;
        self.notes.clear();
        self.todos.clear();
        self.settings = Settings::default();
        info!("All stored data cleared");
        Ok(())
    }
}

fn load_or_default<T>(backend: &dyn StorageBackend, key: &str) -> T
where
    T: DeserializeOwned + Default,
{
    let raw = match backend.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!("No stored value for '{}', using default", key);
            return T::default();
        }
        Err(e) => {
            warn!("Failed to read '{}', using default: {}", key, e);
            return T::default();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => {
            trace!("Parsed stored value for '{}'", key);
            value
        }
        Err(e) => {
            warn!("Stored value for '{}' is malformed, using default: {}", key, e);
            T::default()
        }
    }
}

fn persist<T: Serialize + ?Sized>(
    backend: &mut dyn StorageBackend,
    key: &str,
    value: &T,
) -> Result<()> {
    let json = serde_json::to_string(value).map_err(|e| {
        error!("Failed to serialize '{}': {}", key, e);
        NotepadError::Serialization(e)
    })?;
    backend.set(key, &json).map_err(|e| {
        error!("Failed to persist '{}': {}", key, e);
        e
    })?;
    debug!("Persisted '{}'", key);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use pretty_assertions::assert_eq;

    fn sample_note(id: &str) -> Note {
        Note {
            id: id.to_string(),
            title: "Title".to_string(),
            content: "Body".to_string(),
            color: "transparent".to_string(),
            image: None,
            locked: false,
            date: "2024-01-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap(),
        }
    }

    #[test]
    fn empty_backend_loads_defaults() {
        let store = Store::load(MemoryBackend::new());
        assert!(store.notes().is_empty());
        assert!(store.todos().is_empty());
        assert_eq!(store.settings(), &Settings::default());
    }

    #[test]
    fn malformed_values_fall_back_per_key() {
        let mut backend = MemoryBackend::new();
        backend.set(NOTES_KEY, "{not json").unwrap();
        backend
            .set(TODOS_KEY, r#"[{"id":"1","text":"Call mom","completed":true}]"#)
            .unwrap();
        backend.set(SETTINGS_KEY, r#"{"pin":"12"}"#).unwrap();

        let store = Store::load(backend);
        assert!(store.notes().is_empty());
        assert_eq!(store.todos().len(), 1);
        assert!(store.todos()[0].completed);
        assert_eq!(store.settings(), &Settings::default());
    }

    #[test]
    fn unreadable_todo_time_does_not_drop_the_collection() {
        let mut backend = MemoryBackend::new();
        backend
            .set(
                TODOS_KEY,
                r#"[{"id":"1","text":"keep me","time":"","completed":false,"notified":false},
                    {"id":"2","text":"date only","time":"2024-01-05","completed":false,"notified":false}]"#,
            )
            .unwrap();

        let mut store = Store::load(backend.clone());
        assert_eq!(store.todos().len(), 2);
        assert_eq!(store.todos()[1].time, None);

        store.todos.push(Todo {
            id: "3".to_string(),
            text: "new".to_string(),
            time: None,
            completed: false,
            notified: false,
        });
        store.save_todos().unwrap();

        let texts: Vec<String> = Store::load(backend)
            .todos()
            .iter()
            .map(|t| t.text.clone())
            .collect();
        assert_eq!(texts, vec!["keep me", "date only", "new"]);
    }

    #[test]
    fn failed_clear_keeps_the_loaded_data() {
        let backend = FailingClear(MemoryBackend::new());
        let mut store = Store::load(backend.clone());
        store.notes.push(sample_note("1"));
        store.save_notes().unwrap();

        assert!(store.clear().is_err());
        assert_eq!(store.notes().len(), 1);
        assert_eq!(Store::load(backend).notes().len(), 1);
    }

    #[derive(Clone)]
    struct FailingClear(MemoryBackend);

    impl StorageBackend for FailingClear {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.0.get(key)
        }

        fn set(&mut self, key: &str, value: &str) -> Result<()> {
            self.0.set(key, value)
        }

        fn clear(&mut self) -> Result<()> {
            Err(NotepadError::Storage {
                message: "read-only".to_string(),
            })
        }
    }

    #[test]
    fn saved_collections_survive_reload() {
        let backend = MemoryBackend::new();
        let mut store = Store::load(backend.clone());
        store.notes.push(sample_note("1"));
        store.settings.dark_mode = false;
        store.save_all().unwrap();

        let reloaded = Store::load(backend);
        assert_eq!(reloaded.notes(), &[sample_note("1")]);
        assert!(!reloaded.settings().dark_mode);
    }

    #[test]
    fn file_backend_round_trip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(dir.path().join("data")).unwrap();

        let mut store = Store::load(backend.clone());
        store.notes.push(sample_note("42"));
        store.save_notes().unwrap();
        assert!(backend.dir().join("notes.json").exists());

        let mut reloaded = Store::load(backend.clone());
        assert_eq!(reloaded.notes().len(), 1);

        reloaded.clear().unwrap();
        assert!(!backend.dir().join("notes.json").exists());
        assert!(Store::load(backend).notes().is_empty());
    }

    #[test]
    fn file_backend_missing_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();
        assert_eq!(backend.get(TODOS_KEY).unwrap(), None);
    }
}
