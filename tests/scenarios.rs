use std::sync::Arc;

use chrono::{DateTime, Utc};
use pretty_assertions::assert_eq;

use notepad::{
    run_reminder_pass, FileBackend, FixedClock, MemoryBackend, NoteDraft, NoteUpdate, Notepad,
    NotepadError, RecordingNotifier, Settings, Store, REMINDER_TITLE,
};

fn at(value: &str) -> DateTime<Utc> {
    value.parse().unwrap()
}

fn open(
    backend: impl notepad::StorageBackend + 'static,
    now: &str,
) -> (Notepad, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let notepad = Notepad::new(
        Store::load(backend),
        Arc::new(FixedClock::new(at(now))),
        notifier.clone(),
    );
    (notepad, notifier)
}

#[test]
fn overdue_rent_reminder_fires_once_and_is_persisted() {
    let backend = MemoryBackend::new();
    let (mut notepad, notifier) = open(backend.clone(), "2024-01-02T00:00:00Z");
    notepad
        .create_todo("Pay rent", Some(at("2024-01-01T00:00:00Z")))
        .unwrap();

    assert_eq!(run_reminder_pass(&mut notepad).unwrap(), 1);
    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].title, REMINDER_TITLE);
    assert_eq!(sent[0].body, "Pay rent");

    // A fresh process sees the flag and stays quiet.
    let (mut restarted, notifier) = open(backend, "2024-01-03T00:00:00Z");
    assert!(restarted.todos()[0].notified);
    assert_eq!(run_reminder_pass(&mut restarted).unwrap(), 0);
    assert!(notifier.sent().is_empty());
}

#[test]
fn search_for_meeting_returns_only_the_matching_note() {
    let (mut notepad, _) = open(MemoryBackend::new(), "2024-01-02T00:00:00Z");
    notepad
        .create_note(NoteDraft::new("Groceries", "eggs, milk"))
        .unwrap();
    notepad
        .create_note(NoteDraft::new("Team meeting", "quarterly planning"))
        .unwrap();

    let found = notepad.search_notes("meeting");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].title, "Team meeting");
}

#[test]
fn locked_note_wrong_pin_neither_reveals_nor_mutates() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FileBackend::open(dir.path()).unwrap();
    let (mut notepad, _) = open(backend.clone(), "2024-01-02T00:00:00Z");
    let note = notepad
        .create_note(NoteDraft {
            locked: true,
            ..NoteDraft::new("Diary", "dear diary")
        })
        .unwrap();
    let on_disk = std::fs::read_to_string(dir.path().join("notes.json")).unwrap();

    let edit = notepad.update_note(
        &note.id,
        NoteUpdate {
            content: Some("overwritten".into()),
            ..Default::default()
        },
        Some("9999"),
    );
    assert!(matches!(edit, Err(NotepadError::IncorrectPin)));
    assert!(matches!(
        notepad.delete_note(&note.id, Some("9999")),
        Err(NotepadError::IncorrectPin)
    ));
    let view = notepad.view_note(&note.id, Some("9999"));
    assert!(view.is_err_and(|e| e.is_auth()));

    assert_eq!(
        std::fs::read_to_string(dir.path().join("notes.json")).unwrap(),
        on_disk
    );
    assert_eq!(notepad.view_note(&note.id, Some("1234")).unwrap(), &note);
}

#[test]
fn file_backed_export_import_round_trip() {
    let source_dir = tempfile::tempdir().unwrap();
    let (mut source, _) = open(
        FileBackend::open(source_dir.path()).unwrap(),
        "2024-01-02T00:00:00Z",
    );
    source
        .create_note(NoteDraft::new("Team meeting", "agenda"))
        .unwrap();
    source
        .create_todo("Pay rent", Some(at("2024-02-01T00:00:00Z")))
        .unwrap();
    source.set_app_lock(true).unwrap();
    let backup = source.export_to_dir(source_dir.path()).unwrap();

    let target_dir = tempfile::tempdir().unwrap();
    let target_backend = FileBackend::open(target_dir.path()).unwrap();
    let (mut target, _) = open(target_backend.clone(), "2024-01-05T00:00:00Z");
    target.import_file(&backup).unwrap();

    let reloaded = Store::load(target_backend);
    assert_eq!(reloaded.notes(), source.notes());
    assert_eq!(reloaded.todos(), source.todos());
    assert_eq!(
        reloaded.settings(),
        &Settings {
            app_lock: true,
            ..Settings::default()
        }
    );
}

#[test]
fn corrupt_storage_files_fall_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("notes.json"), "[{\"id\":").unwrap();
    std::fs::write(dir.path().join("settings.json"), "null").unwrap();

    let (notepad, _) = open(
        FileBackend::open(dir.path()).unwrap(),
        "2024-01-02T00:00:00Z",
    );
    assert!(notepad.notes().is_empty());
    assert!(notepad.todos().is_empty());
    assert_eq!(notepad.settings(), &Settings::default());
}
