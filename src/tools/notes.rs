/// Note Tools and Note Store
///
/// Notes are kept in one JSON document mapping title to note. `NoteStore`
/// owns that document: it loads it once at startup, serializes every access
/// through a single mutex, and rewrites the whole file on each change
/// (written to a sibling temp file, then renamed into place). The in-memory
/// copy is only replaced after the file write succeeds, so readers never see
/// a change that did not reach disk.
///
/// Tools: note_create, note_list, note_read, note_delete

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::error::{NoteStoreError, RegistryError, ToolError};
use crate::core::registry::{ContentItem, ToolOutput, ToolRegistry, ToolSpec};
use crate::tools::required_str;

const PREVIEW_CHARS: usize = 50;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Note {
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Title to note, in insertion order.
pub type Notes = IndexMap<String, Note>;

pub struct NoteStore {
    path: PathBuf,
    notes: Mutex<Notes>,
}

impl NoteStore {
    /// Load the store from `path`. A missing or empty file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, NoteStoreError> {
        let path = path.into();
        let notes = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => Notes::new(),
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Notes::new(),
            Err(e) => return Err(io_error(&path, e)),
        };
        tracing::info!(path = %path.display(), notes = notes.len(), "note store loaded");
        Ok(Self {
            path,
            notes: Mutex::new(notes),
        })
    }

    #[cfg(test)]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Hold the store lock, as a mutation in progress would.
    #[cfg(test)]
    pub(crate) fn lock(&self) -> parking_lot::MutexGuard<'_, Notes> {
        self.notes.lock()
    }

    pub fn snapshot(&self) -> Notes {
        self.notes.lock().clone()
    }

    pub fn get(&self, title: &str) -> Option<Note> {
        self.notes.lock().get(title).cloned()
    }

    /// Insert or overwrite a note. Overwriting keeps the original creation
    /// time. Returns `true` when the title was new.
    pub fn upsert(&self, title: &str, content: &str) -> Result<bool, NoteStoreError> {
        let mut notes = self.notes.lock();
        let now = Utc::now();
        let mut next = notes.clone();
        let created = match next.get_mut(title) {
            Some(note) => {
                note.content = content.to_string();
                note.updated_at = now;
                false
            }
            None => {
                next.insert(
                    title.to_string(),
                    Note {
                        content: content.to_string(),
                        created_at: now,
                        updated_at: now,
                    },
                );
                true
            }
        };
        self.persist(&next)?;
        *notes = next;
        Ok(created)
    }

    /// Remove a note, returning it if it existed.
    pub fn remove(&self, title: &str) -> Result<Option<Note>, NoteStoreError> {
        let mut notes = self.notes.lock();
        if !notes.contains_key(title) {
            return Ok(None);
        }
        let mut next = notes.clone();
        let removed = next.shift_remove(title);
        self.persist(&next)?;
        *notes = next;
        Ok(removed)
    }

    fn persist(&self, notes: &Notes) -> Result<(), NoteStoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }
        let document = serde_json::to_string_pretty(notes)?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        if let Err(e) = fs::write(&tmp, document) {
            discard(&tmp);
            return Err(io_error(&tmp, e));
        }
        if let Err(e) = fs::rename(&tmp, &self.path) {
            discard(&tmp);
            return Err(io_error(&self.path, e));
        }

        tracing::debug!(path = %self.path.display(), notes = notes.len(), "note store saved");
        Ok(())
    }
}

/// Best-effort removal of a leftover temp file.
fn discard(tmp: &Path) {
    if let Err(e) = fs::remove_file(tmp) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %tmp.display(), error = %e, "failed to remove temp file");
        }
    }
}

fn io_error(path: &Path, source: std::io::Error) -> NoteStoreError {
    NoteStoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

pub fn register(registry: &mut ToolRegistry, store: Arc<NoteStore>) -> Result<(), RegistryError> {
    let title_only = |description: &str| {
        json!({
            "type": "object",
            "properties": {
                "title": {
                    "type": "string",
                    "description": description
                }
            },
            "required": ["title"]
        })
    };

    let notes = Arc::clone(&store);
    registry.register(
        ToolSpec::new(
            "note_create",
            "Create a new note with a title and content. Notes are persisted to disk.",
            json!({
                "type": "object",
                "properties": {
                    "title": {
                        "type": "string",
                        "description": "Title of the note (used as identifier)"
                    },
                    "content": {
                        "type": "string",
                        "description": "Content of the note"
                    }
                },
                "required": ["title", "content"]
            }),
        ),
        move |args: &Value| create(&notes, args),
    )?;

    let notes = Arc::clone(&store);
    registry.register(
        ToolSpec::new(
            "note_list",
            "List all saved notes with their titles and creation dates.",
            json!({"type": "object", "properties": {}, "required": []}),
        ),
        move |_: &Value| list(&notes),
    )?;

    let notes = Arc::clone(&store);
    registry.register(
        ToolSpec::new(
            "note_read",
            "Read the content of a specific note by title.",
            title_only("Title of the note to read"),
        ),
        move |args: &Value| read(&notes, args),
    )?;

    let notes = store;
    registry.register(
        ToolSpec::new(
            "note_delete",
            "Delete a note by title.",
            title_only("Title of the note to delete"),
        ),
        move |args: &Value| delete(&notes, args),
    )
}

fn title_arg(args: &Value) -> Result<&str, ToolError> {
    let title = required_str(args, "title")?.trim();
    if title.is_empty() {
        return Err(ToolError::invalid("title", "note title must not be empty"));
    }
    Ok(title)
}

fn create(store: &NoteStore, args: &Value) -> ToolOutput {
    let title = title_arg(args)?;
    let content = required_str(args, "content")?;
    let created = store.upsert(title, content)?;
    let verb = if created { "saved" } else { "updated" };
    Ok(vec![ContentItem::text(format!("Note '{title}' {verb} successfully!"))])
}

fn list(store: &NoteStore) -> ToolOutput {
    let notes = store.snapshot();
    if notes.is_empty() {
        return Ok(vec![ContentItem::text(
            "No notes found. Create one with note_create!",
        )]);
    }

    let mut lines = vec!["Your Notes:\n".to_string()];
    for (title, note) in &notes {
        let mut preview: String = note.content.chars().take(PREVIEW_CHARS).collect();
        if note.content.chars().count() > PREVIEW_CHARS {
            preview.push_str("...");
        }
        lines.push(format!(
            "- **{}** (created: {})\n  {}\n",
            title,
            note.created_at.format("%Y-%m-%d"),
            preview
        ));
    }
    Ok(vec![ContentItem::text(lines.join("\n"))])
}

fn read(store: &NoteStore, args: &Value) -> ToolOutput {
    let title = title_arg(args)?;
    let text = match store.get(title) {
        Some(note) => format!(
            "**{}**\n\n{}\n\n_Created: {}_",
            title,
            note.content,
            note.created_at.to_rfc3339()
        ),
        None => format!("Note '{title}' not found"),
    };
    Ok(vec![ContentItem::text(text)])
}

fn delete(store: &NoteStore, args: &Value) -> ToolOutput {
    let title = title_arg(args)?;
    let text = match store.remove(title)? {
        Some(_) => format!("Note '{title}' deleted successfully!"),
        None => format!("Note '{title}' not found"),
    };
    Ok(vec![ContentItem::text(text)])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (NoteStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = NoteStore::open(dir.path().join("data").join("notes.json")).unwrap();
        (store, dir)
    }

    #[test]
    fn missing_file_opens_empty_and_first_write_creates_it() {
        let (store, _dir) = temp_store();
        assert!(store.snapshot().is_empty());
        assert!(!store.path().exists());

        assert!(store.upsert("first", "hello").unwrap());
        assert!(store.path().exists());
    }

    #[test]
    fn notes_survive_reopen_in_insertion_order() {
        let (store, _dir) = temp_store();
        store.upsert("b", "2").unwrap();
        store.upsert("a", "1").unwrap();

        let reopened = NoteStore::open(store.path()).unwrap();
        let titles: Vec<_> = reopened.snapshot().keys().cloned().collect();
        assert_eq!(titles, vec!["b", "a"]);
        assert_eq!(reopened.get("a").unwrap().content, "1");
    }

    #[test]
    fn overwrite_keeps_created_at() {
        let (store, _dir) = temp_store();
        assert!(store.upsert("t", "v1").unwrap());
        let first = store.get("t").unwrap();

        assert!(!store.upsert("t", "v2").unwrap());
        let second = store.get("t").unwrap();
        assert_eq!(second.content, "v2");
        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at >= first.updated_at);
    }

    #[test]
    fn persisted_layout_is_title_keyed_document() {
        let (store, _dir) = temp_store();
        store.upsert("todo", "buy milk").unwrap();

        let raw: Value = serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        let note = &raw["todo"];
        assert_eq!(note["content"], "buy milk");
        for key in ["created_at", "updated_at"] {
            let stamp = note[key].as_str().unwrap();
            assert!(DateTime::parse_from_rfc3339(stamp).is_ok(), "{key}: {stamp}");
        }
    }

    #[test]
    fn failed_write_leaves_memory_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the document should be makes the rename fail.
        let path = dir.path().join("notes.json");
        fs::create_dir(&path).unwrap();
        let store = NoteStore {
            path,
            notes: Mutex::new(Notes::new()),
        };

        assert!(store.upsert("t", "v").is_err());
        assert!(store.get("t").is_none());
        assert!(!dir.path().join("notes.json.tmp").exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_all_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.json");
        let store = Arc::new(NoteStore::open(&path).unwrap());
        let mut registry = ToolRegistry::new();
        register(&mut registry, Arc::clone(&store)).unwrap();
        let dispatcher = crate::core::dispatch::Dispatcher::new(Arc::new(registry));

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move {
                    dispatcher
                        .call(
                            "note_create".to_string(),
                            json!({"title": format!("note-{i}"), "content": format!("body {i}")}),
                        )
                        .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(store.snapshot().len(), 16);
        let reopened = NoteStore::open(&path).unwrap();
        for i in 0..16 {
            let note = reopened.get(&format!("note-{i}")).unwrap();
            assert_eq!(note.content, format!("body {i}"));
        }
    }

    #[test]
    fn corrupt_document_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(NoteStore::open(&path), Err(NoteStoreError::Corrupt(_))));
    }

    #[test]
    fn tool_flow_create_list_read_delete() {
        let (store, _dir) = temp_store();

        let out = create(&store, &json!({"title": "  Groceries ", "content": "eggs"})).unwrap();
        assert_eq!(out[0].as_text(), "Note 'Groceries' saved successfully!");

        let listing = list(&store).unwrap();
        assert!(listing[0].as_text().starts_with("Your Notes:"));
        assert!(listing[0].as_text().contains("**Groceries**"));

        let body = read(&store, &json!({"title": "Groceries"})).unwrap();
        assert!(body[0].as_text().starts_with("**Groceries**\n\neggs"));

        let gone = delete(&store, &json!({"title": "Groceries"})).unwrap();
        assert_eq!(gone[0].as_text(), "Note 'Groceries' deleted successfully!");

        let missing = read(&store, &json!({"title": "Groceries"})).unwrap();
        assert_eq!(missing[0].as_text(), "Note 'Groceries' not found");
        assert!(list(&store).unwrap()[0].as_text().starts_with("No notes found"));
    }

    #[test]
    fn long_content_is_truncated_in_listing() {
        let (store, _dir) = temp_store();
        store.upsert("long", &"x".repeat(80)).unwrap();
        let listing = list(&store).unwrap();
        assert!(listing[0].as_text().contains(&format!("{}...", "x".repeat(50))));
    }

    #[test]
    fn blank_title_is_rejected() {
        let (store, _dir) = temp_store();
        assert!(matches!(
            create(&store, &json!({"title": " ", "content": "c"})),
            Err(ToolError::InvalidArgument { .. })
        ));
    }
}
