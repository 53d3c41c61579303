use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info, warn};

use common::time::now_iso;
use models::Record;

use super::backup::BackupRotation;
use super::document::{Document, PAGES, SETTINGS};
use super::errors::StoreError;

/// Store tuning, usually built from `configs::StoreConfig`.
#[derive(Clone, Copy, Debug)]
pub struct StoreOptions {
    pub backup_enabled: bool,
    pub max_backups: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self { backup_enabled: true, max_backups: 5 }
    }
}

impl From<&configs::StoreConfig> for StoreOptions {
    fn from(cfg: &configs::StoreConfig) -> Self {
        Self { backup_enabled: cfg.backup_enabled, max_backups: cfg.max_backups }
    }
}

/// How many matches `delete_one` removes.
///
/// The historical behavior of "delete one" was to drop every match in a single
/// pass; callers have to pick explicitly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteMode {
    /// Remove only the first match in collection order.
    FirstMatch,
    /// Remove every match.
    AllMatches,
}

/// Result of a closure run under the store lock: whether the document must be written.
enum Outcome<T> {
    Write(T),
    Skip(T),
}

/// Thread-safe JSON document store.
///
/// Every public operation holds one process-wide lock for its whole duration,
/// so reads and mutations never interleave. Mutations back up the current file
/// (when enabled), write the new document to `<file>.tmp`, fsync it and rename
/// it over the live file. Mutations that match nothing write nothing.
pub struct DocumentStore {
    data_file: PathBuf,
    temp_file: PathBuf,
    backups: BackupRotation,
    lock: Mutex<()>,
}

impl DocumentStore {
    /// Open (and create, if absent) the data file at `path`.
    pub fn open<P: Into<PathBuf>>(path: P, options: StoreOptions) -> Result<Arc<Self>, StoreError> {
        let data_file = path.into();
        if let Some(parent) = data_file.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        let store = Self {
            temp_file: data_file.with_extension("tmp"),
            backups: BackupRotation::new(&data_file, options.backup_enabled, options.max_backups),
            data_file,
            lock: Mutex::new(()),
        };
        {
            let _guard = store.lock.lock();
            if !store.data_file.exists() {
                store.persist(&mut Document::empty())?;
                info!(path = %store.data_file.display(), "created empty data file");
            }
        }
        Ok(Arc::new(store))
    }

    pub fn from_config(cfg: &configs::StoreConfig) -> Result<Arc<Self>, StoreError> {
        Self::open(cfg.data_file.clone(), StoreOptions::from(cfg))
    }

    pub fn path(&self) -> &Path {
        &self.data_file
    }

    pub fn backup_dir(&self) -> &Path {
        self.backups.dir()
    }

    // ---------------------------------------------------------------------
    // Whole-document access
    // ---------------------------------------------------------------------

    /// Load the document. A missing or unparseable file is replaced by an empty
    /// document; this never fails.
    pub fn read_all(&self) -> Document {
        let _guard = self.lock.lock();
        self.load()
    }

    /// Replace the whole document (backup first, `updated_at` refreshed).
    pub fn write_all(&self, mut doc: Document) -> Result<(), StoreError> {
        let _guard = self.lock.lock();
        self.backups.snapshot(&self.data_file);
        self.persist(&mut doc)
    }

    // ---------------------------------------------------------------------
    // Collection reads
    // ---------------------------------------------------------------------

    /// A list collection's raw values; missing or non-list keys yield `[]`.
    pub fn get_collection(&self, name: &str) -> Vec<Value> {
        self.read_all().collection(name).cloned().unwrap_or_default()
    }

    pub fn find_one<P>(&self, name: &str, predicate: P) -> Option<Record>
    where
        P: Fn(&Record) -> bool,
    {
        self.read_all().records(name).find(|r| predicate(*r)).cloned()
    }

    pub fn find_many<P>(&self, name: &str, predicate: P) -> Vec<Record>
    where
        P: Fn(&Record) -> bool,
    {
        self.read_all().records(name).filter(|r| predicate(*r)).cloned().collect()
    }

    /// Collection length, or the number of records matching `predicate`.
    pub fn count(&self, name: &str, predicate: Option<&dyn Fn(&Record) -> bool>) -> usize {
        let doc = self.read_all();
        match predicate {
            None => doc.collection(name).map(Vec::len).unwrap_or(0),
            Some(p) => doc.records(name).filter(|r| p(*r)).count(),
        }
    }

    // ---------------------------------------------------------------------
    // Collection mutations
    // ---------------------------------------------------------------------

    /// Stamp `created_at`/`updated_at`, append to `name` (created if absent) and persist.
    /// Duplicate ids are not checked.
    pub fn insert_one(&self, name: &str, mut record: Record) -> Result<Record, StoreError> {
        self.transact(|doc| {
            let items = doc.collection_mut(name)?;
            let now = now_iso();
            record.insert("created_at".into(), Value::from(now.clone()));
            record.insert("updated_at".into(), Value::from(now));
            items.push(Value::Object(record.clone()));
            debug!(collection = name, "inserted record");
            Ok(Outcome::Write(record))
        })
    }

    /// `insert_one`, unless some record already matches `conflict`.
    /// Returns `None` (and writes nothing) on conflict. Check and insert share one lock.
    pub fn insert_unless<P>(&self, name: &str, conflict: P, mut record: Record) -> Result<Option<Record>, StoreError>
    where
        P: Fn(&Record) -> bool,
    {
        self.transact(|doc| {
            if doc.records(name).any(|r| conflict(r)) {
                return Ok(Outcome::Skip(None));
            }
            let items = doc.collection_mut(name)?;
            let now = now_iso();
            record.insert("created_at".into(), Value::from(now.clone()));
            record.insert("updated_at".into(), Value::from(now));
            items.push(Value::Object(record.clone()));
            debug!(collection = name, "inserted record");
            Ok(Outcome::Write(Some(record)))
        })
    }

    /// Shallow-merge `patch` over the first match (patch fields win, nested
    /// objects are replaced wholesale) and refresh its `updated_at`.
    /// Returns false, without writing or backing up, when nothing matches.
    pub fn update_one<P>(&self, name: &str, predicate: P, patch: Record) -> Result<bool, StoreError>
    where
        P: Fn(&Record) -> bool,
    {
        let updated = self.modify_one(name, predicate, |record| {
            for (key, value) in patch {
                record.insert(key, value);
            }
            Ok::<_, StoreError>(())
        })?;
        Ok(updated.is_some())
    }

    /// Run `edit` on the first match in place and persist, all under the lock.
    ///
    /// `Ok(None)` when nothing matches. If `edit` returns an error nothing is
    /// written. `updated_at` is stamped after `edit` runs.
    pub fn modify_one<T, E, P, F>(&self, name: &str, predicate: P, edit: F) -> Result<Option<T>, E>
    where
        P: Fn(&Record) -> bool,
        F: FnOnce(&mut Record) -> Result<T, E>,
        E: From<StoreError>,
    {
        self.transact(|doc| {
            let Some(record) = first_match_mut(doc, name, &predicate) else {
                return Ok(Outcome::Skip(None));
            };
            let out = edit(record)?;
            record.insert("updated_at".into(), Value::from(now_iso()));
            debug!(collection = name, "updated record");
            Ok(Outcome::Write(Some(out)))
        })
    }

    /// Remove the first match or every match, per `mode`. Writes only if something was removed.
    pub fn delete_one<P>(&self, name: &str, predicate: P, mode: DeleteMode) -> Result<bool, StoreError>
    where
        P: Fn(&Record) -> bool,
    {
        self.transact(|doc| {
            let Some(items) = doc.existing_collection_mut(name) else {
                return Ok(Outcome::Skip(false));
            };
            let removed = match mode {
                DeleteMode::FirstMatch => match items.iter().position(|v| matches(v, &predicate)) {
                    Some(idx) => {
                        items.remove(idx);
                        1
                    }
                    None => 0,
                },
                DeleteMode::AllMatches => remove_matches(items, &predicate),
            };
            if removed == 0 {
                return Ok(Outcome::Skip(false));
            }
            debug!(collection = name, removed, ?mode, "deleted records");
            Ok(Outcome::Write(true))
        })
    }

    /// Remove every match; returns how many were removed.
    pub fn delete_many<P>(&self, name: &str, predicate: P) -> Result<usize, StoreError>
    where
        P: Fn(&Record) -> bool,
    {
        self.transact(|doc| {
            let Some(items) = doc.existing_collection_mut(name) else {
                return Ok(Outcome::Skip(0));
            };
            let removed = remove_matches(items, &predicate);
            if removed == 0 {
                return Ok(Outcome::Skip(0));
            }
            debug!(collection = name, removed, "deleted records");
            Ok(Outcome::Write(removed))
        })
    }

    /// Replace a whole list collection.
    pub fn set_collection(&self, name: &str, items: Vec<Value>) -> Result<(), StoreError> {
        self.transact(|doc| {
            *doc.collection_mut(name)? = items;
            Ok(Outcome::Write(()))
        })
    }

    // ---------------------------------------------------------------------
    // Settings and pages
    // ---------------------------------------------------------------------

    pub fn get_settings(&self) -> Record {
        self.read_all().settings()
    }

    /// Shallow-merge `partial` into `settings`; returns the merged settings.
    pub fn update_settings(&self, partial: Record) -> Result<Record, StoreError> {
        self.transact(|doc| {
            let settings = doc.object_mut(SETTINGS);
            for (key, value) in partial {
                settings.insert(key, value);
            }
            Ok(Outcome::Write(settings.clone()))
        })
    }

    pub fn get_page(&self, slug: &str) -> Option<Record> {
        self.read_all().pages().get(slug).and_then(Value::as_object).cloned()
    }

    pub fn list_pages(&self) -> Record {
        self.read_all().pages()
    }

    /// Create or replace `pages.<slug>`, stamping its `updated_at`.
    pub fn update_page(&self, slug: &str, mut page: Record) -> Result<Record, StoreError> {
        self.transact(|doc| {
            page.insert("updated_at".into(), Value::from(now_iso()));
            doc.object_mut(PAGES).insert(slug.to_string(), Value::Object(page.clone()));
            Ok(Outcome::Write(page))
        })
    }

    // ---------------------------------------------------------------------
    // Backups
    // ---------------------------------------------------------------------

    /// Retained backups, newest first.
    pub fn list_backups(&self) -> Vec<String> {
        let _guard = self.lock.lock();
        self.backups.list()
    }

    /// Replace the live file with a retained backup.
    ///
    /// The current state is backed up first. Unknown names and backups that do
    /// not hold a JSON object return `Ok(false)` and leave the live file alone.
    pub fn restore_from_backup(&self, name: &str) -> Result<bool, StoreError> {
        let _guard = self.lock.lock();
        let Some(path) = self.backups.path_of(name) else {
            warn!(backup = %name, "backup not found");
            return Ok(false);
        };
        // Read before the safety backup: pruning may remove `path`.
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(backup = %name, error = %e, "cannot read backup");
                return Ok(false);
            }
        };
        if let Err(e) = serde_json::from_slice::<Document>(&bytes) {
            warn!(backup = %name, error = %e, "backup is not a valid document");
            return Ok(false);
        }
        self.backups.snapshot(&self.data_file);
        self.replace_file(&bytes)?;
        info!(backup = %name, "data restored from backup");
        Ok(true)
    }

    // ---------------------------------------------------------------------
    // Internals; callers must hold `self.lock`.
    // ---------------------------------------------------------------------

    fn transact<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Document) -> Result<Outcome<T>, E>,
        E: From<StoreError>,
    {
        let _guard = self.lock.lock();
        let mut doc = self.try_load()?;
        match f(&mut doc)? {
            Outcome::Skip(out) => Ok(out),
            Outcome::Write(out) => {
                self.backups.snapshot(&self.data_file);
                self.persist(&mut doc)?;
                Ok(out)
            }
        }
    }

    /// Infallible read for queries: an unreadable file serves an empty document.
    fn load(&self) -> Document {
        self.try_load().unwrap_or_else(|e| {
            warn!(error = %e, "cannot read data file; serving an empty document");
            Document::empty()
        })
    }

    /// Missing and corrupt files are reset. Any other read error is returned so
    /// that a write never lands on top of a file it could not see.
    fn try_load(&self) -> Result<Document, StoreError> {
        match fs::read(&self.data_file) {
            Ok(bytes) => match serde_json::from_slice::<Value>(&bytes) {
                Ok(Value::Object(map)) => Ok(Document::from_map(map)),
                Ok(_) => {
                    warn!(path = %self.data_file.display(), "data file is not a JSON object; resetting");
                    Ok(self.reset_unreadable())
                }
                Err(e) => {
                    warn!(path = %self.data_file.display(), error = %e, "data file is corrupt; resetting");
                    Ok(self.reset_unreadable())
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(path = %self.data_file.display(), "data file missing; recreating");
                Ok(self.reset_unreadable())
            }
            Err(e) => Err(StoreError::io(&self.data_file, e)),
        }
    }

    /// Keep a copy of the unreadable file in the rotation, then write an empty document.
    fn reset_unreadable(&self) -> Document {
        self.backups.snapshot(&self.data_file);
        let mut doc = Document::empty();
        if let Err(e) = self.persist(&mut doc) {
            warn!(path = %self.data_file.display(), error = %e, "could not rewrite data file");
        }
        doc
    }

    fn persist(&self, doc: &mut Document) -> Result<(), StoreError> {
        doc.heal();
        doc.touch(&now_iso());
        let bytes = serde_json::to_vec_pretty(doc)?;
        self.replace_file(&bytes)
    }

    /// Write `bytes` to the temp file, fsync, then rename over the data file.
    fn replace_file(&self, bytes: &[u8]) -> Result<(), StoreError> {
        let written = File::create(&self.temp_file).and_then(|mut f| {
            f.write_all(bytes)?;
            f.sync_all()
        });
        if let Err(e) = written {
            let _ = fs::remove_file(&self.temp_file);
            return Err(StoreError::io(&self.temp_file, e));
        }
        if let Err(e) = fs::rename(&self.temp_file, &self.data_file) {
            warn!(temp = %self.temp_file.display(), error = %e, "rename failed, cleaning up temp file");
            let _ = fs::remove_file(&self.temp_file);
            return Err(StoreError::io(&self.data_file, e));
        }
        Ok(())
    }
}

fn matches<P: Fn(&Record) -> bool>(value: &Value, predicate: &P) -> bool {
    value.as_object().map(|r| predicate(r)).unwrap_or(false)
}

fn first_match_mut<'a, P: Fn(&Record) -> bool>(
    doc: &'a mut Document,
    name: &str,
    predicate: &P,
) -> Option<&'a mut Record> {
    doc.existing_collection_mut(name)?
        .iter_mut()
        .find(|v| matches(v, predicate))
        .and_then(Value::as_object_mut)
}

fn remove_matches<P: Fn(&Record) -> bool>(items: &mut Vec<Value>, predicate: &P) -> usize {
    let before = items.len();
    items.retain(|v| !matches(v, predicate));
    before - items.len()
}
