use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use anyhow::{anyhow, Context, Result};
use log::{debug, error};

/// One stored entry: field name to field value, both as text.
pub type Entry = BTreeMap<String, String>;

type Entries = BTreeMap<String, Entry>;

/// A persistent dictionary kept in a single file.
///
/// The whole file is loaded when a handle is acquired and written back when
/// the handle is released, if anything changed. Only one handle exists at a
/// time.
#[derive(Debug)]
pub struct Shelf {
    path: PathBuf,
    lock: Mutex<()>,
}

impl Shelf {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn acquire(&self) -> Result<ShelfHandle<'_>> {
        let guard = self.lock.lock().map_err(|_| anyhow!("shelf lock poisoned"))?;
        let entries = load(&self.path)?;

        Ok(ShelfHandle {
            path: &self.path,
            entries,
            dirty: false,
            _guard: guard,
        })
    }
}

fn load(path: &Path) -> Result<Entries> {
    match fs::read(path) {
        Ok(bytes) if bytes.is_empty() => Ok(Entries::new()),
        Ok(bytes) => postcard::from_bytes(&bytes)
            .with_context(|| format!("corrupt shelf file {}", path.display())),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Entries::new()),
        Err(err) => Err(err).with_context(|| format!("cannot read {}", path.display())),
    }
}

pub struct ShelfHandle<'a> {
    path: &'a Path,
    entries: Entries,
    dirty: bool,
    _guard: MutexGuard<'a, ()>,
}

impl ShelfHandle<'_> {
    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Entry)> {
        self.entries.iter()
    }

    pub fn insert(&mut self, key: impl Into<String>, entry: Entry) -> Option<Entry> {
        self.dirty = true;
        self.entries.insert(key.into(), entry)
    }

    pub fn remove(&mut self, key: &str) -> Option<Entry> {
        let removed = self.entries.remove(key);
        self.dirty |= removed.is_some();
        removed
    }

    /// Writes pending changes and releases the shelf.
    pub fn close(mut self) -> Result<()> {
        self.sync()
    }

    fn sync(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }

        let bytes = postcard::to_allocvec(&self.entries)?;
        // write next to the target, then swap it in
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, bytes).with_context(|| format!("cannot write {}", tmp.display()))?;
        fs::rename(&tmp, self.path)
            .with_context(|| format!("cannot replace {}", self.path.display()))?;

        self.dirty = false;
        debug!("Synced {} entries to {}", self.entries.len(), self.path.display());
        Ok(())
    }
}

impl Drop for ShelfHandle<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.sync() {
            error!("Lost shelf changes: {err:#}");
        }
    }
}
