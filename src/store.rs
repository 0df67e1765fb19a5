//! Persisted set of patterns the user has confirmed are wrong.
//!
//! The set is stored as a JSON array of pattern keys in insertion order,
//! e.g. `["0-1-2-5-8","6-4-2-5"]`. Storage is reached only through the
//! [`PatternStorage`] capability so tests can swap in [`MemoryStorage`].

use std::cell::RefCell;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::error::{PatlockError, Result};
use crate::pattern::{PatternKey, MIN_PATTERN_LEN, TOTAL_PATTERNS};

/// Raw get/set of the serialized rejected set.
pub trait PatternStorage {
    /// `Ok(None)` when nothing has been stored yet.
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, data: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PatternStorage for FileStorage {
    fn load(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(data) => Ok(Some(data)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, data: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, data)?;
        Ok(())
    }
}

/// In-memory storage; clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slot: Rc<RefCell<Option<String>>>,
    fail_writes: Rc<RefCell<bool>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(data: &str) -> Self {
        let storage = Self::default();
        *storage.slot.borrow_mut() = Some(data.to_string());
        storage
    }

    pub fn contents(&self) -> Option<String> {
        self.slot.borrow().clone()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.borrow_mut() = fail;
    }
}

impl PatternStorage for MemoryStorage {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.contents())
    }

    fn save(&self, data: &str) -> Result<()> {
        if *self.fail_writes.borrow() {
            return Err(io::Error::other("memory storage is read-only").into());
        }
        *self.slot.borrow_mut() = Some(data.to_string());
        Ok(())
    }
}

/// Insertion-ordered set of pattern keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RejectedSet {
    order: Vec<PatternKey>,
    members: HashSet<PatternKey>,
}

impl RejectedSet {
    /// Returns `false` when the key was already present.
    pub fn insert(&mut self, key: PatternKey) -> bool {
        if self.members.contains(&key) {
            return false;
        }
        self.members.insert(key.clone());
        self.order.push(key);
        true
    }

    pub fn contains(&self, key: &PatternKey) -> bool {
        self.members.contains(key)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PatternKey> {
        self.order.iter()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.members.clear();
    }

    pub fn remaining(&self) -> usize {
        TOTAL_PATTERNS.saturating_sub(self.len())
    }
}

impl FromIterator<PatternKey> for RejectedSet {
    fn from_iter<I: IntoIterator<Item = PatternKey>>(iter: I) -> Self {
        let mut set = RejectedSet::default();
        for key in iter {
            set.insert(key);
        }
        set
    }
}

/// Owns the rejected set and writes it back after every mutation.
#[derive(Debug)]
pub struct RejectedStore<S: PatternStorage> {
    storage: S,
    set: RejectedSet,
}

impl<S: PatternStorage> RejectedStore<S> {
    /// Loads the persisted set once. Missing or corrupt data yields an empty
    /// set; undecodable or too-short entries are dropped.
    pub fn open(storage: S) -> Self {
        let set = match storage.load() {
            Ok(Some(data)) => parse_rejected(&data),
            Ok(None) => {
                debug!("no rejected patterns stored yet");
                RejectedSet::default()
            }
            Err(err) => {
                warn!(error = %err, "failed to read rejected patterns, starting empty");
                RejectedSet::default()
            }
        };
        info!(rejected = set.len(), "rejected pattern history loaded");
        Self { storage, set }
    }

    pub fn set(&self) -> &RejectedSet {
        &self.set
    }

    pub fn contains(&self, key: &PatternKey) -> bool {
        self.set.contains(key)
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.set.remaining()
    }

    /// Adds `key` and persists. Re-inserting an existing key is a no-op and
    /// does not touch storage.
    pub fn insert(&mut self, key: PatternKey) -> bool {
        let added = self.set.insert(key);
        if added {
            self.persist();
        }
        added
    }

    pub fn clear(&mut self) {
        self.set.clear();
        self.persist();
    }

    // Best effort: a failed write is logged and the in-memory set stays
    // authoritative for the rest of the session.
    fn persist(&self) {
        let keys: Vec<&PatternKey> = self.set.iter().collect();
        let result = serde_json::to_string(&keys)
            .map_err(PatlockError::from)
            .and_then(|data| self.storage.save(&data));
        match result {
            Ok(()) => debug!(rejected = self.set.len(), "rejected patterns persisted"),
            Err(err) => warn!(error = %err, "failed to persist rejected patterns"),
        }
    }
}

fn parse_rejected(data: &str) -> RejectedSet {
    let raw: Vec<String> = match serde_json::from_str(data) {
        Ok(raw) => raw,
        Err(err) => {
            warn!(error = %err, "stored rejected patterns are unparsable, starting empty");
            return RejectedSet::default();
        }
    };

    raw.into_iter()
        .filter_map(|entry| match entry.parse::<PatternKey>() {
            Ok(key) if key.decode().is_ok_and(|pattern| pattern.is_complete()) => Some(key),
            Ok(key) => {
                warn!(%key, min = MIN_PATTERN_LEN, "skipping stored pattern that is too short");
                None
            }
            Err(err) => {
                warn!(error = %err, "skipping stored pattern key");
                None
            }
        })
        .collect()
}
