//! Key-value storage port and its stock implementations.
//!
//! The engine reads two keys at startup and writes them through after every
//! relevant mutation: the full collection snapshot and the sidebar
//! preference. Storage failures are the caller's to degrade on; both
//! implementations report them as plain errors and never panic.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

use crate::text::sanitize_filename;

/// Key holding the JSON-serialized folder collection.
pub const COLLECTION_KEY: &str = "tabledeck.collection";

/// Key holding the sidebar-collapsed boolean preference.
pub const SIDEBAR_KEY: &str = "tabledeck.sidebar-collapsed";

pub trait Storage {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Volatile in-memory storage, the default for tests and embedding shells
/// that bring their own persistence.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Directory-backed storage: one file per key under a root directory, the
/// key sanitized into a filename.
#[derive(Debug)]
pub struct DirStorage {
    root: PathBuf,
}

impl DirStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", sanitize_filename(key)))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Storage for DirStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let text =
            fs::read_to_string(&path).with_context(|| format!("Reading {path:?}"))?;
        Ok(Some(text))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("Creating storage directory {:?}", self.root))?;
        let path = self.key_path(key);
        fs::write(&path, value).with_context(|| format!("Writing {path:?}"))
    }
}
