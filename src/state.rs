// src/state.rs
//! Durable set of listing ids that were already delivered.
//!
//! The file is a bare newline-delimited list. Order in the file is insertion
//! order, oldest first, which is what `save` uses to decide what to evict.

use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub const DEFAULT_STATE_PATH: &str = "last_ids.txt";
pub const ENV_STATE_PATH: &str = "WM_STATE_PATH";
pub const DEFAULT_KEEP_LAST: usize = 5000;

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("reading state file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("writing state file {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Insertion-ordered id set. Re-inserting an id moves it to the newest end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeenIds {
    order: Vec<String>,
    index: HashSet<String>,
}

impl SeenIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains(id)
    }

    pub fn insert(&mut self, id: impl Into<String>) {
        let id = id.into();
        if id.is_empty() {
            return;
        }
        if !self.index.insert(id.clone()) {
            self.order.retain(|x| x != &id);
        }
        self.order.push(id);
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// The newest `keep_last` ids, oldest first.
    pub fn newest(&self, keep_last: usize) -> &[String] {
        let start = self.order.len().saturating_sub(keep_last);
        &self.order[start..]
    }

    fn parse(content: &str) -> Self {
        let mut ids = Self::new();
        for line in content.lines() {
            let t = line.trim();
            if t.is_empty() || t.starts_with('#') {
                continue;
            }
            ids.insert(t);
        }
        ids
    }
}

impl<S: Into<String>> FromIterator<S> for SeenIds {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut ids = Self::new();
        for id in iter {
            ids.insert(id);
        }
        ids
    }
}

#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$WM_STATE_PATH`, falling back to `last_ids.txt` in the working dir.
    pub fn from_env() -> Self {
        let path = std::env::var(ENV_STATE_PATH)
            .ok()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_STATE_PATH.to_string());
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing file means "nothing delivered yet".
    pub fn load(&self) -> Result<SeenIds, StateError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => {
                let ids = SeenIds::parse(&content);
                tracing::debug!(target: "state", path = %self.path.display(), ids = ids.len(), "state loaded");
                Ok(ids)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(target: "state", path = %self.path.display(), "no state file yet");
                Ok(SeenIds::new())
            }
            Err(source) => Err(StateError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Persist the newest `keep_last` ids via temp file + rename so a crash
    /// mid-write leaves the previous file intact.
    pub fn save(&self, ids: &SeenIds, keep_last: usize) -> Result<(), StateError> {
        let kept = ids.newest(keep_last);
        let body = kept.join("\n");
        self.write_atomic(body.as_bytes())
            .map_err(|source| StateError::Write {
                path: self.path.clone(),
                source,
            })?;
        tracing::info!(
            target: "state",
            path = %self.path.display(),
            kept = kept.len(),
            evicted = ids.len() - kept.len(),
            "state saved"
        );
        Ok(())
    }

    fn write_atomic(&self, bytes: &[u8]) -> io::Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let tmp = self.tmp_path();
        let res = (|| {
            let mut f = fs::File::create(&tmp)?;
            f.write_all(bytes)?;
            f.sync_all()?;
            fs::rename(&tmp, &self.path)
        })();
        if res.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        res
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "state".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
