// src/fs/mock.rs

use super::FileSystem;
use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

/// First tick handed out by the mock clock, in seconds since the epoch.
const CLOCK_START: u64 = 1_000_000;

#[derive(Debug, Clone)]
pub enum MockEntry {
    File { content: Vec<u8>, mtime: u64 },
    Dir(Vec<String>), // List of child names
}

#[derive(Debug, Default)]
struct MockState {
    files: HashMap<PathBuf, MockEntry>,
    clock: u64,
}

/// In-memory filesystem with explicit modification times.
///
/// Writes and touches stamp files with a monotonically increasing clock, so a
/// file written later is always strictly newer. `stat_count` counts calls to
/// [`FileSystem::modified`].
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    state: Arc<Mutex<MockState>>,
    stats: Arc<AtomicUsize>,
}

pub fn mtime_secs(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
}

impl MockFileSystem {
    pub fn new() -> Self {
        let mut files = HashMap::new();
        files.insert(PathBuf::from("/"), MockEntry::Dir(Vec::new()));

        Self {
            state: Arc::new(Mutex::new(MockState {
                files,
                clock: CLOCK_START,
            })),
            stats: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Add a file stamped with the next clock tick.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let mut state = self.state.lock().unwrap();
        state.clock += 1;
        let mtime = state.clock;
        Self::insert_file(&mut state.files, path.as_ref(), content.into(), mtime);
    }

    /// Add an empty file with an explicit modification time (seconds).
    pub fn add_file_at(&self, path: impl AsRef<Path>, mtime: u64) {
        let mut state = self.state.lock().unwrap();
        state.clock = state.clock.max(mtime);
        Self::insert_file(&mut state.files, path.as_ref(), Vec::new(), mtime);
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let mut state = self.state.lock().unwrap();
        Self::ensure_dir_entry(&mut state.files, path.as_ref());
    }

    /// Number of `modified` calls served so far.
    pub fn stat_count(&self) -> usize {
        self.stats.load(Ordering::SeqCst)
    }

    pub fn file_content(&self, path: impl AsRef<Path>) -> Option<String> {
        let state = self.state.lock().unwrap();
        match state.files.get(path.as_ref()) {
            Some(MockEntry::File { content, .. }) => String::from_utf8(content.clone()).ok(),
            _ => None,
        }
    }

    fn insert_file(files: &mut HashMap<PathBuf, MockEntry>, path: &Path, content: Vec<u8>, mtime: u64) {
        files.insert(path.to_path_buf(), MockEntry::File { content, mtime });
        if let Some(parent) = parent_of(path) {
            Self::ensure_dir_entry(files, parent);
            Self::link_child(files, parent, path);
        }
    }

    fn ensure_dir_entry(files: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        if files.contains_key(path) {
            return;
        }
        files.insert(path.to_path_buf(), MockEntry::Dir(Vec::new()));
        if let Some(parent) = parent_of(path) {
            Self::ensure_dir_entry(files, parent);
            Self::link_child(files, parent, path);
        }
    }

    fn link_child(files: &mut HashMap<PathBuf, MockEntry>, parent: &Path, child: &Path) {
        if let Some(MockEntry::Dir(children)) = files.get_mut(parent) {
            if let Some(name) = child.file_name().and_then(|n| n.to_str()) {
                if !children.iter().any(|c| c == name) {
                    children.push(name.to_string());
                }
            }
        }
    }

    fn unlink_child(files: &mut HashMap<PathBuf, MockEntry>, child: &Path) {
        let Some(parent) = parent_of(child) else {
            return;
        };
        if let Some(MockEntry::Dir(children)) = files.get_mut(parent) {
            if let Some(name) = child.file_name().and_then(|n| n.to_str()) {
                children.retain(|c| c != name);
            }
        }
    }
}

/// Parent directory, mapping the empty parent of a bare name to ".".
fn parent_of(path: &Path) -> Option<&Path> {
    match path.parent() {
        Some(p) if p.as_os_str().is_empty() => {
            if path == Path::new(".") {
                None
            } else {
                Some(Path::new("."))
            }
        }
        other => other,
    }
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        let state = self.state.lock().unwrap();
        state.files.contains_key(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        let state = self.state.lock().unwrap();
        matches!(state.files.get(path), Some(MockEntry::Dir(_)))
    }

    fn modified(&self, path: &Path) -> Result<Option<SystemTime>> {
        self.stats.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        match state.files.get(path) {
            Some(MockEntry::File { mtime, .. }) => Ok(Some(mtime_secs(*mtime))),
            Some(MockEntry::Dir(_)) => Ok(Some(mtime_secs(CLOCK_START))),
            None => Ok(None),
        }
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        // In mock, we just return the path as is, assuming absolute paths are used in tests
        path.to_path_buf()
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.add_file(path, contents);
        Ok(())
    }

    fn touch(&self, path: &Path) -> std::io::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.clock += 1;
        let now = state.clock;
        match state.files.get_mut(path) {
            Some(MockEntry::File { content, mtime }) => {
                content.clear();
                *mtime = now;
            }
            Some(MockEntry::Dir(_)) => {
                return Err(std::io::Error::other(format!("Is a directory: {:?}", path)));
            }
            None => Self::insert_file(&mut state.files, path, Vec::new(), now),
        }
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        self.add_dir(path);
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> std::io::Result<bool> {
        let mut state = self.state.lock().unwrap();
        match state.files.get(path) {
            Some(MockEntry::File { .. }) => {
                state.files.remove(path);
                Self::unlink_child(&mut state.files, path);
                Ok(true)
            }
            Some(MockEntry::Dir(_)) => Err(std::io::Error::other(format!(
                "Is a directory: {:?}",
                path
            ))),
            None => Ok(false),
        }
    }

    fn remove_dir_all(&self, path: &Path) -> std::io::Result<bool> {
        let mut state = self.state.lock().unwrap();
        if !state.files.contains_key(path) {
            return Ok(false);
        }
        state.files.retain(|p, _| !p.starts_with(path));
        Self::unlink_child(&mut state.files, path);
        Ok(true)
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let state = self.state.lock().unwrap();
        match state.files.get(path) {
            Some(MockEntry::Dir(children)) => {
                Ok(children.iter().map(|name| path.join(name)).collect())
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }

    fn set_executable(&self, path: &Path) -> Result<()> {
        if self.exists(path) {
            Ok(())
        } else {
            Err(anyhow!("File not found: {:?}", path))
        }
    }
}
