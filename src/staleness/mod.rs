// src/staleness/mod.rs

//! Make-style staleness checks.
//!
//! Given targets and sources, decide whether the targets must be remade:
//! - any missing target means stale,
//! - no sources means fresh,
//! - otherwise stale iff the newest source is strictly newer than the
//!   oldest target.
//!
//! A missing *source* is an error ([`GogoError::MissingSource`]), never a
//! reason to rebuild.
//!
//! Modification times are memoized in an [`MtimeCache`] owned by one
//! [`StalenessChecker`], which lives for one scheduling run.

pub mod glob;

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use tracing::trace;

use crate::errors::{GogoError, Result};
use crate::fs::FileSystem;

pub use glob::glob_files;

/// Why a staleness query came out the way it did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cause {
    /// A target does not exist.
    MissingTarget(PathBuf),
    /// This source is newer than the oldest target.
    NewerSource(PathBuf),
    /// This target is at least as new as every source.
    OldestTarget(PathBuf),
    /// There was nothing to compare against.
    NoSources,
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cause::MissingTarget(p) => write!(f, "{} is missing", p.display()),
            Cause::NewerSource(p) | Cause::OldestTarget(p) => write!(f, "{}", p.display()),
            Cause::NoSources => f.write_str("no sources"),
        }
    }
}

/// Result of a staleness query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub stale: bool,
    pub cause: Cause,
}

impl Answer {
    /// The file that justified the decision, if any.
    pub fn cause_path(&self) -> Option<&Path> {
        match &self.cause {
            Cause::MissingTarget(p) | Cause::NewerSource(p) | Cause::OldestTarget(p) => Some(p),
            Cause::NoSources => None,
        }
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} because {}", self.stale, self.cause)
    }
}

/// Per-run memo of modification times, keyed by absolute path.
///
/// Missing files are cached too (as `None`).
#[derive(Debug, Default)]
pub struct MtimeCache {
    mtimes: HashMap<PathBuf, Option<SystemTime>>,
}

impl MtimeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the mtime for a file, stat-ing and caching it if necessary.
    pub fn get_or_stat(&mut self, fs: &dyn FileSystem, path: &Path) -> Result<Option<SystemTime>> {
        let key = fs.absolute(path);
        if let Some(mtime) = self.mtimes.get(&key) {
            return Ok(*mtime);
        }

        trace!(path = %key.display(), "mtime cache miss");
        let mtime = fs.modified(&key)?;
        self.mtimes.insert(key, mtime);
        Ok(mtime)
    }

    /// Forget a file, or everything under a directory (e.g. after touching
    /// or removing it).
    pub fn invalidate(&mut self, fs: &dyn FileSystem, path: &Path) {
        let abs = fs.absolute(path);
        let before = self.mtimes.len();
        self.mtimes.retain(|key, _| !key.starts_with(&abs));
        if self.mtimes.len() < before {
            trace!(
                path = %path.display(),
                dropped = before - self.mtimes.len(),
                "invalidated mtime cache entries"
            );
        }
    }

    pub fn len(&self) -> usize {
        self.mtimes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mtimes.is_empty()
    }
}

/// Staleness session: a filesystem handle plus its mtime cache.
#[derive(Debug)]
pub struct StalenessChecker {
    fs: Arc<dyn FileSystem>,
    mtimes: MtimeCache,
}

impl StalenessChecker {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            mtimes: MtimeCache::new(),
        }
    }

    pub fn cache(&self) -> &MtimeCache {
        &self.mtimes
    }

    pub fn invalidate(&mut self, path: &Path) {
        self.mtimes.invalidate(self.fs.as_ref(), path);
    }

    fn mtime(&mut self, path: &Path) -> Result<Option<SystemTime>> {
        self.mtimes.get_or_stat(self.fs.as_ref(), path)
    }

    /// Decide whether `targets` must be remade from `sources`.
    pub fn is_stale<T, S>(&mut self, targets: &[T], sources: &[S]) -> Result<Answer>
    where
        T: AsRef<Path>,
        S: AsRef<Path>,
    {
        if targets.is_empty() {
            return Err(GogoError::ConfigError(
                "staleness query needs at least one target".to_string(),
            ));
        }

        let mut oldest: Option<(SystemTime, &Path)> = None;
        for target in targets {
            let target = target.as_ref();
            let Some(mtime) = self.mtime(target)? else {
                return Ok(Answer {
                    stale: true,
                    cause: Cause::MissingTarget(target.to_path_buf()),
                });
            };
            // Strict comparison keeps the first file on ties.
            if oldest.is_none_or(|(t, _)| mtime < t) {
                oldest = Some((mtime, target));
            }
        }
        let Some((oldest_mtime, oldest_target)) = oldest else {
            return Err(GogoError::Internal("no oldest target".to_string()));
        };

        let Some((newest_mtime, newest_source)) = self.newest(sources)? else {
            return Ok(Answer {
                stale: false,
                cause: Cause::NoSources,
            });
        };

        if newest_mtime > oldest_mtime {
            Ok(Answer {
                stale: true,
                cause: Cause::NewerSource(newest_source),
            })
        } else {
            Ok(Answer {
                stale: false,
                cause: Cause::OldestTarget(oldest_target.to_path_buf()),
            })
        }
    }

    /// Newest file among `files` (first one wins on ties), or `None` for an
    /// empty list. Every file must exist.
    pub fn newest<S: AsRef<Path>>(&mut self, files: &[S]) -> Result<Option<(SystemTime, PathBuf)>> {
        let mut newest: Option<(SystemTime, &Path)> = None;
        for file in files {
            let file = file.as_ref();
            let mtime = self
                .mtime(file)?
                .ok_or_else(|| GogoError::MissingSource(file.to_path_buf()))?;
            if newest.is_none_or(|(t, _)| mtime > t) {
                newest = Some((mtime, file));
            }
        }
        Ok(newest.map(|(t, p)| (t, p.to_path_buf())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::FileSystem;
    use crate::fs::mock::MockFileSystem;

    fn checker(fs: &MockFileSystem) -> StalenessChecker {
        StalenessChecker::new(Arc::new(fs.clone()))
    }

    #[test]
    fn newer_source_makes_target_stale() {
        let fs = MockFileSystem::new();
        fs.add_file_at("/w/out.bin", 100);
        fs.add_file_at("/w/a.c", 50);
        fs.add_file_at("/w/b.c", 150);

        let answer = checker(&fs)
            .is_stale(&["/w/out.bin"], &["/w/a.c", "/w/b.c"])
            .unwrap();
        assert!(answer.stale);
        assert_eq!(answer.cause, Cause::NewerSource(PathBuf::from("/w/b.c")));
        assert_eq!(answer.to_string(), "true because /w/b.c");
    }

    #[test]
    fn missing_target_is_stale_regardless_of_sources() {
        let fs = MockFileSystem::new();
        fs.add_file_at("/w/a.c", 50);

        let answer = checker(&fs).is_stale(&["/w/out.bin"], &["/w/a.c"]).unwrap();
        assert!(answer.stale);
        assert_eq!(answer.cause_path(), Some(Path::new("/w/out.bin")));

        // Even a missing source does not matter once a target is missing.
        let answer = checker(&fs)
            .is_stale(&["/w/out.bin"], &["/w/gone.c"])
            .unwrap();
        assert!(answer.stale);
    }

    #[test]
    fn no_sources_means_up_to_date() {
        let fs = MockFileSystem::new();
        fs.add_file_at("/w/out.bin", 100);

        let answer = checker(&fs)
            .is_stale::<_, &str>(&["/w/out.bin"], &[])
            .unwrap();
        assert!(!answer.stale);
        assert_eq!(answer.cause, Cause::NoSources);
        assert_eq!(answer.to_string(), "false because no sources");
    }

    #[test]
    fn missing_source_is_an_error_not_staleness() {
        let fs = MockFileSystem::new();
        fs.add_file_at("/w/out.bin", 100);
        fs.add_file_at("/w/a.c", 50);

        match checker(&fs).is_stale(&["/w/out.bin"], &["/w/a.c", "/w/gone.c"]) {
            Err(GogoError::MissingSource(p)) => assert_eq!(p, PathBuf::from("/w/gone.c")),
            other => panic!("expected MissingSource, got {other:?}"),
        }
    }

    #[test]
    fn equal_times_are_up_to_date_and_name_the_oldest_target() {
        let fs = MockFileSystem::new();
        fs.add_file_at("/w/lib.a", 200);
        fs.add_file_at("/w/out.bin", 100);
        fs.add_file_at("/w/out2.bin", 100);
        fs.add_file_at("/w/a.c", 100);

        let answer = checker(&fs)
            .is_stale(&["/w/lib.a", "/w/out.bin", "/w/out2.bin"], &["/w/a.c"])
            .unwrap();
        assert!(!answer.stale);
        assert_eq!(answer.cause, Cause::OldestTarget(PathBuf::from("/w/out.bin")));
    }

    #[test]
    fn repeated_queries_do_not_restat() {
        let fs = MockFileSystem::new();
        fs.add_file_at("/w/out.bin", 100);
        fs.add_file_at("/w/a.c", 50);

        let mut checker = checker(&fs);
        for _ in 0..5 {
            checker.is_stale(&["/w/out.bin"], &["/w/a.c"]).unwrap();
        }
        assert_eq!(fs.stat_count(), 2);
        assert_eq!(checker.cache().len(), 2);

        checker.invalidate(Path::new("/w/out.bin"));
        checker.is_stale(&["/w/out.bin"], &["/w/a.c"]).unwrap();
        assert_eq!(fs.stat_count(), 3);
    }

    #[test]
    fn invalidating_a_directory_forgets_everything_under_it() {
        let fs = MockFileSystem::new();
        fs.add_file_at("/w/done/uvm.done", 100);
        fs.add_file_at("/w/done2/cn.done", 100);
        fs.add_file_at("/w/a.c", 50);

        let mut checker = checker(&fs);
        checker
            .is_stale(&["/w/done/uvm.done", "/w/done2/cn.done"], &["/w/a.c"])
            .unwrap();
        assert_eq!(checker.cache().len(), 3);

        checker.invalidate(Path::new("/w/done"));
        assert_eq!(checker.cache().len(), 2);

        // The marker is gone from disk too: the next query sees that.
        fs.remove_file(Path::new("/w/done/uvm.done")).unwrap();
        let answer = checker.is_stale(&["/w/done/uvm.done"], &["/w/a.c"]).unwrap();
        assert_eq!(answer.cause, Cause::MissingTarget(PathBuf::from("/w/done/uvm.done")));
    }

    #[test]
    fn empty_target_list_is_rejected() {
        let fs = MockFileSystem::new();
        let err = checker(&fs).is_stale::<&str, &str>(&[], &[]).unwrap_err();
        assert!(matches!(err, GogoError::ConfigError(_)));
    }
}
