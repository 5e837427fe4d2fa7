// src/staleness/glob.rs

//! Source-file collection for staleness checks.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::Context;
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::errors::{GogoError, Result};
use crate::fs::FileSystem;

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat)
            .map_err(|e| GogoError::ConfigError(format!("invalid source pattern '{pat}': {e}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| GogoError::ConfigError(format!("building source patterns: {e}")))
}

/// Collect every file under `dirs` whose *file name* matches one of
/// `patterns` (e.g. `*.sv`).
///
/// With `recursive`, subdirectories are searched top-down, skipping
/// directories whose name starts with `.` and any directory listed in
/// `exclude`. Results are absolute, unique and sorted.
pub fn glob_files(
    fs: &dyn FileSystem,
    dirs: &[PathBuf],
    patterns: &[String],
    recursive: bool,
    exclude: &[PathBuf],
) -> Result<Vec<PathBuf>> {
    let set = build_globset(patterns)?;
    let exclude: Vec<PathBuf> = exclude.iter().map(|p| fs.absolute(p)).collect();
    let mut found = BTreeSet::new();

    for dir in dirs {
        let dir = fs.absolute(dir);
        if !fs.is_dir(&dir) {
            return Err(GogoError::ConfigError(format!(
                "source directory {} does not exist",
                dir.display()
            )));
        }
        walk(fs, &dir, &set, recursive, &exclude, &mut found)?;
    }

    Ok(found.into_iter().collect())
}

fn walk(
    fs: &dyn FileSystem,
    dir: &Path,
    set: &GlobSet,
    recursive: bool,
    exclude: &[PathBuf],
    found: &mut BTreeSet<PathBuf>,
) -> Result<()> {
    let entries = fs
        .read_dir(dir)
        .with_context(|| format!("collecting sources in {:?}", dir))?;

    for entry in entries {
        let Some(name) = entry.file_name() else {
            continue;
        };

        if fs.is_dir(&entry) {
            let hidden = name.to_string_lossy().starts_with('.');
            if recursive && !hidden && !exclude.iter().any(|ex| entry.starts_with(ex)) {
                walk(fs, &entry, set, recursive, exclude, found)?;
            }
        } else if set.is_match(Path::new(name)) {
            found.insert(entry);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn tree() -> MockFileSystem {
        let fs = MockFileSystem::new();
        fs.add_file("/vkits/cn/cn_pkg.sv", "");
        fs.add_file("/vkits/cn/cn_defs.svh", "");
        fs.add_file("/vkits/cn/README", "");
        fs.add_file("/vkits/cn/sub/cn_if.sv", "");
        fs.add_file("/vkits/cn/.hidden/junk.sv", "");
        fs.add_file("/vkits/cn/cn_pkg/generated.sv", "");
        fs
    }

    fn patterns() -> Vec<String> {
        vec!["*.sv".to_string(), "*.svh".to_string()]
    }

    #[test]
    fn flat_glob_only_looks_at_the_top_directory() {
        let fs = tree();
        let files = glob_files(&fs, &[PathBuf::from("/vkits/cn")], &patterns(), false, &[]).unwrap();
        assert_eq!(
            files,
            vec![
                PathBuf::from("/vkits/cn/cn_defs.svh"),
                PathBuf::from("/vkits/cn/cn_pkg.sv"),
            ]
        );
    }

    #[test]
    fn recursive_glob_prunes_dot_and_excluded_dirs() {
        let fs = tree();
        let files = glob_files(
            &fs,
            &[PathBuf::from("/vkits/cn")],
            &patterns(),
            true,
            &[PathBuf::from("/vkits/cn/cn_pkg")],
        )
        .unwrap();
        assert_eq!(
            files,
            vec![
                PathBuf::from("/vkits/cn/cn_defs.svh"),
                PathBuf::from("/vkits/cn/cn_pkg.sv"),
                PathBuf::from("/vkits/cn/sub/cn_if.sv"),
            ]
        );
    }

    #[test]
    fn missing_directory_is_a_config_error() {
        let fs = tree();
        let err = glob_files(&fs, &[PathBuf::from("/nope")], &patterns(), true, &[]).unwrap_err();
        assert!(matches!(err, GogoError::ConfigError(_)));
    }
}
