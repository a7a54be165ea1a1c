//! Assembly of the deployable directory.
//!
//! Order matters: the asset tree is copied first, then the contents of the
//! public tree are flattened into the output root. A later copy overwrites an
//! earlier file with the same name, and nothing is ever deleted, so files left
//! by a previous build survive when the new build produces fewer of them.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, info_span};

use crate::error::AssembleError;

/// Source trees and destination of one assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyLayout {
    /// Deployable directory; the build already wrote its outputs here.
    pub out_dir: PathBuf,
    /// Game asset tree, copied as `<out_dir>/<name of assets_dir>`.
    pub assets_dir: PathBuf,
    /// Static public tree, whose contents are copied into `<out_dir>`.
    pub public_dir: PathBuf,
}

impl AssemblyLayout {
    /// Where the asset tree lands inside the output directory.
    pub fn assets_dest(&self) -> PathBuf {
        match self.assets_dir.file_name() {
            Some(name) => self.out_dir.join(name),
            None => self.out_dir.join("assets"),
        }
    }
}

/// What an assembly run copied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssemblyReport {
    /// Files written, relative to the output directory.
    pub copied: BTreeSet<PathBuf>,
    /// Files that already existed and were replaced, relative to the output directory.
    pub overwritten: BTreeSet<PathBuf>,
}

impl AssemblyReport {
    pub fn file_count(&self) -> usize {
        self.copied.len()
    }
}

/// Builds the deployable directory from build outputs, assets and public files.
pub struct OutputAssembler {
    layout: AssemblyLayout,
}

impl OutputAssembler {
    pub fn new(layout: AssemblyLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &AssemblyLayout {
        &self.layout
    }

    /// Runs all assembly steps. No rollback on failure; re-running is safe.
    pub fn assemble(&self) -> Result<AssemblyReport, AssembleError> {
        let layout = &self.layout;
        let span = info_span!("assemble", out_dir = %layout.out_dir.display());
        let _guard = span.enter();

        for source in [&layout.assets_dir, &layout.public_dir] {
            if !source.is_dir() {
                return Err(AssembleError::MissingSource {
                    path: source.clone(),
                });
            }
        }

        fs::create_dir_all(&layout.out_dir)
            .map_err(|e| AssembleError::io(&layout.out_dir, e))?;

        let mut report = AssemblyReport::default();
        let assets_dest = layout.assets_dest();
        copy_tree(&layout.assets_dir, &assets_dest, &layout.out_dir, &mut report)?;
        copy_tree(&layout.public_dir, &layout.out_dir, &layout.out_dir, &mut report)?;

        if !report.overwritten.is_empty() {
            debug!(
                count = report.overwritten.len(),
                files = ?report.overwritten,
                "replaced existing files"
            );
        }
        info!(
            files = report.file_count(),
            overwritten = report.overwritten.len(),
            "output assembled"
        );
        Ok(report)
    }
}

/// Recursively copies the contents of `src` into `dest`, overwriting files.
///
/// Entries are visited in name order. Paths in `report` are relative to `root`.
pub fn copy_tree(
    src: &Path,
    dest: &Path,
    root: &Path,
    report: &mut AssemblyReport,
) -> Result<(), AssembleError> {
    fs::create_dir_all(dest).map_err(|e| AssembleError::io(dest, e))?;

    let mut entries = Vec::new();
    for entry in fs::read_dir(src).map_err(|e| AssembleError::io(src, e))? {
        let entry = entry.map_err(|e| AssembleError::io(src, e))?;
        entries.push(entry.path());
    }
    entries.sort();

    for path in entries {
        let Some(name) = path.file_name() else {
            continue;
        };
        let target = dest.join(name);
        // Follows symlinks, so linked files and directories are copied by value.
        let metadata = fs::metadata(&path).map_err(|e| AssembleError::io(&path, e))?;
        if metadata.is_dir() {
            copy_tree(&path, &target, root, report)?;
            continue;
        }

        let existed = target.is_file();
        fs::copy(&path, &target).map_err(|source| AssembleError::Copy {
            src: path.clone(),
            dest: target.clone(),
            source,
        })?;
        let relative = target
            .strip_prefix(root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| target.clone());
        if existed {
            report.overwritten.insert(relative.clone());
        }
        report.copied.insert(relative);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_copy_tree_is_recursive() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        write(&src.join("a.txt"), "a");
        write(&src.join("nested/deeper/b.txt"), "b");
        let dest = dir.path().join("dest");

        let mut report = AssemblyReport::default();
        copy_tree(&src, &dest, &dest, &mut report).unwrap();

        assert_eq!(fs::read_to_string(dest.join("a.txt")).unwrap(), "a");
        assert_eq!(
            fs::read_to_string(dest.join("nested/deeper/b.txt")).unwrap(),
            "b"
        );
        assert_eq!(report.file_count(), 2);
        assert!(report.overwritten.is_empty());
    }

    #[test]
    fn test_copy_tree_reports_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        write(&src.join("index.html"), "new");
        let dest = dir.path().join("dest");
        write(&dest.join("index.html"), "old");

        let mut report = AssemblyReport::default();
        copy_tree(&src, &dest, &dest, &mut report).unwrap();

        assert_eq!(fs::read_to_string(dest.join("index.html")).unwrap(), "new");
        assert!(report.overwritten.contains(Path::new("index.html")));
    }

    #[test]
    fn test_assets_dest_uses_directory_name() {
        let layout = AssemblyLayout {
            out_dir: PathBuf::from("/work/out"),
            assets_dir: PathBuf::from("/work/game/assets"),
            public_dir: PathBuf::from("/work/web/public"),
        };
        assert_eq!(layout.assets_dest(), Path::new("/work/out/assets"));
    }

    #[test]
    fn test_missing_public_tree_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("assets")).unwrap();
        let assembler = OutputAssembler::new(AssemblyLayout {
            out_dir: dir.path().join("out"),
            assets_dir: dir.path().join("assets"),
            public_dir: dir.path().join("public"),
        });

        let err = assembler.assemble().unwrap_err();

        assert!(matches!(err, AssembleError::MissingSource { ref path } if path.ends_with("public")));
        assert!(!dir.path().join("out").exists());
    }
}
