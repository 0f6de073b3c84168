//! Deterministic, depth-first, pre-order enumeration of a directory tree.

use std::fs::Metadata;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::ArchiveError;

/// One filesystem entry yielded by [`TreeWalker`].
#[derive(Debug)]
pub struct WalkItem {
    pub path: PathBuf,
    pub metadata: Metadata,
}

/// Walks every entry under a root directory, the root itself first.
///
/// Siblings are visited in lexicographic order of their file names, so an
/// unchanged tree always yields the same sequence. Symbolic links are
/// followed; a broken link or a link cycle is reported as
/// [`ArchiveError::Walk`].
pub struct TreeWalker {
    inner: walkdir::IntoIter,
}

impl TreeWalker {
    pub fn new(root: &Path) -> Self {
        let inner = WalkDir::new(root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter();
        Self { inner }
    }
}

impl Iterator for TreeWalker {
    type Item = Result<WalkItem, ArchiveError>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = match self.inner.next()? {
            Ok(entry) => entry,
            Err(e) => return Some(Err(e.into())),
        };
        Some(
            entry
                .metadata()
                .map(|metadata| WalkItem {
                    path: entry.into_path(),
                    metadata,
                })
                .map_err(ArchiveError::from),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn pre_order_and_sorted() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("root");
        fs::create_dir_all(root.join("b")).unwrap();
        fs::create_dir_all(root.join("a/inner")).unwrap();
        fs::write(root.join("c.txt"), b"c").unwrap();
        fs::write(root.join("a/z.txt"), b"z").unwrap();

        let names: Vec<String> = TreeWalker::new(&root)
            .map(|item| {
                let item = item.unwrap();
                item.path
                    .strip_prefix(dir.path())
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect();
        assert_eq!(
            names,
            vec!["root", "root/a", "root/a/inner", "root/a/z.txt", "root/b", "root/c.txt"]
        );
    }

    #[test]
    fn missing_root_is_a_walk_error() {
        let dir = tempdir().unwrap();
        let mut walker = TreeWalker::new(&dir.path().join("nope"));
        let err = walker.next().unwrap().unwrap_err();
        assert!(matches!(err, ArchiveError::Walk { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn broken_symlink_is_a_walk_error() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("root");
        fs::create_dir(&root).unwrap();
        std::os::unix::fs::symlink(root.join("missing"), root.join("dangling")).unwrap();

        let results: Vec<_> = TreeWalker::new(&root).collect();
        assert!(results.iter().any(|r| matches!(r, Err(ArchiveError::Walk { .. }))));
    }
}
