use ignore::WalkBuilder;
use std::io;
use std::path::{Path, PathBuf};

use crate::types::StaticRoot;

/// A file found below one of the static roots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticFile {
    /// Finder-relative path, forward-slash separated, including the root prefix
    pub path: String,
    /// Absolute filesystem path
    pub absolute: PathBuf,
}

/// Locates relative static paths across a set of roots in priority order
pub trait Finder: Send + Sync {
    /// First existing absolute path for `path`, searching roots in order
    fn find(&self, path: &str) -> io::Result<Option<PathBuf>>;

    /// Every existing absolute path for `path`, in root order
    fn find_all(&self, path: &str) -> io::Result<Vec<PathBuf>>;

    /// The configured roots, in priority order
    fn roots(&self) -> &[StaticRoot];

    /// Every file below every root, in root order
    fn list(&self) -> io::Result<Vec<StaticFile>>;
}

/// Finder over directories on the local filesystem
#[derive(Debug, Clone)]
pub struct FileSystemFinder {
    roots: Vec<StaticRoot>,
}

impl FileSystemFinder {
    pub fn new(roots: Vec<StaticRoot>) -> Self {
        Self { roots }
    }

    fn candidates<'a>(&'a self, path: &'a str) -> impl Iterator<Item = PathBuf> + 'a {
        self.roots.iter().filter_map(move |root| root_candidate(root, path))
    }
}

impl Finder for FileSystemFinder {
    fn find(&self, path: &str) -> io::Result<Option<PathBuf>> {
        for candidate in self.candidates(path) {
            if candidate.try_exists()? {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    fn find_all(&self, path: &str) -> io::Result<Vec<PathBuf>> {
        let mut found = Vec::new();
        for candidate in self.candidates(path) {
            if candidate.try_exists()? {
                found.push(candidate);
            }
        }
        Ok(found)
    }

    fn roots(&self) -> &[StaticRoot] {
        &self.roots
    }

    fn list(&self) -> io::Result<Vec<StaticFile>> {
        let mut files = Vec::new();
        for root in &self.roots {
            files.extend(walk_root(root)?);
        }
        Ok(files)
    }
}

/// Map a finder-relative path onto a root, honoring the root prefix.
///
/// Returns `None` when the path lies outside the root's prefix or tries to
/// escape the root.
fn root_candidate(root: &StaticRoot, path: &str) -> Option<PathBuf> {
    let path = path.trim_start_matches('/');
    let relative = match &root.prefix {
        Some(prefix) => path.strip_prefix(prefix.as_str())?.strip_prefix('/')?,
        None => path,
    };

    let mut candidate = root.path.clone();
    for segment in relative.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return None,
            segment => candidate.push(segment),
        }
    }
    Some(candidate)
}

/// List every file below a root.
///
/// Files closer to the root come first; files at the same depth are ordered
/// by path.
pub fn walk_root(root: &StaticRoot) -> io::Result<Vec<StaticFile>> {
    if !root.path.is_dir() {
        return Ok(Vec::new());
    }

    let walker = WalkBuilder::new(&root.path).standard_filters(false).follow_links(true).build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(walk_error)?;
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }

        let Some(relative) = relative_path(&root.path, entry.path()) else {
            continue;
        };
        let path = match &root.prefix {
            Some(prefix) => format!("{prefix}/{relative}"),
            None => relative,
        };
        files.push(StaticFile { path, absolute: entry.into_path() });
    }

    files.sort_by(|a, b| {
        let depth = |f: &StaticFile| f.path.matches('/').count();
        depth(a).cmp(&depth(b)).then_with(|| a.path.cmp(&b.path))
    });
    Ok(files)
}

fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let segments: Vec<_> = relative.components().map(|c| c.as_os_str().to_string_lossy()).collect();
    Some(segments.join("/"))
}

fn walk_error(err: ignore::Error) -> io::Error {
    let message = err.to_string();
    err.into_io_error().unwrap_or_else(|| io::Error::other(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn mkfile(root: &Path, path: &str) -> PathBuf {
        let full = root.join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(&full, "").unwrap();
        full
    }

    #[test]
    fn test_find_respects_root_order() {
        let dir = tempdir().unwrap();
        let first = mkfile(dir.path(), "static/css/main.css");
        let second = mkfile(dir.path(), "app-1/static/css/main.css");

        let finder = FileSystemFinder::new(vec![
            StaticRoot::new(dir.path().join("static")),
            StaticRoot::new(dir.path().join("app-1/static")),
        ]);

        assert_eq!(finder.find("css/main.css").unwrap(), Some(first.clone()));
        assert_eq!(finder.find_all("css/main.css").unwrap(), vec![first, second]);
        assert_eq!(finder.find("css/missing.css").unwrap(), None);
    }

    #[test]
    fn test_find_with_prefix() {
        let dir = tempdir().unwrap();
        let file = mkfile(dir.path(), "static-prefix/css/static.css");

        let finder = FileSystemFinder::new(vec![StaticRoot::with_prefix(
            dir.path().join("static-prefix"),
            "prefix",
        )]);

        assert_eq!(finder.find("prefix/css/static.css").unwrap(), Some(file));
        assert_eq!(finder.find("css/static.css").unwrap(), None);
        assert_eq!(finder.find("prefixcss/static.css").unwrap(), None);
    }

    #[test]
    fn test_find_rejects_parent_segments() {
        let dir = tempdir().unwrap();
        mkfile(dir.path(), "secret.txt");
        mkfile(dir.path(), "static/file.txt");

        let finder = FileSystemFinder::new(vec![StaticRoot::new(dir.path().join("static"))]);
        assert_eq!(finder.find("../secret.txt").unwrap(), None);
    }

    #[test]
    fn test_find_all_directories() {
        let dir = tempdir().unwrap();
        mkfile(dir.path(), "static/css/main.css");
        mkfile(dir.path(), "app-2/static/css/app.css");

        let finder = FileSystemFinder::new(vec![
            StaticRoot::new(dir.path().join("static")),
            StaticRoot::new(dir.path().join("app-1/static")),
            StaticRoot::new(dir.path().join("app-2/static")),
        ]);

        assert_eq!(
            finder.find_all("css").unwrap(),
            vec![dir.path().join("static/css"), dir.path().join("app-2/static/css")]
        );
    }

    #[test]
    fn test_list_orders_shallow_files_first() {
        let dir = tempdir().unwrap();
        mkfile(dir.path(), "static/dir2/file4.in");
        mkfile(dir.path(), "static/file1.in");
        mkfile(dir.path(), "static/dir1/file2.in");
        mkfile(dir.path(), "static-prefix/css/a.css");

        let finder = FileSystemFinder::new(vec![
            StaticRoot::new(dir.path().join("static")),
            StaticRoot::new(dir.path().join("missing")),
            StaticRoot::with_prefix(dir.path().join("static-prefix"), "prefix"),
        ]);

        let paths: Vec<_> = finder.list().unwrap().into_iter().map(|f| f.path).collect();
        assert_eq!(paths, vec!["file1.in", "dir1/file2.in", "dir2/file4.in", "prefix/css/a.css"]);
    }
}
