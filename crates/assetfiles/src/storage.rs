//! Destinations for collected files.

use dashmap::DashMap;
use std::fs;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};

/// Key/blob store that collected files are written to.
///
/// Names are forward-slash separated relative paths.
pub trait Storage: Send + Sync {
    /// Store `content` under `name` and return the name it was stored as
    fn save(&self, name: &str, content: &[u8]) -> io::Result<String>;

    fn open(&self, name: &str) -> io::Result<Box<dyn Read + Send>>;

    fn exists(&self, name: &str) -> io::Result<bool>;

    fn delete(&self, name: &str) -> io::Result<()>;
}

/// Storage rooted at a directory on the local filesystem
#[derive(Debug, Clone)]
pub struct FileSystemStorage {
    location: PathBuf,
}

impl FileSystemStorage {
    pub fn new(location: impl Into<PathBuf>) -> Self {
        Self { location: location.into() }
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Absolute path for a stored name, rejecting names that leave the location
    pub fn path(&self, name: &str) -> io::Result<PathBuf> {
        let mut path = self.location.clone();
        for segment in name.split('/') {
            match segment {
                "" | "." => continue,
                ".." => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("storage name escapes its location: {name}"),
                    ));
                }
                segment => path.push(segment),
            }
        }
        Ok(path)
    }
}

impl Storage for FileSystemStorage {
    fn save(&self, name: &str, content: &[u8]) -> io::Result<String> {
        let path = self.path(name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        Ok(name.to_string())
    }

    fn open(&self, name: &str) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(fs::File::open(self.path(name)?)?))
    }

    fn exists(&self, name: &str) -> io::Result<bool> {
        self.path(name)?.try_exists()
    }

    fn delete(&self, name: &str) -> io::Result<()> {
        match fs::remove_file(self.path(name)?) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            result => result,
        }
    }
}

/// In-memory storage
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: DashMap<String, Vec<u8>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored content, if any
    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.files.get(name).map(|content| content.value().clone())
    }

    /// Stored names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.files.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }
}

impl Storage for MemoryStorage {
    fn save(&self, name: &str, content: &[u8]) -> io::Result<String> {
        self.files.insert(name.to_string(), content.to_vec());
        Ok(name.to_string())
    }

    fn open(&self, name: &str) -> io::Result<Box<dyn Read + Send>> {
        let content = self.get(name).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no stored file named {name}"))
        })?;
        Ok(Box::new(Cursor::new(content)))
    }

    fn exists(&self, name: &str) -> io::Result<bool> {
        Ok(self.files.contains_key(name))
    }

    fn delete(&self, name: &str) -> io::Result<()> {
        self.files.remove(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn read_all(storage: &dyn Storage, name: &str) -> String {
        let mut content = String::new();
        storage.open(name).unwrap().read_to_string(&mut content).unwrap();
        content
    }

    #[test]
    fn test_filesystem_storage() {
        let dir = tempdir().unwrap();
        let storage = FileSystemStorage::new(dir.path().join("public"));

        assert!(!storage.exists("css/app.css").unwrap());
        assert_eq!(storage.save("css/app.css", b"body {}").unwrap(), "css/app.css");
        assert!(dir.path().join("public/css/app.css").is_file());
        assert!(storage.exists("css/app.css").unwrap());
        assert_eq!(read_all(&storage, "css/app.css"), "body {}");

        storage.delete("css/app.css").unwrap();
        assert!(!storage.exists("css/app.css").unwrap());
        // deleting twice is fine
        storage.delete("css/app.css").unwrap();
    }

    #[test]
    fn test_filesystem_storage_rejects_escape() {
        let dir = tempdir().unwrap();
        let storage = FileSystemStorage::new(dir.path());
        let err = storage.save("../outside.css", b"").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_memory_storage() {
        let storage = MemoryStorage::new();
        storage.save("js/app.js", b"alert(1)").unwrap();
        storage.save("css/app.css", b"").unwrap();

        assert_eq!(storage.names(), vec!["css/app.css", "js/app.js"]);
        assert_eq!(read_all(&storage, "js/app.js"), "alert(1)");
        assert_eq!(storage.open("missing").err().map(|e| e.kind()), Some(io::ErrorKind::NotFound));

        storage.delete("js/app.js").unwrap();
        assert!(!storage.exists("js/app.js").unwrap());
        assert_eq!(storage.get("js/app.js"), None);
    }
}
