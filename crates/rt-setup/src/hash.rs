//! Hash del runtime instalado.
//!
//! Si el hash de `(namespace, dir, commit o script)` coincide con el
//! guardado, todo el pipeline puede omitirse.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;
use sha2::{Digest, Sha256};

use crate::errors::HashCacheError;

pub const STATE_SUBDIR: &str = ".rtflow";
pub const HASH_FILE: &str = "runtime.hash";

#[derive(Debug, Clone)]
pub struct RuntimeHashCache {
    dir: PathBuf,
}

impl RuntimeHashCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self { Self { dir: dir.into() } }

    pub fn dir(&self) -> &Path { &self.dir }

    pub fn hash_file(&self) -> PathBuf { self.dir.join(STATE_SUBDIR).join(HASH_FILE) }

    /// sha256 hex de namespace, directorio y contenido, separados por NUL.
    pub fn hash(&self, namespace: &str, content: &str) -> String {
        let mut h = Sha256::new();
        h.update(namespace.as_bytes());
        h.update([0u8]);
        h.update(self.dir.to_string_lossy().as_bytes());
        h.update([0u8]);
        h.update(content.as_bytes());
        h.finalize().iter().map(|b| format!("{b:02x}")).collect()
    }

    pub fn stored(&self) -> Result<Option<String>, HashCacheError> {
        let path = self.hash_file();
        match fs::read_to_string(&path) {
            Ok(s) => Ok(Some(s.trim().to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_err(&path, e)),
        }
    }

    pub fn matches(&self, namespace: &str, content: &str) -> Result<bool, HashCacheError> {
        let current = self.hash(namespace, content);
        let matched = self.stored()?.is_some_and(|s| s == current);
        debug!("runtime hash {} for {namespace}", if matched { "matches" } else { "differs" });
        Ok(matched)
    }

    pub fn store(&self, namespace: &str, content: &str) -> Result<(), HashCacheError> {
        let path = self.hash_file();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
        fs::write(&path, self.hash(namespace, content)).map_err(|e| io_err(&path, e))
    }

    pub fn clear(&self) -> Result<(), HashCacheError> {
        let path = self.hash_file();
        match fs::remove_file(&path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(io_err(&path, e)),
            _ => Ok(()),
        }
    }
}

fn io_err(path: &Path, source: io::Error) -> HashCacheError {
    HashCacheError::Io { path: path.display().to_string(), source }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_then_match_then_clear() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = RuntimeHashCache::new(tmp.path());
        assert!(!cache.matches("org/project", "commit-1").unwrap());
        cache.store("org/project", "commit-1").unwrap();
        assert!(cache.hash_file().ends_with(".rtflow/runtime.hash"));
        assert!(cache.matches("org/project", "commit-1").unwrap());
        assert!(!cache.matches("org/project", "commit-2").unwrap());
        assert!(!cache.matches("org/other", "commit-1").unwrap());
        cache.clear().unwrap();
        cache.clear().unwrap();
        assert_eq!(cache.stored().unwrap(), None);
    }

    #[test]
    fn hash_depends_on_directory() {
        let a = RuntimeHashCache::new("/opt/a").hash("ns", "c");
        let b = RuntimeHashCache::new("/opt/b").hash("ns", "c");
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
    }
}
