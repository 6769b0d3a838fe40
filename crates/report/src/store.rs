//! Filesystem storage of template sources
//!
//! Templates are flat files in one directory, addressed by file name. Each
//! name has its own reader/writer lock so a fill never reads a file while an
//! upload or delete of the same name is in progress, and uploads write a
//! temporary sibling that is renamed over the target. A lock lives only while
//! some call holds it.

use crate::{ReportError, Result};
use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, info};

pub struct TemplateStore {
    dir: PathBuf,
    extensions: Vec<String>,
    locks: Mutex<HashMap<String, Arc<RwLock<()>>>>,
}

impl TemplateStore {
    /// Open the store, creating the directory if needed
    pub fn open(dir: impl Into<PathBuf>, extensions: Vec<String>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), "Template store opened");
        Ok(Self {
            dir,
            extensions: extensions
                .into_iter()
                .map(|ext| ext.to_ascii_lowercase())
                .collect(),
            locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write a template, replacing any previous content
    ///
    /// Returns the stored name.
    pub fn store(&self, name: &str, content: &[u8]) -> Result<String> {
        self.check_name(name)?;
        if content.is_empty() {
            return Err(ReportError::InvalidInput(format!(
                "template '{name}' is empty"
            )));
        }

        self.exclusive(name, || {
            let target = self.dir.join(name);
            let staging = self.dir.join(format!(".{name}.tmp"));
            let written = fs::File::create(&staging).and_then(|mut file| {
                file.write_all(content)?;
                file.sync_all()
            });
            if let Err(e) = written.and_then(|_| fs::rename(&staging, &target)) {
                let _ = fs::remove_file(&staging);
                return Err(e.into());
            }

            info!(template = name, bytes = content.len(), "Template stored");
            Ok(name.to_string())
        })
    }

    /// Read a template source
    pub fn read(&self, name: &str) -> Result<String> {
        self.check_name(name).map_err(|_| ReportError::NotFound(name.to_string()))?;

        self.shared(name, || match fs::read(self.dir.join(name)) {
            Ok(bytes) => String::from_utf8(bytes).map_err(|_| {
                ReportError::InvalidTemplate(format!("template '{name}' is not valid UTF-8"))
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(ReportError::NotFound(name.to_string())),
            Err(e) => Err(e.into()),
        })
    }

    /// Names of the stored templates, sorted ascending
    pub fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with('.') && self.has_extension(name) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Remove a template; `false` when there was nothing to remove
    pub fn delete(&self, name: &str) -> Result<bool> {
        self.check_name(name)?;

        self.exclusive(name, || match fs::remove_file(self.dir.join(name)) {
            Ok(()) => {
                info!(template = name, "Template deleted");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        })
    }

    /// Reject names that escape the directory or lack a known extension
    fn check_name(&self, name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(ReportError::InvalidInput("template name is empty".to_string()));
        }
        if name.contains(['/', '\\']) || name.contains("..") || name.starts_with('.') {
            return Err(ReportError::InvalidInput(format!(
                "invalid template name '{name}'"
            )));
        }
        if !self.has_extension(name) {
            return Err(ReportError::InvalidInput(format!(
                "'{name}' does not have a template extension ({})",
                self.extensions
                    .iter()
                    .map(|ext| format!(".{ext}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }
        Ok(())
    }

    fn has_extension(&self, name: &str) -> bool {
        Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                let ext = ext.to_ascii_lowercase();
                self.extensions.iter().any(|known| *known == ext)
            })
    }

    fn shared<T>(&self, name: &str, op: impl FnOnce() -> Result<T>) -> Result<T> {
        let lock = self.acquire(name);
        let result = {
            let _guard = lock.read().unwrap_or_else(PoisonError::into_inner);
            op()
        };
        self.release(name, lock);
        result
    }

    fn exclusive<T>(&self, name: &str, op: impl FnOnce() -> Result<T>) -> Result<T> {
        let lock = self.acquire(name);
        let result = {
            let _guard = lock.write().unwrap_or_else(PoisonError::into_inner);
            op()
        };
        self.release(name, lock);
        result
    }

    fn acquire(&self, name: &str) -> Arc<RwLock<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(name.to_string()).or_default().clone()
    }

    /// Drop the map entry once no other call holds `lock`
    fn release(&self, name: &str, lock: Arc<RwLock<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // the map's reference plus ours; clones are only taken under this mutex
        if Arc::strong_count(&lock) == 2 {
            locks.remove(name);
        }
    }

    #[cfg(test)]
    fn held_locks(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
