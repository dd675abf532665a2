use crate::common::{COLLECTION_FILE_EXTENSION, TEMP_FILE_SUFFIX};
use crate::errors::{ErrorKind, FolioError, FolioResult};
use crate::store::{documents_from_object, Backup, CollectionMap, Manifest};
use serde::Serialize;
use serde_json::Value;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Whole-file JSON persistence of collections, the manifest and backups.
///
/// Every write replaces the target atomically: the content goes to a hidden
/// temporary sibling, is optionally fsynced, then renamed over the target. A
/// crash leaves either the old or the new file, never a truncated one.
#[derive(Clone)]
pub struct PersistenceEngine {
    storage_dir: PathBuf,
    manifest_path: PathBuf,
    sync_writes: bool,
}

impl PersistenceEngine {
    pub fn new(storage_dir: &Path, manifest_path: &Path, sync_writes: bool) -> Self {
        PersistenceEngine {
            storage_dir: storage_dir.to_path_buf(),
            manifest_path: manifest_path.to_path_buf(),
            sync_writes,
        }
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub fn ensure_storage_folder(&self) -> FolioResult<()> {
        fs::create_dir_all(&self.storage_dir).map_err(|e| {
            log::error!(
                "Failed to create storage folder {}: {}",
                self.storage_dir.display(),
                e
            );
            FolioError::new_with_cause(
                &format!("Failed to create storage folder {}", self.storage_dir.display()),
                ErrorKind::IOError,
                e.into(),
            )
        })
    }

    /// Reads the collection names listed in the manifest. Returns `None` when
    /// the manifest is missing or cannot be interpreted.
    pub fn load_manifest(&self) -> Option<Vec<String>> {
        let content = match fs::read_to_string(&self.manifest_path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No manifest found at {}", self.manifest_path.display());
                return None;
            }
            Err(e) => {
                log::warn!("Failed to read manifest {}: {}", self.manifest_path.display(), e);
                return None;
            }
        };

        match serde_json::from_str::<Manifest>(&content) {
            Ok(manifest) => Some(manifest.collections),
            Err(e) => {
                log::warn!(
                    "Manifest {} is unreadable, rebuilding it from the folder: {}",
                    self.manifest_path.display(),
                    e
                );
                None
            }
        }
    }

    /// Collection names found as `<name>.json` in the storage folder.
    /// Hidden files, including the manifest and temp files, are ignored.
    pub fn scan_folder(&self) -> FolioResult<Vec<String>> {
        let entries = fs::read_dir(&self.storage_dir).map_err(|e| {
            log::error!("Failed to scan {}: {}", self.storage_dir.display(), e);
            FolioError::from(e)
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let is_json = path
                .extension()
                .map(|ext| ext == COLLECTION_FILE_EXTENSION)
                .unwrap_or(false);
            if !is_json {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if !stem.is_empty() && !stem.starts_with('.') {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Loads a collection file. A missing file is an empty collection.
    pub fn load_collection(&self, path: &Path) -> FolioResult<CollectionMap> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(CollectionMap::new()),
            Err(e) => {
                log::error!("Failed to read collection file {}: {}", path.display(), e);
                return Err(FolioError::new_with_cause(
                    &format!("Failed to read collection file {}", path.display()),
                    ErrorKind::IOError,
                    e.into(),
                ));
            }
        };

        if content.trim().is_empty() {
            return Ok(CollectionMap::new());
        }

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(object)) => documents_from_object(object).map_err(|e| {
                FolioError::new_with_cause(
                    &format!("Collection file {} is corrupted", path.display()),
                    ErrorKind::FileCorrupted,
                    e,
                )
            }),
            Ok(_) => {
                log::error!("Collection file {} is not a JSON object", path.display());
                Err(FolioError::new(
                    &format!("Collection file {} is not a JSON object", path.display()),
                    ErrorKind::FileCorrupted,
                ))
            }
            Err(e) => {
                log::error!("Collection file {} is corrupted: {}", path.display(), e);
                Err(FolioError::new_with_cause(
                    &format!("Collection file {} is corrupted", path.display()),
                    ErrorKind::FileCorrupted,
                    e.into(),
                ))
            }
        }
    }

    /// Returns true if `path` exists and holds no content.
    pub fn is_empty_file(&self, path: &Path) -> bool {
        match fs::read_to_string(path) {
            Ok(content) => content.trim().is_empty(),
            Err(_) => false,
        }
    }

    pub fn save_collection(&self, path: &Path, documents: &CollectionMap) -> FolioResult<()> {
        self.write_json(path, documents)
    }

    pub fn save_manifest(&self, names: Vec<String>) -> FolioResult<()> {
        let manifest = Manifest::new(names);
        let path = self.manifest_path.clone();
        self.write_json(&path, &manifest)
    }

    /// Deletes a file; a file that is already gone is not an error.
    pub fn remove_file(&self, path: &Path) -> FolioResult<()> {
        match fs::remove_file(path) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                log::error!("Failed to delete {}: {}", path.display(), e);
                Err(FolioError::new_with_cause(
                    &format!("Failed to delete {}", path.display()),
                    ErrorKind::IOError,
                    e.into(),
                ))
            }
        }
    }

    pub fn write_backup(&self, path: &Path, backup: &Backup) -> FolioResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        self.write_json(path, backup)
    }

    pub fn read_backup(&self, path: &Path) -> FolioResult<Backup> {
        let content = fs::read_to_string(path).map_err(|e| {
            log::error!("Failed to read backup {}: {}", path.display(), e);
            FolioError::from(e)
        })?;

        let value = serde_json::from_str::<Value>(&content).map_err(|e| {
            log::error!("Backup {} is not valid JSON: {}", path.display(), e);
            FolioError::new_with_cause(
                &format!("Backup {} is not valid JSON", path.display()),
                ErrorKind::FileCorrupted,
                e.into(),
            )
        })?;
        Backup::from_value(value)
    }

    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> FolioResult<()> {
        let content = serde_json::to_vec_pretty(value).map_err(|e| {
            log::error!("Failed to encode {}: {}", path.display(), e);
            FolioError::from(e)
        })?;

        let temp_path = temp_path_for(path);
        let result = self.write_atomically(path, &temp_path, &content);
        if let Err(e) = &result {
            log::error!("Failed to write {}: {}", path.display(), e);
            // best effort, the temp file may not exist
            let _ = fs::remove_file(&temp_path);
        }
        result
    }

    fn write_atomically(&self, path: &Path, temp_path: &Path, content: &[u8]) -> FolioResult<()> {
        let mut file = File::create(temp_path)?;
        file.write_all(content)?;
        if self.sync_writes {
            file.sync_all()?;
        }
        drop(file);

        fs::rename(temp_path, path)?;

        if self.sync_writes {
            sync_parent_dir(path);
        }
        Ok(())
    }
}

#[cfg(unix)]
fn sync_parent_dir(path: &Path) {
    if let Some(parent) = path.parent() {
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) {}

/// Hidden sibling used as the write target before the rename, e.g.
/// `users.json` -> `.users.json.tmp`.
fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_name = if file_name.starts_with('.') {
        format!("{}.{}", file_name, TEMP_FILE_SUFFIX)
    } else {
        format!(".{}.{}", file_name, TEMP_FILE_SUFFIX)
    };
    path.with_file_name(temp_name)
}
