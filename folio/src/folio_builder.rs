use crate::errors::{FolioError, FolioResult};
use crate::folio::Folio;
use crate::folio_config::FolioConfig;
use std::path::PathBuf;

/// Fluent builder for a [Folio] store.
///
/// The first invalid setting is remembered and returned by [FolioBuilder::open]
/// or [FolioBuilder::build]; later settings are ignored.
#[derive(Default)]
pub struct FolioBuilder {
    error: Option<FolioError>,
    folio_config: FolioConfig,
}

impl FolioBuilder {
    pub fn new() -> Self {
        FolioBuilder {
            error: None,
            folio_config: FolioConfig::new(),
        }
    }

    /// Directory holding the collection files and the manifest.
    pub fn storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.folio_config.set_storage_path(path) {
                self.error = Some(e);
            }
        }
        self
    }

    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.folio_config.set_cache_capacity(capacity) {
                self.error = Some(e);
            }
        }
        self
    }

    pub fn sync_writes(mut self, sync_writes: bool) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.folio_config.set_sync_writes(sync_writes) {
                self.error = Some(e);
            }
        }
        self
    }

    /// Creates the store without touching the disk. It loads itself on
    /// first use.
    pub fn build(self) -> FolioResult<Folio> {
        if let Some(error) = self.error {
            return Err(error);
        }
        Ok(Folio::new(self.folio_config))
    }

    /// Creates the store and loads it from disk.
    pub fn open(self) -> FolioResult<Folio> {
        let folio = self.build()?;
        folio.ensure_initialized()?;
        Ok(folio)
    }
}
