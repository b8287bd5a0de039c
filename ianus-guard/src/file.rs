//! JSON file backed license records.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tempfile::NamedTempFile;
use tracing::debug;
use uuid::Uuid;

use crate::error::{GuardError, GuardResult};
use crate::source::{
    LicenseRecord, LicenseSource, LicenseStore, active_records, deactivate_record, supersede,
};

const STORE_DIR: &str = "ianus";
const STORE_FILE: &str = "licenses.json";

/// License records kept in a JSON file.
///
/// The file is read on every lookup so records registered by another
/// process are seen. Writes go to a temporary file in the same directory
/// which then replaces the store, so readers see either the old or the
/// new contents. A missing file is an empty store.
#[derive(Debug)]
pub struct FileLicenseSource {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileLicenseSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Opens the store at [`Self::default_path`].
    pub fn open_default() -> GuardResult<Self> {
        Ok(Self::new(Self::default_path()?))
    }

    /// `<data dir>/ianus/licenses.json`.
    pub fn default_path() -> GuardResult<PathBuf> {
        dirs::data_dir()
            .map(|dir| dir.join(STORE_DIR).join(STORE_FILE))
            .ok_or(GuardError::NoDataDirectory)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> GuardResult<Vec<LicenseRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let data = fs::read(&self.path)?;
        if data.is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_slice(&data)?)
    }

    fn save(&self, records: &[LicenseRecord]) -> GuardResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut staged = NamedTempFile::new_in(dir)?;
        staged.write_all(&serde_json::to_vec_pretty(records)?)?;
        staged.as_file().sync_all()?;
        staged.persist(&self.path).map_err(|e| e.error)?;

        debug!(path = %self.path.display(), count = records.len(), "License store saved");
        Ok(())
    }

    fn update<T>(&self, apply: impl FnOnce(&mut Vec<LicenseRecord>) -> T) -> GuardResult<T> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| GuardError::Storage(e.to_string()))?;
        let mut records = self.load()?;
        let output = apply(&mut records);
        self.save(&records)?;
        Ok(output)
    }
}

impl LicenseSource for FileLicenseSource {
    fn find(&self, identifier: &str) -> GuardResult<Vec<LicenseRecord>> {
        Ok(active_records(&self.load()?, identifier))
    }
}

impl LicenseStore for FileLicenseSource {
    fn register(&self, token: &str) -> GuardResult<LicenseRecord> {
        let record = LicenseRecord::from_token(token)?;
        self.update(|records| supersede(records, record.clone()))?;
        Ok(record)
    }

    fn deactivate(&self, id: Uuid) -> GuardResult<bool> {
        self.update(|records| deactivate_record(records, id))
    }

    fn records(&self) -> GuardResult<Vec<LicenseRecord>> {
        self.load()
    }
}
