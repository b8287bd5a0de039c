//! License records and the sources hosts look them up in.

use std::sync::RwLock;

use chrono::{DateTime, Utc};
use ianus_license::{LicenseInfo, normalize_identifier};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{GuardError, GuardResult};

/// A stored license key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseRecord {
    pub id: Uuid,
    /// `<publisher>_<product>`; at most one active record per identifier.
    pub identifier: String,
    /// The raw license token.
    pub key: String,
    /// Display name, `"<publisher> - <product>"`.
    pub name: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub active: bool,
}

impl LicenseRecord {
    /// Builds an active record for `token`.
    ///
    /// The token is read but not verified.
    pub fn from_token(token: &str) -> GuardResult<Self> {
        let info = LicenseInfo::extract(token)?;
        Ok(Self {
            id: Uuid::new_v4(),
            identifier: info.identifier,
            key: token.trim().to_string(),
            name: info.name,
            expires_at: info.expires_at,
            active: true,
        })
    }

    fn is_active_for(&self, identifier: &str) -> bool {
        self.active && normalize_identifier(&self.identifier) == identifier
    }
}

/// Looks up license records by identifier.
pub trait LicenseSource {
    /// Returns the active records stored under `identifier`.
    fn find(&self, identifier: &str) -> GuardResult<Vec<LicenseRecord>>;
}

/// A [`LicenseSource`] that can also store records.
pub trait LicenseStore: LicenseSource {
    /// Stores `token` as the active license for its identifier.
    ///
    /// Every other active record with the same identifier is deactivated.
    fn register(&self, token: &str) -> GuardResult<LicenseRecord>;

    /// Deactivates a record. Returns false if no such record exists.
    fn deactivate(&self, id: Uuid) -> GuardResult<bool>;

    /// All records, active or not.
    fn records(&self) -> GuardResult<Vec<LicenseRecord>>;
}

/// Returns the active records stored under `identifier`.
pub(crate) fn active_records(records: &[LicenseRecord], identifier: &str) -> Vec<LicenseRecord> {
    let identifier = normalize_identifier(identifier);
    records
        .iter()
        .filter(|r| r.is_active_for(&identifier))
        .cloned()
        .collect()
}

/// Deactivates records superseded by `record` and appends it.
pub(crate) fn supersede(records: &mut Vec<LicenseRecord>, record: LicenseRecord) {
    let identifier = normalize_identifier(&record.identifier);
    for existing in records.iter_mut().filter(|r| r.is_active_for(&identifier)) {
        existing.active = false;
        info!(record = %existing.id, identifier = %identifier, "License record superseded");
    }
    info!(record = %record.id, identifier = %identifier, "License record registered");
    records.push(record);
}

/// Marks the record with `id` inactive.
pub(crate) fn deactivate_record(records: &mut [LicenseRecord], id: Uuid) -> bool {
    match records.iter_mut().find(|r| r.id == id) {
        Some(record) => {
            record.active = false;
            true
        }
        None => false,
    }
}

/// Records held in memory, e.g. a dataset the host already loaded.
#[derive(Debug, Default)]
pub struct MemoryLicenseSource {
    records: RwLock<Vec<LicenseRecord>>,
}

impl MemoryLicenseSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_records(records: Vec<LicenseRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    /// Adds a record as-is, without superseding anything.
    pub fn insert(&self, record: LicenseRecord) -> GuardResult<()> {
        self.records
            .write()
            .map_err(|e| GuardError::Storage(e.to_string()))?
            .push(record);
        Ok(())
    }
}

impl LicenseSource for MemoryLicenseSource {
    fn find(&self, identifier: &str) -> GuardResult<Vec<LicenseRecord>> {
        let records = self
            .records
            .read()
            .map_err(|e| GuardError::Storage(e.to_string()))?;
        Ok(active_records(&records, identifier))
    }
}

impl LicenseStore for MemoryLicenseSource {
    fn register(&self, token: &str) -> GuardResult<LicenseRecord> {
        let record = LicenseRecord::from_token(token)?;
        let mut records = self
            .records
            .write()
            .map_err(|e| GuardError::Storage(e.to_string()))?;
        supersede(&mut records, record.clone());
        Ok(record)
    }

    fn deactivate(&self, id: Uuid) -> GuardResult<bool> {
        let mut records = self
            .records
            .write()
            .map_err(|e| GuardError::Storage(e.to_string()))?;
        Ok(deactivate_record(&mut records, id))
    }

    fn records(&self) -> GuardResult<Vec<LicenseRecord>> {
        let records = self
            .records
            .read()
            .map_err(|e| GuardError::Storage(e.to_string()))?;
        Ok(records.clone())
    }
}
