//! Host-side license handling for Ianus Guard.
//!
//! Hosts keep license tokens as records, one active record per
//! publisher/product pair. This crate finds that record and hands its
//! token to [`ianus_license::LicenseValidator`]:
//! - [`LicenseSource`]: lookup capability, backed by memory or a JSON file
//! - [`LicenseStore`]: registering a token supersedes the previous license
//! - [`LicenseGuard`]: the full check, including host configuration errors

mod error;
mod file;
mod guard;
mod source;

pub use error::{GuardError, GuardResult};
pub use file::FileLicenseSource;
pub use guard::{GuardOutcome, LicenseGuard, NO_LICENSE_REASON, USAGE_DENIED_REASON};
pub use source::{LicenseRecord, LicenseSource, LicenseStore, MemoryLicenseSource};
