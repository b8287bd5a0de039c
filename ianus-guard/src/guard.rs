//! Host-side license check: find the stored license, then validate it.

use std::sync::Arc;

use ianus_license::{
    LicenseError, LicenseValidator, UNEXPECTED_FAILURE_REASON, ValidationRequest,
    ValidationResult, record_identifier,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::source::LicenseSource;

/// Reason given when the host denied the current user the product.
pub const USAGE_DENIED_REASON: &str = "Your user is not enabled for using this product";

/// Reason given when no active license record exists.
pub const NO_LICENSE_REASON: &str = "No license found!";

/// Result of a guard check, with the record it was based on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardOutcome {
    pub result: ValidationResult,
    pub license_id: Option<Uuid>,
    pub license_key: Option<String>,
}

impl GuardOutcome {
    fn without_record(result: ValidationResult) -> Self {
        Self {
            result,
            license_id: None,
            license_key: None,
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.result.is_valid()
    }

    /// True when the host should offer to enter a different license key.
    #[must_use]
    pub fn can_set_license(&self) -> bool {
        !self.result.is_valid() && !self.result.is_terminal()
    }
}

/// Checks the license of one product in the current environment.
#[derive(Debug, Clone)]
pub struct LicenseGuard {
    validator: Arc<LicenseValidator>,
    request: ValidationRequest,
    usage_permission: Option<bool>,
}

impl LicenseGuard {
    pub fn new(validator: Arc<LicenseValidator>, request: ValidationRequest) -> Self {
        Self {
            validator,
            request,
            usage_permission: None,
        }
    }

    /// Whether the host granted the current user the product.
    /// `None` means the host does not gate by user.
    #[must_use]
    pub fn with_usage_permission(mut self, permission: Option<bool>) -> Self {
        self.usage_permission = permission;
        self
    }

    #[must_use]
    pub fn request(&self) -> &ValidationRequest {
        &self.request
    }

    /// Identifier the product's license record is stored under.
    #[must_use]
    pub fn license_identifier(&self) -> String {
        record_identifier(&self.request.publisher_id, &self.request.product_id)
    }

    /// Looks up the single active license in `source` and validates it.
    pub fn check<S: LicenseSource + ?Sized>(&self, source: &S) -> GuardOutcome {
        if self.usage_permission == Some(false) {
            return GuardOutcome::without_record(ValidationResult::invalid(
                USAGE_DENIED_REASON,
                true,
            ));
        }
        if self.request.product_id.trim().is_empty() {
            return GuardOutcome::without_record(LicenseError::MissingProductId.into());
        }
        if self.request.public_keys.iter().all(|k| k.trim().is_empty()) {
            return GuardOutcome::without_record(LicenseError::MissingPublicKeys.into());
        }

        let identifier = self.license_identifier();
        let mut records = match source.find(&identifier) {
            Ok(records) => records,
            Err(e) => {
                warn!(identifier = %identifier, "License lookup failed: {}", e);
                return GuardOutcome::without_record(ValidationResult::invalid(
                    UNEXPECTED_FAILURE_REASON,
                    true,
                ));
            }
        };

        let record = match records.len() {
            0 => {
                return GuardOutcome::without_record(ValidationResult::invalid(
                    NO_LICENSE_REASON,
                    false,
                ));
            }
            1 => records.remove(0),
            count => {
                warn!(identifier = %identifier, count, "Multiple active licenses");
                let reason = format!(
                    "Multiple active licenses for '{identifier}' found, \
                     please make sure there is only one active license"
                );
                return GuardOutcome::without_record(ValidationResult::invalid(reason, true));
            }
        };

        info!(identifier = %identifier, record = %record.id, "Validating license record");
        let result = self.validator.validate(&record.key, &self.request);

        GuardOutcome {
            result,
            license_id: Some(record.id),
            license_key: Some(record.key),
        }
    }

    /// Runs [`Self::check`] on tokio's blocking pool.
    pub async fn check_async<S>(&self, source: Arc<S>) -> GuardOutcome
    where
        S: LicenseSource + Send + Sync + 'static,
    {
        let guard = self.clone();
        match tokio::task::spawn_blocking(move || guard.check(source.as_ref())).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("License check task failed: {}", e);
                GuardOutcome::without_record(ValidationResult::invalid(
                    UNEXPECTED_FAILURE_REASON,
                    true,
                ))
            }
        }
    }
}
