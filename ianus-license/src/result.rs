//! Validation outcome returned to hosts.

use serde::{Deserialize, Serialize};

use crate::claims::LicenseClaims;
use crate::error::LicenseError;

/// User-facing reason for failures whose details must stay internal.
pub const UNEXPECTED_FAILURE_REASON: &str =
    "Oops, something went wrong while validating your license";

/// Outcome of validating a license token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ValidationResult {
    /// Claims passed every rule and the signature verified.
    Valid { claims: Box<LicenseClaims> },
    /// The license is not usable.
    Invalid {
        /// Message for the end user.
        reason: String,
        /// True when a different license key cannot fix the failure.
        terminal: bool,
    },
}

impl ValidationResult {
    pub fn valid(claims: LicenseClaims) -> Self {
        Self::Valid {
            claims: Box::new(claims),
        }
    }

    pub fn invalid(reason: impl Into<String>, terminal: bool) -> Self {
        Self::Invalid {
            reason: reason.into(),
            terminal,
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }

    /// Returns true for invalid results the user cannot correct.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Invalid { terminal: true, .. })
    }

    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Valid { .. } => None,
            Self::Invalid { reason, .. } => Some(reason),
        }
    }

    #[must_use]
    pub fn claims(&self) -> Option<&LicenseClaims> {
        match self {
            Self::Valid { claims } => Some(claims),
            Self::Invalid { .. } => None,
        }
    }

    #[must_use]
    pub fn into_claims(self) -> Option<LicenseClaims> {
        match self {
            Self::Valid { claims } => Some(*claims),
            Self::Invalid { .. } => None,
        }
    }
}

impl From<LicenseError> for ValidationResult {
    fn from(err: LicenseError) -> Self {
        let reason = if err.is_unexpected() {
            UNEXPECTED_FAILURE_REASON.to_string()
        } else {
            err.to_string()
        };
        Self::invalid(reason, err.is_terminal())
    }
}
