//! Unverified license summaries for storing license records.
//!
//! Nothing here checks the signature. The output only labels a stored
//! record; access decisions go through [`crate::LicenseValidator`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::claims::LicenseClaims;
use crate::codec::TokenParts;
use crate::error::{LicenseError, LicenseResult};

/// Display data read from a token without verifying it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenseInfo {
    /// Record identifier, `<publisher>_<product>`.
    pub identifier: String,
    /// `"<publisher name> - <product name>"`.
    pub name: String,
    pub expires_at: Option<DateTime<Utc>>,
    /// `kid` from the header, if the header decodes.
    pub key_id: Option<String>,
    pub claims: LicenseClaims,
}

impl LicenseInfo {
    /// Reads record data from a token.
    pub fn extract(token: &str) -> LicenseResult<Self> {
        let token = token.trim();
        if token.is_empty() {
            return Err(LicenseError::EmptyToken);
        }

        let parts = TokenParts::split(token)?;
        let claims = parts.decode_claims()?;
        let key_id = parts.decode_header().ok().and_then(|h| h.kid);

        let expires_at = claims
            .exp
            .map(|exp| DateTime::from_timestamp(exp, 0).ok_or(LicenseError::InvalidExpiry(exp)))
            .transpose()?;

        let publisher_name = claims.pub_meta.as_ref().map_or("", |m| m.name.as_str());
        let product_name = claims.prd_meta.as_ref().map_or("", |m| m.name.as_str());

        Ok(Self {
            identifier: claims.record_identifier(),
            name: format!("{publisher_name} - {product_name}"),
            expires_at,
            key_id,
            claims,
        })
    }
}
