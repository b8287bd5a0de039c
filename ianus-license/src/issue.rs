//! License issuance: building claims and signing tokens.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::claims::{EnvironmentEntry, LicenseClaims, Meta, issuer_url, normalize_identifier};
use crate::codec::{TokenHeader, encode_claims, encode_header, signing_input};
use crate::error::LicenseResult;
use crate::keys::SigningKey;
use crate::validator::{DEFAULT_AUDIENCE, DEFAULT_PORTAL_BASE_URL};

/// Schema version written into new licenses.
pub const SCHEMA_VERSION: &str = "1.0";

/// Default license lifetime in days.
pub const DEFAULT_LIFETIME_DAYS: u32 = 30;

/// Settings of the issuing side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssuerConfig {
    pub portal_base_url: String,
    pub audience: String,
    /// Written as `kid` into the token header.
    pub key_id: Option<String>,
    pub schema_version: String,
    /// `None` issues licenses that never expire.
    pub lifetime_days: Option<u32>,
    pub issuer_name: String,
    pub audience_name: String,
}

impl Default for IssuerConfig {
    fn default() -> Self {
        Self {
            portal_base_url: DEFAULT_PORTAL_BASE_URL.to_string(),
            audience: DEFAULT_AUDIENCE.to_string(),
            key_id: None,
            schema_version: SCHEMA_VERSION.to_string(),
            lifetime_days: Some(DEFAULT_LIFETIME_DAYS),
            issuer_name: "Ianus Guard".to_string(),
            audience_name: "Ianus Guard".to_string(),
        }
    }
}

/// Who a license is granted to, and where it may run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LicenseGrant {
    pub publisher_id: String,
    #[serde(default)]
    pub publisher_name: String,
    pub product_id: String,
    #[serde(default)]
    pub product_name: String,
    pub subject_id: String,
    #[serde(default)]
    pub subject_name: String,
    pub environments: Vec<EnvironmentEntry>,
    #[serde(default)]
    pub custom: Map<String, Value>,
}

impl LicenseClaims {
    /// Builds the claims for a new license issued at `now`.
    #[must_use]
    pub fn issue(config: &IssuerConfig, grant: &LicenseGrant, now: DateTime<Utc>) -> Self {
        let iat = now.timestamp();
        let exp = config
            .lifetime_days
            .map(|days| (now + Duration::days(i64::from(days))).timestamp());

        Self {
            jti: Uuid::new_v4().to_string(),
            iss: issuer_url(
                &config.portal_base_url,
                &normalize_identifier(&grant.product_id),
            ),
            aud: config.audience.clone(),
            publisher: grant.publisher_id.clone(),
            product: grant.product_id.clone(),
            subject: grant.subject_id.clone(),
            env: grant.environments.clone(),
            required_roles: Vec::new(),
            iat,
            nbf: iat,
            exp,
            custom: grant.custom.clone(),
            iss_meta: Some(Meta::new(&config.issuer_name)),
            aud_meta: Some(Meta::new(&config.audience_name)),
            pub_meta: Some(Meta::new(&grant.publisher_name)),
            prd_meta: Some(Meta::new(&grant.product_name)),
            sub_meta: Some(Meta::new(&grant.subject_name)),
            ver: config.schema_version.clone(),
        }
    }
}

/// Encodes and signs a token.
pub fn encode_token(
    header: &TokenHeader,
    claims: &LicenseClaims,
    key: &SigningKey,
) -> LicenseResult<String> {
    let header_segment = encode_header(header)?;
    let claims_segment = encode_claims(claims)?;
    let signature_segment = key.sign(&signing_input(&header_segment, &claims_segment))?;
    Ok(format!("{header_segment}.{claims_segment}.{signature_segment}"))
}

/// Issues a signed license for `grant` at `now`.
pub fn issue_license(
    config: &IssuerConfig,
    grant: &LicenseGrant,
    key: &SigningKey,
    now: DateTime<Utc>,
) -> LicenseResult<String> {
    let claims = LicenseClaims::issue(config, grant, now);
    encode_token(&TokenHeader::new(config.key_id.clone()), &claims, key)
}
