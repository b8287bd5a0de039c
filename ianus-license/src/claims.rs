//! The signed license payload.
//!
//! Field names follow the compact wire schema (`pub`, `prd`, `sub`, ...).
//! Unknown fields are ignored and every field has a default, so older or
//! partial payloads still decode and are rejected by the validator with a
//! readable reason instead of a parse error.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::{LicenseError, LicenseResult};

/// Path under the portal base URL that issues licenses for a product.
const ISSUER_PRODUCTS_PATH: &str = "/api/public/products/";

/// Human-readable display name attached to an identifier claim.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Meta {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

impl Meta {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A deployment environment a license authorizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentEntry {
    /// Environment kind, e.g. `dataverse` or `entra`.
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub kind: String,
    /// Opaque identifier (organization id, tenant id).
    #[serde(default, deserialize_with = "null_as_default")]
    pub identifier: String,
    /// Display name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

impl EnvironmentEntry {
    pub fn new(
        kind: impl Into<String>,
        identifier: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            identifier: identifier.into(),
            name: name.into(),
        }
    }

    /// Returns true if this entry authorizes the given environment.
    ///
    /// The type compares case-insensitively, the identifier after
    /// [`normalize_identifier`].
    #[must_use]
    pub fn matches(&self, kind: &str, identifier: &str) -> bool {
        self.kind.trim().to_lowercase() == kind.trim().to_lowercase()
            && normalize_identifier(&self.identifier) == normalize_identifier(identifier)
    }
}

impl fmt::Display for EnvironmentEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.kind, self.identifier, self.name)
    }
}

/// Parses the `type:identifier:name` notation used when issuing licenses.
/// The name is optional.
impl FromStr for EnvironmentEntry {
    type Err = LicenseError;

    fn from_str(s: &str) -> LicenseResult<Self> {
        let mut parts = s.splitn(3, ':');
        let kind = parts.next().unwrap_or_default().trim();
        let identifier = parts.next().unwrap_or_default().trim();
        let name = parts.next().unwrap_or_default().trim();

        if kind.is_empty() || identifier.is_empty() {
            return Err(LicenseError::InvalidClaimsEncoding(format!(
                "environment '{s}' must have the form type:identifier[:name]"
            )));
        }

        Ok(Self::new(kind, identifier, name))
    }
}

/// The claims carried by a license token.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LicenseClaims {
    /// Unique license instance id.
    #[serde(default, deserialize_with = "null_as_default")]
    pub jti: String,
    /// Issuer URL, `<portal>/api/public/products/<productId>`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub iss: String,
    /// Audience constant identifying the licensing system.
    #[serde(default, deserialize_with = "null_as_default")]
    pub aud: String,
    /// Publisher id.
    #[serde(rename = "pub", default, deserialize_with = "null_as_default")]
    pub publisher: String,
    /// Product id.
    #[serde(rename = "prd", default, deserialize_with = "null_as_default")]
    pub product: String,
    /// Licensed subject (customer) id.
    #[serde(rename = "sub", default, deserialize_with = "null_as_default")]
    pub subject: String,
    /// Authorized deployment environments.
    #[serde(default, deserialize_with = "null_as_default")]
    pub env: Vec<EnvironmentEntry>,
    /// Reserved role gate. Carried but not enforced.
    #[serde(default, deserialize_with = "null_as_default")]
    pub required_roles: Vec<String>,
    /// Issued-at, seconds since epoch.
    #[serde(default, deserialize_with = "null_as_default")]
    pub iat: i64,
    /// Not-before, seconds since epoch.
    #[serde(default, deserialize_with = "null_as_default")]
    pub nbf: i64,
    /// Expiry, seconds since epoch. `None` never expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// Publisher-defined extension data.
    #[serde(default, deserialize_with = "null_as_default")]
    pub custom: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss_meta: Option<Meta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud_meta: Option<Meta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pub_meta: Option<Meta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prd_meta: Option<Meta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_meta: Option<Meta>,
    /// Schema version tag.
    #[serde(default, deserialize_with = "null_as_default")]
    pub ver: String,
}

impl LicenseClaims {
    /// Returns true if the structural minimum is present: a non-empty
    /// environment list and non-empty audience and issuer.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.env.is_empty() && !self.aud.trim().is_empty() && !self.iss.trim().is_empty()
    }

    /// Returns true if the license carries an expiry.
    #[must_use]
    pub fn expires(&self) -> bool {
        self.exp.is_some()
    }

    /// Record identifier for this license, `<publisher>_<product>`.
    #[must_use]
    pub fn record_identifier(&self) -> String {
        record_identifier(&self.publisher, &self.product)
    }

    /// Comma-separated list of licensed environments for diagnostics.
    #[must_use]
    pub fn licensed_environments(&self) -> String {
        self.env
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Lowercases, trims and strips braces so `{ABC-123}` equals `abc-123`.
#[must_use]
pub fn normalize_identifier(identifier: &str) -> String {
    identifier
        .chars()
        .filter(|c| *c != '{' && *c != '}')
        .collect::<String>()
        .trim()
        .to_lowercase()
}

/// Returns true if both identifiers are equal after normalization.
#[must_use]
pub fn identifiers_match(a: &str, b: &str) -> bool {
    normalize_identifier(a) == normalize_identifier(b)
}

/// Builds the conventional issuer URL for a product.
#[must_use]
pub fn issuer_url(portal_base_url: &str, product_id: &str) -> String {
    format!(
        "{}{ISSUER_PRODUCTS_PATH}{product_id}",
        portal_base_url.trim_end_matches('/')
    )
}

/// Returns true if `issuer` names the same issuer URL as `expected`.
///
/// Both compare case-insensitively; the trailing product segment is
/// compared after [`normalize_identifier`].
#[must_use]
pub fn issuers_match(issuer: &str, expected: &str) -> bool {
    fn split(url: &str) -> (String, String) {
        let url = url.trim().to_lowercase();
        match url.rfind(ISSUER_PRODUCTS_PATH) {
            Some(at) => {
                let (base, product) = url.split_at(at + ISSUER_PRODUCTS_PATH.len());
                (base.to_string(), normalize_identifier(product))
            }
            None => (url, String::new()),
        }
    }

    split(issuer) == split(expected)
}

/// Builds the identifier a license record is stored under.
#[must_use]
pub fn record_identifier(publisher_id: &str, product_id: &str) -> String {
    format!(
        "{}_{}",
        normalize_identifier(publisher_id),
        normalize_identifier(product_id)
    )
}

/// Treats an explicit JSON `null` like an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
