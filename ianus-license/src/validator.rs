//! License validation.
//!
//! Claims are checked against the expected identity first so the user
//! gets a precise reason, then the signature is verified against the
//! candidate keys. Only a verified signature yields a valid result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::claims::{
    LicenseClaims, identifiers_match, issuer_url, issuers_match, normalize_identifier,
};
use crate::codec::TokenParts;
use crate::error::{LicenseError, LicenseResult};
use crate::keys::{KeyCache, KeyRing};
use crate::result::ValidationResult;

/// Base URL of the licensing portal that issues tokens.
pub const DEFAULT_PORTAL_BASE_URL: &str = "https://www.ianusguard.com";

/// Audience every license of the product line is issued for.
pub const DEFAULT_AUDIENCE: &str = "ianusguard";

/// Identity of the licensing system a validator trusts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub portal_base_url: String,
    pub audience: String,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            portal_base_url: DEFAULT_PORTAL_BASE_URL.to_string(),
            audience: DEFAULT_AUDIENCE.to_string(),
        }
    }
}

impl ValidatorConfig {
    /// Loads a config from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> LicenseResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Issuer a license for `product_id` must carry.
    #[must_use]
    pub fn expected_issuer(&self, product_id: &str) -> String {
        issuer_url(&self.portal_base_url, &normalize_identifier(product_id))
    }
}

/// What the host expects a license to be for.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationRequest {
    pub publisher_id: String,
    pub product_id: String,
    pub environment_type: String,
    pub environment_identifier: String,
    /// Candidate PEM public keys, tried in order.
    pub public_keys: Vec<String>,
}

impl ValidationRequest {
    pub fn new(publisher_id: impl Into<String>, product_id: impl Into<String>) -> Self {
        Self {
            publisher_id: publisher_id.into(),
            product_id: product_id.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_environment(
        mut self,
        environment_type: impl Into<String>,
        environment_identifier: impl Into<String>,
    ) -> Self {
        self.environment_type = environment_type.into();
        self.environment_identifier = environment_identifier.into();
        self
    }

    #[must_use]
    pub fn with_public_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.public_keys = keys.into_iter().map(Into::into).collect();
        self
    }
}

/// Validates license tokens. Holds no per-call state.
#[derive(Debug, Default)]
pub struct LicenseValidator {
    config: ValidatorConfig,
    key_cache: Option<KeyCache>,
}

impl LicenseValidator {
    #[must_use]
    pub fn new(config: ValidatorConfig) -> Self {
        Self {
            config,
            key_cache: None,
        }
    }

    /// Memoizes imported public keys across calls.
    #[must_use]
    pub fn with_key_cache(mut self) -> Self {
        self.key_cache = Some(KeyCache::new());
        self
    }

    #[must_use]
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    #[must_use]
    pub fn key_cache(&self) -> Option<&KeyCache> {
        self.key_cache.as_ref()
    }

    /// Validates `token` against `request` at the current time.
    #[must_use]
    pub fn validate(&self, token: &str, request: &ValidationRequest) -> ValidationResult {
        self.validate_at(token, request, Utc::now())
    }

    /// Validates `token` against `request` as of `now`.
    #[must_use]
    pub fn validate_at(
        &self,
        token: &str,
        request: &ValidationRequest,
        now: DateTime<Utc>,
    ) -> ValidationResult {
        match self.run(token, request, now) {
            Ok(claims) => {
                debug!(license = %claims.jti, subject = %claims.subject, "License valid");
                ValidationResult::valid(claims)
            }
            Err(err) if err.is_unexpected() => {
                warn!(
                    product = %request.product_id,
                    "License validation failed unexpectedly: {}", err
                );
                err.into()
            }
            Err(err) => {
                debug!(product = %request.product_id, "License rejected: {}", err);
                err.into()
            }
        }
    }

    fn run(
        &self,
        token: &str,
        request: &ValidationRequest,
        now: DateTime<Utc>,
    ) -> LicenseResult<LicenseClaims> {
        if request.product_id.trim().is_empty() {
            return Err(LicenseError::MissingProductId);
        }
        if request.public_keys.iter().all(|k| k.trim().is_empty()) {
            return Err(LicenseError::MissingPublicKeys);
        }

        let token = token.trim();
        if token.is_empty() {
            return Err(LicenseError::EmptyToken);
        }

        let parts = TokenParts::split(token)?;
        let claims = parts.decode_claims()?;

        self.check_claims(&claims, request, now)?;
        self.check_signature(&parts, &request.public_keys)?;

        Ok(claims)
    }

    /// Applies the claim rules in order and stops at the first failure.
    pub fn check_claims(
        &self,
        claims: &LicenseClaims,
        request: &ValidationRequest,
        now: DateTime<Utc>,
    ) -> LicenseResult<()> {
        if !claims.is_complete() {
            return Err(LicenseError::IncompleteClaims);
        }

        let expected_issuer = self.config.expected_issuer(&request.product_id);
        if !issuers_match(&claims.iss, &expected_issuer) {
            return Err(LicenseError::IssuerMismatch {
                expected: expected_issuer,
            });
        }

        if claims.aud.trim().to_lowercase() != self.config.audience.to_lowercase() {
            return Err(LicenseError::AudienceMismatch {
                expected: self.config.audience.clone(),
            });
        }

        if !identifiers_match(&claims.publisher, &request.publisher_id) {
            return Err(LicenseError::PublisherMismatch {
                expected: request.publisher_id.clone(),
            });
        }

        if !identifiers_match(&claims.product, &request.product_id) {
            return Err(LicenseError::ProductMismatch {
                expected: request.product_id.clone(),
            });
        }

        let environment_licensed = claims
            .env
            .iter()
            .any(|e| e.matches(&request.environment_type, &request.environment_identifier));
        if !environment_licensed {
            return Err(LicenseError::EnvironmentMismatch {
                environment_type: request.environment_type.clone(),
                identifier: request.environment_identifier.clone(),
                licensed: claims.licensed_environments(),
            });
        }

        // A license without exp never expires
        if let Some(exp) = claims.exp {
            let expiry = DateTime::from_timestamp(exp, 0).ok_or(LicenseError::InvalidExpiry(exp))?;
            if expiry < now {
                return Err(LicenseError::Expired(
                    expiry.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Verifies the token signature against each candidate key in order.
    pub fn check_signature<S: AsRef<str>>(
        &self,
        parts: &TokenParts<'_>,
        public_keys: &[S],
    ) -> LicenseResult<()> {
        let ring = KeyRing::import(public_keys, self.key_cache.as_ref());
        if ring.is_empty() {
            return Err(LicenseError::NoImportableKey);
        }

        let signature = parts
            .decode_signature()
            .map_err(|_| LicenseError::InvalidSignature)?;

        match ring.verify(&parts.signing_input(), &signature) {
            Some(anchor) => {
                debug!(anchor = %anchor.fingerprint(), "License signature verified");
                Ok(())
            }
            None => Err(LicenseError::InvalidSignature),
        }
    }
}

/// Validates `token` with the default licensing-system identity.
#[must_use]
pub fn validate<S: AsRef<str>>(
    token: &str,
    publisher_id: &str,
    product_id: &str,
    environment_type: &str,
    environment_identifier: &str,
    public_keys: &[S],
) -> ValidationResult {
    let request = ValidationRequest::new(publisher_id, product_id)
        .with_environment(environment_type, environment_identifier)
        .with_public_keys(public_keys.iter().map(|k| k.as_ref().to_string()));
    LicenseValidator::default().validate(token, &request)
}
