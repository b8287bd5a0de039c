//! License tokens and offline validation for Ianus Guard.
//!
//! This crate handles:
//! - The compact token format and its base64url codec
//! - Issuing signed licenses (RSASSA-PKCS1-v1_5 with SHA-256)
//! - Validating licenses against the expected publisher, product and
//!   environment, and against one or more trusted public keys
//!
//! # License Token Format
//!
//! Tokens are formatted as: `base64url(header).base64url(claims).base64url(signature)`
//! The signature covers the first two segments exactly as they appear in
//! the token.
//!
//! # Validation Order
//!
//! Claim rules run before the signature check so the first failing rule
//! produces the user-facing reason. Only a verified signature yields
//! [`ValidationResult::Valid`]. Nothing in this crate performs I/O.

mod claims;
mod codec;
mod error;
mod info;
mod issue;
mod keys;
mod result;
mod validator;

pub use claims::{
    EnvironmentEntry, LicenseClaims, Meta, identifiers_match, issuer_url, issuers_match,
    normalize_identifier, record_identifier,
};
pub use codec::{
    ALGORITHM, TOKEN_TYPE, TokenHeader, TokenParts, decode_claims, decode_header, decode_segment,
    encode_claims, encode_header, encode_segment, signing_input,
};
pub use error::{LicenseError, LicenseResult};
pub use info::LicenseInfo;
pub use issue::{
    DEFAULT_LIFETIME_DAYS, IssuerConfig, LicenseGrant, SCHEMA_VERSION, encode_token, issue_license,
};
pub use keys::{KeyCache, KeyRing, SigningKey, TrustAnchor};
pub use result::{UNEXPECTED_FAILURE_REASON, ValidationResult};
pub use validator::{
    DEFAULT_AUDIENCE, DEFAULT_PORTAL_BASE_URL, LicenseValidator, ValidationRequest,
    ValidatorConfig, validate,
};
