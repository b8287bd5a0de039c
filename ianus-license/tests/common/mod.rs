//! Shared test helpers for license tests.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use ianus_license::{
    EnvironmentEntry, LicenseClaims, LicenseValidator, SigningKey, TokenHeader,
    ValidationRequest, ValidatorConfig, encode_segment, encode_token, signing_input,
};

pub const PRIMARY_PRIVATE: &str = include_str!("../fixtures/primary_private.pem");
pub const PRIMARY_PUBLIC: &str = include_str!("../fixtures/primary_public.pem");
pub const FALLBACK_PRIVATE: &str = include_str!("../fixtures/fallback_private.pem");
pub const FALLBACK_PUBLIC: &str = include_str!("../fixtures/fallback_public.pem");

pub const PORTAL: &str = "https://host";

pub fn primary_key() -> SigningKey {
    SigningKey::from_pem(PRIMARY_PRIVATE).unwrap()
}

pub fn fallback_key() -> SigningKey {
    SigningKey::from_pem(FALLBACK_PRIVATE).unwrap()
}

pub fn validator() -> LicenseValidator {
    LicenseValidator::new(ValidatorConfig {
        portal_base_url: PORTAL.to_string(),
        ..ValidatorConfig::default()
    })
}

/// Claims for publisher P1 / product D1 licensed to dataverse org ORG1,
/// expiring a day after `now`.
pub fn scenario_claims(now: DateTime<Utc>) -> LicenseClaims {
    LicenseClaims {
        jti: "8f8a3c1e-0b7e-4f6c-9d2a-2b1f6f1e9c11".to_string(),
        iss: format!("{PORTAL}/api/public/products/D1"),
        aud: "ianusguard".to_string(),
        publisher: "P1".to_string(),
        product: "D1".to_string(),
        subject: "S1".to_string(),
        env: vec![EnvironmentEntry::new("dataverse", "ORG1", "n")],
        iat: now.timestamp(),
        nbf: now.timestamp(),
        exp: Some(now.timestamp() + 86_400),
        ver: "1.0".to_string(),
        ..LicenseClaims::default()
    }
}

pub fn scenario_request(public_keys: &[&str]) -> ValidationRequest {
    ValidationRequest::new("P1", "D1")
        .with_environment("dataverse", "ORG1")
        .with_public_keys(public_keys.iter().copied())
}

/// Signs claims into a token with the given key.
pub fn sign(key: &SigningKey, claims: &LicenseClaims) -> String {
    encode_token(&TokenHeader::new(Some("test".into())), claims, key).unwrap()
}

/// Signs an arbitrary claims JSON string into a token.
pub fn sign_json(key: &SigningKey, claims_json: &str) -> String {
    let header = encode_segment(br#"{"alg":"RS256","typ":"JWT"}"#);
    let claims = encode_segment(claims_json.as_bytes());
    let signature = key.sign(&signing_input(&header, &claims)).unwrap();
    format!("{header}.{claims}.{signature}")
}
