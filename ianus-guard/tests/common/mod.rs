//! Shared test helpers for guard tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Duration, Utc};
use ianus_license::{
    EnvironmentEntry, IssuerConfig, LicenseGrant, LicenseValidator, SigningKey,
    ValidationRequest, ValidatorConfig, issue_license,
};
use ianus_guard::LicenseGuard;

pub const PRIMARY_PRIVATE: &str = include_str!("../fixtures/primary_private.pem");
pub const PRIMARY_PUBLIC: &str = include_str!("../fixtures/primary_public.pem");

pub const PORTAL: &str = "https://portal.test";
pub const PUBLISHER: &str = "6f1c2f0e-3b1a-4d7e-8e55-0a9d1c2b3e4f";
pub const PRODUCT: &str = "0b7d9a52-1c3e-4f60-9a8b-7c6d5e4f3a21";
pub const ORGANIZATION: &str = "c0ffee00-1111-2222-3333-444455556666";

pub fn grant(subject: &str) -> LicenseGrant {
    LicenseGrant {
        publisher_id: PUBLISHER.into(),
        publisher_name: "Ianua Software".into(),
        product_id: PRODUCT.into(),
        product_name: "Demo".into(),
        subject_id: subject.into(),
        subject_name: "Customer".into(),
        environments: vec![EnvironmentEntry::new("dataverse", ORGANIZATION, "Production")],
        ..LicenseGrant::default()
    }
}

/// Issues a license for the test product valid for `days` days.
pub fn issue(subject: &str, days: Option<u32>) -> String {
    let config = IssuerConfig {
        portal_base_url: PORTAL.into(),
        lifetime_days: days,
        ..IssuerConfig::default()
    };
    let key = SigningKey::from_pem(PRIMARY_PRIVATE).unwrap();
    issue_license(&config, &grant(subject), &key, Utc::now()).unwrap()
}

/// Issues a license that expired yesterday.
pub fn issue_expired(subject: &str) -> String {
    let config = IssuerConfig {
        portal_base_url: PORTAL.into(),
        lifetime_days: Some(1),
        ..IssuerConfig::default()
    };
    let key = SigningKey::from_pem(PRIMARY_PRIVATE).unwrap();
    issue_license(&config, &grant(subject), &key, Utc::now() - Duration::days(2)).unwrap()
}

pub fn request() -> ValidationRequest {
    ValidationRequest::new(format!("{{{}}}", PUBLISHER.to_uppercase()), PRODUCT)
        .with_environment("dataverse", ORGANIZATION)
        .with_public_keys([PRIMARY_PUBLIC])
}

pub fn guard(request: ValidationRequest) -> LicenseGuard {
    let validator = LicenseValidator::new(ValidatorConfig {
        portal_base_url: PORTAL.into(),
        ..ValidatorConfig::default()
    });
    LicenseGuard::new(Arc::new(validator), request)
}
