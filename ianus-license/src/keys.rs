//! RSA key handling for RS256 license tokens.
//!
//! Public keys are trust anchors supplied by the host as PEM strings.
//! A signature valid under any anchor of the set is accepted.

use std::collections::HashMap;
use std::sync::RwLock;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, crypto};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::codec::encode_segment;
use crate::error::{LicenseError, LicenseResult};

const PUBLIC_KEY_BEGIN: &str = "-----BEGIN PUBLIC KEY-----";
const PUBLIC_KEY_END: &str = "-----END PUBLIC KEY-----";

/// An imported RSA public key.
#[derive(Clone)]
pub struct TrustAnchor {
    key: DecodingKey,
    fingerprint: String,
}

impl TrustAnchor {
    /// Imports an RSA public key from PEM.
    ///
    /// Accepts SPKI (`BEGIN PUBLIC KEY`) and PKCS#1 (`BEGIN RSA PUBLIC KEY`)
    /// armor, or a bare base64 SPKI body without armor.
    pub fn from_pem(pem: &str) -> LicenseResult<Self> {
        let armored = armor_public_key(pem);
        let key = DecodingKey::from_rsa_pem(armored.as_bytes())
            .map_err(|e| LicenseError::KeyImport(e.to_string()))?;

        Ok(Self {
            key,
            fingerprint: fingerprint(&armored),
        })
    }

    /// Short hex fingerprint of the key material, for diagnostics.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Verifies an RSASSA-PKCS1-v1_5 / SHA-256 signature over `message`.
    #[must_use]
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        match crypto::verify(&encode_segment(signature), message, &self.key, Algorithm::RS256) {
            Ok(valid) => valid,
            Err(e) => {
                debug!(anchor = %self.fingerprint, "Signature check errored: {}", e);
                false
            }
        }
    }
}

impl std::fmt::Debug for TrustAnchor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustAnchor")
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

/// Memoizes imported anchors keyed by the PEM label and body.
///
/// Whitespace and line breaks do not create new entries, so the cache
/// holds at most one anchor per distinct key. Only the parsed key is
/// cached. Every validation still verifies the signature against the
/// anchors the caller passed for that call.
#[derive(Default)]
pub struct KeyCache {
    anchors: RwLock<HashMap<String, TrustAnchor>>,
}

impl KeyCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached anchor for `pem`, importing it on first use.
    pub fn anchor(&self, pem: &str) -> LicenseResult<TrustAnchor> {
        let cache_key = normalized_pem(&armor_public_key(pem));
        if let Ok(anchors) = self.anchors.read() {
            if let Some(anchor) = anchors.get(&cache_key) {
                return Ok(anchor.clone());
            }
        }

        let anchor = TrustAnchor::from_pem(pem)?;
        if let Ok(mut anchors) = self.anchors.write() {
            anchors.insert(cache_key, anchor.clone());
        }
        Ok(anchor)
    }

    /// Number of cached anchors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.anchors.read().map(|a| a.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for KeyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyCache").field("len", &self.len()).finish()
    }
}

/// An ordered set of trust anchors.
#[derive(Debug, Clone, Default)]
pub struct KeyRing {
    anchors: Vec<TrustAnchor>,
}

impl KeyRing {
    /// Imports every candidate PEM in order, skipping ones that fail.
    pub fn import<S: AsRef<str>>(pems: &[S], cache: Option<&KeyCache>) -> Self {
        let anchors = pems
            .iter()
            .enumerate()
            .filter_map(|(index, pem)| {
                let imported = match cache {
                    Some(cache) => cache.anchor(pem.as_ref()),
                    None => TrustAnchor::from_pem(pem.as_ref()),
                };
                imported
                    .map_err(|e| warn!(candidate = index, "Public key import failed: {}", e))
                    .ok()
            })
            .collect();

        Self { anchors }
    }

    /// Returns the first anchor that verifies the signature.
    #[must_use]
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Option<&TrustAnchor> {
        self.anchors
            .iter()
            .find(|anchor| anchor.verify(message, signature))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrustAnchor> {
        self.anchors.iter()
    }
}

/// An RSA private key used to issue licenses.
pub struct SigningKey(EncodingKey);

impl SigningKey {
    /// Imports an RSA private key from PKCS#1 or PKCS#8 PEM.
    pub fn from_pem(pem: &str) -> LicenseResult<Self> {
        EncodingKey::from_rsa_pem(pem.as_bytes())
            .map(Self)
            .map_err(|e| LicenseError::KeyImport(e.to_string()))
    }

    /// Signs `message` and returns the base64url signature segment.
    pub fn sign(&self, message: &[u8]) -> LicenseResult<String> {
        crypto::sign(message, &self.0, Algorithm::RS256)
            .map_err(|e| LicenseError::Signing(e.to_string()))
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Wraps a bare base64 body in SPKI armor; armored input is returned trimmed.
fn armor_public_key(pem: &str) -> String {
    let trimmed = pem.trim();
    if trimmed.starts_with("-----BEGIN") {
        return trimmed.to_string();
    }

    let body: String = trimmed.split_whitespace().collect();
    let lines = body
        .as_bytes()
        .chunks(64)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join("\n");
    format!("{PUBLIC_KEY_BEGIN}\n{lines}\n{PUBLIC_KEY_END}")
}

/// PEM body with armor and whitespace removed.
fn pem_body(pem: &str) -> String {
    pem.lines()
        .filter(|line| !line.trim().starts_with("-----"))
        .flat_map(|line| line.split_whitespace())
        .collect()
}

/// The `BEGIN` line followed by the body, independent of layout.
fn normalized_pem(pem: &str) -> String {
    let label = pem
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("-----BEGIN"))
        .unwrap_or_default();
    format!("{label}{}", pem_body(pem))
}

/// SHA-256 over the PEM body, first 8 bytes.
fn fingerprint(pem: &str) -> String {
    let digest = Sha256::digest(pem_body(pem).as_bytes());
    hex::encode(&digest[..8])
}
