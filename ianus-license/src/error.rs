//! Error types for the licensing core.
//!
//! Rule violations carry the exact text shown to the end user; the
//! validator turns any of these into a [`crate::ValidationResult`].

use thiserror::Error;

/// Licensing-specific errors.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// The integrating application passed no product id.
    #[error("No productId found, pass a productId!")]
    MissingProductId,

    /// The integrating application passed no public keys.
    #[error("No public key found, pass a valid public key!")]
    MissingPublicKeys,

    /// No license token was supplied.
    #[error("No license key set!")]
    EmptyToken,

    /// Token has fewer than three dot-separated segments.
    #[error("Invalid license format!")]
    MalformedToken,

    /// A segment is not valid base64url.
    #[error("invalid base64url segment: {0}")]
    InvalidBase64(String),

    /// Claims segment decoded but is not a claims object.
    #[error("invalid claims encoding: {0}")]
    InvalidClaimsEncoding(String),

    /// Header segment decoded but is not a header object.
    #[error("invalid token header: {0}")]
    InvalidHeader(String),

    /// `env`, `aud` or `iss` is missing or empty.
    #[error("Incomplete license!")]
    IncompleteClaims,

    /// Issuer does not belong to the expected product.
    #[error("Invalid license issuer: Issuer must be '{expected}'")]
    IssuerMismatch { expected: String },

    /// Audience is not the licensing system.
    #[error("Invalid license audience: Audience must be '{expected}'")]
    AudienceMismatch { expected: String },

    /// License was issued by another publisher.
    #[error("Invalid license publisher: Publisher must be '{expected}'")]
    PublisherMismatch { expected: String },

    /// License was issued for another product.
    #[error("Invalid license product: Product must be '{expected}'")]
    ProductMismatch { expected: String },

    /// No licensed environment matches the current one.
    #[error(
        "Invalid environment: Your license is not intended for usage in '{environment_type}' environment '{identifier}' but for '{licensed}'"
    )]
    EnvironmentMismatch {
        environment_type: String,
        identifier: String,
        licensed: String,
    },

    /// The `exp` claim cannot be represented as a date.
    #[error("Invalid license expiry: License expiry '{0}' is out of range")]
    InvalidExpiry(i64),

    /// License has expired.
    #[error("Invalid license expiry: License expired on '{0}'")]
    Expired(String),

    /// A PEM string is not an importable RSA key.
    #[error("invalid RSA key: {0}")]
    KeyImport(String),

    /// None of the candidate public keys could be imported.
    #[error("Invalid license signature: No public key could be imported!")]
    NoImportableKey,

    /// No candidate key verifies the signature.
    #[error("Invalid license signature: Verification failed!")]
    InvalidSignature,

    /// Creating a signature failed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LicenseError {
    /// Returns true for failures a different license key cannot fix:
    /// misconfiguration of the host and unexpected internal failures.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::MissingProductId
                | Self::MissingPublicKeys
                | Self::InvalidBase64(_)
                | Self::InvalidClaimsEncoding(_)
                | Self::InvalidHeader(_)
                | Self::Signing(_)
                | Self::Serialization(_)
        )
    }

    /// Returns true when the user-facing message must not reveal the
    /// underlying error text.
    #[must_use]
    pub fn is_unexpected(&self) -> bool {
        matches!(
            self,
            Self::InvalidBase64(_)
                | Self::InvalidClaimsEncoding(_)
                | Self::InvalidHeader(_)
                | Self::Signing(_)
                | Self::Serialization(_)
        )
    }
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;
