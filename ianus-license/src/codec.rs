//! Compact token codec.
//!
//! Tokens use the format: `base64url(header).base64url(claims).base64url(signature)`
//!
//! The signature covers the ASCII bytes of `header_b64 + "." + claims_b64`
//! exactly as they appear in the token, never a re-serialization of the
//! decoded claims.

use base64::{
    Engine,
    engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD},
};
use serde::{Deserialize, Serialize};

use crate::claims::LicenseClaims;
use crate::error::{LicenseError, LicenseResult};

/// The only signature algorithm tokens are issued with.
pub const ALGORITHM: &str = "RS256";

/// Token type written into every header.
pub const TOKEN_TYPE: &str = "JWT";

/// Token header segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHeader {
    pub alg: String,
    pub typ: String,
    /// Signing key id. Cosmetic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
}

impl TokenHeader {
    /// Creates an RS256 header with an optional key id.
    #[must_use]
    pub fn new(kid: Option<String>) -> Self {
        Self {
            alg: ALGORITHM.to_string(),
            typ: TOKEN_TYPE.to_string(),
            kid,
        }
    }
}

impl Default for TokenHeader {
    fn default() -> Self {
        Self::new(None)
    }
}

/// The three encoded segments of a token, borrowed from the raw string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenParts<'a> {
    pub header: &'a str,
    pub claims: &'a str,
    pub signature: &'a str,
}

impl<'a> TokenParts<'a> {
    /// Splits a token on `.`.
    ///
    /// Fewer than three segments is malformed; segments beyond the third
    /// are ignored.
    pub fn split(token: &'a str) -> LicenseResult<Self> {
        let mut segments = token.split('.');
        match (segments.next(), segments.next(), segments.next()) {
            (Some(header), Some(claims), Some(signature)) => Ok(Self {
                header,
                claims,
                signature,
            }),
            _ => Err(LicenseError::MalformedToken),
        }
    }

    /// The bytes covered by the signature.
    #[must_use]
    pub fn signing_input(&self) -> Vec<u8> {
        signing_input(self.header, self.claims)
    }

    /// Decodes the claims segment.
    pub fn decode_claims(&self) -> LicenseResult<LicenseClaims> {
        decode_claims(self.claims)
    }

    /// Decodes the header segment.
    pub fn decode_header(&self) -> LicenseResult<TokenHeader> {
        decode_header(self.header)
    }

    /// Decodes the raw signature bytes.
    pub fn decode_signature(&self) -> LicenseResult<Vec<u8>> {
        decode_segment(self.signature)
    }
}

/// Returns `header_segment + "." + claims_segment` as bytes.
#[must_use]
pub fn signing_input(header_segment: &str, claims_segment: &str) -> Vec<u8> {
    format!("{header_segment}.{claims_segment}").into_bytes()
}

/// Encodes bytes as unpadded base64url.
#[must_use]
pub fn encode_segment(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decodes a base64url segment, padded or not.
///
/// Padding is re-synthesized from the length: remainder 2 takes two `=`,
/// remainder 3 takes one. Remainder 1 can never be valid.
pub fn decode_segment(segment: &str) -> LicenseResult<Vec<u8>> {
    let unpadded = segment.trim_end_matches('=');
    let padding = match unpadded.len() % 4 {
        0 => 0,
        2 => 2,
        3 => 1,
        _ => {
            return Err(LicenseError::InvalidBase64(format!(
                "segment of length {} cannot be base64url",
                unpadded.len()
            )));
        }
    };

    let mut padded = String::with_capacity(unpadded.len() + padding);
    padded.push_str(unpadded);
    padded.extend(std::iter::repeat_n('=', padding));

    URL_SAFE
        .decode(padded.as_bytes())
        .map_err(|e| LicenseError::InvalidBase64(e.to_string()))
}

/// Decodes and parses a claims segment.
pub fn decode_claims(claims_segment: &str) -> LicenseResult<LicenseClaims> {
    let json = decode_segment(claims_segment)?;
    serde_json::from_slice(&json).map_err(|e| LicenseError::InvalidClaimsEncoding(e.to_string()))
}

/// Decodes and parses a header segment.
pub fn decode_header(header_segment: &str) -> LicenseResult<TokenHeader> {
    let json = decode_segment(header_segment)?;
    serde_json::from_slice(&json).map_err(|e| LicenseError::InvalidHeader(e.to_string()))
}

/// Serializes claims to compact JSON and base64url-encodes them.
pub fn encode_claims(claims: &LicenseClaims) -> LicenseResult<String> {
    Ok(encode_segment(&serde_json::to_vec(claims)?))
}

/// Serializes a header to compact JSON and base64url-encodes it.
pub fn encode_header(header: &TokenHeader) -> LicenseResult<String> {
    Ok(encode_segment(&serde_json::to_vec(header)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_accepts_every_valid_remainder() {
        // "a" -> YQ (rem 2), "ab" -> YWI (rem 3), "abc" -> YWJj (rem 0)
        assert_eq!(decode_segment("YQ").unwrap(), b"a");
        assert_eq!(decode_segment("YWI").unwrap(), b"ab");
        assert_eq!(decode_segment("YWJj").unwrap(), b"abc");
    }

    #[test]
    fn decode_accepts_padded_input() {
        assert_eq!(decode_segment("YQ==").unwrap(), b"a");
        assert_eq!(decode_segment("YWI=").unwrap(), b"ab");
    }

    #[test]
    fn decode_rejects_remainder_one() {
        assert!(matches!(
            decode_segment("YWJjZ"),
            Err(LicenseError::InvalidBase64(_))
        ));
    }

    #[test]
    fn decode_uses_url_alphabet() {
        // 0xfb 0xff encodes to "-_8" in base64url and "+/8" in standard base64
        assert_eq!(decode_segment("-_8").unwrap(), vec![0xfb, 0xff]);
        assert!(decode_segment("+/8").is_err());
    }

    #[test]
    fn split_ignores_extra_segments() {
        let parts = TokenParts::split("a.b.c.d").unwrap();
        assert_eq!(parts.header, "a");
        assert_eq!(parts.claims, "b");
        assert_eq!(parts.signature, "c");
    }

    #[test]
    fn split_requires_three_segments() {
        assert!(matches!(
            TokenParts::split("a.b"),
            Err(LicenseError::MalformedToken)
        ));
        assert!(matches!(
            TokenParts::split("nodots"),
            Err(LicenseError::MalformedToken)
        ));
    }

    #[test]
    fn signing_input_is_raw_segments() {
        let parts = TokenParts::split("aGVhZA.Y2xhaW1z.c2ln").unwrap();
        assert_eq!(parts.signing_input(), b"aGVhZA.Y2xhaW1z".to_vec());
    }

    #[test]
    fn header_encodes_compactly() {
        let header = TokenHeader::new(Some("k1".into()));
        let json = serde_json::to_string(&header).unwrap();
        assert_eq!(json, r#"{"alg":"RS256","typ":"JWT","kid":"k1"}"#);
        assert_eq!(decode_header(&encode_header(&header).unwrap()).unwrap(), header);
    }
}
