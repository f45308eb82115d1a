//! Canonical payload encoding and the compact wire form.
//!
//! A token is `header.payload.tag`, each segment unpadded base64url. The
//! header is a fixed HS256 JWS header, so the oracle's MAC over
//! `header.payload` is a standard HS256 signature. Decoding is strict: any
//! byte sequence other than the one `encode` would have produced for the
//! same claims is rejected.

use super::{CodecError, IssuedToken, TokenClaims};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

/// `{"alg":"HS256","typ":"JWT"}`
pub const HEADER_JSON: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// base64url of [`HEADER_JSON`].
pub const HEADER_SEGMENT: &str = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9";

/// Longest wire token accepted.
pub const MAX_WIRE_LEN: usize = 8 * 1024;

// Field order here is the canonical order on the wire.
#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireClaims {
    iss: String,
    sub: String,
    iat: i64,
    exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scope: Option<String>,
    jti: String,
}

impl From<&TokenClaims> for WireClaims {
    fn from(claims: &TokenClaims) -> Self {
        Self {
            iss: claims.issuer.clone(),
            sub: claims.subject.clone(),
            iat: claims.issued_at,
            exp: claims.expires_at,
            scope: claims.scope_string(),
            jti: claims.token_id.clone(),
        }
    }
}

impl From<WireClaims> for TokenClaims {
    fn from(wire: WireClaims) -> Self {
        Self {
            issuer: wire.iss,
            subject: wire.sub,
            issued_at: wire.iat,
            expires_at: wire.exp,
            scopes: wire
                .scope
                .map(|s| s.split(' ').map(str::to_string).collect())
                .unwrap_or_default(),
            token_id: wire.jti,
        }
    }
}

/// Canonical JSON encoding of `claims`.
///
/// # Errors
///
/// Returns [`CodecError::Malformed`] if the claims violate their invariants.
pub fn encode(claims: &TokenClaims) -> Result<Vec<u8>, CodecError> {
    claims.validate()?;
    serde_json::to_vec(&WireClaims::from(claims)).map_err(|e| CodecError::malformed(e.to_string()))
}

/// Strict inverse of [`encode`].
///
/// # Errors
///
/// Returns [`CodecError::Malformed`] for unknown or duplicate fields,
/// invariant violations, and any non-canonical encoding.
pub fn decode(bytes: &[u8]) -> Result<TokenClaims, CodecError> {
    let wire: WireClaims =
        serde_json::from_slice(bytes).map_err(|e| CodecError::malformed(e.to_string()))?;
    let claims = TokenClaims::from(wire);
    if encode(&claims)? != bytes {
        return Err(CodecError::malformed("non-canonical encoding"));
    }
    Ok(claims)
}

/// Render the compact wire form.
#[must_use]
pub fn to_wire_string(token: &IssuedToken) -> String {
    let mut wire = token.signing_input_string();
    wire.push('.');
    wire.push_str(&URL_SAFE_NO_PAD.encode(&token.tag));
    wire
}

/// Parse the compact wire form. Does not verify the tag or decode claims.
///
/// # Errors
///
/// Returns [`CodecError::Malformed`] for anything that is not exactly three
/// canonical segments under the fixed header.
pub fn from_wire_string(wire: &str) -> Result<IssuedToken, CodecError> {
    if wire.len() > MAX_WIRE_LEN {
        return Err(CodecError::malformed("token too long"));
    }
    let mut segments = wire.split('.');
    let (Some(header), Some(payload), Some(tag), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(CodecError::malformed("expected three segments"));
    };

    if header != HEADER_SEGMENT {
        return Err(CodecError::malformed("unexpected header"));
    }
    let payload = decode_segment(payload)?;
    let tag = decode_segment(tag)?;
    Ok(IssuedToken { payload, tag })
}

fn decode_segment(segment: &str) -> Result<Vec<u8>, CodecError> {
    if segment.is_empty() {
        return Err(CodecError::malformed("empty segment"));
    }
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| CodecError::malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims() -> TokenClaims {
        TokenClaims {
            issuer: "open-idp".to_string(),
            subject: "acme".to_string(),
            issued_at: 1_700_000_000,
            expires_at: 1_700_003_600,
            scopes: vec!["read".to_string()],
            token_id: "0b8c6f4e-2a31-4d4a-9b55-3f0e2c1d9a77".to_string(),
        }
    }

    #[test]
    fn test_header_segment_matches_json() {
        assert_eq!(URL_SAFE_NO_PAD.encode(HEADER_JSON), HEADER_SEGMENT);
    }

    #[test]
    fn test_canonical_field_order() {
        let bytes = encode(&claims()).unwrap();
        assert_eq!(
            std::str::from_utf8(&bytes).unwrap(),
            r#"{"iss":"open-idp","sub":"acme","iat":1700000000,"exp":1700003600,"scope":"read","jti":"0b8c6f4e-2a31-4d4a-9b55-3f0e2c1d9a77"}"#
        );
    }

    #[test]
    fn test_scope_omitted_when_empty() {
        let mut c = claims();
        c.scopes.clear();
        let bytes = encode(&c).unwrap();
        assert!(!std::str::from_utf8(&bytes).unwrap().contains("scope"));
        assert_eq!(decode(&bytes).unwrap(), c);
    }

    #[test]
    fn test_decode_rejects_non_canonical() {
        let reordered = br#"{"sub":"acme","iss":"open-idp","iat":1,"exp":2,"jti":"x"}"#;
        assert!(decode(reordered).is_err());

        let spaced = br#"{"iss": "open-idp","sub":"acme","iat":1,"exp":2,"jti":"x"}"#;
        assert!(decode(spaced).is_err());

        let unknown = br#"{"iss":"i","sub":"s","iat":1,"exp":2,"jti":"x","admin":true}"#;
        assert!(decode(unknown).is_err());

        let empty_scope = br#"{"iss":"i","sub":"s","iat":1,"exp":2,"scope":"","jti":"x"}"#;
        assert!(decode(empty_scope).is_err());

        let double_space = br#"{"iss":"i","sub":"s","iat":1,"exp":2,"scope":"a  b","jti":"x"}"#;
        assert!(decode(double_space).is_err());

        let expired_before_issue = br#"{"iss":"i","sub":"s","iat":2,"exp":2,"jti":"x"}"#;
        assert!(decode(expired_before_issue).is_err());

        let canonical = br#"{"iss":"i","sub":"s","iat":1,"exp":2,"jti":"x"}"#;
        assert!(decode(canonical).is_ok());
    }

    #[test]
    fn test_wire_round_trip() {
        let token = IssuedToken {
            payload: encode(&claims()).unwrap(),
            tag: vec![0xde, 0xad, 0xbe, 0xef],
        };
        let wire = to_wire_string(&token);
        assert!(wire.starts_with(HEADER_SEGMENT));
        assert_eq!(from_wire_string(&wire).unwrap(), token);
    }

    #[test]
    fn test_wire_rejects_bad_shapes() {
        let payload = URL_SAFE_NO_PAD.encode(b"{}");
        for wire in [
            "not-a-token".to_string(),
            String::new(),
            format!("{HEADER_SEGMENT}.{payload}"),
            format!("{HEADER_SEGMENT}.{payload}.AAAA.AAAA"),
            format!("{HEADER_SEGMENT}..AAAA"),
            format!("{HEADER_SEGMENT}.{payload}."),
            format!("eyJhbGciOiJub25lIn0.{payload}.AAAA"),
            format!("{HEADER_SEGMENT}.{payload}.AAAA=="),
            format!("{HEADER_SEGMENT}.{payload}.AA+/"),
            format!("{HEADER_SEGMENT}.{payload}.{}", "A".repeat(MAX_WIRE_LEN)),
        ] {
            assert!(from_wire_string(&wire).is_err(), "accepted {wire:?}");
        }
    }

    #[test]
    fn test_wire_rejects_trailing_bits() {
        // "AB" decodes to one byte but leaves non-zero trailing bits; "AA" is canonical.
        let payload = URL_SAFE_NO_PAD.encode(b"{}");
        assert!(from_wire_string(&format!("{HEADER_SEGMENT}.{payload}.AB")).is_err());
        assert!(from_wire_string(&format!("{HEADER_SEGMENT}.{payload}.AA")).is_ok());
    }
}
