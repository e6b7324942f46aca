//! Minimal ES384 JSON Web Tokens.
//!
//! Login credentials arrive as compact JWTs (`header.payload.signature`,
//! each segment base64url). Only what the login flow needs is here:
//! parse a token, check its ES384 signature against a P-384 key, and sign
//! new tokens (for clients, proxies, and tests).
//!
//! Public keys travel as base64 SPKI DER, the same form the protocol uses
//! in the `identityPublicKey` claim and the `x5u` header.

use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use p384::PublicKey;
use p384::ecdsa::signature::{Signer, Verifier};
use p384::ecdsa::{Signature, SigningKey, VerifyingKey};
use p384::pkcs8::{DecodePublicKey, EncodePublicKey};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::SessionError;

/// The only signature algorithm the protocol uses.
pub const ES384: &str = "ES384";

/// Decodes a base64 SPKI DER public key.
pub fn decode_public_key(encoded: &str) -> Result<PublicKey, SessionError> {
    let der = STANDARD
        .decode(encoded.trim())
        .map_err(|e| SessionError::InvalidPublicKey(e.to_string()))?;
    PublicKey::from_public_key_der(&der).map_err(|e| SessionError::InvalidPublicKey(e.to_string()))
}

/// Encodes a public key as base64 SPKI DER.
pub fn encode_public_key(key: &PublicKey) -> Result<String, SessionError> {
    let der = key
        .to_public_key_der()
        .map_err(|e| SessionError::InvalidPublicKey(e.to_string()))?;
    Ok(STANDARD.encode(der.as_bytes()))
}

/// Segments are base64url without padding, but some clients pad them or
/// use the standard alphabet. Accept both.
fn decode_segment(segment: &str) -> Result<Vec<u8>, SessionError> {
    URL_SAFE_NO_PAD
        .decode(segment.trim_end_matches('='))
        .or_else(|_| STANDARD.decode(segment))
        .map_err(|e| SessionError::MalformedToken(e.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    /// The signer's public key, base64 SPKI DER.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x5u: Option<String>,
}

/// A parsed, not yet verified, token.
#[derive(Debug, Clone)]
pub struct JwtToken {
    pub header: JwtHeader,
    pub claims: Map<String, Value>,
    signing_input: String,
    signature: Vec<u8>,
}

impl JwtToken {
    /// Splits and decodes a compact token. Does not check the signature.
    ///
    /// # Errors
    /// [`SessionError::MalformedToken`] unless the token is exactly three
    /// segments with a JSON header and a JSON object payload.
    pub fn parse(token: &str) -> Result<Self, SessionError> {
        let mut parts = token.trim().split('.');
        let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(SessionError::MalformedToken(
                "expected three segments".into(),
            ));
        };

        let header: JwtHeader = serde_json::from_slice(&decode_segment(header_b64)?)
            .map_err(|e| SessionError::MalformedToken(format!("header: {e}")))?;
        let claims: Map<String, Value> = serde_json::from_slice(&decode_segment(payload_b64)?)
            .map_err(|e| SessionError::MalformedToken(format!("payload: {e}")))?;
        let signature = decode_segment(signature_b64)?;

        Ok(Self {
            header,
            claims,
            signing_input: format!("{header_b64}.{payload_b64}"),
            signature,
        })
    }

    /// Returns `true` if the token is ES384 and its signature verifies
    /// against `key`. Any malformed signature simply fails to verify.
    pub fn is_signed_by(&self, key: &PublicKey) -> bool {
        if self.header.alg != ES384 {
            return false;
        }
        let Ok(signature) = Signature::from_slice(&self.signature) else {
            return false;
        };
        VerifyingKey::from(key)
            .verify(self.signing_input.as_bytes(), &signature)
            .is_ok()
    }

    /// Looks up a string claim.
    pub fn claim_str(&self, name: &str) -> Option<&str> {
        self.claims.get(name).and_then(Value::as_str)
    }

    /// Signs `claims` with `key`, producing a compact ES384 token whose
    /// `x5u` header names the signer.
    pub fn sign(claims: &Map<String, Value>, key: &SigningKey) -> Result<String, SessionError> {
        let signer = PublicKey::from(key.verifying_key());
        let header = JwtHeader {
            alg: ES384.to_string(),
            x5u: Some(encode_public_key(&signer)?),
        };

        let header_json =
            serde_json::to_vec(&header).map_err(|e| SessionError::Internal(e.to_string()))?;
        let payload_json =
            serde_json::to_vec(claims).map_err(|e| SessionError::Internal(e.to_string()))?;

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header_json),
            URL_SAFE_NO_PAD.encode(payload_json)
        );
        let signature: Signature = key.sign(signing_input.as_bytes());
        Ok(format!(
            "{signing_input}.{}",
            URL_SAFE_NO_PAD.encode(signature.to_bytes())
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_core::OsRng;
    use serde_json::json;

    fn claims(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("claims must be an object"),
        }
    }

    #[test]
    fn test_public_key_base64_round_trip() {
        let key = SigningKey::random(&mut OsRng);
        let public = PublicKey::from(key.verifying_key());
        let encoded = encode_public_key(&public).unwrap();
        assert_eq!(decode_public_key(&encoded).unwrap(), public);
    }

    #[test]
    fn test_decode_public_key_garbage_fails() {
        assert!(matches!(
            decode_public_key("bm90IGEga2V5"),
            Err(SessionError::InvalidPublicKey(_))
        ));
    }

    #[test]
    fn test_parse_signed_token_exposes_claims_and_header() {
        let key = SigningKey::random(&mut OsRng);
        let token = JwtToken::sign(&claims(json!({"identityPublicKey": "abc"})), &key).unwrap();
        let parsed = JwtToken::parse(&token).unwrap();
        assert_eq!(parsed.header.alg, ES384);
        assert!(parsed.header.x5u.is_some());
        assert_eq!(parsed.claim_str("identityPublicKey"), Some("abc"));
    }

    #[test]
    fn test_is_signed_by_signer_only() {
        let signer = SigningKey::random(&mut OsRng);
        let other = SigningKey::random(&mut OsRng);
        let token = JwtToken::sign(&claims(json!({"n": 1})), &signer).unwrap();
        let parsed = JwtToken::parse(&token).unwrap();

        assert!(parsed.is_signed_by(&PublicKey::from(signer.verifying_key())));
        assert!(!parsed.is_signed_by(&PublicKey::from(other.verifying_key())));
    }

    #[test]
    fn test_is_signed_by_tampered_payload_fails() {
        let signer = SigningKey::random(&mut OsRng);
        let token = JwtToken::sign(&claims(json!({"name": "alice"})), &signer).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let forged_payload = URL_SAFE_NO_PAD.encode(br#"{"name":"mallory"}"#);
        let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

        let parsed = JwtToken::parse(&forged).unwrap();
        assert!(!parsed.is_signed_by(&PublicKey::from(signer.verifying_key())));
    }

    #[test]
    fn test_is_signed_by_rejects_other_algorithms() {
        let signer = SigningKey::random(&mut OsRng);
        let token = JwtToken::sign(&claims(json!({})), &signer).unwrap();
        let mut parsed = JwtToken::parse(&token).unwrap();
        parsed.header.alg = "none".into();
        assert!(!parsed.is_signed_by(&PublicKey::from(signer.verifying_key())));
    }

    #[test]
    fn test_parse_wrong_segment_count_fails() {
        assert!(matches!(
            JwtToken::parse("a.b"),
            Err(SessionError::MalformedToken(_))
        ));
        assert!(matches!(
            JwtToken::parse("a.b.c.d"),
            Err(SessionError::MalformedToken(_))
        ));
    }

    #[test]
    fn test_parse_non_object_payload_fails() {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"ES384"}"#);
        let payload = URL_SAFE_NO_PAD.encode(b"[1,2]");
        let token = format!("{header}.{payload}.AAAA");
        assert!(matches!(
            JwtToken::parse(&token),
            Err(SessionError::MalformedToken(_))
        ));
    }
}
