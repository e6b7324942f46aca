//! Certificate chain validation.
//!
//! The Login packet carries an ordered list of JWTs. Each link declares an
//! `identityPublicKey`, and the next link must be signed with it. Somewhere
//! in the chain one link must also be signed by the trusted root key (the
//! identity provider). The last link's claims then describe the player.
//!
//! ```text
//! link 0  signed by client key   identityPublicKey = ROOT
//! link 1  signed by ROOT  ✓ trust identityPublicKey = K1
//! link 2  signed by K1           identityPublicKey = K2  ← leaf
//! ```
//!
//! Root trust only has to show up once, at any position. The
//! predecessor check, by contrast, applies to every link after the first,
//! whether or not trust has already been established.

use std::fmt;

use p384::PublicKey;
use serde_json::{Map, Value};

use super::jwt::{JwtToken, decode_public_key};
use crate::SessionError;

/// The identity provider's root key (base64 SPKI DER, secp384r1).
pub const MOJANG_ROOT_KEY: &str = "MHYwEAYHKoZIzj0CAQYFK4EEACIDYgAE8ELkixyLcwlZryUQcu1TvPOmI2B7vX83ndnWRUaXm74wFfa5f/lwQNTfrLVHa2PmenpGI6JhIMUJaWZrjmMj90NoKNFSNBuKdm8rYiXsfaz3K36x/1U26HpG0ZxK/V1V";

/// The single public key every accepted chain must lead back to.
///
/// Parsed once at startup and shared by reference (usually in an `Arc`);
/// it is never mutated afterwards.
#[derive(Clone, PartialEq, Eq)]
pub struct TrustRoot {
    key: PublicKey,
}

impl TrustRoot {
    pub fn new(key: PublicKey) -> Self {
        Self { key }
    }

    /// Parses a base64 SPKI DER key.
    pub fn from_base64(encoded: &str) -> Result<Self, SessionError> {
        Ok(Self::new(decode_public_key(encoded)?))
    }

    /// The production identity provider's root.
    pub fn mojang() -> Result<Self, SessionError> {
        Self::from_base64(MOJANG_ROOT_KEY)
    }

    pub fn key(&self) -> &PublicKey {
        &self.key
    }
}

impl fmt::Debug for TrustRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustRoot").finish_non_exhaustive()
    }
}

/// A chain that passed validation.
#[derive(Debug, Clone)]
pub struct ValidatedChain {
    /// The leaf's `identityPublicKey`. Client data must be signed by it.
    pub identity_key: PublicKey,
    /// The leaf's claims, including `extraData`.
    pub claims: Map<String, Value>,
}

/// Validates a certificate chain against `root`.
///
/// # Errors
/// - [`SessionError::MalformedToken`] if a link is not a JWT.
/// - [`SessionError::ChainVerificationFailed`] if a link is not signed
///   by its predecessor's declared key.
/// - [`SessionError::MissingIdentityKey`] if a link has no string
///   `identityPublicKey`.
/// - [`SessionError::UntrustedChain`] if no link is signed by `root`, or
///   the chain is empty.
pub fn validate_chain<S: AsRef<str>>(
    links: &[S],
    root: &TrustRoot,
) -> Result<ValidatedChain, SessionError> {
    let mut trusted = false;
    let mut last_key: Option<PublicKey> = None;
    let mut leaf_claims: Option<Map<String, Value>> = None;

    for (index, link) in links.iter().enumerate() {
        let token = JwtToken::parse(link.as_ref())?;

        if !trusted && token.is_signed_by(root.key()) {
            trusted = true;
        }

        if let Some(previous) = &last_key {
            if !token.is_signed_by(previous) {
                return Err(SessionError::ChainVerificationFailed { index });
            }
        }

        let declared = token
            .claim_str("identityPublicKey")
            .ok_or(SessionError::MissingIdentityKey { index })?;
        last_key = Some(decode_public_key(declared)?);
        leaf_claims = Some(token.claims);
    }

    if !trusted {
        return Err(SessionError::UntrustedChain);
    }

    match (last_key, leaf_claims) {
        (Some(identity_key), Some(claims)) => Ok(ValidatedChain {
            identity_key,
            claims,
        }),
        _ => Err(SessionError::UntrustedChain),
    }
}
