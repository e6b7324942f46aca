//! Login authentication.
//!
//! A Login packet carries two things: a certificate chain proving who the
//! player is, and a client data token describing their device and skin.
//! [`LoginVerifier`] checks both:
//!
//! 1. The chain validates against the [`TrustRoot`] ([`validate_chain`]).
//! 2. The leaf's `extraData` becomes the [`AuthProfile`].
//! 3. The client data token is signed by the leaf's identity key.
//!
//! Everything here is synchronous and CPU-bound, so the session runs it on
//! the login worker pool rather than on the connection task.

mod chain;
mod client_data;
mod jwt;

use std::sync::Arc;

use p384::PublicKey;
use serde::Deserialize;

use crate::SessionError;

pub use chain::{MOJANG_ROOT_KEY, TrustRoot, ValidatedChain, validate_chain};
pub use client_data::{AuthProfile, ClientData};
pub use jwt::{ES384, JwtHeader, JwtToken, decode_public_key, encode_public_key};

/// Shape of the Login packet's chain data.
#[derive(Deserialize)]
struct ChainEnvelope {
    chain: Vec<String>,
}

/// Everything a successful login verification yields.
#[derive(Debug, Clone)]
pub struct VerifiedLogin {
    pub profile: AuthProfile,
    pub client_data: ClientData,
    /// The leaf identity key; the encryption handshake agrees on a secret
    /// with it.
    pub identity_key: PublicKey,
}

/// Checks Login credentials against a fixed trust root.
///
/// Cheap to clone: the root is shared.
#[derive(Debug, Clone)]
pub struct LoginVerifier {
    root: Arc<TrustRoot>,
}

impl LoginVerifier {
    pub fn new(root: Arc<TrustRoot>) -> Self {
        Self { root }
    }

    /// Verifies the chain JSON and the client data token from a Login.
    ///
    /// # Errors
    /// - [`SessionError::MalformedChain`] if `chain_data` is not
    ///   `{"chain": [string, ...]}` or the leaf lacks `extraData`.
    /// - Any error from [`validate_chain`].
    /// - [`SessionError::ClientDataVerificationFailed`] if the client data
    ///   is not signed by the leaf identity key.
    pub fn verify(
        &self,
        chain_data: &str,
        client_data: &str,
    ) -> Result<VerifiedLogin, SessionError> {
        let envelope: ChainEnvelope = serde_json::from_str(chain_data)
            .map_err(|e| SessionError::MalformedChain(e.to_string()))?;

        let chain = validate_chain(&envelope.chain, &self.root)?;
        let profile = AuthProfile::from_claims(&chain.claims)?;

        let token = JwtToken::parse(client_data)?;
        if !token.is_signed_by(&chain.identity_key) {
            return Err(SessionError::ClientDataVerificationFailed(
                "signature does not match identity key".into(),
            ));
        }
        let client_data = ClientData::from_claims(token.claims)?;

        Ok(VerifiedLogin {
            profile,
            client_data,
            identity_key: chain.identity_key,
        })
    }
}
