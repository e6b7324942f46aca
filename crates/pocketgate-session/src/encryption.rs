//! Key agreement and the per-session packet cipher.
//!
//! Once a login is verified, the server and client agree on a symmetric
//! key without ever sending it:
//!
//! 1. The server makes a throwaway secp384r1 key pair and a random token.
//! 2. ECDH between the throwaway secret and the client's identity key
//!    gives a shared secret only the two of them can compute.
//! 3. `key = SHA-256(token ‖ shared_secret)`.
//! 4. The server sends its throwaway public key and the token in a
//!    [`ServerToClientHandshake`]; the client repeats step 2-3 on its side.
//!
//! From then on every frame body is AES-256-CFB8 encrypted (IV = first
//! 16 key bytes), with an 8-byte checksum appended before encryption:
//! `SHA-256(counter_le ‖ payload ‖ key)[..8]`. The counter goes up by one
//! per frame and per direction, so a replayed, dropped, or reordered frame
//! fails its checksum.

use std::fmt;

use aes::Aes256;
use cfb8::cipher::generic_array::GenericArray;
use cfb8::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use p384::ecdh::EphemeralSecret;
use p384::{PublicKey, SecretKey};
use pocketgate_protocol::packets::ServerToClientHandshake;
use rand::Rng;
use rand_core::OsRng;
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::SessionError;
use crate::auth::{decode_public_key, encode_public_key};

/// Length of the random salt sent in the handshake.
pub const TOKEN_LEN: usize = 16;

/// Length of the frame checksum.
pub const CHECKSUM_LEN: usize = 8;

type Encryptor = cfb8::Encryptor<Aes256>;
type Decryptor = cfb8::Decryptor<Aes256>;

/// Whether this deployment encrypts sessions at all.
///
/// Decided once from configuration; clients never negotiate it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncryptionSupport {
    #[default]
    Enabled,
    Disabled,
}

impl EncryptionSupport {
    pub fn is_enabled(self) -> bool {
        matches!(self, Self::Enabled)
    }
}

impl From<bool> for EncryptionSupport {
    fn from(enabled: bool) -> Self {
        if enabled { Self::Enabled } else { Self::Disabled }
    }
}

/// `SHA-256(token ‖ shared_secret)`.
pub fn derive_session_key(token: &[u8], shared_secret: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(token);
    hasher.update(shared_secret);
    hasher.finalize().into()
}

// ---------------------------------------------------------------------------
// Handshake
// ---------------------------------------------------------------------------

/// The server's half of the key agreement.
pub struct ServerHandshake {
    /// Ready to install on the session's frame codec.
    pub cipher: PacketCipher,
    /// Tells the client how to derive the same key.
    pub packet: ServerToClientHandshake,
}

impl ServerHandshake {
    /// Agrees on a session key with the holder of `client_identity_key`.
    ///
    /// # Errors
    /// [`SessionError::Handshake`] if the server's key cannot be encoded
    /// for the client.
    pub fn start(client_identity_key: &PublicKey) -> Result<Self, SessionError> {
        let secret = EphemeralSecret::random(&mut OsRng);
        let server_public = secret.public_key();
        let shared = secret.diffie_hellman(client_identity_key);

        let mut token = [0u8; TOKEN_LEN];
        rand::rng().fill(&mut token);

        let mut key = derive_session_key(&token, shared.raw_secret_bytes().as_slice());
        let cipher = PacketCipher::new(&key);
        key.zeroize();

        Ok(Self {
            cipher,
            packet: ServerToClientHandshake {
                public_key: encode_public_key(&server_public)
                    .map_err(|e| SessionError::Handshake(e.to_string()))?,
                token: token.to_vec(),
            },
        })
    }
}

/// The client's half: derives the session key from the server's
/// handshake packet and the client's identity secret.
pub fn client_session_key(
    client_secret: &SecretKey,
    handshake: &ServerToClientHandshake,
) -> Result<[u8; 32], SessionError> {
    let server_public = decode_public_key(&handshake.public_key)?;
    let shared =
        p384::ecdh::diffie_hellman(client_secret.to_nonzero_scalar(), server_public.as_affine());
    Ok(derive_session_key(&handshake.token, shared.raw_secret_bytes().as_slice()))
}

// ---------------------------------------------------------------------------
// PacketCipher
// ---------------------------------------------------------------------------

/// Encrypts outbound and decrypts inbound frame bodies for one session.
///
/// The two directions are separate CFB8 streams with separate counters.
/// Both must see every frame exactly once, in order.
pub struct PacketCipher {
    key: [u8; 32],
    encryptor: Encryptor,
    decryptor: Decryptor,
    send_counter: u64,
    receive_counter: u64,
}

impl PacketCipher {
    pub fn new(key: &[u8; 32]) -> Self {
        let key_array = GenericArray::from_slice(key.as_slice());
        let iv = GenericArray::from_slice(&key[..16]);
        Self {
            key: *key,
            encryptor: Encryptor::new(key_array, iv),
            decryptor: Decryptor::new(key_array, iv),
            send_counter: 0,
            receive_counter: 0,
        }
    }

    fn checksum(&self, counter: u64, payload: &[u8]) -> [u8; CHECKSUM_LEN] {
        let mut hasher = Sha256::new();
        hasher.update(counter.to_le_bytes());
        hasher.update(payload);
        hasher.update(self.key);
        let digest = hasher.finalize();
        let mut out = [0u8; CHECKSUM_LEN];
        out.copy_from_slice(&digest[..CHECKSUM_LEN]);
        out
    }

    /// Appends the checksum and encrypts.
    pub fn encrypt(&mut self, payload: &[u8]) -> Vec<u8> {
        let checksum = self.checksum(self.send_counter, payload);
        self.send_counter = self.send_counter.wrapping_add(1);

        let mut out = Vec::with_capacity(payload.len() + CHECKSUM_LEN);
        out.extend_from_slice(payload);
        out.extend_from_slice(&checksum);
        for byte in out.iter_mut() {
            self.encryptor
                .encrypt_block_mut(GenericArray::from_mut_slice(std::slice::from_mut(byte)));
        }
        out
    }

    /// Decrypts and checks the checksum.
    ///
    /// # Errors
    /// [`SessionError::ChecksumMismatch`] if the frame is too short or its
    /// checksum is wrong. The stream is out of sync after that; the
    /// session has to end.
    pub fn decrypt(&mut self, data: &[u8]) -> Result<Vec<u8>, SessionError> {
        let mut plain = data.to_vec();
        for byte in plain.iter_mut() {
            self.decryptor
                .decrypt_block_mut(GenericArray::from_mut_slice(std::slice::from_mut(byte)));
        }

        if plain.len() < CHECKSUM_LEN {
            return Err(SessionError::ChecksumMismatch);
        }
        let split = plain.len() - CHECKSUM_LEN;
        let expected = self.checksum(self.receive_counter, &plain[..split]);
        self.receive_counter = self.receive_counter.wrapping_add(1);

        if plain[split..] != expected {
            return Err(SessionError::ChecksumMismatch);
        }
        plain.truncate(split);
        Ok(plain)
    }
}

impl Drop for PacketCipher {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl fmt::Debug for PacketCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PacketCipher")
            .field("send_counter", &self.send_counter)
            .field("receive_counter", &self.receive_counter)
            .finish_non_exhaustive()
    }
}
