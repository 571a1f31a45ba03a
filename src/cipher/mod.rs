pub mod null;
pub mod suite1;

use rand_core::CryptoRngCore;
use zeroize::Zeroizing;

use crate::address::Address;
use crate::error::{Error, ParseError, Result};
use crate::secret::Secret;

pub use null::{NullPrivateBundle, NullPublicBundle, NullSuite};
pub use suite1::{Suite1, Suite1PrivateBundle, Suite1PublicBundle};

/// Default cipher suite for new identities. The null suite is never selected
/// implicitly.
pub const DEFAULT_CIPHER: CipherId = CipherId::Suite1;

/// Registered cipher suites, identified by a small integer on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CipherId {
    /// Placeholder suite with fixed outputs. NOT SECURE; test plumbing only.
    Null = 0,
    /// RSA-4096 (PSS/OAEP) + X25519 + AES-256-CTR + HMAC-SHA-512.
    Suite1 = 1,
}

impl CipherId {
    pub fn from_u8(v: u8) -> std::result::Result<Self, ParseError> {
        match v {
            0 => Ok(Self::Null),
            1 => Ok(Self::Suite1),
            other => Err(ParseError::UnknownCipher(other)),
        }
    }

    /// Resolve the implementation for this id.
    pub fn suite(self) -> &'static dyn CipherSuite {
        match self {
            Self::Null => &NullSuite,
            Self::Suite1 => &Suite1,
        }
    }
}

/// Public halves of an identity's key bundle, one variant per suite.
#[derive(Debug, Clone)]
pub enum PublicKeyBundle {
    Null(NullPublicBundle),
    Suite1(Suite1PublicBundle),
}

impl PublicKeyBundle {
    pub fn cipher(&self) -> CipherId {
        match self {
            Self::Null(_) => CipherId::Null,
            Self::Suite1(_) => CipherId::Suite1,
        }
    }
}

/// Private key bundle owned by a first-person identity, one variant per suite.
pub enum PrivateKeyBundle {
    Null(NullPrivateBundle),
    Suite1(Suite1PrivateBundle),
}

impl PrivateKeyBundle {
    pub fn cipher(&self) -> CipherId {
        match self {
            Self::Null(_) => CipherId::Null,
            Self::Suite1(_) => CipherId::Suite1,
        }
    }
}

/// The three public key fields of an identity declaration (GIDC), as raw
/// bytes in each suite's packed form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedPublicKeys {
    pub signature: Vec<u8>,
    pub encryption: Vec<u8>,
    pub exchange: Vec<u8>,
}

/// Capability contract every cipher suite satisfies.
///
/// Implementations are stateless: every operation is a pure function of its
/// inputs, so a suite handle may be shared freely across threads. Operations
/// that need entropy take it explicitly; signing draws its padding salt from
/// the OS generator internally.
///
/// Signing and MAC data is always a container's 64-byte address digest, never
/// free-form plaintext; authenticity binds to the container's identity.
pub trait CipherSuite: Send + Sync {
    fn id(&self) -> CipherId;

    /// Generate fresh asymmetric key material for all three roles.
    fn generate_keys(&self, rng: &mut dyn CryptoRngCore) -> Result<PrivateKeyBundle>;

    /// Project the public halves out of a private bundle.
    fn public_bundle(&self, keys: &PrivateKeyBundle) -> Result<PublicKeyBundle>;

    /// Serialize public keys into the GIDC field triple.
    fn pack_public(&self, keys: &PublicKeyBundle) -> Result<PackedPublicKeys>;

    /// Rebuild a public bundle from GIDC fields.
    fn unpack_public(&self, packed: &PackedPublicKeys) -> Result<PublicKeyBundle>;

    /// Sign a precomputed 64-byte address digest.
    fn sign(&self, keys: &PrivateKeyBundle, digest: &[u8]) -> Result<Vec<u8>>;

    /// Verify a signature over a 64-byte address digest. Any mismatch is
    /// `Error::Security`; success is `Ok(())`, never a boolean.
    fn verify(&self, keys: &PublicKeyBundle, signature: &[u8], digest: &[u8]) -> Result<()>;

    /// Encrypt a short structured record to a counterparty's public
    /// encryption key. Plaintext length is bounded by the suite.
    fn encrypt_asym(&self, keys: &PublicKeyBundle, plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Decrypt an asymmetric payload with our private encryption key.
    fn decrypt_asym(&self, keys: &PrivateKeyBundle, ciphertext: &[u8]) -> Result<Vec<u8>>;

    /// Symmetric encryption under a one-time secret.
    fn encrypt_sym(&self, secret: &Secret, plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Symmetric decryption under a one-time secret.
    fn decrypt_sym(&self, secret: &Secret, ciphertext: &[u8]) -> Result<Vec<u8>>;

    /// Derive shared key material with a counterparty. Symmetric: both sides
    /// compute the same key regardless of who initiates.
    fn derive_shared(
        &self,
        own: &PrivateKeyBundle,
        own_address: &Address,
        partner: &PublicKeyBundle,
        partner_address: &Address,
    ) -> Result<Zeroizing<Vec<u8>>>;

    /// Keyed integrity tag over a 64-byte address digest.
    fn mac(&self, key: &[u8], data: &[u8]) -> Result<Vec<u8>>;

    /// Verify a MAC in constant time. Any mismatch is `Error::Security`.
    fn verify_mac(&self, key: &[u8], tag: &[u8], data: &[u8]) -> Result<()>;

    /// Generate a fresh one-time secret with independently random key and
    /// seed.
    fn new_secret(&self, rng: &mut dyn CryptoRngCore) -> Result<Secret>;
}

/// Reject a secret that does not belong to `expected` before any cryptographic
/// call touches it.
pub(crate) fn typecheck_secret(expected: CipherId, secret: &Secret) -> Result<()> {
    if secret.cipher() != expected {
        return Err(Error::TypeMismatch(
            "secret belongs to a different cipher suite than this identity",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_resolves_by_id() {
        assert_eq!(CipherId::Null.suite().id(), CipherId::Null);
        assert_eq!(CipherId::Suite1.suite().id(), CipherId::Suite1);
    }

    #[test]
    fn unknown_cipher_id_rejected() {
        assert!(matches!(
            CipherId::from_u8(42),
            Err(ParseError::UnknownCipher(42))
        ));
    }

    #[test]
    fn default_cipher_is_not_the_null_suite() {
        assert_ne!(DEFAULT_CIPHER, CipherId::Null);
    }

    #[test]
    fn secret_typecheck_fails_fast() {
        let secret = Secret::new(CipherId::Null, vec![0; 32], vec![0; 16]);
        assert!(matches!(
            typecheck_secret(CipherId::Suite1, &secret),
            Err(Error::TypeMismatch(_))
        ));
        assert!(typecheck_secret(CipherId::Null, &secret).is_ok());
    }
}
