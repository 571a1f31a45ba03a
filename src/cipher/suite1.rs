//! CipherSuite-1: RSA-4096 signatures (PSS/SHA-512) and encryption (OAEP),
//! X25519 key exchange with HKDF-SHA-512 stretching, AES-256-CTR symmetric
//! encryption, and HMAC-SHA-512 authentication.

use aes::Aes256;
use ctr::cipher::{KeyIvInit, StreamCipher};
use ctr::Ctr128BE;
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand_core::CryptoRngCore;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, Oaep, Pss, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha512};
use x25519_dalek::{PublicKey as ExchangePublicKey, StaticSecret};
use zeroize::Zeroizing;

use super::{
    typecheck_secret, CipherId, CipherSuite, PackedPublicKeys, PrivateKeyBundle, PublicKeyBundle,
};
use crate::address::{Address, DIGEST_LEN};
use crate::error::{Error, Result};
use crate::secret::Secret;

/// RSA modulus size for both the signature and encryption roles.
pub const RSA_BITS: usize = 4096;
const MODULUS_LEN: usize = RSA_BITS / 8;

/// Fixed public exponent; only the modulus travels in a GIDC.
const RSA_EXPONENT: u32 = 65537;

/// OAEP with SHA-512 costs `2 * hash + 2` bytes of a 512-byte block. Payloads
/// are short structured records (handshake/ack/nak), never bulk objects.
pub const MAX_ASYM_PLAINTEXT: usize = MODULUS_LEN - 2 * DIGEST_LEN - 2;

const SYM_KEY_LEN: usize = 32;
const SYM_SEED_LEN: usize = 16;

/// AES-256 in counter mode; the full 16-byte IV is the initial value of a
/// 128-bit big-endian counter.
type Aes256Ctr = Ctr128BE<Aes256>;
type HmacSha512 = Hmac<Sha512>;

/// Public key bundle for suite 1.
#[derive(Debug, Clone)]
pub struct Suite1PublicBundle {
    pub signature: RsaPublicKey,
    pub encryption: RsaPublicKey,
    pub exchange: ExchangePublicKey,
}

/// Private key bundle for suite 1. The exchange secret zeroizes on drop.
pub struct Suite1PrivateBundle {
    signature: RsaPrivateKey,
    encryption: RsaPrivateKey,
    exchange: StaticSecret,
}

impl Suite1PrivateBundle {
    pub fn new(
        signature: RsaPrivateKey,
        encryption: RsaPrivateKey,
        exchange: StaticSecret,
    ) -> Self {
        Self {
            signature,
            encryption,
            exchange,
        }
    }
}

/// PSS salt length equals the digest size, MGF1 over the same digest.
fn pss() -> Pss {
    Pss::new_with_salt::<Sha512>(DIGEST_LEN)
}

fn oaep() -> Oaep {
    Oaep::new::<Sha512>()
}

/// Serialize a modulus as a fixed-width big-endian integer.
fn pack_modulus(key: &RsaPublicKey) -> Vec<u8> {
    let n = key.n().to_bytes_be();
    let mut out = vec![0u8; MODULUS_LEN - n.len()];
    out.extend_from_slice(&n);
    out
}

fn unpack_modulus(bytes: &[u8]) -> Result<RsaPublicKey> {
    if bytes.len() != MODULUS_LEN {
        return Err(Error::Configuration(
            "RSA public key must be a 512-byte big-endian modulus",
        ));
    }
    RsaPublicKey::new(BigUint::from_bytes_be(bytes), BigUint::from(RSA_EXPONENT))
        .map_err(|_| Error::Configuration("invalid RSA modulus"))
}

fn expect_private(keys: &PrivateKeyBundle) -> Result<&Suite1PrivateBundle> {
    match keys {
        PrivateKeyBundle::Suite1(bundle) => Ok(bundle),
        _ => Err(Error::TypeMismatch(
            "private key bundle does not belong to cipher suite 1",
        )),
    }
}

fn expect_public(keys: &PublicKeyBundle) -> Result<&Suite1PublicBundle> {
    match keys {
        PublicKeyBundle::Suite1(bundle) => Ok(bundle),
        _ => Err(Error::TypeMismatch(
            "public key bundle does not belong to cipher suite 1",
        )),
    }
}

fn expect_digest(digest: &[u8]) -> Result<()> {
    if digest.len() != DIGEST_LEN {
        return Err(Error::TypeMismatch(
            "signing input must be a 64-byte address digest",
        ));
    }
    Ok(())
}

fn expect_secret(secret: &Secret) -> Result<()> {
    typecheck_secret(CipherId::Suite1, secret)?;
    if secret.key().len() != SYM_KEY_LEN || secret.seed().len() != SYM_SEED_LEN {
        return Err(Error::TypeMismatch(
            "suite 1 secrets carry a 32-byte key and a 16-byte seed",
        ));
    }
    Ok(())
}

/// Counter-mode keystream application; encryption and decryption are the same
/// operation.
fn apply_ctr(secret: &Secret, data: &[u8]) -> Result<Vec<u8>> {
    let mut cipher = Aes256Ctr::new_from_slices(secret.key(), secret.seed())
        .map_err(|_| Error::TypeMismatch("suite 1 secrets carry a 32-byte key and a 16-byte seed"))?;
    let mut out = data.to_vec();
    cipher.apply_keystream(&mut out);
    Ok(out)
}

pub struct Suite1;

impl CipherSuite for Suite1 {
    fn id(&self) -> CipherId {
        CipherId::Suite1
    }

    fn generate_keys(&self, rng: &mut dyn CryptoRngCore) -> Result<PrivateKeyBundle> {
        let signature = RsaPrivateKey::new(rng, RSA_BITS)
            .map_err(|_| Error::Configuration("RSA signature key generation failed"))?;
        let encryption = RsaPrivateKey::new(rng, RSA_BITS)
            .map_err(|_| Error::Configuration("RSA encryption key generation failed"))?;

        let mut seed = [0u8; 32];
        rng.fill_bytes(&mut seed);
        let exchange = StaticSecret::from(seed);

        Ok(PrivateKeyBundle::Suite1(Suite1PrivateBundle {
            signature,
            encryption,
            exchange,
        }))
    }

    fn public_bundle(&self, keys: &PrivateKeyBundle) -> Result<PublicKeyBundle> {
        let keys = expect_private(keys)?;
        Ok(PublicKeyBundle::Suite1(Suite1PublicBundle {
            signature: RsaPublicKey::from(&keys.signature),
            encryption: RsaPublicKey::from(&keys.encryption),
            exchange: ExchangePublicKey::from(&keys.exchange),
        }))
    }

    fn pack_public(&self, keys: &PublicKeyBundle) -> Result<PackedPublicKeys> {
        let keys = expect_public(keys)?;
        Ok(PackedPublicKeys {
            signature: pack_modulus(&keys.signature),
            encryption: pack_modulus(&keys.encryption),
            exchange: keys.exchange.as_bytes().to_vec(),
        })
    }

    fn unpack_public(&self, packed: &PackedPublicKeys) -> Result<PublicKeyBundle> {
        let exchange: [u8; 32] = packed
            .exchange
            .as_slice()
            .try_into()
            .map_err(|_| Error::Configuration("X25519 public key must be 32 bytes"))?;
        Ok(PublicKeyBundle::Suite1(Suite1PublicBundle {
            signature: unpack_modulus(&packed.signature)?,
            encryption: unpack_modulus(&packed.encryption)?,
            exchange: ExchangePublicKey::from(exchange),
        }))
    }

    fn sign(&self, keys: &PrivateKeyBundle, digest: &[u8]) -> Result<Vec<u8>> {
        let keys = expect_private(keys)?;
        expect_digest(digest)?;
        keys.signature
            .sign_with_rng(&mut OsRng, pss(), digest)
            .map_err(|_| Error::Configuration("RSA-PSS signing failed"))
    }

    fn verify(&self, keys: &PublicKeyBundle, signature: &[u8], digest: &[u8]) -> Result<()> {
        let keys = expect_public(keys)?;
        expect_digest(digest)?;
        keys.signature
            .verify(pss(), digest, signature)
            .map_err(|_| Error::Security("signature verification failed"))
    }

    fn encrypt_asym(&self, keys: &PublicKeyBundle, plaintext: &[u8]) -> Result<Vec<u8>> {
        let keys = expect_public(keys)?;
        if plaintext.len() > MAX_ASYM_PLAINTEXT {
            return Err(Error::TypeMismatch(
                "plaintext exceeds the asymmetric capacity of suite 1",
            ));
        }
        keys.encryption
            .encrypt(&mut OsRng, oaep(), plaintext)
            .map_err(|_| Error::Configuration("RSA-OAEP encryption failed"))
    }

    fn decrypt_asym(&self, keys: &PrivateKeyBundle, ciphertext: &[u8]) -> Result<Vec<u8>> {
        let keys = expect_private(keys)?;
        // Uniform error: padding failures are indistinguishable from any
        // other malformed ciphertext.
        keys.encryption
            .decrypt(oaep(), ciphertext)
            .map_err(|_| Error::Security("asymmetric decryption failed"))
    }

    fn encrypt_sym(&self, secret: &Secret, plaintext: &[u8]) -> Result<Vec<u8>> {
        expect_secret(secret)?;
        apply_ctr(secret, plaintext)
    }

    fn decrypt_sym(&self, secret: &Secret, ciphertext: &[u8]) -> Result<Vec<u8>> {
        expect_secret(secret)?;
        apply_ctr(secret, ciphertext)
    }

    fn derive_shared(
        &self,
        own: &PrivateKeyBundle,
        own_address: &Address,
        partner: &PublicKeyBundle,
        partner_address: &Address,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let own = expect_private(own)?;
        let partner = expect_public(partner)?;

        let shared = own.exchange.diffie_hellman(&partner.exchange);
        if !shared.was_contributory() {
            return Err(Error::Security(
                "non-contributory key exchange: peer sent a low-order point",
            ));
        }

        // XOR of both address digests: symmetric and order-independent, so
        // either side computes an identical salt. The derived key is bound to
        // both identities without a negotiated nonce.
        let mut salt = [0u8; DIGEST_LEN];
        for (s, (a, b)) in salt
            .iter_mut()
            .zip(own_address.digest().iter().zip(partner_address.digest()))
        {
            *s = a ^ b;
        }

        let hkdf = Hkdf::<Sha512>::new(Some(&salt), shared.as_bytes());
        let mut key = Zeroizing::new(vec![0u8; DIGEST_LEN]);
        hkdf.expand(&[], &mut key)
            .map_err(|_| Error::Configuration("HKDF expand failed"))?;
        Ok(key)
    }

    fn mac(&self, key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
        let mut mac = HmacSha512::new_from_slice(key)
            .map_err(|_| Error::Configuration("HMAC key rejected"))?;
        mac.update(data);
        Ok(mac.finalize().into_bytes().to_vec())
    }

    fn verify_mac(&self, key: &[u8], tag: &[u8], data: &[u8]) -> Result<()> {
        let mut mac = HmacSha512::new_from_slice(key)
            .map_err(|_| Error::Configuration("HMAC key rejected"))?;
        mac.update(data);
        // Constant-time comparison.
        mac.verify_slice(tag)
            .map_err(|_| Error::Security("MAC verification failed"))
    }

    fn new_secret(&self, rng: &mut dyn CryptoRngCore) -> Result<Secret> {
        let mut key = vec![0u8; SYM_KEY_LEN];
        let mut seed = vec![0u8; SYM_SEED_LEN];
        rng.fill_bytes(&mut key);
        rng.fill_bytes(&mut seed);
        Ok(Secret::new(CipherId::Suite1, key, seed))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::OnceLock;

    use super::*;
    use crate::address::AddressAlgo;

    // RSA-4096 generation dominates test time; share one bundle per process.
    fn fixture() -> &'static (PrivateKeyBundle, PublicKeyBundle) {
        static KEYS: OnceLock<(PrivateKeyBundle, PublicKeyBundle)> = OnceLock::new();
        KEYS.get_or_init(|| {
            let private = Suite1.generate_keys(&mut OsRng).unwrap();
            let public = Suite1.public_bundle(&private).unwrap();
            (private, public)
        })
    }

    fn test_secret() -> Secret {
        Secret::new(CipherId::Suite1, vec![0x42; SYM_KEY_LEN], vec![0x24; SYM_SEED_LEN])
    }

    #[test]
    fn symmetric_round_trip() {
        let secret = test_secret();
        let plaintext = b"counter mode keystream".to_vec();
        let ciphertext = Suite1.encrypt_sym(&secret, &plaintext).unwrap();
        assert_ne!(ciphertext, plaintext);
        assert_eq!(Suite1.decrypt_sym(&secret, &ciphertext).unwrap(), plaintext);
    }

    #[test]
    fn wrong_suite_secret_fails_before_crypto() {
        let secret = Secret::new(CipherId::Null, vec![0; 32], vec![0; 16]);
        assert!(matches!(
            Suite1.encrypt_sym(&secret, b"data"),
            Err(Error::TypeMismatch(_))
        ));
    }

    #[test]
    fn sign_verify_round_trip_and_tamper() {
        let (private, public) = fixture();
        let digest = AddressAlgo::Sha512.digest(b"canonical body");

        let signature = Suite1.sign(private, &digest).unwrap();
        Suite1.verify(public, &signature, &digest).unwrap();

        let mut bad_sig = signature.clone();
        bad_sig[0] ^= 0x01;
        assert!(matches!(
            Suite1.verify(public, &bad_sig, &digest),
            Err(Error::Security(_))
        ));

        let mut bad_digest = digest;
        bad_digest[17] ^= 0x80;
        assert!(matches!(
            Suite1.verify(public, &signature, &bad_digest),
            Err(Error::Security(_))
        ));
    }

    #[test]
    fn sign_rejects_non_digest_input() {
        let (private, _) = fixture();
        assert!(matches!(
            Suite1.sign(private, b"not a digest"),
            Err(Error::TypeMismatch(_))
        ));
    }

    #[test]
    fn asymmetric_round_trip_and_bound() {
        let (private, public) = fixture();

        let plaintext = b"short structured record".to_vec();
        let ciphertext = Suite1.encrypt_asym(public, &plaintext).unwrap();
        assert_eq!(ciphertext.len(), MODULUS_LEN);
        assert_eq!(Suite1.decrypt_asym(private, &ciphertext).unwrap(), plaintext);

        let oversized = vec![0u8; MAX_ASYM_PLAINTEXT + 1];
        assert!(matches!(
            Suite1.encrypt_asym(public, &oversized),
            Err(Error::TypeMismatch(_))
        ));

        let mut tampered = Suite1.encrypt_asym(public, &plaintext).unwrap();
        tampered[100] ^= 0xFF;
        assert!(matches!(
            Suite1.decrypt_asym(private, &tampered),
            Err(Error::Security(_))
        ));
    }

    #[test]
    fn mac_round_trip_and_tamper() {
        let key = [0x11u8; 64];
        let data = AddressAlgo::Sha512.digest(b"address body");

        let tag = Suite1.mac(&key, &data).unwrap();
        assert_eq!(tag.len(), 64);
        Suite1.verify_mac(&key, &tag, &data).unwrap();

        let mut bad_tag = tag.clone();
        bad_tag[63] ^= 0x01;
        assert!(matches!(
            Suite1.verify_mac(&key, &bad_tag, &data),
            Err(Error::Security(_))
        ));

        let mut bad_data = data;
        bad_data[0] ^= 0x01;
        assert!(matches!(
            Suite1.verify_mac(&key, &tag, &bad_data),
            Err(Error::Security(_))
        ));
    }

    #[test]
    fn shared_secret_is_symmetric() {
        // Exchange-only bundles are enough; RSA roles reuse the fixture keys
        // so no extra generation happens here.
        let (private_a, public_a) = fixture();

        let exchange_b = StaticSecret::from([0x5Au8; 32]);
        let public_b_exchange = ExchangePublicKey::from(&exchange_b);

        let (PrivateKeyBundle::Suite1(a_priv), PublicKeyBundle::Suite1(a_pub)) =
            (private_a, public_a)
        else {
            unreachable!()
        };
        let private_b = PrivateKeyBundle::Suite1(Suite1PrivateBundle {
            signature: a_priv.signature.clone(),
            encryption: a_priv.encryption.clone(),
            exchange: exchange_b,
        });
        let public_b = PublicKeyBundle::Suite1(Suite1PublicBundle {
            signature: a_pub.signature.clone(),
            encryption: a_pub.encryption.clone(),
            exchange: public_b_exchange,
        });

        let addr_a = Address::from_body(AddressAlgo::Sha512, b"identity a");
        let addr_b = Address::from_body(AddressAlgo::Sha512, b"identity b");

        let k_ab = Suite1
            .derive_shared(private_a, &addr_a, &public_b, &addr_b)
            .unwrap();
        let k_ba = Suite1
            .derive_shared(&private_b, &addr_b, public_a, &addr_a)
            .unwrap();

        assert_eq!(k_ab.as_slice(), k_ba.as_slice());
        assert_eq!(k_ab.len(), DIGEST_LEN);
    }
}
