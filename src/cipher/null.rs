//! CipherSuite-0: a placeholder suite with fixed outputs.
//!
//! NOT SECURE. Every operation returns a constant and both verification
//! operations always succeed, so protocol plumbing can be exercised without
//! real cryptography. Never selected by default; an identity only uses this
//! suite when constructed with `CipherId::Null` explicitly.

use rand_core::CryptoRngCore;
use zeroize::Zeroizing;

use super::{
    CipherId, CipherSuite, PackedPublicKeys, PrivateKeyBundle, PublicKeyBundle,
};
use crate::address::Address;
use crate::error::Result;
use crate::secret::Secret;

pub(crate) const PLACEHOLDER_KEY: [u8; 32] = [0u8; 32];
pub(crate) const PLACEHOLDER_SIGNATURE: &[u8] = b"[[ placeholder signature ]]";
pub(crate) const PLACEHOLDER_MAC: &[u8] = b"[[ placeholder mac ]]";
pub(crate) const PLACEHOLDER_SHARED: &[u8] = b"[[ placeholder shared secret ]]";
pub(crate) const PLACEHOLDER_ASYM: &[u8] = b"[[ placeholder asymmetric message ]]";
pub(crate) const PLACEHOLDER_ENCRYPTED: &[u8] =
    b"[[ PLACEHOLDER ENCRYPTED SYMMETRIC MESSAGE. Hello, world? ]]";
pub(crate) const PLACEHOLDER_DECRYPTED: &[u8] =
    b"[[ PLACEHOLDER DECRYPTED SYMMETRIC MESSAGE. Hello world! ]]";

/// Public half of a null key bundle. Carries nothing; packing produces fixed
/// placeholder key bytes.
#[derive(Debug, Clone, Default)]
pub struct NullPublicBundle;

/// Private half of a null key bundle.
#[derive(Default)]
pub struct NullPrivateBundle;

pub struct NullSuite;

impl CipherSuite for NullSuite {
    fn id(&self) -> CipherId {
        CipherId::Null
    }

    fn generate_keys(&self, _rng: &mut dyn CryptoRngCore) -> Result<PrivateKeyBundle> {
        Ok(PrivateKeyBundle::Null(NullPrivateBundle))
    }

    fn public_bundle(&self, keys: &PrivateKeyBundle) -> Result<PublicKeyBundle> {
        let PrivateKeyBundle::Null(_) = keys else {
            return Err(crate::error::Error::TypeMismatch(
                "key bundle does not belong to the null suite",
            ));
        };
        Ok(PublicKeyBundle::Null(NullPublicBundle))
    }

    fn pack_public(&self, keys: &PublicKeyBundle) -> Result<PackedPublicKeys> {
        let PublicKeyBundle::Null(_) = keys else {
            return Err(crate::error::Error::TypeMismatch(
                "key bundle does not belong to the null suite",
            ));
        };
        Ok(PackedPublicKeys {
            signature: PLACEHOLDER_KEY.to_vec(),
            encryption: PLACEHOLDER_KEY.to_vec(),
            exchange: PLACEHOLDER_KEY.to_vec(),
        })
    }

    fn unpack_public(&self, _packed: &PackedPublicKeys) -> Result<PublicKeyBundle> {
        Ok(PublicKeyBundle::Null(NullPublicBundle))
    }

    fn sign(&self, _keys: &PrivateKeyBundle, _digest: &[u8]) -> Result<Vec<u8>> {
        Ok(PLACEHOLDER_SIGNATURE.to_vec())
    }

    fn verify(&self, _keys: &PublicKeyBundle, _signature: &[u8], _digest: &[u8]) -> Result<()> {
        Ok(())
    }

    fn encrypt_asym(&self, _keys: &PublicKeyBundle, _plaintext: &[u8]) -> Result<Vec<u8>> {
        Ok(PLACEHOLDER_ASYM.to_vec())
    }

    fn decrypt_asym(&self, _keys: &PrivateKeyBundle, _ciphertext: &[u8]) -> Result<Vec<u8>> {
        Ok(PLACEHOLDER_ASYM.to_vec())
    }

    fn encrypt_sym(&self, _secret: &Secret, _plaintext: &[u8]) -> Result<Vec<u8>> {
        Ok(PLACEHOLDER_ENCRYPTED.to_vec())
    }

    fn decrypt_sym(&self, _secret: &Secret, _ciphertext: &[u8]) -> Result<Vec<u8>> {
        Ok(PLACEHOLDER_DECRYPTED.to_vec())
    }

    fn derive_shared(
        &self,
        _own: &PrivateKeyBundle,
        _own_address: &Address,
        _partner: &PublicKeyBundle,
        _partner_address: &Address,
    ) -> Result<Zeroizing<Vec<u8>>> {
        Ok(Zeroizing::new(PLACEHOLDER_SHARED.to_vec()))
    }

    fn mac(&self, _key: &[u8], _data: &[u8]) -> Result<Vec<u8>> {
        Ok(PLACEHOLDER_MAC.to_vec())
    }

    fn verify_mac(&self, _key: &[u8], _tag: &[u8], _data: &[u8]) -> Result<()> {
        Ok(())
    }

    fn new_secret(&self, _rng: &mut dyn CryptoRngCore) -> Result<Secret> {
        Ok(Secret::new(CipherId::Null, vec![0u8; 32], vec![0u8; 16]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn every_operation_returns_its_placeholder() {
        let suite = NullSuite;
        let mut rng = OsRng;
        let keys = suite.generate_keys(&mut rng).unwrap();
        let public = suite.public_bundle(&keys).unwrap();
        let secret = suite.new_secret(&mut rng).unwrap();
        let addr = Address::from_body(crate::address::AddressAlgo::Sha512, b"x");

        assert_eq!(suite.sign(&keys, b"whatever").unwrap(), PLACEHOLDER_SIGNATURE);
        assert_eq!(
            suite.encrypt_sym(&secret, b"data").unwrap(),
            PLACEHOLDER_ENCRYPTED
        );
        assert_eq!(
            suite.decrypt_sym(&secret, b"data").unwrap(),
            PLACEHOLDER_DECRYPTED
        );
        assert_eq!(
            suite.encrypt_asym(&public, b"data").unwrap(),
            PLACEHOLDER_ASYM
        );
        assert_eq!(suite.mac(b"key", b"data").unwrap(), PLACEHOLDER_MAC);
        assert_eq!(
            suite
                .derive_shared(&keys, &addr, &public, &addr)
                .unwrap()
                .as_slice(),
            PLACEHOLDER_SHARED
        );
    }

    #[test]
    fn verification_always_succeeds() {
        let suite = NullSuite;
        let mut rng = OsRng;
        let keys = suite.generate_keys(&mut rng).unwrap();
        let public = suite.public_bundle(&keys).unwrap();

        suite.verify(&public, b"nonsense", b"more nonsense").unwrap();
        suite.verify_mac(b"key", b"nonsense", b"data").unwrap();
    }
}
