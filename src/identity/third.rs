use bytes::Bytes;

use crate::address::{Address, AddressAlgo};
use crate::cipher::{CipherId, CipherSuite, PackedPublicKeys, PublicKeyBundle};
use crate::error::Result;
use crate::record::Gidc;

/// Public-only representation of a remote identity: its author address, the
/// cipher suite it declared, its public key bundle, and the packed GIDC it
/// was derived from. Immutable after construction.
#[derive(Clone)]
pub struct ThirdPersonIdentity {
    author: Address,
    cipher: CipherId,
    keys: PublicKeyBundle,
    packed: Bytes,
}

impl ThirdPersonIdentity {
    /// Build an identity from public key material: pack a GIDC and take its
    /// address as the author guid.
    pub fn from_keys(keys: PublicKeyBundle, address_algo: AddressAlgo) -> Result<Self> {
        let cipher = keys.cipher();
        let suite = cipher.suite();
        let packed_keys = suite.pack_public(&keys)?;
        let mut gidc = Gidc::new(
            packed_keys.signature,
            packed_keys.encryption,
            packed_keys.exchange,
        );
        let author = gidc.pack(cipher, address_algo)?.clone();
        let packed = gidc.packed()?;
        Ok(Self {
            author,
            cipher,
            keys,
            packed,
        })
    }

    /// Load a received identity declaration. The author address is recomputed
    /// from the canonical body, so the declaration self-certifies: bytes that
    /// were tampered with in transit yield a different author.
    pub fn from_packed(bytes: &[u8]) -> Result<Self> {
        let gidc = Gidc::unpack(bytes)?;
        let cipher = gidc.cipher()?;
        let keys = cipher.suite().unpack_public(&PackedPublicKeys {
            signature: gidc.signature_key().to_vec(),
            encryption: gidc.encryption_key().to_vec(),
            exchange: gidc.exchange_key().to_vec(),
        })?;
        Ok(Self {
            author: gidc.address()?.clone(),
            cipher,
            keys,
            packed: gidc.packed()?,
        })
    }

    pub fn author(&self) -> &Address {
        &self.author
    }

    pub fn cipher(&self) -> CipherId {
        self.cipher
    }

    pub fn keys(&self) -> &PublicKeyBundle {
        &self.keys
    }

    /// The packed GIDC declaring this identity.
    pub fn packed(&self) -> &Bytes {
        &self.packed
    }
}

impl std::fmt::Debug for ThirdPersonIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThirdPersonIdentity")
            .field("author", &self.author)
            .field("cipher", &self.cipher)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::{CipherSuite, NullSuite};
    use rand::rngs::OsRng;

    fn null_public() -> PublicKeyBundle {
        let private = NullSuite.generate_keys(&mut OsRng).unwrap();
        NullSuite.public_bundle(&private).unwrap()
    }

    #[test]
    fn from_keys_is_deterministic() {
        let a = ThirdPersonIdentity::from_keys(null_public(), AddressAlgo::Sha512).unwrap();
        let b = ThirdPersonIdentity::from_keys(null_public(), AddressAlgo::Sha512).unwrap();
        assert_eq!(a.author(), b.author());
        assert_eq!(a.cipher(), CipherId::Null);
    }

    #[test]
    fn packed_declaration_loads_back() {
        let original = ThirdPersonIdentity::from_keys(null_public(), AddressAlgo::Sha512).unwrap();
        let loaded = ThirdPersonIdentity::from_packed(original.packed()).unwrap();
        assert_eq!(loaded.author(), original.author());
        assert_eq!(loaded.cipher(), original.cipher());
    }

    #[test]
    fn tampered_declaration_changes_author() {
        let original = ThirdPersonIdentity::from_keys(null_public(), AddressAlgo::Sha512).unwrap();
        let mut bytes = original.packed().to_vec();
        bytes[8] ^= 0x01; // inside the key fields
        let loaded = ThirdPersonIdentity::from_packed(&bytes).unwrap();
        assert_ne!(loaded.author(), original.author());
    }
}
