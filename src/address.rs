use bytes::{BufMut, BytesMut};
use sha2::{Digest, Sha512};

use crate::error::ParseError;

/// Length of an address digest in bytes. Every registered algorithm produces
/// this size, which is also the size of the data handed to signing.
pub const DIGEST_LEN: usize = 64;

/// Encoded size of an address: one algorithm byte plus the digest.
pub const ENCODED_LEN: usize = 1 + DIGEST_LEN;

/// Default address algorithm for new containers.
pub const DEFAULT_ADDRESS_ALGO: AddressAlgo = AddressAlgo::Sha512;

/// Registered address algorithms, identified by a small integer on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AddressAlgo {
    /// Fixed-output placeholder. Produces colliding addresses; exists only to
    /// exercise container plumbing without hashing.
    Placeholder = 0,
    /// SHA-512 over the canonical container body.
    Sha512 = 1,
}

impl AddressAlgo {
    pub fn from_u8(v: u8) -> Result<Self, ParseError> {
        match v {
            0 => Ok(Self::Placeholder),
            1 => Ok(Self::Sha512),
            other => Err(ParseError::UnknownAddressAlgo(other)),
        }
    }

    /// Digest a canonical container body.
    pub fn digest(self, body: &[u8]) -> [u8; DIGEST_LEN] {
        match self {
            Self::Placeholder => [0u8; DIGEST_LEN],
            Self::Sha512 => Sha512::digest(body).into(),
        }
    }
}

/// Content-derived address (guid) of a packed container: the digest of its
/// canonical body under a chosen algorithm.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Address {
    algo: AddressAlgo,
    digest: [u8; DIGEST_LEN],
}

impl Address {
    /// Compute the address of a canonical container body.
    pub fn from_body(algo: AddressAlgo, body: &[u8]) -> Self {
        Self {
            algo,
            digest: algo.digest(body),
        }
    }

    pub fn from_parts(algo: AddressAlgo, digest: [u8; DIGEST_LEN]) -> Self {
        Self { algo, digest }
    }

    pub fn algo(&self) -> AddressAlgo {
        self.algo
    }

    /// The raw digest. This is the exact byte string that signatures and MACs
    /// are computed over.
    pub fn digest(&self) -> &[u8; DIGEST_LEN] {
        &self.digest
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.algo as u8);
        buf.put_slice(&self.digest);
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ParseError> {
        if bytes.len() < ENCODED_LEN {
            return Err(ParseError::Truncated {
                needed: ENCODED_LEN - bytes.len(),
            });
        }
        let algo = AddressAlgo::from_u8(bytes[0])?;
        let mut digest = [0u8; DIGEST_LEN];
        digest.copy_from_slice(&bytes[1..ENCODED_LEN]);
        Ok(Self { algo, digest })
    }
}

impl std::fmt::Debug for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Address({}:{}…)",
            self.algo as u8,
            hex::encode(&self.digest[..8])
        )
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.algo as u8, hex::encode(self.digest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha512_addresses_are_deterministic_and_distinct() {
        let a = Address::from_body(AddressAlgo::Sha512, b"one body");
        let b = Address::from_body(AddressAlgo::Sha512, b"one body");
        let c = Address::from_body(AddressAlgo::Sha512, b"another body");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn placeholder_addresses_collide() {
        let a = Address::from_body(AddressAlgo::Placeholder, b"one body");
        let b = Address::from_body(AddressAlgo::Placeholder, b"another body");
        assert_eq!(a, b);
    }

    #[test]
    fn encode_decode_round_trip() {
        let a = Address::from_body(AddressAlgo::Sha512, b"payload");
        let mut buf = BytesMut::new();
        a.encode(&mut buf);
        assert_eq!(buf.len(), ENCODED_LEN);
        let back = Address::decode(&buf).unwrap();
        assert_eq!(a, back);
    }

    #[test]
    fn unknown_algo_rejected() {
        let mut buf = vec![0xFFu8];
        buf.extend_from_slice(&[0u8; DIGEST_LEN]);
        assert!(matches!(
            Address::decode(&buf),
            Err(ParseError::UnknownAddressAlgo(0xFF))
        ));
    }
}
