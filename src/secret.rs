use bytes::{BufMut, BytesMut};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::cipher::CipherId;
use crate::error::ParseError;

/// Key material for one-time symmetric use: a key plus a nonce/seed, tagged
/// with the cipher suite it belongs to.
///
/// A secret is only valid against an identity of the same cipher id, and a
/// given (key, seed) pair must encrypt at most one plaintext; counter-mode
/// keystream reuse discloses the XOR of both plaintexts.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Secret {
    #[zeroize(skip)]
    cipher: CipherId,
    key: Vec<u8>,
    seed: Vec<u8>,
}

impl Secret {
    pub fn new(cipher: CipherId, key: Vec<u8>, seed: Vec<u8>) -> Self {
        Self { cipher, key, seed }
    }

    pub fn cipher(&self) -> CipherId {
        self.cipher
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn seed(&self) -> &[u8] {
        &self.seed
    }

    /// Append the wire form: cipher id, then length-prefixed key and seed.
    pub(crate) fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.cipher as u8);
        buf.put_u16(self.key.len() as u16);
        buf.put_slice(&self.key);
        buf.put_u16(self.seed.len() as u16);
        buf.put_slice(&self.seed);
    }

    /// Decode a secret from the front of `bytes`, returning it together with
    /// the number of bytes consumed.
    pub(crate) fn decode(bytes: &[u8]) -> Result<(Self, usize), ParseError> {
        let mut at = 0usize;
        let need = |at: usize, n: usize, len: usize| -> Result<(), ParseError> {
            if at + n > len {
                Err(ParseError::Truncated {
                    needed: at + n - len,
                })
            } else {
                Ok(())
            }
        };

        need(at, 1, bytes.len())?;
        let cipher = CipherId::from_u8(bytes[at])?;
        at += 1;

        need(at, 2, bytes.len())?;
        let key_len = u16::from_be_bytes([bytes[at], bytes[at + 1]]) as usize;
        at += 2;
        need(at, key_len, bytes.len())?;
        let key = bytes[at..at + key_len].to_vec();
        at += key_len;

        need(at, 2, bytes.len())?;
        let seed_len = u16::from_be_bytes([bytes[at], bytes[at + 1]]) as usize;
        at += 2;
        need(at, seed_len, bytes.len())?;
        let seed = bytes[at..at + seed_len].to_vec();
        at += seed_len;

        Ok((Self { cipher, key, seed }, at))
    }
}

// Key material stays out of logs and panic messages.
impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secret")
            .field("cipher", &self.cipher)
            .field("key_len", &self.key.len())
            .field("seed_len", &self.seed.len())
            .finish()
    }
}
