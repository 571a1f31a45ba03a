//! Inner records exchanged inside a GARQ envelope: a handshake proposing a
//! secret, and ack/nak confirming or rejecting one.
//!
//! The records travel encrypted; after decryption they are recovered by an
//! ordered parse cascade (handshake, then ack, then nak). Only a parse
//! mismatch advances the cascade; any other error propagates untouched. A
//! payload matching no candidate fails closed: it cannot be distinguished
//! from an attack.

use bytes::{BufMut, Bytes, BytesMut};

use super::{Reader, CONTAINER_VERSION};
use crate::address::{Address, ENCODED_LEN};
use crate::error::{Error, ParseError, Result};
use crate::secret::Secret;

const MAGIC_HANDSHAKE: &[u8; 4] = b"?REQ";
const MAGIC_ACK: &[u8; 4] = b"?ACK";
const MAGIC_NAK: &[u8; 4] = b"?NAK";

fn put_inner_header(buf: &mut BytesMut, magic: &[u8; 4]) {
    buf.put_slice(magic);
    buf.put_u8(CONTAINER_VERSION);
}

fn read_inner_header(
    r: &mut Reader<'_>,
    magic: &[u8; 4],
    name: &'static str,
) -> std::result::Result<(), ParseError> {
    let got = r.take(4)?;
    if got != magic {
        return Err(ParseError::InvalidMagic {
            expected: name,
            got: [got[0], got[1], got[2], got[3]],
        });
    }
    let version = r.u8()?;
    if version != CONTAINER_VERSION {
        return Err(ParseError::UnsupportedVersion(version));
    }
    Ok(())
}

fn read_address(r: &mut Reader<'_>) -> std::result::Result<Address, ParseError> {
    Address::decode(r.take(ENCODED_LEN)?)
}

/// Handshake request: the author proposes a shared secret for a target
/// container to the recipient.
#[derive(Debug, Clone, PartialEq)]
pub struct Handshake {
    pub author: Address,
    pub target: Address,
    pub secret: Secret,
}

impl Handshake {
    pub fn pack(&self) -> Bytes {
        let mut buf = BytesMut::new();
        put_inner_header(&mut buf, MAGIC_HANDSHAKE);
        self.author.encode(&mut buf);
        self.target.encode(&mut buf);
        self.secret.encode(&mut buf);
        buf.freeze()
    }

    pub fn unpack(bytes: &[u8]) -> Result<Self> {
        let mut r = Reader::new(bytes);
        read_inner_header(&mut r, MAGIC_HANDSHAKE, "?REQ")?;
        let author = read_address(&mut r)?;
        let target = read_address(&mut r)?;
        let (secret, consumed) = Secret::decode(r.take(bytes.len() - r.offset())?)?;
        let leftover = bytes.len() - (ENCODED_LEN * 2 + 5) - consumed;
        if leftover > 0 {
            return Err(ParseError::TrailingBytes(leftover).into());
        }
        Ok(Self {
            author,
            target,
            secret,
        })
    }
}

/// Positive acknowledgement of a prior handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub author: Address,
    pub target: Address,
    pub status: u32,
}

/// Negative acknowledgement (rejection) of a prior handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nak {
    pub author: Address,
    pub target: Address,
    pub status: u32,
}

fn pack_status(magic: &[u8; 4], author: &Address, target: &Address, status: u32) -> Bytes {
    let mut buf = BytesMut::new();
    put_inner_header(&mut buf, magic);
    author.encode(&mut buf);
    target.encode(&mut buf);
    buf.put_u32(status);
    buf.freeze()
}

fn unpack_status(
    bytes: &[u8],
    magic: &[u8; 4],
    name: &'static str,
) -> Result<(Address, Address, u32)> {
    let mut r = Reader::new(bytes);
    read_inner_header(&mut r, magic, name)?;
    let author = read_address(&mut r)?;
    let target = read_address(&mut r)?;
    let status = r.u32()?;
    r.finish()?;
    Ok((author, target, status))
}

impl Ack {
    pub fn pack(&self) -> Bytes {
        pack_status(MAGIC_ACK, &self.author, &self.target, self.status)
    }

    pub fn unpack(bytes: &[u8]) -> Result<Self> {
        let (author, target, status) = unpack_status(bytes, MAGIC_ACK, "?ACK")?;
        Ok(Self {
            author,
            target,
            status,
        })
    }
}

impl Nak {
    pub fn pack(&self) -> Bytes {
        pack_status(MAGIC_NAK, &self.author, &self.target, self.status)
    }

    pub fn unpack(bytes: &[u8]) -> Result<Self> {
        let (author, target, status) = unpack_status(bytes, MAGIC_NAK, "?NAK")?;
        Ok(Self {
            author,
            target,
            status,
        })
    }
}

/// A decrypted asymmetric payload: whichever inner record kind parsed.
#[derive(Debug, Clone, PartialEq)]
pub enum AsymPayload {
    Handshake(Handshake),
    Ack(Ack),
    Nak(Nak),
}

fn parse_handshake(bytes: &[u8]) -> Result<AsymPayload> {
    Handshake::unpack(bytes).map(AsymPayload::Handshake)
}

fn parse_ack(bytes: &[u8]) -> Result<AsymPayload> {
    Ack::unpack(bytes).map(AsymPayload::Ack)
}

fn parse_nak(bytes: &[u8]) -> Result<AsymPayload> {
    Nak::unpack(bytes).map(AsymPayload::Nak)
}

/// Candidate record kinds, tried in this order.
const CASCADE: [(&str, fn(&[u8]) -> Result<AsymPayload>); 3] = [
    ("handshake", parse_handshake),
    ("ack", parse_ack),
    ("nak", parse_nak),
];

impl AsymPayload {
    /// Recover the inner record from a decrypted payload by trying each
    /// candidate parser in order.
    pub fn unpack(plaintext: &[u8]) -> Result<Self> {
        for (kind, parse) in CASCADE {
            match parse(plaintext) {
                Ok(payload) => {
                    tracing::debug!(kind, "asymmetric payload parsed");
                    return Ok(payload);
                }
                // A parse mismatch just means "not this kind".
                Err(Error::Parse(_)) => continue,
                Err(other) => return Err(other),
            }
        }
        Err(Error::Security(
            "inbound asymmetric payload matched no known record type",
        ))
    }

    pub fn author(&self) -> &Address {
        match self {
            Self::Handshake(h) => &h.author,
            Self::Ack(a) => &a.author,
            Self::Nak(n) => &n.author,
        }
    }

    pub fn target(&self) -> &Address {
        match self {
            Self::Handshake(h) => &h.target,
            Self::Ack(a) => &a.target,
            Self::Nak(n) => &n.target,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::AddressAlgo;
    use crate::cipher::CipherId;

    fn addr(tag: &[u8]) -> Address {
        Address::from_body(AddressAlgo::Sha512, tag)
    }

    fn sample_secret() -> Secret {
        Secret::new(CipherId::Suite1, vec![1u8; 32], vec![2u8; 16])
    }

    #[test]
    fn handshake_round_trip() {
        let handshake = Handshake {
            author: addr(b"author"),
            target: addr(b"target"),
            secret: sample_secret(),
        };
        let packed = handshake.pack();
        assert_eq!(Handshake::unpack(&packed).unwrap(), handshake);
    }

    #[test]
    fn cascade_resolves_each_kind() {
        let handshake = Handshake {
            author: addr(b"a"),
            target: addr(b"t"),
            secret: sample_secret(),
        };
        let ack = Ack {
            author: addr(b"a"),
            target: addr(b"t"),
            status: 0,
        };
        let nak = Nak {
            author: addr(b"a"),
            target: addr(b"t"),
            status: 7,
        };

        assert!(matches!(
            AsymPayload::unpack(&handshake.pack()).unwrap(),
            AsymPayload::Handshake(_)
        ));
        assert!(matches!(
            AsymPayload::unpack(&ack.pack()).unwrap(),
            AsymPayload::Ack(_)
        ));
        assert!(matches!(
            AsymPayload::unpack(&nak.pack()).unwrap(),
            AsymPayload::Nak(_)
        ));
    }

    #[test]
    fn cascade_fails_closed_on_unknown_payload() {
        assert!(matches!(
            AsymPayload::unpack(b"definitely not a record"),
            Err(Error::Security(_))
        ));
        assert!(matches!(
            AsymPayload::unpack(&[]),
            Err(Error::Security(_))
        ));
    }

    #[test]
    fn cascade_fails_closed_on_truncated_record() {
        let ack = Ack {
            author: addr(b"a"),
            target: addr(b"t"),
            status: 0,
        };
        let packed = ack.pack();
        assert!(matches!(
            AsymPayload::unpack(&packed[..packed.len() - 1]),
            Err(Error::Security(_))
        ));
    }

    #[test]
    fn trailing_bytes_do_not_parse_as_any_kind() {
        let mut extended = Handshake {
            author: addr(b"a"),
            target: addr(b"t"),
            secret: sample_secret(),
        }
        .pack()
        .to_vec();
        extended.push(0);
        assert!(matches!(
            AsymPayload::unpack(&extended),
            Err(Error::Security(_))
        ));
    }
}
