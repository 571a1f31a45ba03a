//! Container records: identity declarations (GIDC), encrypted objects (GEOC),
//! static and dynamic bindings (GOBS/GOBD), debindings (GDXX), and asymmetric
//! request envelopes (GARQ).
//!
//! Every record packs to `magic || version || cipher || fields`, followed by
//! an address block (the digest of everything before it) and, for signed
//! records, a detached signature slot filled in after packing: pack the body,
//! sign or MAC the resulting address, attach. Decoding is strict (length
//! checked, exact-consume), and the address stored on an unpacked record is
//! recomputed from the canonical body rather than trusted from the wire, so
//! body tampering surfaces when the signature over the address is checked.

pub mod asym;

use bytes::{BufMut, Bytes, BytesMut};

use crate::address::{Address, AddressAlgo, ENCODED_LEN};
use crate::cipher::CipherId;
use crate::error::{Error, ParseError, Result};

/// Current container format version.
pub const CONTAINER_VERSION: u8 = 1;

/// Decode guard for variable-length payloads: 32 MiB.
pub const MAX_PAYLOAD_SIZE: usize = 32 * 1024 * 1024;

const MAGIC_GIDC: &[u8; 4] = b"GIDC";
const MAGIC_GEOC: &[u8; 4] = b"GEOC";
const MAGIC_GOBS: &[u8; 4] = b"GOBS";
const MAGIC_GOBD: &[u8; 4] = b"GOBD";
const MAGIC_GDXX: &[u8; 4] = b"GDXX";
const MAGIC_GARQ: &[u8; 4] = b"GARQ";

/// Strict forward-only cursor over container bytes.
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
    at: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, at: 0 }
    }

    pub(crate) fn take(&mut self, n: usize) -> std::result::Result<&'a [u8], ParseError> {
        let end = self
            .at
            .checked_add(n)
            .ok_or(ParseError::FieldTooLarge(n))?;
        if end > self.buf.len() {
            return Err(ParseError::Truncated {
                needed: end - self.buf.len(),
            });
        }
        let out = &self.buf[self.at..end];
        self.at = end;
        Ok(out)
    }

    pub(crate) fn u8(&mut self) -> std::result::Result<u8, ParseError> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn u16(&mut self) -> std::result::Result<u16, ParseError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub(crate) fn u32(&mut self) -> std::result::Result<u32, ParseError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Bytes consumed so far.
    pub(crate) fn offset(&self) -> usize {
        self.at
    }

    /// Reject anything left over after the declared end of the container.
    pub(crate) fn finish(self) -> std::result::Result<(), ParseError> {
        let left = self.buf.len() - self.at;
        if left > 0 {
            return Err(ParseError::TrailingBytes(left));
        }
        Ok(())
    }
}

fn put_header(buf: &mut BytesMut, magic: &[u8; 4], cipher: CipherId) {
    buf.put_slice(magic);
    buf.put_u8(CONTAINER_VERSION);
    buf.put_u8(cipher as u8);
}

fn read_header(
    r: &mut Reader<'_>,
    magic: &[u8; 4],
    name: &'static str,
) -> std::result::Result<CipherId, ParseError> {
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
    CipherId::from_u8(r.u8()?)
}

fn put_field16(buf: &mut BytesMut, bytes: &[u8]) -> Result<()> {
    if bytes.len() > u16::MAX as usize {
        return Err(ParseError::FieldTooLarge(bytes.len()).into());
    }
    buf.put_u16(bytes.len() as u16);
    buf.put_slice(bytes);
    Ok(())
}

fn read_field16<'a>(r: &mut Reader<'a>) -> std::result::Result<&'a [u8], ParseError> {
    let len = r.u16()? as usize;
    r.take(len)
}

fn put_payload(buf: &mut BytesMut, payload: &[u8]) -> Result<()> {
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(ParseError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD_SIZE,
        }
        .into());
    }
    buf.put_u32(payload.len() as u32);
    buf.put_slice(payload);
    Ok(())
}

fn read_payload<'a>(r: &mut Reader<'a>) -> std::result::Result<&'a [u8], ParseError> {
    let len = r.u32()? as usize;
    if len > MAX_PAYLOAD_SIZE {
        return Err(ParseError::PayloadTooLarge {
            size: len,
            max: MAX_PAYLOAD_SIZE,
        });
    }
    r.take(len)
}

fn read_address(r: &mut Reader<'_>) -> std::result::Result<Address, ParseError> {
    Address::decode(r.take(ENCODED_LEN)?)
}

/// Canonical body plus derived address, produced by `pack` or `unpack`.
#[derive(Debug, Clone)]
struct Sealed {
    cipher: CipherId,
    body: Bytes,
    address: Address,
    signature: Option<Vec<u8>>,
}

impl Sealed {
    fn seal(cipher: CipherId, algo: AddressAlgo, buf: BytesMut) -> Self {
        let body = buf.freeze();
        let address = Address::from_body(algo, &body);
        Self {
            cipher,
            body,
            address,
            signature: None,
        }
    }

    /// Reconstruct from parsed bytes: the address is recomputed over the
    /// canonical body; the wire address contributes only its algorithm id.
    fn reopen(
        cipher: CipherId,
        declared: Address,
        body: &[u8],
        signature: Option<Vec<u8>>,
    ) -> Self {
        Self {
            cipher,
            body: Bytes::copy_from_slice(body),
            address: Address::from_body(declared.algo(), body),
            signature,
        }
    }

    fn packed(&self, signed: bool) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(self.body.len() + ENCODED_LEN + 2 + 512);
        buf.put_slice(&self.body);
        self.address.encode(&mut buf);
        if signed {
            let signature = self.signature.as_deref().ok_or(Error::TypeMismatch(
                "container has no attached signature; pack and sign it first",
            ))?;
            put_field16(&mut buf, signature)?;
        }
        Ok(buf.freeze())
    }
}

macro_rules! sealed_accessors {
    ($signed:expr) => {
        /// Address assigned by `pack` (or recomputed by `unpack`).
        pub fn address(&self) -> Result<&Address> {
            Ok(&self.require_sealed()?.address)
        }

        /// Cipher suite id this container was packed under.
        pub fn cipher(&self) -> Result<CipherId> {
            Ok(self.require_sealed()?.cipher)
        }

        /// Full wire bytes. For signed records the signature must have been
        /// attached first.
        pub fn packed(&self) -> Result<Bytes> {
            self.require_sealed()?.packed($signed)
        }

        fn require_sealed(&self) -> Result<&Sealed> {
            self.sealed
                .as_ref()
                .ok_or(Error::TypeMismatch("container has not been packed"))
        }
    };
}

macro_rules! signature_slot {
    () => {
        /// Attach the detached signature or MAC computed over this
        /// container's address.
        pub fn pack_signature(&mut self, signature: Vec<u8>) -> Result<()> {
            let sealed = self
                .sealed
                .as_mut()
                .ok_or(Error::TypeMismatch("container has not been packed"))?;
            sealed.signature = Some(signature);
            Ok(())
        }

        /// The attached signature or MAC, if any.
        pub fn signature(&self) -> Option<&[u8]> {
            self.sealed.as_ref()?.signature.as_deref()
        }
    };
}

// -- GIDC: identity declaration --

/// Identity declaration carrying the three packed public keys. GIDC is
/// self-certifying through its content address and has no signature slot.
#[derive(Debug, Clone)]
pub struct Gidc {
    signature_key: Vec<u8>,
    encryption_key: Vec<u8>,
    exchange_key: Vec<u8>,
    sealed: Option<Sealed>,
}

impl Gidc {
    pub fn new(signature_key: Vec<u8>, encryption_key: Vec<u8>, exchange_key: Vec<u8>) -> Self {
        Self {
            signature_key,
            encryption_key,
            exchange_key,
            sealed: None,
        }
    }

    pub fn pack(&mut self, cipher: CipherId, algo: AddressAlgo) -> Result<&Address> {
        let mut buf = BytesMut::new();
        put_header(&mut buf, MAGIC_GIDC, cipher);
        put_field16(&mut buf, &self.signature_key)?;
        put_field16(&mut buf, &self.encryption_key)?;
        put_field16(&mut buf, &self.exchange_key)?;
        Ok(&self.sealed.insert(Sealed::seal(cipher, algo, buf)).address)
    }

    pub fn unpack(bytes: &[u8]) -> Result<Self> {
        let mut r = Reader::new(bytes);
        let cipher = read_header(&mut r, MAGIC_GIDC, "GIDC")?;
        let signature_key = read_field16(&mut r)?.to_vec();
        let encryption_key = read_field16(&mut r)?.to_vec();
        let exchange_key = read_field16(&mut r)?.to_vec();
        let body_len = r.offset();
        let declared = read_address(&mut r)?;
        r.finish()?;
        Ok(Self {
            signature_key,
            encryption_key,
            exchange_key,
            sealed: Some(Sealed::reopen(cipher, declared, &bytes[..body_len], None)),
        })
    }

    pub fn signature_key(&self) -> &[u8] {
        &self.signature_key
    }

    pub fn encryption_key(&self) -> &[u8] {
        &self.encryption_key
    }

    pub fn exchange_key(&self) -> &[u8] {
        &self.exchange_key
    }

    sealed_accessors!(false);
}

// -- GEOC: encrypted object --

/// Encrypted object container: author plus opaque ciphertext payload.
#[derive(Debug, Clone)]
pub struct Geoc {
    author: Address,
    payload: Vec<u8>,
    sealed: Option<Sealed>,
}

impl Geoc {
    pub fn new(author: Address, payload: Vec<u8>) -> Self {
        Self {
            author,
            payload,
            sealed: None,
        }
    }

    pub fn pack(&mut self, cipher: CipherId, algo: AddressAlgo) -> Result<&Address> {
        let mut buf = BytesMut::new();
        put_header(&mut buf, MAGIC_GEOC, cipher);
        self.author.encode(&mut buf);
        put_payload(&mut buf, &self.payload)?;
        Ok(&self.sealed.insert(Sealed::seal(cipher, algo, buf)).address)
    }

    pub fn unpack(bytes: &[u8]) -> Result<Self> {
        let mut r = Reader::new(bytes);
        let cipher = read_header(&mut r, MAGIC_GEOC, "GEOC")?;
        let author = read_address(&mut r)?;
        let payload = read_payload(&mut r)?.to_vec();
        let body_len = r.offset();
        let declared = read_address(&mut r)?;
        let signature = read_field16(&mut r)?.to_vec();
        r.finish()?;
        Ok(Self {
            author,
            payload,
            sealed: Some(Sealed::reopen(
                cipher,
                declared,
                &bytes[..body_len],
                Some(signature),
            )),
        })
    }

    pub fn author(&self) -> &Address {
        &self.author
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    sealed_accessors!(true);
    signature_slot!();
}

// -- GOBS: static binding --

/// Static binding: binder pins target, forever.
#[derive(Debug, Clone)]
pub struct Gobs {
    binder: Address,
    target: Address,
    sealed: Option<Sealed>,
}

impl Gobs {
    pub fn new(binder: Address, target: Address) -> Self {
        Self {
            binder,
            target,
            sealed: None,
        }
    }

    pub fn pack(&mut self, cipher: CipherId, algo: AddressAlgo) -> Result<&Address> {
        let mut buf = BytesMut::new();
        put_header(&mut buf, MAGIC_GOBS, cipher);
        self.binder.encode(&mut buf);
        self.target.encode(&mut buf);
        Ok(&self.sealed.insert(Sealed::seal(cipher, algo, buf)).address)
    }

    pub fn unpack(bytes: &[u8]) -> Result<Self> {
        let mut r = Reader::new(bytes);
        let cipher = read_header(&mut r, MAGIC_GOBS, "GOBS")?;
        let binder = read_address(&mut r)?;
        let target = read_address(&mut r)?;
        let body_len = r.offset();
        let declared = read_address(&mut r)?;
        let signature = read_field16(&mut r)?.to_vec();
        r.finish()?;
        Ok(Self {
            binder,
            target,
            sealed: Some(Sealed::reopen(
                cipher,
                declared,
                &bytes[..body_len],
                Some(signature),
            )),
        })
    }

    pub fn binder(&self) -> &Address {
        &self.binder
    }

    pub fn target(&self) -> &Address {
        &self.target
    }

    sealed_accessors!(true);
    signature_slot!();
}

// -- GOBD: dynamic binding --

/// Dynamic binding frame: a reassignable address plus a history chain of
/// superseded frame addresses. The first frame of a chain omits the explicit
/// dynamic address; the chain is thereafter referenced by that frame's own
/// address.
#[derive(Debug, Clone)]
pub struct Gobd {
    binder: Address,
    target: Address,
    dynamic_address: Option<Address>,
    history: Vec<Address>,
    sealed: Option<Sealed>,
}

impl Gobd {
    pub fn new(
        binder: Address,
        target: Address,
        dynamic_address: Option<Address>,
        history: Vec<Address>,
    ) -> Self {
        Self {
            binder,
            target,
            dynamic_address,
            history,
            sealed: None,
        }
    }

    pub fn pack(&mut self, cipher: CipherId, algo: AddressAlgo) -> Result<&Address> {
        if self.history.len() > u16::MAX as usize {
            return Err(ParseError::FieldTooLarge(self.history.len()).into());
        }
        let mut buf = BytesMut::new();
        put_header(&mut buf, MAGIC_GOBD, cipher);
        self.binder.encode(&mut buf);
        self.target.encode(&mut buf);
        match &self.dynamic_address {
            Some(addr) => {
                buf.put_u8(1);
                addr.encode(&mut buf);
            }
            None => buf.put_u8(0),
        }
        buf.put_u16(self.history.len() as u16);
        for frame in &self.history {
            frame.encode(&mut buf);
        }
        Ok(&self.sealed.insert(Sealed::seal(cipher, algo, buf)).address)
    }

    pub fn unpack(bytes: &[u8]) -> Result<Self> {
        let mut r = Reader::new(bytes);
        let cipher = read_header(&mut r, MAGIC_GOBD, "GOBD")?;
        let binder = read_address(&mut r)?;
        let target = read_address(&mut r)?;
        let dynamic_address = match r.u8()? {
            0 => None,
            _ => Some(read_address(&mut r)?),
        };
        let count = r.u16()? as usize;
        let mut history = Vec::with_capacity(count);
        for _ in 0..count {
            history.push(read_address(&mut r)?);
        }
        let body_len = r.offset();
        let declared = read_address(&mut r)?;
        let signature = read_field16(&mut r)?.to_vec();
        r.finish()?;
        Ok(Self {
            binder,
            target,
            dynamic_address,
            history,
            sealed: Some(Sealed::reopen(
                cipher,
                declared,
                &bytes[..body_len],
                Some(signature),
            )),
        })
    }

    pub fn binder(&self) -> &Address {
        &self.binder
    }

    pub fn target(&self) -> &Address {
        &self.target
    }

    pub fn history(&self) -> &[Address] {
        &self.history
    }

    /// The chain's reassignable address: the explicit one carried by later
    /// frames, or this frame's own address for the first frame of a chain.
    pub fn dynamic_address(&self) -> Result<&Address> {
        match &self.dynamic_address {
            Some(addr) => Ok(addr),
            None => self.address(),
        }
    }

    sealed_accessors!(true);
    signature_slot!();
}

// -- GDXX: debinding --

/// Debinding: debinder revokes target.
#[derive(Debug, Clone)]
pub struct Gdxx {
    debinder: Address,
    target: Address,
    sealed: Option<Sealed>,
}

impl Gdxx {
    pub fn new(debinder: Address, target: Address) -> Self {
        Self {
            debinder,
            target,
            sealed: None,
        }
    }

    pub fn pack(&mut self, cipher: CipherId, algo: AddressAlgo) -> Result<&Address> {
        let mut buf = BytesMut::new();
        put_header(&mut buf, MAGIC_GDXX, cipher);
        self.debinder.encode(&mut buf);
        self.target.encode(&mut buf);
        Ok(&self.sealed.insert(Sealed::seal(cipher, algo, buf)).address)
    }

    pub fn unpack(bytes: &[u8]) -> Result<Self> {
        let mut r = Reader::new(bytes);
        let cipher = read_header(&mut r, MAGIC_GDXX, "GDXX")?;
        let debinder = read_address(&mut r)?;
        let target = read_address(&mut r)?;
        let body_len = r.offset();
        let declared = read_address(&mut r)?;
        let signature = read_field16(&mut r)?.to_vec();
        r.finish()?;
        Ok(Self {
            debinder,
            target,
            sealed: Some(Sealed::reopen(
                cipher,
                declared,
                &bytes[..body_len],
                Some(signature),
            )),
        })
    }

    pub fn debinder(&self) -> &Address {
        &self.debinder
    }

    pub fn target(&self) -> &Address {
        &self.target
    }

    sealed_accessors!(true);
    signature_slot!();
}

// -- GARQ: asymmetric request envelope --

/// Asymmetric request envelope: an opaque payload encrypted to the recipient.
/// Its signature slot carries a MAC under the author/recipient shared key,
/// not a signature.
#[derive(Debug, Clone)]
pub struct Garq {
    recipient: Address,
    payload: Vec<u8>,
    sealed: Option<Sealed>,
}

impl Garq {
    pub fn new(recipient: Address, payload: Vec<u8>) -> Self {
        Self {
            recipient,
            payload,
            sealed: None,
        }
    }

    pub fn pack(&mut self, cipher: CipherId, algo: AddressAlgo) -> Result<&Address> {
        let mut buf = BytesMut::new();
        put_header(&mut buf, MAGIC_GARQ, cipher);
        self.recipient.encode(&mut buf);
        put_payload(&mut buf, &self.payload)?;
        Ok(&self.sealed.insert(Sealed::seal(cipher, algo, buf)).address)
    }

    pub fn unpack(bytes: &[u8]) -> Result<Self> {
        let mut r = Reader::new(bytes);
        let cipher = read_header(&mut r, MAGIC_GARQ, "GARQ")?;
        let recipient = read_address(&mut r)?;
        let payload = read_payload(&mut r)?.to_vec();
        let body_len = r.offset();
        let declared = read_address(&mut r)?;
        let signature = read_field16(&mut r)?.to_vec();
        r.finish()?;
        Ok(Self {
            recipient,
            payload,
            sealed: Some(Sealed::reopen(
                cipher,
                declared,
                &bytes[..body_len],
                Some(signature),
            )),
        })
    }

    pub fn recipient(&self) -> &Address {
        &self.recipient
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    sealed_accessors!(true);
    signature_slot!();
}
