use bytes::Bytes;
use rand::rngs::OsRng;
use rand_core::CryptoRngCore;

use crate::address::{Address, AddressAlgo, DEFAULT_ADDRESS_ALGO};
use crate::cipher::{typecheck_secret, CipherId, CipherSuite, PrivateKeyBundle, DEFAULT_CIPHER};
use crate::error::{Error, Result};
use crate::record::asym::{Ack, AsymPayload, Handshake, Nak};
use crate::record::{Garq, Gdxx, Geoc, Gobd, Gobs};
use crate::secret::Secret;

use super::ThirdPersonIdentity;

/// An unpacked asymmetric request envelope moving through its lifecycle:
/// unverified (plaintext cached by `unpack_request`), authenticated (MAC
/// verified by `receive_request`, plaintext handed out), consumed (cache
/// discarded). No path returns to unverified; consuming twice is a usage
/// error, not a security error.
#[derive(Debug)]
pub struct RequestEnvelope {
    garq: Garq,
    cached: Option<AsymPayload>,
}

impl RequestEnvelope {
    /// Address of the envelope container.
    pub fn address(&self) -> Result<&Address> {
        self.garq.address()
    }

    pub fn recipient(&self) -> &Address {
        self.garq.recipient()
    }

    pub fn is_consumed(&self) -> bool {
        self.cached.is_none()
    }
}

/// A full identity: private key bundle plus the derived third-person
/// projection it shares its author address and cipher suite with.
///
/// All operations take `&self` and hold no interior mutability, so one
/// identity may serve concurrent callers, provided no secret is reused
/// across concurrent encryptions.
pub struct FirstPersonIdentity {
    keys: PrivateKeyBundle,
    third: ThirdPersonIdentity,
    address_algo: AddressAlgo,
}

impl FirstPersonIdentity {
    /// Generate a fresh identity with the default cipher suite and address
    /// algorithm.
    pub fn generate() -> Result<Self> {
        Self::generate_with(DEFAULT_CIPHER, DEFAULT_ADDRESS_ALGO)
    }

    pub fn generate_with(cipher: CipherId, address_algo: AddressAlgo) -> Result<Self> {
        Self::generate_with_rng(cipher, address_algo, &mut OsRng)
    }

    /// Generate with an explicit entropy source, for environments that route
    /// key generation to a hardware or blocking generator.
    pub fn generate_with_rng(
        cipher: CipherId,
        address_algo: AddressAlgo,
        rng: &mut dyn CryptoRngCore,
    ) -> Result<Self> {
        let keys = cipher.suite().generate_keys(rng)?;
        Self::from_keys(keys, address_algo)
    }

    /// Load an identity from existing private key material. The public bundle
    /// and author address are re-derived rather than trusted from the caller.
    pub fn from_keys(keys: PrivateKeyBundle, address_algo: AddressAlgo) -> Result<Self> {
        let suite = keys.cipher().suite();
        let public = suite.public_bundle(&keys)?;
        let third = ThirdPersonIdentity::from_keys(public, address_algo)?;
        Ok(Self {
            keys,
            third,
            address_algo,
        })
    }

    fn suite(&self) -> &'static dyn CipherSuite {
        self.third.cipher().suite()
    }

    /// The public projection of this identity, as counterparties see it.
    pub fn third_party(&self) -> &ThirdPersonIdentity {
        &self.third
    }

    pub fn author(&self) -> &Address {
        self.third.author()
    }

    pub fn cipher(&self) -> CipherId {
        self.third.cipher()
    }

    pub fn address_algo(&self) -> AddressAlgo {
        self.address_algo
    }

    /// Fresh one-time symmetric secret for this identity's suite.
    pub fn new_secret(&self) -> Result<Secret> {
        self.suite().new_secret(&mut OsRng)
    }

    pub fn new_secret_with_rng(&self, rng: &mut dyn CryptoRngCore) -> Result<Secret> {
        self.suite().new_secret(rng)
    }

    fn typecheck_third_party(&self, other: &ThirdPersonIdentity) -> Result<()> {
        if other.cipher() != self.cipher() {
            return Err(Error::TypeMismatch(
                "counterparty identity uses a different cipher suite",
            ));
        }
        Ok(())
    }

    /// Encrypt a plaintext under `secret`, pack it as a GEOC, and sign the
    /// resulting address.
    pub fn create_object(&self, secret: &Secret, plaintext: &[u8]) -> Result<(Address, Bytes)> {
        typecheck_secret(self.cipher(), secret)?;
        let suite = self.suite();

        let payload = suite.encrypt_sym(secret, plaintext)?;
        let mut geoc = Geoc::new(self.author().clone(), payload);
        let address = geoc.pack(self.cipher(), self.address_algo)?.clone();
        let signature = suite.sign(&self.keys, address.digest())?;
        geoc.pack_signature(signature)?;
        tracing::debug!(%address, "object packed and signed");
        Ok((address, geoc.packed()?))
    }

    /// Bind a target address statically to this identity.
    pub fn bind_static(&self, target: &Address) -> Result<(Address, Bytes)> {
        let mut gobs = Gobs::new(self.author().clone(), target.clone());
        let address = gobs.pack(self.cipher(), self.address_algo)?.clone();
        gobs.pack_signature(self.suite().sign(&self.keys, address.digest())?)?;
        Ok((address, gobs.packed()?))
    }

    /// Bind a target under a reassignable dynamic address. Omitting `address`
    /// starts a new chain; `history` carries superseded frame addresses.
    pub fn bind_dynamic(
        &self,
        target: &Address,
        address: Option<Address>,
        history: Vec<Address>,
    ) -> Result<(Address, Bytes, Address)> {
        let mut gobd = Gobd::new(self.author().clone(), target.clone(), address, history);
        let frame = gobd.pack(self.cipher(), self.address_algo)?.clone();
        gobd.pack_signature(self.suite().sign(&self.keys, frame.digest())?)?;
        let dynamic = gobd.dynamic_address()?.clone();
        Ok((frame, gobd.packed()?, dynamic))
    }

    /// Revoke a previously published binding.
    pub fn debind(&self, target: &Address) -> Result<(Address, Bytes)> {
        let mut gdxx = Gdxx::new(self.author().clone(), target.clone());
        let address = gdxx.pack(self.cipher(), self.address_algo)?.clone();
        gdxx.pack_signature(self.suite().sign(&self.keys, address.digest())?)?;
        Ok((address, gdxx.packed()?))
    }

    /// Propose a secret to `recipient` for `target`.
    ///
    /// The envelope is authenticated by a MAC under the shared secret derived
    /// with the recipient, not by a signature: only the recipient needs to
    /// verify it, and the authentication then binds to the relationship
    /// instead of a broadcastable credential.
    pub fn make_request(
        &self,
        secret: &Secret,
        target: &Address,
        recipient: &ThirdPersonIdentity,
    ) -> Result<(Address, Bytes)> {
        self.typecheck_third_party(recipient)?;
        let handshake = Handshake {
            author: self.author().clone(),
            target: target.clone(),
            secret: secret.clone(),
        };
        self.make_asym(recipient, &handshake.pack())
    }

    /// Confirm a received handshake.
    pub fn make_ack(
        &self,
        target: &Address,
        recipient: &ThirdPersonIdentity,
        status: u32,
    ) -> Result<(Address, Bytes)> {
        self.typecheck_third_party(recipient)?;
        let ack = Ack {
            author: self.author().clone(),
            target: target.clone(),
            status,
        };
        self.make_asym(recipient, &ack.pack())
    }

    /// Reject a received handshake.
    pub fn make_nak(
        &self,
        target: &Address,
        recipient: &ThirdPersonIdentity,
        status: u32,
    ) -> Result<(Address, Bytes)> {
        self.typecheck_third_party(recipient)?;
        let nak = Nak {
            author: self.author().clone(),
            target: target.clone(),
            status,
        };
        self.make_asym(recipient, &nak.pack())
    }

    fn make_asym(
        &self,
        recipient: &ThirdPersonIdentity,
        plaintext: &[u8],
    ) -> Result<(Address, Bytes)> {
        let suite = self.suite();
        let payload = suite.encrypt_asym(recipient.keys(), plaintext)?;
        let mut garq = Garq::new(recipient.author().clone(), payload);
        let address = garq.pack(self.cipher(), self.address_algo)?.clone();

        let key = suite.derive_shared(
            &self.keys,
            self.author(),
            recipient.keys(),
            recipient.author(),
        )?;
        garq.pack_signature(suite.mac(&key, address.digest())?)?;
        tracing::debug!(%address, recipient = %recipient.author(), "request envelope packed");
        Ok((address, garq.packed()?))
    }

    /// Unpack an inbound GARQ and decrypt its payload, without
    /// authenticating it. Parsing tries handshake, then ack, then nak; a
    /// payload matching none fails closed: it cannot be distinguished from
    /// an attack. Returns the claimed author and the envelope with the
    /// plaintext cached for `receive_request`.
    pub fn unpack_request(&self, packed: &[u8]) -> Result<(Address, RequestEnvelope)> {
        let garq = Garq::unpack(packed)?;
        if garq.cipher()? != self.cipher() {
            return Err(Error::TypeMismatch(
                "envelope was packed under a different cipher suite",
            ));
        }
        if garq.recipient() != self.author() {
            tracing::debug!(
                recipient = %garq.recipient(),
                "unpacking an envelope addressed to another identity"
            );
        }

        let plaintext = self.suite().decrypt_asym(&self.keys, garq.payload())?;
        let payload = AsymPayload::unpack(&plaintext)?;
        let author = payload.author().clone();
        Ok((
            author,
            RequestEnvelope {
                garq,
                cached: Some(payload),
            },
        ))
    }

    /// Authenticate an unpacked envelope against its claimed sender and hand
    /// out the cached plaintext exactly once.
    ///
    /// The MAC over the envelope address is verified under the shared secret
    /// derived with `sender`; on success the cache is consumed. Failure
    /// leaves the envelope unconsumed and is terminal for this call.
    pub fn receive_request(
        &self,
        sender: &ThirdPersonIdentity,
        envelope: &mut RequestEnvelope,
    ) -> Result<AsymPayload> {
        self.typecheck_third_party(sender)?;
        if envelope.is_consumed() {
            return Err(Error::TypeMismatch(
                "envelope plaintext was already consumed",
            ));
        }

        let suite = self.suite();
        let key = suite.derive_shared(
            &self.keys,
            self.author(),
            sender.keys(),
            sender.author(),
        )?;
        let address = envelope.garq.address()?;
        let mac = envelope
            .garq
            .signature()
            .ok_or(Error::TypeMismatch("envelope carries no MAC"))?;
        suite.verify_mac(&key, mac, address.digest()).map_err(|e| {
            tracing::warn!(
                %address,
                sender = %sender.author(),
                "envelope MAC verification failed"
            );
            e
        })?;

        tracing::debug!(%address, "envelope authenticated and consumed");
        envelope
            .cached
            .take()
            .ok_or(Error::TypeMismatch("envelope plaintext was already consumed"))
    }

    /// Unpack an inbound GEOC without verifying anything. Returns the claimed
    /// author and the parsed container for `receive_object`.
    pub fn unpack_object(&self, packed: &[u8]) -> Result<(Address, Geoc)> {
        let geoc = Geoc::unpack(packed)?;
        Ok((geoc.author().clone(), geoc))
    }

    /// Verify an object's signature against its author and only then decrypt
    /// its payload. No plaintext leaves this call unless the signature
    /// verifies.
    pub fn receive_object(
        &self,
        sender: &ThirdPersonIdentity,
        secret: &Secret,
        geoc: &Geoc,
    ) -> Result<(Address, Vec<u8>)> {
        self.typecheck_third_party(sender)?;
        typecheck_secret(self.cipher(), secret)?;
        if geoc.cipher()? != self.cipher() {
            return Err(Error::TypeMismatch(
                "object was packed under a different cipher suite",
            ));
        }

        let suite = self.suite();
        let address = geoc.address()?.clone();
        let signature = geoc
            .signature()
            .ok_or(Error::TypeMismatch("object carries no signature"))?;
        suite
            .verify(sender.keys(), signature, address.digest())
            .map_err(|e| {
                tracing::warn!(
                    %address,
                    author = %sender.author(),
                    "object signature verification failed"
                );
                e
            })?;

        let plaintext = suite.decrypt_sym(secret, geoc.payload())?;
        Ok((address, plaintext))
    }
}

impl std::fmt::Debug for FirstPersonIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirstPersonIdentity")
            .field("author", self.author())
            .field("cipher", &self.cipher())
            .finish()
    }
}
