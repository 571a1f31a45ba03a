pub mod address;
pub mod cipher;
pub mod error;
pub mod identity;
pub mod record;
pub mod secret;

// Re-export key types at crate root for convenience.
pub use address::{Address, AddressAlgo, DEFAULT_ADDRESS_ALGO};
pub use cipher::{CipherId, CipherSuite, PrivateKeyBundle, PublicKeyBundle, DEFAULT_CIPHER};
pub use error::{Error, ParseError, Result};
pub use identity::{FirstPersonIdentity, RequestEnvelope, ThirdPersonIdentity};
pub use record::asym::{Ack, AsymPayload, Handshake, Nak};
pub use secret::Secret;
