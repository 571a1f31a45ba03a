//! End-to-end object exchange under the production suite: create, publish
//! bindings, unpack, authenticate, decrypt.

use std::sync::OnceLock;

use golix::record::{Gdxx, Gobs};
use golix::{CipherSuite, Error, FirstPersonIdentity};

// RSA-4096 generation dominates test time; generate each identity once per
// test binary.
fn alice() -> &'static FirstPersonIdentity {
    static ALICE: OnceLock<FirstPersonIdentity> = OnceLock::new();
    ALICE.get_or_init(|| FirstPersonIdentity::generate().unwrap())
}

fn bob() -> &'static FirstPersonIdentity {
    static BOB: OnceLock<FirstPersonIdentity> = OnceLock::new();
    BOB.get_or_init(|| FirstPersonIdentity::generate().unwrap())
}

#[test]
fn object_round_trip() {
    let secret = alice().new_secret().unwrap();
    let (address, packed) = alice().create_object(&secret, b"hello").unwrap();

    let (claimed_author, geoc) = bob().unpack_object(&packed).unwrap();
    assert_eq!(&claimed_author, alice().author());

    let (received_address, plaintext) = bob()
        .receive_object(alice().third_party(), &secret, &geoc)
        .unwrap();
    assert_eq!(received_address, address);
    assert_eq!(plaintext, b"hello");
}

#[test]
fn corrupted_payload_fails_verification() {
    let secret = alice().new_secret().unwrap();
    let (_, packed) = alice().create_object(&secret, b"hello").unwrap();

    // One flipped ciphertext byte: the object still parses, but its
    // recomputed address no longer matches what was signed. The payload
    // starts after the 6-byte header, the 65-byte author, and the length
    // prefix.
    let mut corrupted = packed.to_vec();
    corrupted[6 + 65 + 4] ^= 0x01;

    let (_, geoc) = bob().unpack_object(&corrupted).unwrap();
    assert!(matches!(
        bob().receive_object(alice().third_party(), &secret, &geoc),
        Err(Error::Security(_))
    ));
}

#[test]
fn corrupted_signature_fails_verification() {
    let secret = alice().new_secret().unwrap();
    let (_, packed) = alice().create_object(&secret, b"hello").unwrap();

    let mut corrupted = packed.to_vec();
    let last = corrupted.len() - 1;
    corrupted[last] ^= 0x01;

    let (_, geoc) = bob().unpack_object(&corrupted).unwrap();
    assert!(matches!(
        bob().receive_object(alice().third_party(), &secret, &geoc),
        Err(Error::Security(_))
    ));
}

#[test]
fn wrong_claimed_author_fails_verification() {
    let secret = alice().new_secret().unwrap();
    let (_, packed) = alice().create_object(&secret, b"hello").unwrap();

    let (_, geoc) = bob().unpack_object(&packed).unwrap();
    assert!(matches!(
        bob().receive_object(bob().third_party(), &secret, &geoc),
        Err(Error::Security(_))
    ));
}

#[test]
fn no_plaintext_without_verification() {
    // An unpacked-but-unverified object hands out only ciphertext.
    let secret = alice().new_secret().unwrap();
    let (_, packed) = alice().create_object(&secret, b"confidential").unwrap();

    let (_, geoc) = bob().unpack_object(&packed).unwrap();
    assert_ne!(geoc.payload(), &b"confidential"[..]);
}

#[test]
fn bindings_verify_under_the_author_key() {
    let secret = alice().new_secret().unwrap();
    let (object_address, _) = alice().create_object(&secret, b"bound object").unwrap();

    let suite = alice().cipher().suite();
    let keys = alice().third_party().keys();

    let (gobs_address, gobs_packed) = alice().bind_static(&object_address).unwrap();
    let gobs = Gobs::unpack(&gobs_packed).unwrap();
    assert_eq!(gobs.address().unwrap(), &gobs_address);
    suite
        .verify(keys, gobs.signature().unwrap(), gobs_address.digest())
        .unwrap();

    let (first_frame, _, dynamic) = alice()
        .bind_dynamic(&object_address, None, Vec::new())
        .unwrap();
    assert_eq!(first_frame, dynamic);
    let (_, _, second_dynamic) = alice()
        .bind_dynamic(&object_address, Some(dynamic.clone()), vec![first_frame])
        .unwrap();
    assert_eq!(second_dynamic, dynamic);

    let (gdxx_address, gdxx_packed) = alice().debind(&gobs_address).unwrap();
    let gdxx = Gdxx::unpack(&gdxx_packed).unwrap();
    assert_eq!(gdxx.target(), &gobs_address);
    suite
        .verify(keys, gdxx.signature().unwrap(), gdxx_address.digest())
        .unwrap();
}
