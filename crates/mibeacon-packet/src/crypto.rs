//! Object region encryption and decryption.
//!
//! Encrypted MiBeacon v4/v5 frames protect the object region with AES-128-CCM
//! using a 4-byte tag. The encrypted region is laid out as:
//!
//! | Field      | Size (bytes) | Description                              |
//! |------------|--------------|------------------------------------------|
//! | ciphertext | N (>= 1)     | Encrypted object region                  |
//! | trailer    | 3            | Extended counter, sent in the clear      |
//! | tag        | 4            | CCM authentication tag (MIC)             |
//!
//! The 12-byte nonce is built from frame fields in a fixed order:
//!
//! ```text
//! reversed MAC (6) | product id LE (2) | frame counter (1) | trailer (3)
//! ```
//!
//! The associated data is the single byte [`MIBEACON_AAD`].

use aes::Aes128;
use ccm::aead::{generic_array::GenericArray, AeadInPlace, KeyInit};
use ccm::consts::{U12, U4};
use ccm::Ccm;
use tracing::{debug, trace};

use crate::{BindKey, DecodeOutcome, MacAddress, PacketError, RawFrame};

/// AES-128-CCM with a 4-byte tag and 12-byte nonce.
pub type MiBeaconCcm = Ccm<Aes128, U4, U12>;

/// Fixed associated data for MiBeacon v4/v5.
pub const MIBEACON_AAD: [u8; 1] = [0x11];

/// Nonce length in bytes.
pub const NONCE_SIZE: usize = 12;

/// Trailer length in bytes.
pub const TRAILER_SIZE: usize = 3;

/// Authentication tag length in bytes.
pub const TAG_SIZE: usize = 4;

/// Smallest encrypted region: one ciphertext byte plus trailer and tag.
pub const MIN_ENCRYPTED_SIZE: usize = 1 + TRAILER_SIZE + TAG_SIZE;

/// Build the CCM nonce for a frame.
pub fn build_nonce(
    address: &MacAddress,
    product_id: u16,
    frame_counter: u8,
    trailer: &[u8; TRAILER_SIZE],
) -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    nonce[..6].copy_from_slice(&address.reversed());
    nonce[6..8].copy_from_slice(&product_id.to_le_bytes());
    nonce[8] = frame_counter;
    nonce[9..].copy_from_slice(trailer);
    nonce
}

/// Split an encrypted region into ciphertext, trailer and tag.
fn split_region(region: &[u8]) -> Option<(&[u8], [u8; TRAILER_SIZE], &[u8])> {
    if region.len() < MIN_ENCRYPTED_SIZE {
        return None;
    }
    let tag_start = region.len() - TAG_SIZE;
    let trailer_start = tag_start - TRAILER_SIZE;
    let mut trailer = [0u8; TRAILER_SIZE];
    trailer.copy_from_slice(&region[trailer_start..tag_start]);
    Some((&region[..trailer_start], trailer, &region[tag_start..]))
}

/// Decrypt and authenticate an encrypted object region.
///
/// Returns the plaintext object region. Fails with
/// [`DecodeOutcome::Malformed`] if the region is too short to hold a
/// ciphertext, trailer and tag, and [`DecodeOutcome::AuthenticationFailed`]
/// if the tag does not verify.
pub fn decrypt_payload(
    region: &[u8],
    key: &BindKey,
    address: &MacAddress,
    product_id: u16,
    frame_counter: u8,
) -> Result<Vec<u8>, DecodeOutcome> {
    let (ciphertext, trailer, tag) = split_region(region).ok_or_else(|| {
        debug!(
            "Encrypted payload too short to contain ciphertext, trailer and MIC: len={}",
            region.len()
        );
        DecodeOutcome::Malformed
    })?;

    let nonce = build_nonce(address, product_id, frame_counter, &trailer);
    let cipher = MiBeaconCcm::new(GenericArray::from_slice(&key.0));

    let mut buffer = ciphertext.to_vec();
    cipher
        .decrypt_in_place_detached(
            GenericArray::from_slice(&nonce),
            &MIBEACON_AAD,
            &mut buffer,
            GenericArray::from_slice(tag),
        )
        .map_err(|_| {
            trace!(
                nonce = %hex::encode_upper(nonce),
                aad = %hex::encode_upper(MIBEACON_AAD),
                ciphertext = %hex::encode_upper(ciphertext),
                mic = %hex::encode_upper(tag),
                "AES-CCM tag mismatch"
            );
            DecodeOutcome::AuthenticationFailed
        })?;

    Ok(buffer)
}

/// Decrypt the object region of a parsed frame.
pub fn decrypt_frame(
    frame: &RawFrame<'_>,
    key: &BindKey,
    address: &MacAddress,
) -> Result<Vec<u8>, DecodeOutcome> {
    trace!(
        "Decrypting frame: frame_control=0x{:04X}, product_id=0x{:04X}, counter={}",
        frame.frame_control.bits(),
        frame.product_id,
        frame.frame_counter
    );
    decrypt_payload(
        frame.object_region,
        key,
        address,
        frame.product_id,
        frame.frame_counter,
    )
}

/// Encrypt a plaintext object region.
///
/// Returns `ciphertext || trailer || tag`, ready to be placed after the
/// frame header.
pub fn encrypt_payload(
    plaintext: &[u8],
    key: &BindKey,
    address: &MacAddress,
    product_id: u16,
    frame_counter: u8,
    trailer: &[u8; TRAILER_SIZE],
) -> Result<Vec<u8>, PacketError> {
    if plaintext.is_empty() {
        return Err(PacketError::encryption("plaintext must not be empty"));
    }

    let nonce = build_nonce(address, product_id, frame_counter, trailer);
    let cipher = MiBeaconCcm::new(GenericArray::from_slice(&key.0));

    let mut buffer = Vec::with_capacity(plaintext.len() + TRAILER_SIZE + TAG_SIZE);
    buffer.extend_from_slice(plaintext);
    let tag = cipher
        .encrypt_in_place_detached(GenericArray::from_slice(&nonce), &MIBEACON_AAD, &mut buffer)
        .map_err(|e| PacketError::encryption(format!("Encryption failed: {}", e)))?;

    buffer.extend_from_slice(trailer);
    buffer.extend_from_slice(&tag);
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    const KEY_HEX: &str = "b853075158487ca39a5b5ea9b0a2f4cd";
    const ADDRESS: &str = "A4:C1:38:5A:0B:1C";

    fn key() -> BindKey {
        BindKey::parse(KEY_HEX).unwrap()
    }

    fn address() -> MacAddress {
        MacAddress::parse(ADDRESS).unwrap()
    }

    #[test]
    fn test_nonce_layout() {
        let nonce = build_nonce(&address(), 0x3F4C, 0x2A, &[0x01, 0x00, 0x00]);
        assert_eq!(hex::encode(nonce), "1c0b5a38c1a44c3f2a010000");
    }

    #[test]
    fn test_known_answer_vector() {
        // Produced by an independent AES-CCM implementation (tag length 4).
        let region = hex::decode("76770d9fd6518a63010000442d9e90").unwrap();
        let plaintext = decrypt_payload(&region, &key(), &address(), 0x3F4C, 0x2A).unwrap();
        assert_eq!(plaintext, vec![0x3C, 0x48, 0x01, 0x01, 0x03, 0x4C, 0x01, 0x55]);

        let encrypted = encrypt_payload(&plaintext, &key(), &address(), 0x3F4C, 0x2A, &[0x01, 0x00, 0x00]).unwrap();
        assert_eq!(encrypted, region);
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let plaintext = [0x3D, 0x48, 0x04, 0x10, 0x00, 0x00, 0x00];
        let trailer = [0xAA, 0xBB, 0xCC];
        let region = encrypt_payload(&plaintext, &key(), &address(), 0x3F4C, 7, &trailer).unwrap();
        assert_eq!(region.len(), plaintext.len() + TRAILER_SIZE + TAG_SIZE);
        assert_eq!(&region[plaintext.len()..plaintext.len() + 3], &trailer);

        let decrypted = decrypt_payload(&region, &key(), &address(), 0x3F4C, 7).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_wrong_key_fails() {
        let region = encrypt_payload(&[0x01], &key(), &address(), 0x3F4C, 1, &[0; 3]).unwrap();
        let other = BindKey([0x42; 16]);
        let result = decrypt_payload(&region, &other, &address(), 0x3F4C, 1);
        assert_eq!(result, Err(DecodeOutcome::AuthenticationFailed));
    }

    #[test]
    fn test_nonce_fields_are_authenticated() {
        let region = encrypt_payload(&[0x01, 0x02], &key(), &address(), 0x3F4C, 1, &[0; 3]).unwrap();
        let other_addr = MacAddress::parse("A4:C1:38:5A:0B:1D").unwrap();

        assert_eq!(
            decrypt_payload(&region, &key(), &other_addr, 0x3F4C, 1),
            Err(DecodeOutcome::AuthenticationFailed)
        );
        assert_eq!(
            decrypt_payload(&region, &key(), &address(), 0x3F4D, 1),
            Err(DecodeOutcome::AuthenticationFailed)
        );
        assert_eq!(
            decrypt_payload(&region, &key(), &address(), 0x3F4C, 2),
            Err(DecodeOutcome::AuthenticationFailed)
        );
    }

    #[test]
    fn test_short_region_is_malformed() {
        for len in 0..MIN_ENCRYPTED_SIZE {
            let region = vec![0u8; len];
            assert_eq!(
                decrypt_payload(&region, &key(), &address(), 0x3F4C, 1),
                Err(DecodeOutcome::Malformed)
            );
        }
    }

    #[test]
    fn test_tamper_any_byte_fails() {
        let mut rng = ChaCha8Rng::seed_from_u64(0x4d69);
        for _ in 0..32 {
            let mut key_bytes = [0u8; 16];
            rng.fill(&mut key_bytes);
            let key = BindKey(key_bytes);
            let counter: u8 = rng.gen();
            let trailer: [u8; 3] = rng.gen();
            let len = rng.gen_range(1..24);
            let plaintext: Vec<u8> = (0..len).map(|_| rng.gen()).collect();

            let region = encrypt_payload(&plaintext, &key, &address(), 0x3F4C, counter, &trailer).unwrap();
            for i in 0..region.len() {
                let mut tampered = region.clone();
                tampered[i] ^= 1 << rng.gen_range(0..8);
                assert_eq!(
                    decrypt_payload(&tampered, &key, &address(), 0x3F4C, counter),
                    Err(DecodeOutcome::AuthenticationFailed),
                    "tampering byte {} of {} was not detected",
                    i,
                    region.len()
                );
            }
        }
    }

    #[test]
    fn test_encrypt_empty_rejected() {
        assert!(encrypt_payload(&[], &key(), &address(), 0x3F4C, 1, &[0; 3]).is_err());
    }
}
