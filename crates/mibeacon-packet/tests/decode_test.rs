//! End-to-end decoding tests for MiBeacon service data.

use std::sync::Arc;
use std::thread;

use mibeacon_packet::{
    crypto, decode, object_ids, objects::decode_objects, BindKey, DecodeOutcome, DecodedReading,
    FrameBuilder, MacAddress, MiBeaconDecoder, PRODUCT_ID_PS1BB,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const ADDRESS: &str = "A4:C1:38:5A:0B:1C";
const KEY_HEX: &str = "b853075158487ca39a5b5ea9b0a2f4cd";

fn address() -> MacAddress {
    MacAddress::parse(ADDRESS).unwrap()
}

fn key() -> BindKey {
    BindKey::parse(KEY_HEX).unwrap()
}

fn decode_ps1bb(data: &[u8], key: Option<&BindKey>) -> Result<DecodedReading, DecodeOutcome> {
    decode(data, key, ADDRESS, &[PRODUCT_ID_PS1BB])
}

// ============================================================================
// Reference Frames
// ============================================================================

#[test]
fn test_pressure_only_frame() {
    let data = [0x40, 0x00, 0x4C, 0x3F, 0x01, 0x3C, 0x48, 0x01, 0x01];
    let reading = decode_ps1bb(&data, None).unwrap();

    let mut expected = DecodedReading::new(address());
    expected.pressure_present = Some(true);
    assert_eq!(reading, expected);
}

#[test]
fn test_pressure_and_battery_frame() {
    let data = [
        0x40, 0x00, 0x4C, 0x3F, 0x01, 0x3C, 0x48, 0x01, 0x01, 0x03, 0x4C, 0x01, 0x55,
    ];
    let reading = decode_ps1bb(&data, None).unwrap();
    assert_eq!(reading.pressure_present, Some(true));
    assert_eq!(reading.battery_percent, Some(85));
    assert_eq!(reading.pressure_present_duration_s, None);
}

#[test]
fn test_object_flag_clear_is_no_data() {
    let data = [0x00, 0x00, 0x4C, 0x3F, 0x01, 0x3C, 0x48, 0x01, 0x01];
    assert_eq!(decode_ps1bb(&data, None), Err(DecodeOutcome::NoData));
}

#[test]
fn test_reference_encrypted_frame() {
    let data = hex::decode("78004c3f2a1c0b5a38c1a40876770d9fd6518a63010000442d9e90").unwrap();
    let reading = decode_ps1bb(&data, Some(&key())).unwrap();
    assert_eq!(reading.pressure_present, Some(true));
    assert_eq!(reading.battery_percent, Some(85));

    let data = hex::decode("48004c3f2a76770d9fd6518a63010000442d9e90").unwrap();
    let reading = decode_ps1bb(&data, Some(&key())).unwrap();
    assert_eq!(reading.battery_percent, Some(85));

    assert_eq!(decode_ps1bb(&data, None), Err(DecodeOutcome::KeyRequired));
}

// ============================================================================
// Applicability
// ============================================================================

#[test]
fn test_short_buffers_not_applicable() {
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    for len in 0..5 {
        for _ in 0..64 {
            let data: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
            assert_eq!(decode_ps1bb(&data, Some(&key())), Err(DecodeOutcome::NotApplicable));
        }
    }
}

#[test]
fn test_foreign_product_not_applicable() {
    let mut rng = ChaCha8Rng::seed_from_u64(2);
    for _ in 0..256 {
        let product_id: u16 = rng.gen();
        if product_id == PRODUCT_ID_PS1BB {
            continue;
        }
        let len = rng.gen_range(0..40);
        let mut data = vec![0x58, 0x00];
        data.extend_from_slice(&product_id.to_le_bytes());
        data.extend((0..len).map(|_| rng.gen::<u8>()));
        assert_eq!(decode_ps1bb(&data, Some(&key())), Err(DecodeOutcome::NotApplicable));
    }
}

// ============================================================================
// Encryption Transparency
// ============================================================================

#[test]
fn test_encryption_is_transparent() {
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let decoder = MiBeaconDecoder::default();

    for _ in 0..100 {
        let key = BindKey(rng.gen());
        let counter: u8 = rng.gen();
        let trailer: [u8; 3] = rng.gen();

        let mut builder = FrameBuilder::new(PRODUCT_ID_PS1BB, counter);
        if rng.gen_bool(0.5) {
            builder = builder.object(object_ids::PRESSURE_STATE, &[rng.gen_range(0..2)]);
        }
        if rng.gen_bool(0.5) {
            builder = builder.object(object_ids::PRESSURE_PRESENT_DURATION, &rng.gen::<u32>().to_le_bytes());
        }
        if rng.gen_bool(0.5) {
            builder = builder.object(0x1001, &[rng.gen()]);
        }
        builder = builder.object(object_ids::BATTERY, &[rng.gen_range(0..=100)]);

        let plain = builder.build().unwrap();
        let encrypted = builder.encrypt(key, address(), trailer).build().unwrap();
        assert_ne!(plain, encrypted);

        let from_plain = decoder.decode(&plain, None, ADDRESS).unwrap();
        let from_encrypted = decoder.decode(&encrypted, Some(&key), ADDRESS).unwrap();
        assert_eq!(from_plain, from_encrypted);

        let direct = decode_objects(&plain[5..], DecodedReading::new(address()));
        assert_eq!(from_plain, direct);
    }
}

#[test]
fn test_tampered_frames_fail_authentication() {
    let mut rng = ChaCha8Rng::seed_from_u64(4);
    for _ in 0..16 {
        let key = BindKey(rng.gen());
        let frame = FrameBuilder::new(PRODUCT_ID_PS1BB, rng.gen())
            .mac_echo(address())
            .object(object_ids::PRESSURE_STATE, &[1])
            .object(object_ids::BATTERY, &[rng.gen_range(0..=100)])
            .encrypt(key, address(), rng.gen())
            .build()
            .unwrap();

        // Everything after header (5) and MAC echo (6) is ciphertext, trailer or tag.
        for i in 11..frame.len() {
            let mut tampered = frame.clone();
            tampered[i] = tampered[i].wrapping_add(rng.gen_range(1..=255));
            assert_eq!(
                decode_ps1bb(&tampered, Some(&key)),
                Err(DecodeOutcome::AuthenticationFailed),
                "byte {} tampered",
                i
            );
        }

        // The frame counter is bound into the nonce.
        let mut tampered = frame.clone();
        tampered[4] ^= 0x01;
        assert_eq!(decode_ps1bb(&tampered, Some(&key)), Err(DecodeOutcome::AuthenticationFailed));
    }
}

#[test]
fn test_ciphertext_truncation_is_detected() {
    let frame = FrameBuilder::new(PRODUCT_ID_PS1BB, 9)
        .object(object_ids::BATTERY, &[42])
        .encrypt(key(), address(), [1, 2, 3])
        .build()
        .unwrap();
    for cut in 1..frame.len() - 5 {
        let truncated = &frame[..frame.len() - cut];
        let result = decode_ps1bb(truncated, Some(&key()));
        assert!(
            matches!(
                result,
                Err(DecodeOutcome::AuthenticationFailed)
                    | Err(DecodeOutcome::Malformed)
                    | Err(DecodeOutcome::NoData)
            ),
            "cut {} gave {:?}",
            cut,
            result
        );
    }
}

#[test]
fn test_wrong_address_fails_authentication() {
    let frame = FrameBuilder::new(PRODUCT_ID_PS1BB, 9)
        .object(object_ids::BATTERY, &[42])
        .encrypt(key(), address(), [1, 2, 3])
        .build()
        .unwrap();
    let result = decode(&frame, Some(&key()), "A4:C1:38:5A:0B:1D", &[PRODUCT_ID_PS1BB]);
    assert_eq!(result, Err(DecodeOutcome::AuthenticationFailed));
}

// ============================================================================
// Object Walk
// ============================================================================

#[test]
fn test_truncated_object_keeps_earlier_fields() {
    let frame = FrameBuilder::new(PRODUCT_ID_PS1BB, 1)
        .object(object_ids::PRESSURE_STATE, &[1])
        .object(object_ids::PRESSURE_ABSENT_DURATION, &[0x10, 0x0E, 0x00, 0x00])
        .raw_objects(&[0x03, 0x4C, 0x09, 0x55])
        .build()
        .unwrap();
    let reading = decode_ps1bb(&frame, None).unwrap();
    assert_eq!(reading.pressure_present, Some(true));
    assert_eq!(reading.pressure_absent_duration_s, Some(3600));
    assert_eq!(reading.battery_percent, None);
}

#[test]
fn test_truncated_object_inside_ciphertext() {
    let frame = FrameBuilder::new(PRODUCT_ID_PS1BB, 1)
        .object(object_ids::BATTERY, &[77])
        .raw_objects(&[0x3C, 0x48, 0x05, 0x01])
        .encrypt(key(), address(), [0, 0, 1])
        .build()
        .unwrap();
    let reading = decode_ps1bb(&frame, Some(&key())).unwrap();
    assert_eq!(reading.battery_percent, Some(77));
    assert_eq!(reading.pressure_present, None);
}

#[test]
fn test_unknown_objects_interleaved() {
    let frame = FrameBuilder::new(PRODUCT_ID_PS1BB, 1)
        .object(0x1004, &[0x12, 0x34])
        .object(object_ids::PRESSURE_PRESENT_THRESHOLD, &[0x1E, 0, 0, 0])
        .object(0x4E1C, &[])
        .object(object_ids::PRESSURE_ABSENT_THRESHOLD, &[0x3C, 0, 0, 0])
        .object(0xFFFF, &[0; 10])
        .build()
        .unwrap();
    let reading = decode_ps1bb(&frame, None).unwrap();
    assert_eq!(reading.pressure_present_threshold_s, Some(30));
    assert_eq!(reading.pressure_absent_threshold_s, Some(60));
}

#[test]
fn test_all_fields() {
    let frame = FrameBuilder::new(PRODUCT_ID_PS1BB, 200)
        .capability(0x08)
        .object(object_ids::PRESSURE_STATE, &[0])
        .object(object_ids::PRESSURE_PRESENT_DURATION, &1u32.to_le_bytes())
        .object(object_ids::PRESSURE_ABSENT_DURATION, &2u32.to_le_bytes())
        .object(object_ids::PRESSURE_PRESENT_THRESHOLD, &3u32.to_le_bytes())
        .object(object_ids::PRESSURE_ABSENT_THRESHOLD, &4u32.to_le_bytes())
        .object(object_ids::BATTERY, &[100])
        .encrypt(key(), address(), [9, 9, 9])
        .build()
        .unwrap();
    let reading = decode_ps1bb(&frame, Some(&key())).unwrap();
    assert_eq!(reading.pressure_present, Some(false));
    assert_eq!(reading.pressure_present_duration_s, Some(1));
    assert_eq!(reading.pressure_absent_duration_s, Some(2));
    assert_eq!(reading.pressure_present_threshold_s, Some(3));
    assert_eq!(reading.pressure_absent_threshold_s, Some(4));
    assert_eq!(reading.battery_percent, Some(100));
    assert_eq!(reading.signal_strength_dbm, None);
}

// ============================================================================
// Robustness
// ============================================================================

#[test]
fn test_random_input_never_panics() {
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let decoder = MiBeaconDecoder::default();
    for _ in 0..5_000 {
        let len = rng.gen_range(0..64);
        let mut data: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
        if data.len() >= 4 && rng.gen_bool(0.8) {
            data[2..4].copy_from_slice(&PRODUCT_ID_PS1BB.to_le_bytes());
        }
        let key = if rng.gen_bool(0.5) { Some(key()) } else { None };
        let _ = decoder.decode(&data, key.as_ref(), ADDRESS);
    }
}

#[test]
fn test_concurrent_decoding() {
    let decoder = Arc::new(MiBeaconDecoder::default());
    let frame = Arc::new(
        FrameBuilder::new(PRODUCT_ID_PS1BB, 1)
            .object(object_ids::BATTERY, &[64])
            .encrypt(key(), address(), [0, 1, 2])
            .build()
            .unwrap(),
    );

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let decoder = Arc::clone(&decoder);
            let frame = Arc::clone(&frame);
            thread::spawn(move || {
                let key = key();
                (0..100)
                    .map(|_| decoder.decode(&frame, Some(&key), ADDRESS))
                    .all(|r| r.map(|reading| reading.battery_percent) == Ok(Some(64)))
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
}

#[test]
fn test_encrypt_payload_layout() {
    let region = crypto::encrypt_payload(&[0x03, 0x4C, 0x01, 0x55], &key(), &address(), PRODUCT_ID_PS1BB, 1, &[7, 8, 9])
        .unwrap();
    assert_eq!(region.len(), 4 + crypto::TRAILER_SIZE + crypto::TAG_SIZE);
    assert_eq!(&region[4..7], &[7, 8, 9]);
}
