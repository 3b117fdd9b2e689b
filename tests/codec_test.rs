use sep39::{checksum, decode, encode, MediaDescriptor, Sep39Error, WireVersion, MAX_PAYLOAD};

/// Deterministic pseudo-random bytes so failures reproduce.
fn sample_bytes(len: usize, seed: u32) -> Vec<u8> {
    let mut state = seed | 1;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (state >> 24) as u8
        })
        .collect()
}

fn octet_stream(name: &str) -> MediaDescriptor {
    MediaDescriptor::new("application/octet-stream").with_param("n", name)
}

#[test]
fn test_single_descriptor_roundtrip() {
    let data = sample_bytes(10_000, 7);
    let descriptor = octet_stream("random");

    let slots = encode(&data, &[descriptor.clone()], WireVersion::V2).unwrap();
    let (descriptors, attachments) = decode(&slots).unwrap();

    assert_eq!(descriptors, vec![descriptor]);
    assert_eq!(attachments, vec![data]);
}

#[test]
fn test_slot_width_invariant() {
    for size in [10, 1_000, 50_000, 112_000] {
        let data = sample_bytes(size, size as u32);
        let slots = encode(&data, &[octet_stream("x")], WireVersion::V2).unwrap();
        for slot in &slots {
            assert!(slot.key.len() <= 64, "size {size}: key {} chars", slot.key.len());
            assert!(slot.value.len() <= 64, "size {size}: value {} bytes", slot.value.len());
        }
        let (_, attachments) = decode(&slots).unwrap();
        assert_eq!(attachments, vec![data]);
    }
}

#[test]
fn test_multi_attachment_requires_size() {
    let first = sample_bytes(150, 1);
    let second = sample_bytes(10_000, 2);
    let combined: Vec<u8> = first.iter().chain(&second).copied().collect();

    let no_size = [octet_stream("prefix"), octet_stream("bytes")];
    assert!(matches!(
        encode(&combined, &no_size, WireVersion::V2),
        Err(Sep39Error::MissingSizeParameter { index: 0 })
    ));

    let sized = [
        octet_stream("prefix").with_size(first.len()),
        octet_stream("bytes"),
    ];
    let slots = encode(&combined, &sized, WireVersion::V2).unwrap();
    let (descriptors, attachments) = decode(&slots).unwrap();
    assert_eq!(descriptors.len(), 2);
    assert_eq!(attachments, vec![first, second]);
}

#[test]
fn test_checksum_enforced() {
    let data = sample_bytes(300, 9);
    let descriptor = octet_stream("chk")
        .with_size(data.len())
        .with_checksum(checksum(&data));

    let slots = encode(&data, &[descriptor.clone()], WireVersion::V2).unwrap();
    let (_, attachments) = decode(&slots).unwrap();
    assert_eq!(attachments, vec![data]);

    // Corrupt one raw payload byte in the final slot's value.
    let mut corrupted = slots.clone();
    let victim = corrupted
        .iter_mut()
        .rev()
        .find(|slot| !slot.value.is_empty())
        .unwrap();
    let last = victim.value.len() - 1;
    victim.value[last] ^= 0x01;

    assert!(matches!(
        decode(&corrupted),
        Err(Sep39Error::ChecksumMismatch { index: 0, .. })
    ));
}

#[test]
fn test_empty_metadata_edge_case() {
    let data = sample_bytes(300, 11);

    let slots = encode(&data, &[], WireVersion::V2).unwrap();
    // Index, version digit, then exactly the single digit `0`.
    assert!(slots[0].key.starts_with("0020"));
    let (descriptors, attachments) = decode(&slots).unwrap();
    assert!(descriptors.is_empty());
    assert_eq!(attachments, vec![data.clone()]);

    let slots = encode(&data, &[], WireVersion::V1).unwrap();
    assert!(slots[0].key.starts_with("001000000"));
    let (descriptors, attachments) = decode(&slots).unwrap();
    assert!(descriptors.is_empty());
    assert_eq!(attachments, vec![data]);
}

#[test]
fn test_boundary_payload_sizes() {
    for version in [WireVersion::V1, WireVersion::V2] {
        for size in [0, 1, 63, 64, 65, 126, 127, 128] {
            let data = sample_bytes(size, 100 + size as u32);
            let slots = encode(&data, &[octet_stream("b")], version).unwrap();
            let (_, attachments) = decode(&slots).unwrap();
            assert_eq!(attachments, vec![data], "{version:?} size {size}");
        }
    }
}

#[test]
fn test_header_exactly_fills_first_slot() {
    // 1 version char + 3 length digits + 122 metadata chars = 126, the
    // per-slot header capacity: binary mode must begin at slot 1, offset 0.
    let descriptor = MediaDescriptor::new("text/plain").with_param("n", "x".repeat(109));
    let rendered = sep39::render(std::slice::from_ref(&descriptor)).unwrap();
    assert_eq!(rendered.len(), 122);

    for payload in [0usize, 1, 64, 65] {
        let data = sample_bytes(payload, 42);
        let slots = encode(&data, &[descriptor.clone()], WireVersion::V2).unwrap();
        let (descriptors, attachments) = decode(&slots).unwrap();
        assert_eq!(descriptors, vec![descriptor.clone()], "payload {payload}");
        assert_eq!(attachments, vec![data], "payload {payload}");
    }
}

#[test]
fn test_metadata_spanning_multiple_slots() {
    for version in [WireVersion::V1, WireVersion::V2] {
        let descriptor = octet_stream(&"y".repeat(300));
        let data = sample_bytes(500, 5);
        let slots = encode(&data, &[descriptor.clone()], version).unwrap();
        let (descriptors, attachments) = decode(&slots).unwrap();
        assert_eq!(descriptors, vec![descriptor]);
        assert_eq!(attachments, vec![data]);
    }
}

#[test]
fn test_oversize_rejection() {
    let descriptor = [octet_stream("big")];
    assert!(matches!(
        encode(&vec![0u8; MAX_PAYLOAD], &descriptor, WireVersion::V2),
        Err(Sep39Error::PayloadTooLarge { len: 126_000, max: 126_000 })
    ));

    let data = sample_bytes(MAX_PAYLOAD - 1, 13);
    let slots = encode(&data, &descriptor, WireVersion::V2).unwrap();
    let (_, attachments) = decode(&slots).unwrap();
    assert_eq!(attachments, vec![data]);
}

#[test]
fn test_legacy_revision_roundtrip() {
    let data = sample_bytes(4_096, 17);
    let descriptor = octet_stream("legacy").with_checksum(checksum(&data));

    let v1 = encode(&data, std::slice::from_ref(&descriptor), WireVersion::V1).unwrap();
    let v2 = encode(&data, std::slice::from_ref(&descriptor), WireVersion::V2).unwrap();
    assert!(v1[0].key.starts_with("001"));
    assert!(v2[0].key.starts_with("002"));
    assert_ne!(v1[0].key, v2[0].key);

    assert_eq!(decode(&v1).unwrap(), (vec![descriptor.clone()], vec![data.clone()]));
    assert_eq!(decode(&v2).unwrap(), (vec![descriptor], vec![data]));
}

#[test]
fn test_invalid_frame_rejected() {
    assert!(matches!(decode(&[]), Err(Sep39Error::InvalidFrame { .. })));

    let data = sample_bytes(100, 19);
    let mut slots = encode(&data, &[octet_stream("f")], WireVersion::V2).unwrap();
    slots[0].key.replace_range(0..3, "009");
    assert!(matches!(decode(&slots), Err(Sep39Error::InvalidFrame { .. })));
}

#[test]
fn test_invalid_length_rejected() {
    let data = sample_bytes(100, 23);
    let mut slots = encode(&data, &[octet_stream("l")], WireVersion::V2).unwrap();
    // Clobber the first length digit with a non-digit.
    slots[0].key.replace_range(3..4, "/");
    assert!(matches!(decode(&slots), Err(Sep39Error::InvalidLength { .. })));
}

#[test]
fn test_truncated_metadata_rejected() {
    let descriptor = octet_stream(&"z".repeat(400));
    let data = sample_bytes(50, 29);
    let slots = encode(&data, &[descriptor], WireVersion::V2).unwrap();
    // Metadata spans several slots; dropping the tail must not decode.
    assert!(matches!(
        decode(&slots[..1]),
        Err(Sep39Error::TruncatedMetadata { .. })
    ));
}

#[test]
fn test_declared_size_beyond_stream_rejected() {
    let data = sample_bytes(100, 31);
    let descriptor = octet_stream("over").with_size(data.len() + 1);
    let slots = encode(&data, &[descriptor], WireVersion::V2).unwrap();
    assert!(matches!(
        decode(&slots),
        Err(Sep39Error::AttachmentCountMismatch { descriptors: 1, .. })
    ));
}
