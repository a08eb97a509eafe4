use rsdelta::format::{DELTA_MAGIC, Instruction, InstructionIter, SIG_MAGIC};
use rsdelta::hash::rolling::weak_sum;
use rsdelta::{Error, Signature, SignatureOptions, engine};

fn opts(block_len: usize, strong_len: usize) -> SignatureOptions {
    SignatureOptions::new(block_len, strong_len).unwrap()
}

// ---------------------------------------------------------------------------
// Signature stream
// ---------------------------------------------------------------------------

#[test]
fn empty_signature_is_header_only() {
    let sig = engine::signature(b"", SignatureOptions::default()).unwrap();
    assert_eq!(sig, [
        0x72, 0x73, 0x01, 0x36, // magic
        0x00, 0x00, 0x08, 0x00, // block_len 2048
        0x00, 0x00, 0x00, 0x08, // strong_len 8
    ]);
}

#[test]
fn signature_record_layout() {
    // MD4("abc") = a448017aaf21d8525fc10ae87aa6729d (RFC 1320).
    assert_eq!(weak_sum(b"abc"), 0x0304_0183);
    let sig = engine::signature(b"abc", opts(3, 8)).unwrap();
    assert_eq!(sig, [
        0x72, 0x73, 0x01, 0x36, //
        0x00, 0x00, 0x00, 0x03, //
        0x00, 0x00, 0x00, 0x08, //
        0x03, 0x04, 0x01, 0x83, // weak
        0xa4, 0x48, 0x01, 0x7a, 0xaf, 0x21, 0xd8, 0x52, // strong[..8]
    ]);
}

#[test]
fn magics_are_distinct() {
    assert_eq!(SIG_MAGIC, 0x7273_0136);
    assert_eq!(DELTA_MAGIC, 0x7273_0236);
}

#[test]
fn signature_rejects_foreign_magic() {
    let mut bytes = engine::signature(b"abcdef", opts(2, 8)).unwrap();
    bytes[3] = 0x37;
    assert!(matches!(
        engine::load_signature(&bytes),
        Err(Error::UnsupportedFormat { magic: 0x7273_0137 })
    ));

    let empty = Signature::from_basis(b"", opts(2, 8)).unwrap();
    let delta = engine::delta(&empty, b"long enough to fill a header").unwrap();
    assert!(matches!(
        engine::load_signature(&delta),
        Err(Error::UnsupportedFormat { magic: DELTA_MAGIC })
    ));
}

#[test]
fn signature_rejects_bad_header_fields() {
    let mut zero_block = engine::signature(b"", opts(8, 8)).unwrap();
    zero_block[4..8].fill(0);
    assert!(matches!(
        engine::load_signature(&zero_block),
        Err(Error::CorruptInput(_))
    ));

    let mut long_strong = engine::signature(b"", opts(8, 8)).unwrap();
    long_strong[11] = 17;
    assert!(matches!(
        engine::load_signature(&long_strong),
        Err(Error::CorruptInput(_))
    ));
}

#[test]
fn signature_rejects_partial_record() {
    let mut bytes = engine::signature(b"abcdefgh", opts(4, 8)).unwrap();
    bytes.pop();
    assert!(matches!(
        engine::load_signature(&bytes),
        Err(Error::CorruptInput(_))
    ));
    assert!(matches!(
        engine::load_signature(&bytes[..7]),
        Err(Error::CorruptInput(_))
    ));
}

// ---------------------------------------------------------------------------
// Delta stream
// ---------------------------------------------------------------------------

#[test]
fn delta_command_bytes() {
    let sig = engine::load_signature(&engine::signature(b"abc", opts(3, 8)).unwrap()).unwrap();
    let delta = engine::delta(&sig, b"abcabcX").unwrap();
    assert_eq!(delta, [
        0x72, 0x73, 0x02, 0x36, //
        0x45, 0x00, 0x03, // COPY 0 3
        0x45, 0x00, 0x03, // COPY 0 3
        0x01, b'X', // LITERAL 1
        0x00, // END
    ]);
    assert_eq!(engine::patch(b"abc", &delta).unwrap(), b"abcabcX");
}

#[test]
fn wide_parameters_decode() {
    let basis: Vec<u8> = (0..70_000u32).map(|i| (i % 251) as u8).collect();
    let delta = [
        0x72, 0x73, 0x02, 0x36, //
        0x4B, 0x01, 0x00, 0x00, 0x00, 0x01, 0x2C, // COPY offset u16 256, len u32 300
        0x41, 0x02, b'h', b'i', // LITERAL_N1 2
        0x00,
    ];
    let out = engine::patch(&basis, &delta).unwrap();
    assert_eq!(&out[..300], &basis[256..556]);
    assert_eq!(&out[300..], b"hi");

    let listed: Vec<Instruction> = InstructionIter::new(&delta)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(listed, vec![
        Instruction::Copy {
            offset: 256,
            len: 300
        },
        Instruction::Literal { len: 2 },
    ]);
}

#[test]
fn trailing_bytes_after_end_are_ignored() {
    let delta = [0x72, 0x73, 0x02, 0x36, 0x02, b'o', b'k', 0x00, 0xFF, 0xFF];
    assert_eq!(engine::patch(b"", &delta).unwrap(), b"ok");
}

// ---------------------------------------------------------------------------
// Corruption
// ---------------------------------------------------------------------------

#[test]
fn copy_past_basis_end_is_corrupt() {
    let delta = [0x72, 0x73, 0x02, 0x36, 0x45, 0x00, 0x0A, 0x00];
    let err = engine::patch(b"12345", &delta).unwrap_err();
    assert!(matches!(err, Error::CorruptInput(_)), "{err}");
    assert!(err.is_corruption());
}

#[test]
fn reserved_opcode_is_corrupt() {
    for op in [0x55u8, 0x80, 0xFF] {
        let delta = [0x72, 0x73, 0x02, 0x36, op, 0x00];
        assert!(matches!(
            engine::patch(b"", &delta),
            Err(Error::CorruptInput(_))
        ));
    }
}

#[test]
fn every_truncation_is_corrupt() {
    let basis: Vec<u8> = (0..5000u32).map(|i| (i * 13 % 256) as u8).collect();
    let mut new = basis[1000..4000].to_vec();
    new.extend_from_slice(b"some fresh literal bytes");
    let sig = Signature::from_basis(&basis, opts(256, 8)).unwrap();
    let delta = engine::delta(&sig, &new).unwrap();
    for cut in 0..delta.len() {
        let err = engine::patch(&basis, &delta[..cut]).unwrap_err();
        assert!(err.is_corruption(), "cut at {cut}: {err}");
    }
}

#[test]
fn wrong_magic_is_unsupported() {
    let delta = [0x72, 0x73, 0x01, 0x36, 0x00];
    assert!(matches!(
        engine::patch(b"", &delta),
        Err(Error::UnsupportedFormat { magic: SIG_MAGIC })
    ));
}
