use std::collections::HashMap;
use std::io::Write;

use bmpack::{fingerprint, read_all, Compressor, Dictionary, Expander, Record, BLOCK};

// ── helpers ──────────────────────────────────────────────────────────────

fn compress(dict: &[u8], input: &[u8]) -> Vec<u8> {
    let mut c = Compressor::new(Vec::new());
    c.attach_dictionary(Dictionary::Raw(dict.to_vec()));
    c.write_all(input).unwrap();
    c.finalize().unwrap();
    c.into_inner()
}

fn expand(dict: &[u8], stream: &[u8]) -> Vec<u8> {
    Expander::new(stream, dict).expand().unwrap()
}

fn roundtrip(dict: &[u8], input: &[u8]) -> Vec<u8> {
    expand(dict, &compress(dict, input))
}

fn assert_roundtrip(dict: &[u8], input: &[u8]) {
    assert_eq!(
        roundtrip(dict, input),
        input,
        "roundtrip failed for |dict|={}, |input|={}",
        dict.len(),
        input.len()
    );
}

const PHRASE: &[u8] = b"the quick brown fox jumps over the lazy dog";

// ── fundamental round-trips ──────────────────────────────────────────────

// TestIdentical
#[test]
fn test_roundtrip_identical() {
    let data = PHRASE.repeat(3);
    assert_roundtrip(&data, &data);

    let stream = compress(&data, &data);
    let records = read_all(&mut &stream[..]).unwrap();
    assert_eq!(
        records,
        vec![Record::Reference { offset: 0, length: 129 }]
    );
}

// TestCompletelyDifferent
#[test]
fn test_roundtrip_unrelated() {
    let dict: Vec<u8> = (0..=255u8).cycle().take(512).collect();
    let input: Vec<u8> = (0..=255u8).rev().cycle().take(512).collect();
    assert_roundtrip(&dict, &input);
}

#[test]
fn test_roundtrip_empty_input() {
    assert_eq!(compress(PHRASE, b""), b"");
    assert_roundtrip(PHRASE, b"");
}

#[test]
fn test_roundtrip_empty_dictionary() {
    let input = PHRASE.repeat(2);
    assert_roundtrip(b"", &input);
}

#[test]
fn test_roundtrip_block_boundary_lengths() {
    let dict = PHRASE.repeat(4);
    for len in [BLOCK - 1, BLOCK, BLOCK + 1, 2 * BLOCK, 2 * BLOCK + 7] {
        assert_roundtrip(&dict, &dict[..len]);
    }
}

// TestScatteredModifications
#[test]
fn test_roundtrip_scattered_modifications() {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    let mut rng = StdRng::seed_from_u64(42);
    let dict: Vec<u8> = (0..2000).map(|_| rng.gen()).collect();
    let mut input = dict.clone();
    for _ in 0..100 {
        let idx = rng.gen_range(0..input.len());
        input[idx] = rng.gen();
    }
    assert_roundtrip(&dict, &input);
}

#[test]
fn test_roundtrip_random_trials() {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    let mut rng = StdRng::seed_from_u64(9999);
    let dict: Vec<u8> = (0..5000).map(|_| rng.gen()).collect();

    for trial in 0..20 {
        // Stitch dictionary slices together with junk between them.
        let mut input = Vec::new();
        for _ in 0..rng.gen_range(1..6) {
            let start = rng.gen_range(0..dict.len() - BLOCK);
            let len = rng.gen_range(1..dict.len() - start);
            input.extend_from_slice(&dict[start..start + len]);
            let junk_len = rng.gen_range(0..200);
            input.extend((0..junk_len).map(|_| rng.gen::<u8>()));
        }
        assert_eq!(
            roundtrip(&dict, &input),
            input,
            "trial {} failed, |input|={}",
            trial,
            input.len()
        );
    }
}

// ── stream-level properties ──────────────────────────────────────────────

#[test]
fn test_near_miss_roundtrip_and_ratio() {
    let dict = PHRASE.repeat(3);
    let mut input = dict.clone();
    input[64] ^= 0x20;

    let mut c = Compressor::new(Vec::new());
    c.attach_dictionary(Dictionary::Raw(dict.clone()));
    c.write_all(&input).unwrap();
    c.finalize().unwrap();

    assert_eq!(
        c.ratio(),
        ((c.output_size() * 10_000) / c.input_size()) as i64
    );
    let stream = c.into_inner();
    assert_eq!(expand(&dict, &stream), input);
}

#[test]
fn test_references_stay_inside_dictionary() {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    let mut rng = StdRng::seed_from_u64(7);
    let dict: Vec<u8> = (0..3000).map(|_| rng.gen()).collect();
    let mut input = dict[500..2500].to_vec();
    for _ in 0..40 {
        let idx = rng.gen_range(0..input.len());
        input[idx] = rng.gen();
    }

    let stream = compress(&dict, &input);
    let records = read_all(&mut &stream[..]).unwrap();
    let mut references = 0;
    for record in &records {
        if let Record::Reference { offset, length } = record {
            references += 1;
            assert!(
                *offset as usize + *length as usize <= dict.len(),
                "{} escapes the dictionary",
                record
            );
            assert!(*length as usize >= BLOCK);
        }
    }
    assert!(references > 0, "expected at least one reference");
    assert_eq!(expand(&dict, &stream), input);
}

// A colliding fingerprint pair must be rejected by byte confirmation, never
// emitted as a bogus reference.
#[test]
fn test_fingerprint_collision_is_confirmed_away() {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    let mut rng = StdRng::seed_from_u64(1234);

    // Birthday-search the 2^23 fingerprint space for two distinct windows
    // with equal fingerprints.
    let mut seen: HashMap<u32, Vec<u8>> = HashMap::new();
    let (a, b) = loop {
        let window: Vec<u8> = (0..BLOCK).map(|_| rng.gen()).collect();
        let fp = fingerprint(&window);
        match seen.get(&fp) {
            Some(prev) if prev != &window => break (prev.clone(), window),
            Some(_) => {}
            None => {
                seen.insert(fp, window);
            }
        }
    };
    assert_eq!(fingerprint(&a), fingerprint(&b));
    assert_ne!(a, b);

    // Dictionary holds window A; the input leads with window B, whose
    // fingerprint hits A's index entry but whose bytes differ.
    let mut input = b.clone();
    input.push(b'!');
    let stream = compress(&a, &input);

    let records = read_all(&mut &stream[..]).unwrap();
    assert_eq!(records, vec![Record::Literal { data: input.clone() }]);
    assert_eq!(expand(&a, &stream), input);
}

#[test]
fn test_streams_decode_with_shared_dictionary() {
    // One frozen dictionary serving several compressions.
    let dict = PHRASE.repeat(6);
    let inputs: Vec<Vec<u8>> = vec![
        dict[..130].to_vec(),
        dict[43..200].to_vec(),
        b"unrelated content, nothing shared".to_vec(),
    ];
    for input in &inputs {
        assert_roundtrip(&dict, input);
    }
}
