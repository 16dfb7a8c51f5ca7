// Integration tests for the standard Rosetta policy
// These tests drive the policy the way a storage engine does: build through
// the builder, persist the blob, query through readers.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rosetta_filter::filter::format::{HEADER_SIZE, TRAILER_SIZE};
use rosetta_filter::key::{decode_successor, encode_key};
use rosetta_filter::{new_rosetta_policy, Error, FilterOptions, FilterPolicy};
use std::collections::BTreeSet;
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::TempDir;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn build(policy: &dyn FilterPolicy, keys: &[u64]) -> Vec<u8> {
    let mut builder = policy.filter_bits_builder().expect("full filters enabled");
    for &key in keys {
        builder.add_key(&encode_key(key)).unwrap();
    }
    builder.finish().unwrap()
}

/// Keys {1, 5, 9} with 10 bits per key
#[test]
fn test_small_filter_scenario() {
    init_logging();
    let policy = FilterOptions::standard(10).build_policy().unwrap();

    let blob = build(policy.as_ref(), &[1, 5, 9]);
    assert!(!blob.is_empty());

    let reader = policy.filter_bits_reader(&blob).unwrap();
    assert!(reader.may_match(&encode_key(1)));
    assert!(reader.may_match(&encode_key(5)));
    assert!(reader.may_match(&encode_key(9)));

    // Unconstrained, but must answer
    let _ = reader.may_match(&encode_key(4));
}

/// No inserted key is ever rejected
#[test]
fn test_no_false_negatives_random_keys() {
    init_logging();
    let policy = new_rosetta_policy(false, 10);
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let keys: Vec<u64> = (0..5000).map(|_| rng.random()).collect();

    let blob = build(policy.as_ref(), &keys);
    let reader = policy.filter_bits_reader(&blob).unwrap();

    for &key in &keys {
        assert!(
            reader.may_match(&encode_key(key)),
            "False negative for key {}",
            key
        );
    }
}

/// False positive rate stays near the bits-per-key target
#[test]
fn test_false_positive_rate() {
    let policy = new_rosetta_policy(false, 10);
    let mut rng = StdRng::seed_from_u64(7);
    let keys: BTreeSet<u64> = (0..5000).map(|_| rng.random()).collect();
    let key_vec: Vec<u64> = keys.iter().copied().collect();

    let blob = build(policy.as_ref(), &key_vec);
    let reader = policy.filter_bits_reader(&blob).unwrap();

    let mut false_positives = 0;
    let mut probes = 0;
    while probes < 10_000 {
        let probe: u64 = rng.random();
        if keys.contains(&probe) {
            continue;
        }
        probes += 1;
        if reader.may_match(&encode_key(probe)) {
            false_positives += 1;
        }
    }

    let fp_rate = false_positives as f64 / probes as f64;
    println!(
        "False positive rate: {:.4} ({}/{})",
        fp_rate, false_positives, probes
    );
    assert!(
        fp_rate < 0.03,
        "False positive rate too high: {:.4}",
        fp_rate
    );
}

/// Seek never skips an inserted key and never goes backwards
#[test]
fn test_seek_ordering() {
    let policy = new_rosetta_policy(false, 12);
    let mut rng = StdRng::seed_from_u64(42);
    let keys: BTreeSet<u64> = (0..2000).map(|_| rng.random_range(0..1_000_000)).collect();
    let key_vec: Vec<u64> = keys.iter().copied().collect();

    let blob = build(policy.as_ref(), &key_vec);
    let reader = policy.filter_bits_reader(&blob).unwrap();

    for _ in 0..2000 {
        let probe: u64 = rng.random_range(0..1_100_000);
        let next_real = keys.range(probe..).next().copied();
        let found = reader
            .seek(&encode_key(probe))
            .unwrap()
            .map(decode_successor);

        match (found, next_real) {
            (Some(s), Some(r)) => {
                assert!(s >= probe, "seek({}) went backwards to {}", probe, s);
                assert!(s <= r, "seek({}) = {} skipped key {}", probe, s, r);
            }
            (Some(s), None) => assert!(s >= probe),
            (None, Some(r)) => panic!("seek({}) found nothing but {} exists", probe, r),
            (None, None) => {}
        }
    }
}

/// Seek results compare as raw bytes in key order
#[test]
fn test_seek_results_compare_as_bytes() {
    let policy = new_rosetta_policy(false, 16);
    let blob = build(policy.as_ref(), &[1, 256, 65_536]);
    let reader = policy.filter_bits_reader(&blob).unwrap();

    let a = reader.seek(&encode_key(1)).unwrap().unwrap();
    let b = reader.seek(&encode_key(256)).unwrap().unwrap();
    let c = reader.seek(&encode_key(65_536)).unwrap().unwrap();

    assert!(a < b && b < c);
    assert_eq!(decode_successor(c), 65_536);
}

/// One-shot create/match agrees with the builder/reader path
#[test]
fn test_one_shot_matches_builder_path() {
    let policy = new_rosetta_policy(false, 10);
    let keys: Vec<[u8; 8]> = (0..200u64).map(|i| encode_key(i * 101)).collect();
    let key_refs: Vec<&[u8]> = keys.iter().map(|k| k.as_slice()).collect();

    let mut one_shot = Vec::new();
    policy.create_filter(&key_refs, &mut one_shot).unwrap();

    let raw_keys: Vec<u64> = (0..200u64).map(|i| i * 101).collect();
    let built = build(policy.as_ref(), &raw_keys);
    assert_eq!(one_shot, built);

    let reader = policy.filter_bits_reader(&built).unwrap();
    for probe in 0..3_000u64 {
        let key = encode_key(probe);
        assert_eq!(
            policy.key_may_match(&key, &one_shot).unwrap(),
            reader.may_match(&key)
        );
    }
}

/// Block-based mode hands out no builder
#[test]
fn test_legacy_block_based_gate() {
    let policy = FilterOptions::standard(10)
        .use_block_based_builder(true)
        .build_policy()
        .unwrap();
    assert!(policy.filter_bits_builder().is_none());

    // Readers and one-shot paths still work
    let mut dst = Vec::new();
    policy
        .create_filter(&[encode_key(3).as_slice()], &mut dst)
        .unwrap();
    assert!(policy.key_may_match(&encode_key(3), &dst).unwrap());
}

/// Persist a filter next to its policy name, reload and verify it
#[test]
fn test_persist_and_reload() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let policy = new_rosetta_policy(false, 10);
    let keys: Vec<u64> = (0..1000).map(|i| i * 17 + 3).collect();

    let blob = build(policy.as_ref(), &keys);
    std::fs::write(dir.path().join("filter.name"), policy.name()).unwrap();
    std::fs::write(dir.path().join("filter.blob"), &blob).unwrap();
    drop(policy);

    // A later process with the same configuration
    let policy = new_rosetta_policy(false, 10);
    let name = std::fs::read_to_string(dir.path().join("filter.name")).unwrap();
    policy.verify_name(&name).unwrap();

    let loaded = std::fs::read(dir.path().join("filter.blob")).unwrap();
    let reader = policy.filter_bits_reader(&loaded).unwrap();
    for &key in &keys {
        assert!(reader.may_match(&encode_key(key)));
    }

    // A process configured for a different policy refuses the filter
    let elastic = FilterOptions::elastic(8, vec![4, 4])
        .build_policy()
        .unwrap();
    assert!(matches!(
        elastic.verify_name(&name),
        Err(Error::PolicyMismatch { .. })
    ));
}

/// Truncated or corrupted filters are reported, never queried
#[test]
fn test_corrupted_filter_is_rejected() {
    let policy = new_rosetta_policy(false, 10);
    let blob = build(policy.as_ref(), &[1, 2, 3]);

    assert!(policy.filter_bits_reader(&blob[..blob.len() / 2]).is_err());
    assert!(policy.filter_bits_reader(&[]).is_err());

    let mut flipped = blob.clone();
    flipped[40] ^= 0x10;
    assert!(matches!(
        policy.filter_bits_reader(&flipped).err(),
        Some(Error::ChecksumMismatch { .. })
    ));
}

/// Budgets too large to allocate fail the build instead of the process
#[test]
fn test_oversized_budget_is_an_error() {
    assert!(FilterOptions::standard(1 << 62).build_policy().is_err());

    let policy = new_rosetta_policy(false, 1 << 62);
    let mut builder = policy.filter_bits_builder().unwrap();
    builder.add_key(&encode_key(1)).unwrap();
    assert!(matches!(builder.finish(), Err(Error::FilterCore(_))));

    let mut dst = Vec::new();
    assert!(policy
        .create_filter(&[encode_key(1).as_slice()], &mut dst)
        .is_err());
    assert!(dst.is_empty());
}

/// A filter whose checksum is intact but whose hash count is not is refused
#[test]
fn test_excessive_hash_count_is_rejected() {
    let policy = new_rosetta_policy(false, 10);
    let mut blob = build(policy.as_ref(), &[1, 2, 3]);

    // num_hashes of the first section, right after its length prefix
    let offset = HEADER_SIZE + 4;
    blob[offset..offset + 4].copy_from_slice(&u32::MAX.to_le_bytes());
    let body_len = blob.len() - TRAILER_SIZE;
    let crc = crc32fast::hash(&blob[..body_len]);
    blob[body_len..].copy_from_slice(&crc.to_le_bytes());

    assert!(matches!(
        policy.filter_bits_reader(&blob).err(),
        Some(Error::FilterCore(_))
    ));
    assert!(policy.key_may_match(&encode_key(1), &blob).is_err());
}

/// Many readers over one shared blob
#[test]
fn test_concurrent_readers() {
    let policy: Arc<dyn FilterPolicy> = Arc::from(new_rosetta_policy(false, 10));
    let keys: Vec<u64> = (0..2000).map(|i| i * 7 + 1).collect();
    let blob = Arc::new(build(policy.as_ref(), &keys));
    let keys = Arc::new(keys);

    let num_threads = 8;
    let barrier = Arc::new(Barrier::new(num_threads));
    let mut handles = vec![];

    for thread_id in 0..num_threads {
        let policy = Arc::clone(&policy);
        let blob = Arc::clone(&blob);
        let keys = Arc::clone(&keys);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier.wait();
            let reader = policy.filter_bits_reader(&blob).unwrap();
            for &key in keys.iter() {
                assert!(
                    reader.may_match(&encode_key(key)),
                    "Thread {} lost key {}",
                    thread_id,
                    key
                );
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }
}

/// Short keys are rejected on write and handled on read
#[test]
fn test_short_keys() {
    let policy = new_rosetta_policy(false, 10);
    let mut builder = policy.filter_bits_builder().unwrap();
    assert!(matches!(
        builder.add_key(b"1234567"),
        Err(Error::InvalidArgument(_))
    ));
    builder.add_key(b"12345678").unwrap();
    let blob = builder.finish().unwrap();

    let reader = policy.filter_bits_reader(&blob).unwrap();
    assert!(reader.may_match(b"12345678"));
    assert!(reader.may_match(b"123"));
    assert!(reader.seek(b"123").is_err());
}
