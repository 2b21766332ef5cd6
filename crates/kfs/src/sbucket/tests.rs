//! # S-Bucket Tests

use super::*;
use crate::domain::StoreBackend;
use crate::utils::coerce_key;

fn memory_sbucket(options: KfsOptions) -> (tempfile::TempDir, Arc<SBucket>) {
    let dir = tempfile::tempdir().unwrap();
    let sb = Arc::new(SBucket::new(7, dir.path().join("007.s"), Arc::new(options)));
    (dir, sb)
}

#[test]
fn test_write_read_roundtrip() {
    let (_dir, sb) = memory_sbucket(KfsOptions::for_testing());

    let data: Vec<u8> = (0..100u8).collect();
    sb.write_file("file", &data).unwrap();

    assert!(sb.exists("file").unwrap());
    assert_eq!(sb.read_file("file").unwrap(), data);
}

#[test]
fn test_write_file_replaces_previous_version() {
    let (_dir, sb) = memory_sbucket(KfsOptions::for_testing());

    sb.write_file("file", &[1u8; 100]).unwrap();
    sb.write_file("file", b"short").unwrap();

    assert_eq!(sb.read_file("file").unwrap(), b"short".to_vec());
    assert_eq!(sb.read_chunk("file", 1).unwrap(), None);
}

#[test]
fn test_unlink() {
    let (_dir, sb) = memory_sbucket(KfsOptions::for_testing());

    sb.write_file("file", &[9u8; 50]).unwrap();
    sb.write_file("other", b"keep").unwrap();
    sb.unlink("file").unwrap();

    assert!(!sb.exists("file").unwrap());
    assert!(sb.exists("other").unwrap());
    let err = sb.read_file("file").unwrap_err();
    assert!(err.is_not_found());

    // Unlinking a missing key is a no-op
    sb.unlink("file").unwrap();
}

#[test]
fn test_keys_are_coerced() {
    let (_dir, sb) = memory_sbucket(KfsOptions::for_testing());

    sb.write_file("A", b"data").unwrap();
    assert!(sb.exists(&coerce_key("A")).unwrap());
}

#[test]
fn test_stat_tracks_usage() {
    let options = KfsOptions::for_testing().with_max_sbucket_size(10_000);
    let (_dir, sb) = memory_sbucket(options);

    let empty = sb.stat().unwrap();
    assert_eq!(empty.used, 0);
    assert_eq!(empty.free, 10_000);

    sb.write_file("file", &[0u8; 32]).unwrap();
    let stats = sb.stat().unwrap();
    // two 16-byte chunks under 47-byte item keys
    assert_eq!(stats.used, 2 * (47 + 16));
    assert_eq!(stats.free, 10_000 - stats.used);
}

#[test]
fn test_full_sbucket_rejects_writes() {
    let options = KfsOptions::for_testing().with_max_sbucket_size(100);
    let (_dir, sb) = memory_sbucket(options);

    let err = sb.write_file("file", &[0u8; 64]).unwrap_err();
    assert!(matches!(err, KfsError::SBucketFull { index: 7, .. }));
    // Partial chunks were rolled back
    assert!(!sb.exists("file").unwrap());
}

#[test]
fn test_list_groups_chunks_by_file() {
    let (_dir, sb) = memory_sbucket(KfsOptions::for_testing());

    sb.write_file("a", &[1u8; 40]).unwrap();
    sb.write_file("b", b"xyz").unwrap();

    let list = sb.list().unwrap();
    assert_eq!(list.len(), 2);

    let mut expected = vec![(coerce_key("a"), 40), (coerce_key("b"), 3)];
    expected.sort();
    let actual: Vec<_> = list
        .into_iter()
        .map(|k| (k.base_key, k.approximate_size))
        .collect();
    assert_eq!(actual, expected);
}

#[test]
fn test_memory_sbucket_survives_close() {
    let (_dir, sb) = memory_sbucket(KfsOptions::for_testing());

    sb.write_file("file", b"data").unwrap();
    sb.close().unwrap();
    assert!(sb.is_open());
    assert_eq!(sb.read_file("file").unwrap(), b"data".to_vec());
}

#[test]
fn test_log_sbucket_reopens_after_close() {
    let options = KfsOptions::for_testing().with_backend(StoreBackend::Log);
    let (_dir, sb) = memory_sbucket(options);

    sb.write_file("file", b"persisted across close").unwrap();
    sb.close().unwrap();
    assert!(!sb.is_open());

    assert_eq!(
        sb.read_file("file").unwrap(),
        b"persisted across close".to_vec()
    );
    assert!(sb.is_open());
}

#[test]
fn test_flush_keeps_data() {
    let options = KfsOptions::for_testing().with_backend(StoreBackend::Log);
    let (_dir, sb) = memory_sbucket(options);

    sb.write_file("file", &[3u8; 64]).unwrap();
    sb.write_file("file", &[4u8; 20]).unwrap();
    sb.flush().unwrap();

    assert_eq!(sb.read_file("file").unwrap(), vec![4u8; 20]);
}

#[test]
fn test_idle_tracking() {
    let (_dir, sb) = memory_sbucket(KfsOptions::for_testing());
    sb.open().unwrap();

    let later = Instant::now() + Duration::from_secs(90);
    assert!(sb.idle_for(later) >= Duration::from_secs(90));
}
