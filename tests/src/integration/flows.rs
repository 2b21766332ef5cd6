//! # Table Lifecycle Flows
//!
//! 1. Write many files, reopen the table, read them back
//! 2. Streams across chunk boundaries
//! 3. Stat/list consistency with what was written
//! 4. Crash recovery of a torn S-bucket log

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::fs::OpenOptions;
    use std::io::{Read, Write};

    use kfs::utils::coerce_key;
    use kfs::{is_not_found_error, BTable, KfsOptions, SBucketSelector, StoreBackend};

    use crate::integration::{log_table, payload};

    fn options() -> KfsOptions {
        KfsOptions::for_testing()
            .with_backend(StoreBackend::Log)
            .with_chunk_size(64)
    }

    #[test]
    fn test_many_files_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.kfs");

        let files: BTreeMap<String, Vec<u8>> = (0..50u64)
            .map(|i| (format!("file-{}", i), payload((i * 37 % 500) as usize, i)))
            .collect();

        {
            let table = BTable::open(&path, options()).unwrap();
            for (key, data) in &files {
                table.write_file(key, data).unwrap();
            }
            table.close().unwrap();
        }

        let table = BTable::open(&path, options()).unwrap();
        for (key, data) in &files {
            assert_eq!(&table.read_file(key).unwrap(), data, "file {}", key);
        }
    }

    #[test]
    fn test_overwrite_and_unlink() {
        let (_dir, table) = log_table(64);

        table.write_file("doc", &payload(1000, 1)).unwrap();
        table.write_file("doc", &payload(10, 2)).unwrap();
        assert_eq!(table.read_file("doc").unwrap(), payload(10, 2));

        table.unlink("doc").unwrap();
        let err = table.read_file("doc").unwrap_err();
        assert!(err.is_not_found());
        assert!(is_not_found_error(&err));
        assert!(is_not_found_error(&std::io::Error::from(err)));
    }

    #[test]
    fn test_streaming_across_chunk_boundaries() {
        let (_dir, table) = log_table(100);
        let data = payload(1234, 9);

        let mut writer = table.create_write_stream("stream").unwrap();
        for piece in data.chunks(77) {
            writer.write_all(piece).unwrap();
        }
        assert_eq!(writer.finish().unwrap(), 13);

        let mut reader = table.create_read_stream("stream").unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_list_and_stat_reflect_contents() {
        let (_dir, table) = log_table(64);
        let keys = ["alpha", "beta", "gamma", "delta"];
        for (i, key) in keys.iter().enumerate() {
            table.write_file(key, &payload(100 * (i + 1), i as u64)).unwrap();
        }

        let lists = table.list(SBucketSelector::All).unwrap();
        let mut listed: Vec<(String, u64)> = lists
            .iter()
            .flat_map(|l| l.keys.iter().map(|k| (k.base_key.clone(), k.approximate_size)))
            .collect();
        listed.sort();

        let mut expected: Vec<(String, u64)> = keys
            .iter()
            .enumerate()
            .map(|(i, key)| (coerce_key(key), 100 * (i as u64 + 1)))
            .collect();
        expected.sort();
        assert_eq!(listed, expected);

        for list in &lists {
            for key in &list.keys {
                assert_eq!(table.sbucket_index_for_key(&key.base_key), list.sbucket_index);
            }
        }

        let stats = table.stat(SBucketSelector::All).unwrap();
        assert_eq!(stats.len(), lists.len());
        for stat in &stats {
            assert!(stat.stats.used > 0);
            assert_eq!(
                stat.stats.used + stat.stats.free,
                table.options().max_sbucket_size
            );
        }
    }

    #[test]
    fn test_torn_log_tail_loses_only_last_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.kfs");

        let sbucket_dir = {
            let table = BTable::open(&path, options()).unwrap();
            table.write_file("A", &payload(50, 1)).unwrap();
            let sbucket = table.get_sbucket_for_key("A").unwrap();
            table.close().unwrap();
            sbucket.path().to_path_buf()
        };

        let mut log = OpenOptions::new()
            .append(true)
            .open(sbucket_dir.join("data.log"))
            .unwrap();
        log.write_all(&[0xde, 0xad, 0xbe]).unwrap();
        drop(log);

        let table = BTable::open(&path, options()).unwrap();
        assert_eq!(table.read_file("A").unwrap(), payload(50, 1));
        table.write_file("B", b"after recovery").unwrap();
        assert_eq!(table.read_file("B").unwrap(), b"after recovery".to_vec());
    }
}
