//! # Concurrent Access
//!
//! A `BTable` is shared across threads behind an `Arc`; S-buckets are
//! created once and reopened on demand after the idle reaper closes them.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    use kfs::{BTable, KfsOptions, StoreBackend};
    use parking_lot::Mutex;

    use crate::integration::{log_table, payload};

    #[test]
    fn test_parallel_writers_and_readers() {
        let (_dir, table) = log_table(128);
        let table = Arc::new(table);
        let failures = Arc::new(Mutex::new(Vec::new()));

        let handles: Vec<_> = (0..8u64)
            .map(|worker| {
                let table = Arc::clone(&table);
                let failures = Arc::clone(&failures);
                thread::spawn(move || {
                    for i in 0..20u64 {
                        let key = format!("w{}-f{}", worker, i);
                        let data = payload(300 + i as usize, worker * 100 + i);
                        table.write_file(&key, &data).unwrap();
                        if table.read_file(&key).unwrap() != data {
                            failures.lock().push(key);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert!(failures.lock().is_empty(), "mismatched: {:?}", failures.lock());
    }

    #[test]
    fn test_reaper_runs_alongside_traffic() {
        let dir = tempfile::tempdir().unwrap();
        let options = KfsOptions::for_testing()
            .with_backend(StoreBackend::Log)
            .with_sbucket_idle(Duration::from_millis(5));
        let table = Arc::new(BTable::open(dir.path().join("store"), options).unwrap());
        let _reaper = table.spawn_idle_reaper().unwrap();

        let deadline = Instant::now() + Duration::from_millis(300);
        let mut round = 0u64;
        while Instant::now() < deadline {
            let key = format!("key-{}", round % 10);
            let data = payload(64, round);
            table.write_file(&key, &data).unwrap();
            assert_eq!(table.read_file(&key).unwrap(), data);
            round += 1;
            thread::sleep(Duration::from_millis(3));
        }
    }
}
