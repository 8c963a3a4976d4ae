//! Many writers and readers against one store.

use crate::common::*;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

#[test]
fn concurrent_writers_lose_nothing() {
    let t = TestStore::new(500, Duration::ZERO);
    let store = Arc::new(t.store);
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|w| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..1_000i64 {
                    // Distinct keys so no two generations can share a span
                    store.write_lf(w, 1, T0 + i * 8 + w, i as f64).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    store.close();

    let stats = store.stats();
    assert_eq!(stats.flush_failures, 0);
    let result = store
        .read_all_blocks(&RangeQuery::new(0, pancarte::MAX_INGEST_MICROS))
        .unwrap();
    assert_eq!(result.records.lf.len(), 8_000);
    for w in 0..8i64 {
        let query = RangeQuery::new(0, pancarte::MAX_INGEST_MICROS).filter("source_id", w);
        assert_eq!(store.read_all_blocks(&query).unwrap().records.lf.len(), 1_000);
    }
}

#[test]
fn shuffled_arrivals_come_back_sorted_within_blocks() {
    let t = TestStore::new(100, Duration::ZERO);
    let mut rng = rand::rngs::StdRng::seed_from_u64(0x5eed);
    let mut keys: Vec<i64> = (0..1_000).map(|i| T0 + i * SECOND).collect();
    keys.shuffle(&mut rng);

    for k in &keys {
        let v: f64 = rng.gen_range(35.0..42.0);
        t.store.write_lf(1, 1, *k, v).unwrap();
    }
    t.store.close();

    let scan = t
        .store
        .read_blocks(&RangeQuery::new(0, pancarte::MAX_INGEST_MICROS))
        .unwrap();
    let mut total = 0;
    for read in scan {
        let ts = read.unwrap().records.lf.timestamp_micros;
        assert!(ts.windows(2).all(|w| w[0] <= w[1]));
        total += ts.len();
    }
    assert_eq!(total, 1_000);
}

#[test]
fn readers_never_see_partial_blocks() {
    let t = TestStore::new(50, Duration::ZERO);
    let store = Arc::new(t.store);

    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for i in 0..2_000i64 {
                store.write_hf(1, 1, T0 + i * SECOND, 100.0, vec![i as f64; 10]).unwrap();
            }
            store.flush_pending();
        })
    };

    let reader = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for _ in 0..50 {
                let result = store
                    .read_all_blocks(&RangeQuery::new(0, pancarte::MAX_INGEST_MICROS))
                    .unwrap();
                assert!(result.malformed_blocks.is_empty());
                assert!(result.records.hf.values.iter().all(|v| v.len() == 10));
            }
        })
    };

    writer.join().unwrap();
    reader.join().unwrap();
    store.close();

    let result = store
        .read_all_blocks(&RangeQuery::new(0, pancarte::MAX_INGEST_MICROS))
        .unwrap();
    assert_eq!(result.records.hf.len(), 2_000);
}
