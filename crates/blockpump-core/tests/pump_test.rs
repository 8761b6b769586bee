// Blockpump - Block Migration for Content-Addressed Stores
// Copyright (C) 2026 Blockpump Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.

//! End-to-end pipeline tests
//!
//! Real collectors and drains over in-memory datastores, plus a few stage doubles for the
//! setup failure paths.

#![allow(clippy::unwrap_used)]

use async_channel::{Receiver, Sender};
use async_trait::async_trait;
use blockpump_core::cid::{key_from_cid, RAW, SHA2_256};
use blockpump_core::{
    Block, BlockInfo, CidPrefix, Collector, CountingProgress, DatastoreCollector,
    DatastoreDrain, Drain, Enumerator, FailDrain, FileEnumerator, FileFailedBlocks, Key,
    MemoryFailedBlocks, PassThroughCollector, Pump, PumpConfig, PumpError, PumpResult,
    Resolved, TotalCount, VerifyingDrain,
};
use blockpump_storage::{MemoryBackend, StorageBackend};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio_test::{assert_err, assert_ok};

/// Emits a fixed list of keys
struct ListEnumerator {
    keys: Vec<Key>,
    started: AtomicBool,
}

impl ListEnumerator {
    fn new(keys: &[Key]) -> Self {
        ListEnumerator {
            keys: keys.to_vec(),
            started: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Enumerator for ListEnumerator {
    fn total_count(&self) -> TotalCount {
        TotalCount::Known(self.keys.len() as u64)
    }

    async fn keys(&self, out: Sender<BlockInfo>) -> PumpResult<JoinHandle<()>> {
        self.started.store(true, Ordering::SeqCst);
        let keys = self.keys.clone();
        Ok(tokio::spawn(async move {
            for key in keys {
                if out.send(BlockInfo::new(key)).await.is_err() {
                    break;
                }
            }
        }))
    }
}

/// Cannot open its source
struct BrokenEnumerator;

#[async_trait]
impl Enumerator for BrokenEnumerator {
    fn total_count(&self) -> TotalCount {
        TotalCount::Unknown
    }

    async fn keys(&self, _out: Sender<BlockInfo>) -> PumpResult<JoinHandle<()>> {
        Err(PumpError::Enumeration("no such repository".into()))
    }
}

/// Starts `healthy` loops, then reports its source as unreachable
struct FlakyCollector {
    inner: PassThroughCollector,
    healthy: usize,
    calls: AtomicUsize,
}

#[async_trait]
impl Collector for FlakyCollector {
    async fn blocks(
        &self,
        input: Receiver<BlockInfo>,
        out: Sender<Resolved>,
    ) -> PumpResult<JoinHandle<()>> {
        if self.calls.fetch_add(1, Ordering::SeqCst) >= self.healthy {
            return Err(PumpError::unreachable("source", "connection refused"));
        }
        self.inner.blocks(input, out).await
    }
}

/// Remembers every block it sees and rejects keys ending in `reject_suffix`
#[derive(Default)]
struct RecordingDrain {
    seen: Mutex<Vec<Key>>,
    reject_suffix: Option<&'static str>,
}

impl RecordingDrain {
    fn rejecting(suffix: &'static str) -> Self {
        RecordingDrain {
            seen: Mutex::new(Vec::new()),
            reject_suffix: Some(suffix),
        }
    }

    fn seen(&self) -> BTreeSet<Key> {
        self.seen.lock().unwrap().iter().cloned().collect()
    }
}

#[async_trait]
impl Drain for RecordingDrain {
    async fn drain(&self, block: &Block) -> PumpResult<()> {
        self.seen.lock().unwrap().push(block.key.clone());
        match self.reject_suffix {
            Some(suffix) if block.key.as_str().ends_with(suffix) => {
                Err(PumpError::Write("rejected".into()))
            }
            _ => Ok(()),
        }
    }
}

fn keys(n: usize) -> Vec<Key> {
    (0..n).map(|i| Key::new(&format!("/blocks/K{:03}", i))).collect()
}

fn source_with(keys: &[Key]) -> MemoryBackend {
    MemoryBackend::with_data(
        keys.iter()
            .map(|k| (k.as_str().to_string(), k.as_str().as_bytes().to_vec())),
    )
}

#[tokio::test]
async fn test_every_key_is_counted_once() {
    for workers in [1, 2, 7, 32] {
        let keys = keys(40);
        let progress = CountingProgress::new();
        let drain = Arc::new(RecordingDrain::default());

        let report = Pump::new(
            Arc::new(ListEnumerator::new(&keys)),
            Arc::new(DatastoreCollector::new(Arc::new(source_with(&keys)))),
            Arc::<RecordingDrain>::clone(&drain),
            PumpConfig::new(workers),
        )
        .with_progress(Arc::new(progress.clone()))
        .run()
        .await
        .unwrap();

        assert_eq!(report.processed, 40, "workers = {}", workers);
        assert_eq!(report.succeeded, 40);
        assert_eq!(progress.count(), 40);
        assert_eq!(progress.total(), TotalCount::Known(40));
        assert_eq!(drain.seen.lock().unwrap().len(), 40);
    }
}

#[tokio::test]
async fn test_missing_block_is_recorded_not_drained() {
    let keys = keys(5);
    let source = source_with(&keys[..4]);
    let destination = MemoryBackend::new();
    let failed = Arc::new(MemoryFailedBlocks::new());
    let progress = CountingProgress::new();

    let report = Pump::new(
        Arc::new(ListEnumerator::new(&keys)),
        Arc::new(DatastoreCollector::new(Arc::new(source))),
        Arc::new(DatastoreDrain::new(Arc::new(destination.clone()))),
        PumpConfig::new(3),
    )
    .with_failed_blocks(Arc::<MemoryFailedBlocks>::clone(&failed))
    .with_progress(Arc::new(progress.clone()))
    .run()
    .await
    .unwrap();

    assert_eq!(report.succeeded, 4);
    assert_eq!(report.failed, 1);
    assert_eq!(progress.count(), 5);
    assert_eq!(failed.keys(), vec![keys[4].clone()]);
    assert_eq!(destination.len().await, 4);
    assert!(!destination.exists(keys[4].as_str()).await.unwrap());
}

#[tokio::test]
async fn test_drain_never_sees_failed_blocks() {
    let keys = keys(10);
    let drain = Arc::new(RecordingDrain::default());

    Pump::new(
        Arc::new(ListEnumerator::new(&keys)),
        Arc::new(DatastoreCollector::new(Arc::new(source_with(&keys[..6])))),
        Arc::<RecordingDrain>::clone(&drain),
        PumpConfig::new(4),
    )
    .run()
    .await
    .unwrap();

    let expected: BTreeSet<Key> = keys[..6].iter().cloned().collect();
    assert_eq!(drain.seen(), expected);
}

#[tokio::test]
async fn test_partition_independent_of_worker_count() {
    let keys = keys(60);
    // every seventh block is missing at the source
    let present: Vec<Key> = keys
        .iter()
        .enumerate()
        .filter(|(i, _)| i % 7 != 0)
        .map(|(_, k)| k.clone())
        .collect();

    let mut partitions = Vec::new();
    for workers in [1, 4, 50] {
        let failed = Arc::new(MemoryFailedBlocks::new());
        let drain = Arc::new(RecordingDrain::rejecting("5"));

        let report = Pump::new(
            Arc::new(ListEnumerator::new(&keys)),
            Arc::new(DatastoreCollector::new(Arc::new(source_with(&present)))),
            Arc::<RecordingDrain>::clone(&drain),
            PumpConfig::new(workers),
        )
        .with_failed_blocks(Arc::<MemoryFailedBlocks>::clone(&failed))
        .run()
        .await
        .unwrap();

        assert_eq!(report.processed, 60);
        let failed: BTreeSet<Key> = failed.keys().into_iter().collect();
        let succeeded: BTreeSet<Key> = drain
            .seen()
            .into_iter()
            .filter(|k| !k.as_str().ends_with('5'))
            .collect();
        assert_eq!(failed.len() + succeeded.len(), 60);
        partitions.push((succeeded, failed));
    }

    assert_eq!(partitions[0], partitions[1]);
    assert_eq!(partitions[1], partitions[2]);
}

#[tokio::test]
async fn test_second_run_is_a_no_op() {
    let keys = keys(8);
    let source = Arc::new(source_with(&keys));
    let destination = MemoryBackend::new();

    for _ in 0..2 {
        let report = Pump::new(
            Arc::new(ListEnumerator::new(&keys)),
            Arc::new(DatastoreCollector::new(Arc::<MemoryBackend>::clone(&source))),
            Arc::new(DatastoreDrain::new(Arc::new(destination.clone()))),
            PumpConfig::new(2),
        )
        .run()
        .await
        .unwrap();
        assert_eq!(report.succeeded, 8);
        assert_eq!(report.failed, 0);
    }
    assert_eq!(destination.len().await, 8);
}

#[tokio::test]
async fn test_tampered_block_fails_verification() {
    let good = b"intact payload".to_vec();
    let good_key = key_from_cid(&CidPrefix::v1(RAW, SHA2_256, 32).sum(&good).unwrap());
    let bad_key = key_from_cid(&CidPrefix::v1(RAW, SHA2_256, 32).sum(b"original").unwrap());

    let source = MemoryBackend::with_data([
        (good_key.as_str().to_string(), good.clone()),
        (bad_key.as_str().to_string(), b"corrupted".to_vec()),
    ]);
    let destination = MemoryBackend::new();
    let failed = Arc::new(MemoryFailedBlocks::new());

    let report = Pump::new(
        Arc::new(ListEnumerator::new(&[good_key.clone(), bad_key.clone()])),
        Arc::new(DatastoreCollector::new(Arc::new(source))),
        Arc::new(VerifyingDrain::new(Arc::new(destination.clone()), RAW)),
        PumpConfig::new(2),
    )
    .with_failed_blocks(Arc::<MemoryFailedBlocks>::clone(&failed))
    .run()
    .await
    .unwrap();

    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);
    let entries = failed.entries();
    assert_eq!(entries[0].0, bad_key);
    assert!(entries[0].1.contains("digest mismatch"));
    assert_eq!(destination.get(good_key.as_str()).await.unwrap(), good);
    assert!(!destination.exists(bad_key.as_str()).await.unwrap());
}

#[tokio::test]
async fn test_zero_workers_is_rejected_before_start() {
    let enumerator = Arc::new(ListEnumerator::new(&keys(3)));

    let result = Pump::new(
        Arc::<ListEnumerator>::clone(&enumerator),
        Arc::new(PassThroughCollector::new()),
        Arc::new(RecordingDrain::default()),
        PumpConfig::new(0),
    )
    .run()
    .await;

    assert!(matches!(assert_err!(result), PumpError::InvalidConfig(_)));
    assert!(!enumerator.started.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_enumerator_setup_failure_aborts() {
    let drain = Arc::new(RecordingDrain::default());

    let result = Pump::new(
        Arc::new(BrokenEnumerator),
        Arc::new(PassThroughCollector::new()),
        Arc::<RecordingDrain>::clone(&drain),
        PumpConfig::new(2),
    )
    .run()
    .await;

    let err = assert_err!(result);
    assert!(err.is_fatal());
    assert!(drain.seen().is_empty());
}

#[tokio::test]
async fn test_collector_setup_failure_shuts_down() {
    let drain = Arc::new(RecordingDrain::default());
    let pump = Pump::new(
        Arc::new(ListEnumerator::new(&keys(100))),
        Arc::new(FlakyCollector {
            inner: PassThroughCollector::new(),
            healthy: 2,
            calls: AtomicUsize::new(0),
        }),
        Arc::<RecordingDrain>::clone(&drain),
        PumpConfig::new(4),
    );

    let result = tokio::time::timeout(Duration::from_secs(10), pump.run())
        .await
        .unwrap();

    assert!(matches!(result, Err(PumpError::Unreachable { .. })));
    assert!(drain.seen().is_empty());
}

#[tokio::test]
async fn test_failed_blocks_file_feeds_next_run() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("failed-blocks.txt");
    let keys = keys(6);

    let sink = Arc::new(assert_ok!(FileFailedBlocks::create(&path).await));
    let report = Pump::new(
        Arc::new(ListEnumerator::new(&keys)),
        Arc::new(PassThroughCollector::new()),
        Arc::new(FailDrain),
        PumpConfig::new(3),
    )
    .with_failed_blocks(sink)
    .run()
    .await
    .unwrap();
    assert_eq!(report.failed, 6);

    let retry = assert_ok!(FileEnumerator::open(&path).await);
    assert_eq!(retry.total_count(), TotalCount::Known(6));

    let drain = Arc::new(RecordingDrain::default());
    Pump::new(
        Arc::new(retry),
        Arc::new(PassThroughCollector::new()),
        Arc::<RecordingDrain>::clone(&drain),
        PumpConfig::new(2),
    )
    .run()
    .await
    .unwrap();
    assert_eq!(drain.seen(), keys.into_iter().collect::<BTreeSet<_>>());
}

#[tokio::test]
async fn test_pin_index_keys_reach_drain_as_cids() {
    let cid = "QmUNLLsPACCz1vLxQVkXqqLX5R1X345qqfHbsf67hvA3Nn";
    let keys = vec![
        Key::new(&format!("/pins/index/cidRindex/{}/a1", cid)),
        Key::new("/pins/index"),
    ];
    let drain = Arc::new(RecordingDrain::default());
    let failed = Arc::new(MemoryFailedBlocks::new());

    let report = Pump::new(
        Arc::new(ListEnumerator::new(&keys)),
        Arc::new(PassThroughCollector::pin_index()),
        Arc::<RecordingDrain>::clone(&drain),
        PumpConfig::new(2),
    )
    .with_failed_blocks(Arc::<MemoryFailedBlocks>::clone(&failed))
    .run()
    .await
    .unwrap();

    assert_eq!(report.succeeded, 1);
    assert_eq!(drain.seen(), [Key::new(cid)].into_iter().collect::<BTreeSet<_>>());
    assert_eq!(failed.keys(), vec![Key::new("/pins/index")]);
}
