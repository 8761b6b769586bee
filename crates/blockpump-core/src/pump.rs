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

//! The migration pipeline.
//!
//! One enumerator feeds a shared bounded queue. Each of the `workers` units runs a
//! collector loop on that queue and a drain worker behind it, connected by a queue of
//! capacity 1:
//!
//! ```text
//!                       ┌─ collector ─[1]─ worker ─┐
//! enumerator ─[workers]─┼─ collector ─[1]─ worker ─┼─▶ drain
//!                       └─ collector ─[1]─ worker ─┘
//! ```
//!
//! Idle units pull the next key from the shared queue, so there is no static partitioning.
//! Failures of single blocks go to the failed-blocks sink; only setup errors end a run.

use crate::block::{FailedBlock, Resolved};
use crate::collect::Collector;
use crate::drain::Drain;
use crate::enumerate::Enumerator;
use crate::error::{PumpError, PumpResult};
use crate::failed::{FailedBlocksWriter, NullFailedBlocks};
use crate::key::Key;
use crate::progress::{CountingProgress, ProgressWriter};
use async_channel::Receiver;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

/// Default number of worker units
pub const DEFAULT_WORKERS: usize = 1;

/// Run-wide settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PumpConfig {
    /// Number of collector/drain units
    pub workers: usize,
    /// Bound on each remote pin call
    pub pin_timeout: Duration,
}

impl Default for PumpConfig {
    fn default() -> Self {
        PumpConfig {
            workers: DEFAULT_WORKERS,
            pin_timeout: crate::drain::DEFAULT_PIN_TIMEOUT,
        }
    }
}

impl PumpConfig {
    pub fn new(workers: usize) -> Self {
        PumpConfig {
            workers,
            ..Default::default()
        }
    }

    pub fn with_pin_timeout(mut self, timeout: Duration) -> Self {
        self.pin_timeout = timeout;
        self
    }

    pub fn validate(&self) -> PumpResult<()> {
        if self.workers == 0 {
            return Err(PumpError::InvalidConfig(
                "worker count must be at least 1".into(),
            ));
        }
        if self.pin_timeout.is_zero() {
            return Err(PumpError::InvalidConfig(
                "pin timeout must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Outcome of a finished run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PumpReport {
    pub processed: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub elapsed: Duration,
}

impl fmt::Display for PumpReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} blocks processed in {:.2?}: {} succeeded, {} failed",
            self.processed, self.elapsed, self.succeeded, self.failed
        )
    }
}

#[derive(Debug, Default)]
struct Tally {
    succeeded: AtomicU64,
    failed: AtomicU64,
}

/// Enumerator, collector and drain wired into one run
///
/// ```rust,no_run
/// # use blockpump_core::{Pump, PumpConfig, FileEnumerator, DatastoreCollector, DatastoreDrain};
/// # use blockpump_storage::MemoryBackend;
/// # use std::sync::Arc;
/// # async fn example() -> blockpump_core::PumpResult<()> {
/// let enumerator = FileEnumerator::open("keys.txt").await?;
/// let source = Arc::new(MemoryBackend::new());
/// let destination = Arc::new(MemoryBackend::new());
///
/// let report = Pump::new(
///     Arc::new(enumerator),
///     Arc::new(DatastoreCollector::new(source)),
///     Arc::new(DatastoreDrain::new(destination)),
///     PumpConfig::new(4),
/// )
/// .run()
/// .await?;
/// println!("{}", report);
/// # Ok(())
/// # }
/// ```
pub struct Pump {
    enumerator: Arc<dyn Enumerator>,
    collector: Arc<dyn Collector>,
    drain: Arc<dyn Drain>,
    failed_blocks: Arc<dyn FailedBlocksWriter>,
    progress: Arc<dyn ProgressWriter>,
    config: PumpConfig,
}

impl Pump {
    /// Pipeline discarding failed keys and counting progress silently
    pub fn new(
        enumerator: Arc<dyn Enumerator>,
        collector: Arc<dyn Collector>,
        drain: Arc<dyn Drain>,
        config: PumpConfig,
    ) -> Self {
        Pump {
            enumerator,
            collector,
            drain,
            failed_blocks: Arc::new(NullFailedBlocks),
            progress: Arc::new(CountingProgress::new()),
            config,
        }
    }

    pub fn with_failed_blocks(mut self, sink: Arc<dyn FailedBlocksWriter>) -> Self {
        self.failed_blocks = sink;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressWriter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &PumpConfig {
        &self.config
    }

    /// Move every enumerated block through the pipeline
    ///
    /// Returns an error only when the pipeline cannot be set up. Blocks that fail on the way
    /// are recorded in the failed-blocks sink and counted in the report.
    pub async fn run(&self) -> PumpResult<PumpReport> {
        self.config.validate()?;
        let workers = self.config.workers;
        let started = Instant::now();

        let total = self.enumerator.total_count();
        self.progress.set_total(total);

        let (info_tx, info_rx) = async_channel::bounded(workers);
        let enumerator = self.enumerator.keys(info_tx).await?;
        info!(workers, total = %total, "Starting pump");

        let mut collectors = Vec::with_capacity(workers);
        let mut queues = Vec::with_capacity(workers);
        for unit in 0..workers {
            let (block_tx, block_rx) = async_channel::bounded(1);
            match self.collector.blocks(info_rx.clone(), block_tx).await {
                Ok(handle) => {
                    collectors.push(handle);
                    queues.push(block_rx);
                }
                Err(e) => {
                    error!(unit, "Collector setup failed: {}", e);
                    drop(queues);
                    drop(info_rx);
                    for handle in collectors {
                        join("collector", handle).await;
                    }
                    join("enumerator", enumerator).await;
                    return Err(e);
                }
            }
        }
        drop(info_rx);

        let tally = Arc::new(Tally::default());
        let handles: Vec<_> = queues
            .into_iter()
            .enumerate()
            .map(|(unit, queue)| self.spawn_worker(unit, queue, Arc::clone(&tally)))
            .collect();

        for handle in handles {
            join("worker", handle).await;
        }
        for handle in collectors {
            join("collector", handle).await;
        }
        join("enumerator", enumerator).await;

        if let Err(e) = self.failed_blocks.flush().await {
            error!("Failed to flush failed-blocks sink: {}", e);
        }
        self.progress.finish();

        let succeeded = tally.succeeded.load(Ordering::Relaxed);
        let failed = tally.failed.load(Ordering::Relaxed);
        let report = PumpReport {
            processed: succeeded + failed,
            succeeded,
            failed,
            elapsed: started.elapsed(),
        };
        info!(
            processed = report.processed,
            succeeded = report.succeeded,
            failed = report.failed,
            "Pump finished in {:.2?}",
            report.elapsed
        );
        Ok(report)
    }

    fn spawn_worker(
        &self,
        unit: usize,
        queue: Receiver<Resolved>,
        tally: Arc<Tally>,
    ) -> JoinHandle<()> {
        let drain = Arc::clone(&self.drain);
        let sink = Arc::clone(&self.failed_blocks);
        let progress = Arc::clone(&self.progress);

        tokio::spawn(async move {
            while let Ok(item) = queue.recv().await {
                match item {
                    Ok(block) => {
                        match drain.drain(&block).await {
                            Ok(()) => {
                                trace!(key = %block.key, "Drained");
                                tally.succeeded.fetch_add(1, Ordering::Relaxed);
                            }
                            Err(e) => {
                                record_failure(sink.as_ref(), &block.key, &e).await;
                                tally.failed.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                    }
                    Err(FailedBlock { key, error }) => {
                        record_failure(sink.as_ref(), &key, &error).await;
                        tally.failed.fetch_add(1, Ordering::Relaxed);
                    }
                }
                progress.increment();
            }
            debug!(unit, "Worker finished");
        })
    }
}

async fn record_failure(sink: &dyn FailedBlocksWriter, key: &Key, cause: &PumpError) {
    warn!(key = %key, "Block failed: {}", cause);
    if let Err(e) = sink.append(key, cause).await {
        error!(key = %key, "Cannot record failed block: {}", e);
    }
}

async fn join(task: &str, handle: JoinHandle<()>) {
    if let Err(e) = handle.await {
        error!(task, "Task ended abnormally: {}", e);
    }
}
