/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/

use super::NotificationOptimizer;
use crate::{
    common::types::*,
    measure_latency_duration,
    tools::prometheus::{CACHED_USERS, PENDING_BATCHES, TRACKED_DUPLICATE_KEYS},
};
use std::{sync::Arc, time::Duration};
use tokio::{sync::oneshot, task::JoinHandle};
use tracing::*;

impl NotificationOptimizer {
    /// Duplicate-tracker sweep, then cache sweep, then stale-batch sweep.
    pub fn cleanup(&self) -> CleanupReport {
        let start_time = std::time::Instant::now();

        let report = CleanupReport {
            expired_duplicates: self.cleanup_expired_duplicates(),
            expired_cache_entries: self.sweep_expired_cache(),
            stale_batches: self.sweep_stale_batches(),
        };

        let stats = self.get_stats();
        CACHED_USERS.set(stats.cache.entries as i64);
        PENDING_BATCHES.set(stats.batches.batches as i64);
        TRACKED_DUPLICATE_KEYS.set(stats.duplicates.tracked_keys as i64);

        measure_latency_duration!("notification_optimizer_cleanup", start_time);
        debug!("[Cleanup] : {:?}", report);

        report
    }

    pub fn get_stats(&self) -> OptimizerStats {
        let now = self.now();

        let (cached_notifications, total_cache_age_ms) =
            self.cache
                .iter()
                .fold((0usize, 0i64), |(notifications, age_ms), entry| {
                    (
                        notifications + entry.notifications.len(),
                        age_ms + (now - entry.last_updated).num_milliseconds(),
                    )
                });
        let cache_entries = self.cache.len();

        let batched_notifications: usize = self
            .batches
            .iter()
            .map(|batch| batch.notifications.len())
            .sum();
        let batches = self.batches.len();

        OptimizerStats {
            cache: CacheStats {
                entries: cache_entries,
                total_notifications: cached_notifications,
                average_age_ms: if cache_entries == 0 {
                    0
                } else {
                    total_cache_age_ms / cache_entries as i64
                },
            },
            batches: BatchStats {
                batches,
                total_notifications: batched_notifications,
                average_batch_size: if batches == 0 {
                    0.0
                } else {
                    batched_notifications as f64 / batches as f64
                },
            },
            duplicates: DuplicateStats {
                tracked_keys: self.sent.len(),
            },
        }
    }
}

/// Owned by whoever started the periodic cleanup. The task stops on `cancel`
/// or when the handle is dropped.
pub struct CleanupHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl CleanupHandle {
    pub async fn cancel(mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        if let Err(err) = self.task.await {
            error!("[Periodic Cleanup] Task ended abnormally : {:?}", err);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Runs `cleanup` every `interval` on the current tokio runtime. The first
/// sweep happens one full interval after the call.
pub fn start_periodic_cleanup(
    optimizer: Arc<NotificationOptimizer>,
    interval: Duration,
) -> CleanupHandle {
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
    let interval = interval.max(Duration::from_millis(1));

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        info!("[Periodic Cleanup] Started with interval : {:?}", interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    optimizer.cleanup();
                }
                _ = &mut shutdown_rx => {
                    info!("[Periodic Cleanup] Stopped");
                    break;
                }
            }
        }
    });

    CleanupHandle {
        shutdown_tx: Some(shutdown_tx),
        task,
    }
}
