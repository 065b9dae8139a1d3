/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/

use super::{quiet_hours::compute_optimal_send_time, NotificationOptimizer};
use crate::{
    common::types::*,
    tools::prometheus::{BATCHES_DRAINED, STALE_BATCHES_DROPPED},
};
use chrono::Duration;
use dashmap::mapref::entry::Entry;
use tracing::*;

/// Batches still undrained this long after their scheduled time are dropped by cleanup.
pub const STALE_BATCH_THRESHOLD_MS: i64 = 60 * 60 * 1000;

impl NotificationOptimizer {
    /// Appends to the user's pending batch, escalating its priority if `priority`
    /// is higher. Starts a new batch, scheduled around the user's quiet hours,
    /// when none is pending.
    pub fn add_to_batch(
        &self,
        user_id: &UserId,
        notification: Notification,
        settings: &NotificationSettings,
        priority: BatchPriority,
    ) {
        let now = self.now();

        match self.batches.entry(user_id.to_owned()) {
            Entry::Occupied(mut entry) => {
                let batch = entry.get_mut();
                batch.notifications.push(notification);
                if priority > batch.priority {
                    debug!(
                        "[Batch Escalated] : {} => {} -> {}",
                        user_id, batch.priority, priority
                    );
                    batch.priority = priority;
                }
            }
            Entry::Vacant(entry) => {
                let scheduled_for = compute_optimal_send_time(
                    settings,
                    now,
                    self.config.quiet_hours_buffer_minutes,
                );
                debug!(
                    "[Batch Created] : {} => priority : {}, scheduled_for : {}",
                    user_id, priority, scheduled_for
                );
                entry.insert(BatchedNotification {
                    user_id: user_id.to_owned(),
                    notifications: vec![notification],
                    settings: settings.to_owned(),
                    priority,
                    scheduled_for,
                });
            }
        }
    }

    /// Removes and returns every batch that is due, full, or high priority,
    /// ordered by scheduled time. Sending them is the caller's job.
    pub fn drain_ready_batches(&self) -> Vec<BatchedNotification> {
        let now = self.now();
        let batch_size = self.config.batch_size;

        let ready_users: Vec<UserId> = self
            .batches
            .iter()
            .filter(|batch| batch.is_ready(now, batch_size))
            .map(|batch| batch.key().to_owned())
            .collect();

        let mut drained: Vec<BatchedNotification> = ready_users
            .iter()
            .filter_map(|user_id| {
                self.batches
                    .remove_if(user_id, |_, batch| batch.is_ready(now, batch_size))
            })
            .map(|(_, batch)| batch)
            .collect();

        drained.sort_by_key(|batch| batch.scheduled_for);
        BATCHES_DRAINED.inc_by(drained.len() as u64);

        drained
    }

    pub fn clear_batch(&self, user_id: &UserId) -> bool {
        self.batches.remove(user_id).is_some()
    }

    pub fn batch_for(&self, user_id: &UserId) -> Option<BatchedNotification> {
        self.batches.get(user_id).map(|batch| batch.value().clone())
    }

    pub(crate) fn sweep_stale_batches(&self) -> usize {
        let now = self.now();
        let threshold = Duration::milliseconds(STALE_BATCH_THRESHOLD_MS);
        let mut dropped = 0;

        self.batches.retain(|user_id, batch| {
            let is_stale = now - batch.scheduled_for > threshold;
            if is_stale {
                warn!(
                    "[Stale Batch Dropped] : {} => {} notifications scheduled for {}",
                    user_id,
                    batch.notifications.len(),
                    batch.scheduled_for
                );
                STALE_BATCHES_DROPPED.inc();
                dropped += 1;
            }
            !is_stale
        });

        dropped
    }
}
