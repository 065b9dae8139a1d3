/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/

use crate::{
    common::types::*,
    measure_latency_duration,
    optimizer::NotificationOptimizer,
    outbound::external::Dispatcher,
    tools::prometheus::{DELIVERED_BATCHES, DUPLICATES_SUPPRESSED, FAILED_BATCHES},
};
use futures::future::join_all;
use serde::Serialize;
use tracing::*;

#[derive(Serialize, Clone, Copy, Debug, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum EnqueueOutcome {
    Batched,
    Duplicate,
    Muted,
}

#[derive(Serialize, Clone, Copy, Debug, Default, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
}

pub fn enqueue_notification(
    optimizer: &NotificationOptimizer,
    notification: Notification,
    settings: &NotificationSettings,
    priority: BatchPriority,
) -> EnqueueOutcome {
    let user_id = notification.user_id.to_owned();

    if !settings.allows(&notification.notification_type) {
        debug!(
            "[Muted] : {} => {} notifications are disabled",
            user_id, notification.notification_type
        );
        return EnqueueOutcome::Muted;
    }

    if optimizer.is_duplicate(
        &user_id,
        &notification.notification_type,
        &notification.content_hash(),
    ) {
        DUPLICATES_SUPPRESSED.inc();
        info!(
            "[Duplicate Suppressed] : {} => {:?}",
            user_id, notification.id
        );
        return EnqueueOutcome::Duplicate;
    }

    optimizer.add_to_batch(&user_id, notification, settings, priority);
    EnqueueOutcome::Batched
}

/// Drains the ready batches and hands each to `dispatcher`. Every notification
/// of a delivered batch is marked sent; a failed batch is logged and dropped.
pub async fn dispatch_ready_batches(
    optimizer: &NotificationOptimizer,
    dispatcher: &dyn Dispatcher,
) -> DispatchReport {
    let start_time = std::time::Instant::now();
    let batches = optimizer.drain_ready_batches();

    if batches.is_empty() {
        return DispatchReport::default();
    }

    let results = join_all(batches.iter().map(|batch| dispatcher.dispatch(batch))).await;

    let mut report = DispatchReport::default();
    for (batch, result) in batches.iter().zip(results) {
        match result {
            Ok(()) => {
                for notification in &batch.notifications {
                    optimizer.mark_sent(
                        &batch.user_id,
                        &notification.notification_type,
                        &notification.content_hash(),
                    );
                }
                DELIVERED_BATCHES.inc();
                report.delivered += 1;
            }
            Err(err) => {
                FAILED_BATCHES.inc();
                error!(
                    "[Dispatch Failed] : {} => {} notifications, Error : {}",
                    batch.user_id,
                    batch.notifications.len(),
                    err
                );
                report.failed += 1;
            }
        }
    }

    measure_latency_duration!("dispatch_ready_batches", start_time);
    report
}
