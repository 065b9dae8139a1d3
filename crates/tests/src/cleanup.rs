/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/

use crate::common::*;
use chrono::Duration;
use notification_optimizer::{
    common::{types::*, utils::content_hash},
    optimizer::cleanup::start_periodic_cleanup,
};
use std::sync::Arc;

#[test]
fn quiet_hours_batch_waits_until_window_ends() {
    let (clock, optimizer) = optimizer_at(at(2024, 1, 15, 23, 10), Default::default());
    let alice = user("alice");

    optimizer.add_to_batch(
        &alice,
        notification("alice", NotificationType::Reminder, "Stand-up", "Tomorrow at 9"),
        &quiet_settings("22:00", "08:00"),
        BatchPriority::Normal,
    );
    assert_eq!(
        optimizer.batch_for(&alice).map(|b| b.scheduled_for),
        Some(at(2024, 1, 16, 8, 5))
    );

    clock.set(at(2024, 1, 16, 8, 4));
    assert!(optimizer.drain_ready_batches().is_empty());

    clock.set(at(2024, 1, 16, 8, 6));
    let drained = optimizer.drain_ready_batches();
    assert_eq!(drained.len(), 1);
    assert_eq!(drained[0].user_id, alice);
    assert!(optimizer.batch_for(&alice).is_none());
}

#[test]
fn stats_report_counts_and_averages() {
    let now = at(2024, 1, 15, 12, 0);
    let (clock, optimizer) = optimizer_at(now, Default::default());
    let settings = NotificationSettings::default();

    optimizer.set_cached(&user("alice"), numbered("alice", 3));
    clock.advance(Duration::seconds(10));
    optimizer.set_cached(&user("bob"), numbered("bob", 1));

    for notification in numbered("alice", 2) {
        optimizer.add_to_batch(
            &user("alice"),
            notification,
            &settings,
            BatchPriority::Normal,
        );
    }
    optimizer.add_to_batch(&user("bob"), one("bob"), &settings, BatchPriority::Normal);

    optimizer.mark_sent(&user("alice"), &NotificationType::Task, "a1");
    optimizer.mark_sent(&user("alice"), &NotificationType::Group, "a1");

    clock.advance(Duration::seconds(10));
    let stats = optimizer.get_stats();

    assert_eq!(stats.cache.entries, 2);
    assert_eq!(stats.cache.total_notifications, 4);
    assert_eq!(stats.cache.average_age_ms, 15_000);
    assert_eq!(stats.batches.batches, 2);
    assert_eq!(stats.batches.total_notifications, 3);
    assert!((stats.batches.average_batch_size - 1.5).abs() < f64::EPSILON);
    assert_eq!(stats.duplicates.tracked_keys, 2);
}

#[test]
fn empty_stats_are_zero() {
    let (_clock, optimizer) = optimizer_at(at(2024, 1, 15, 12, 0), Default::default());
    assert_eq!(optimizer.get_stats(), OptimizerStats::default());
}

#[test]
fn cleanup_sweeps_every_store() {
    let now = at(2024, 1, 15, 12, 0);
    let (clock, optimizer) = optimizer_at(now, Default::default());
    let settings = NotificationSettings::default();
    let hash = content_hash(&NotificationType::Task, "Assigned", "Buy milk");

    optimizer.mark_sent(&user("alice"), &NotificationType::Task, &hash);
    optimizer.set_cached(&user("alice"), numbered("alice", 2));
    optimizer.add_to_batch(
        &user("alice"),
        one("alice"),
        &settings,
        BatchPriority::Normal,
    );

    clock.advance(Duration::minutes(10));
    optimizer.mark_sent(&user("bob"), &NotificationType::Task, &hash);
    optimizer.set_cached(&user("bob"), numbered("bob", 1));

    clock.advance(Duration::minutes(55));
    // alice: duplicate mark 65 min old, cache entry past 5 min expiry, batch 64 min overdue.
    // bob: duplicate mark 55 min old, cache entry past expiry too.
    let report = optimizer.cleanup();

    assert_eq!(
        report,
        CleanupReport {
            expired_duplicates: 2,
            expired_cache_entries: 2,
            stale_batches: 1,
        }
    );
    assert_eq!(optimizer.get_stats(), OptimizerStats::default());
}

#[test]
fn cleanup_keeps_live_state() {
    let (clock, optimizer) = optimizer_at(at(2024, 1, 15, 12, 0), Default::default());

    optimizer.mark_sent(&user("alice"), &NotificationType::Task, "h");
    optimizer.set_cached(&user("alice"), numbered("alice", 1));
    optimizer.add_to_batch(
        &user("alice"),
        one("alice"),
        &NotificationSettings::default(),
        BatchPriority::Normal,
    );
    clock.advance(Duration::seconds(30));

    assert_eq!(optimizer.cleanup(), CleanupReport::default());

    let stats = optimizer.get_stats();
    assert_eq!(stats.cache.entries, 1);
    assert_eq!(stats.batches.batches, 1);
    assert_eq!(stats.duplicates.tracked_keys, 1);
}

#[tokio::test]
async fn periodic_cleanup_runs_until_cancelled() {
    let (clock, optimizer) = optimizer_at(at(2024, 1, 15, 12, 0), Default::default());
    let optimizer = Arc::new(optimizer);

    optimizer.mark_sent(&user("alice"), &NotificationType::Task, "h");
    clock.advance(Duration::minutes(2));

    let handle = start_periodic_cleanup(optimizer.clone(), std::time::Duration::from_millis(10));
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    assert_eq!(optimizer.get_stats().duplicates.tracked_keys, 0);
    assert!(!handle.is_finished());

    handle.cancel().await;
}

#[tokio::test]
async fn periodic_cleanup_waits_one_interval() {
    let (clock, optimizer) = optimizer_at(at(2024, 1, 15, 12, 0), Default::default());
    let optimizer = Arc::new(optimizer);

    optimizer.mark_sent(&user("alice"), &NotificationType::Task, "h");
    clock.advance(Duration::minutes(2));

    let handle = start_periodic_cleanup(optimizer.clone(), std::time::Duration::from_secs(60));
    tokio::task::yield_now().await;

    assert_eq!(optimizer.get_stats().duplicates.tracked_keys, 1);
    handle.cancel().await;
}
