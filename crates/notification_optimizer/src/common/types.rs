/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/

use chrono::{DateTime, FixedOffset, Offset, Utc};
use dashmap::DashMap;
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use std::{fmt, hash::BuildHasherDefault};
use strum_macros::{Display, EnumString};

use crate::common::utils::content_hash;

pub type FxBuildHasher = BuildHasherDefault<FxHasher>;

pub type FxDashMap<K, V> = DashMap<K, V, FxBuildHasher>;

#[derive(Deserialize, Serialize, Clone, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Eq, Hash, PartialEq)]
pub struct NotificationId(pub String);

#[derive(Debug, Clone, Copy, EnumString, Display, Serialize, Deserialize, Eq, Hash, PartialEq)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Task,
    Group,
    System,
    Reminder,
}

#[derive(Debug, Clone, Copy, EnumString, Display, Serialize, Deserialize, Eq, Hash, PartialEq)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Unread,
    Read,
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    EnumString,
    Display,
    Serialize,
    Deserialize,
    Eq,
    Hash,
    PartialEq,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    Low,
    #[default]
    Medium,
    High,
}

/// A notification as produced by the document store. The optimizer only ever
/// holds copies of it.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub status: NotificationStatus,
    #[serde(default)]
    pub priority: NotificationPriority,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl Notification {
    pub fn content_hash(&self) -> String {
        content_hash(&self.notification_type, &self.title, &self.message)
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuietHours {
    pub enabled: bool,
    pub start_time: String,
    pub end_time: String,
    /// Offset of the user's wall clock from UTC. Both window bounds are read in it.
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl QuietHours {
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60))
            .unwrap_or_else(|| Utc.fix())
    }
}

impl Default for QuietHours {
    fn default() -> Self {
        Self {
            enabled: false,
            start_time: "22:00".to_string(),
            end_time: "08:00".to_string(),
            utc_offset_minutes: 0,
        }
    }
}

fn enabled_by_default() -> bool {
    true
}

#[derive(Deserialize, Serialize, Clone, Debug, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    #[serde(default)]
    pub quiet_hours: QuietHours,
    #[serde(default = "enabled_by_default")]
    pub task_notifications: bool,
    #[serde(default = "enabled_by_default")]
    pub group_notifications: bool,
    #[serde(default = "enabled_by_default")]
    pub system_notifications: bool,
    #[serde(default = "enabled_by_default")]
    pub reminder_notifications: bool,
    #[serde(default = "enabled_by_default")]
    pub push_enabled: bool,
}

impl NotificationSettings {
    pub fn allows(&self, notification_type: &NotificationType) -> bool {
        self.push_enabled
            && match notification_type {
                NotificationType::Task => self.task_notifications,
                NotificationType::Group => self.group_notifications,
                NotificationType::System => self.system_notifications,
                NotificationType::Reminder => self.reminder_notifications,
            }
    }
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            quiet_hours: QuietHours::default(),
            task_notifications: true,
            group_notifications: true,
            system_notifications: true,
            reminder_notifications: true,
            push_enabled: true,
        }
    }
}

/// Declaration order is the escalation order: `Low < Normal < High`.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    EnumString,
    Display,
    Serialize,
    Deserialize,
    Eq,
    Hash,
    PartialEq,
    PartialOrd,
    Ord,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BatchPriority {
    Low,
    #[default]
    Normal,
    High,
}

impl From<NotificationPriority> for BatchPriority {
    fn from(priority: NotificationPriority) -> Self {
        match priority {
            NotificationPriority::Low => BatchPriority::Low,
            NotificationPriority::Medium => BatchPriority::Normal,
            NotificationPriority::High => BatchPriority::High,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TimeOfDay {
    pub hours: u32,
    pub minutes: u32,
}

impl TimeOfDay {
    pub fn minutes_since_midnight(&self) -> u32 {
        self.hours.saturating_mul(60).saturating_add(self.minutes)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CacheEntry {
    pub notifications: Vec<Notification>,
    pub last_updated: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatchedNotification {
    pub user_id: UserId,
    pub notifications: Vec<Notification>,
    pub settings: NotificationSettings,
    pub priority: BatchPriority,
    pub scheduled_for: DateTime<Utc>,
}

impl BatchedNotification {
    pub fn is_ready(&self, now: DateTime<Utc>, batch_size: usize) -> bool {
        self.scheduled_for <= now
            || self.notifications.len() >= batch_size
            || self.priority == BatchPriority::High
    }
}

#[derive(Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub entries: usize,
    pub total_notifications: usize,
    pub average_age_ms: i64,
}

#[derive(Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatchStats {
    pub batches: usize,
    pub total_notifications: usize,
    pub average_batch_size: f64,
}

#[derive(Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateStats {
    pub tracked_keys: usize,
}

#[derive(Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OptimizerStats {
    pub cache: CacheStats,
    pub batches: BatchStats,
    pub duplicates: DuplicateStats,
}

#[derive(Serialize, Clone, Copy, Debug, Default, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    pub expired_duplicates: usize,
    pub expired_cache_entries: usize,
    pub stale_batches: usize,
}
