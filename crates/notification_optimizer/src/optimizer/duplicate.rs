/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/

use super::NotificationOptimizer;
use crate::{
    common::{
        types::*,
        utils::{duplicate_key, duration_from_millis},
    },
    environment::OptimizerConfigOverride,
};
use dashmap::mapref::entry::Entry;

impl NotificationOptimizer {
    pub fn is_duplicate(
        &self,
        user_id: &UserId,
        notification_type: &NotificationType,
        content_hash: &str,
    ) -> bool {
        self.is_duplicate_with(
            user_id,
            notification_type,
            content_hash,
            &OptimizerConfigOverride::default(),
        )
    }

    /// True iff the same key was marked sent less than `duplicate_window_ms` ago.
    /// Records nothing.
    pub fn is_duplicate_with(
        &self,
        user_id: &UserId,
        notification_type: &NotificationType,
        content_hash: &str,
        overrides: &OptimizerConfigOverride,
    ) -> bool {
        let window = duration_from_millis(self.effective_config(overrides).duplicate_window_ms);
        let now = self.now();

        self.sent
            .get(&duplicate_key(user_id, notification_type, content_hash))
            .map(|last_sent_at| now - *last_sent_at < window)
            .unwrap_or(false)
    }

    pub fn mark_sent(
        &self,
        user_id: &UserId,
        notification_type: &NotificationType,
        content_hash: &str,
    ) {
        self.sent.insert(
            duplicate_key(user_id, notification_type, content_hash),
            self.now(),
        );
    }

    /// `is_duplicate` and `mark_sent` as a single step under the key's shard lock.
    /// Returns `true` (and records nothing) when the notification is a duplicate.
    pub fn check_and_mark_sent(
        &self,
        user_id: &UserId,
        notification_type: &NotificationType,
        content_hash: &str,
    ) -> bool {
        let window = duration_from_millis(self.config.duplicate_window_ms);
        let now = self.now();

        match self
            .sent
            .entry(duplicate_key(user_id, notification_type, content_hash))
        {
            Entry::Occupied(mut entry) => {
                if now - *entry.get() < window {
                    true
                } else {
                    entry.insert(now);
                    false
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                false
            }
        }
    }

    pub fn cleanup_expired_duplicates(&self) -> usize {
        self.cleanup_expired_duplicates_with(&OptimizerConfigOverride::default())
    }

    pub fn cleanup_expired_duplicates_with(&self, overrides: &OptimizerConfigOverride) -> usize {
        let window = duration_from_millis(self.effective_config(overrides).duplicate_window_ms);
        let now = self.now();
        let before = self.sent.len();
        self.sent
            .retain(|_, last_sent_at| now - *last_sent_at <= window);
        before.saturating_sub(self.sent.len())
    }
}
