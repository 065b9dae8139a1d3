/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/

use super::NotificationOptimizer;
use crate::{
    common::{types::*, utils::saturating_add_millis},
    environment::OptimizerConfigOverride,
    tools::prometheus::{CACHE_HITS, CACHE_MISSES},
};
use tracing::*;

impl NotificationOptimizer {
    /// Returns `None` when nothing is cached for the user or the entry has
    /// expired. An expired entry is evicted on the way out.
    pub fn get_cached(&self, user_id: &UserId) -> Option<Vec<Notification>> {
        let now = self.now();

        let lookup = self.cache.get(user_id).map(|entry| {
            if entry.is_expired(now) {
                None
            } else {
                Some(entry.notifications.to_owned())
            }
        });

        match lookup {
            Some(Some(notifications)) => {
                CACHE_HITS.inc();
                Some(notifications)
            }
            Some(None) => {
                self.cache
                    .remove_if(user_id, |_, entry| entry.is_expired(now));
                debug!("[Cache Expired] : {}", user_id);
                CACHE_MISSES.inc();
                None
            }
            None => {
                CACHE_MISSES.inc();
                None
            }
        }
    }

    pub fn set_cached(&self, user_id: &UserId, notifications: Vec<Notification>) {
        self.set_cached_with(user_id, notifications, &OptimizerConfigOverride::default())
    }

    /// Keeps the first `max_cache_size` notifications in the order given and
    /// replaces whatever was cached for the user.
    pub fn set_cached_with(
        &self,
        user_id: &UserId,
        mut notifications: Vec<Notification>,
        overrides: &OptimizerConfigOverride,
    ) {
        let config = self.effective_config(overrides);
        let now = self.now();

        notifications.truncate(config.max_cache_size);

        self.cache.insert(
            user_id.to_owned(),
            CacheEntry {
                notifications,
                last_updated: now,
                expires_at: saturating_add_millis(now, config.cache_expiry_ms),
            },
        );
    }

    pub fn invalidate(&self, user_id: &UserId) {
        if self.cache.remove(user_id).is_some() {
            debug!("[Cache Invalidated] : {}", user_id);
        }
    }

    pub fn clear_all(&self) {
        info!("[Cache Cleared] : {} users", self.cache.len());
        self.cache.clear();
    }

    pub(crate) fn sweep_expired_cache(&self) -> usize {
        let now = self.now();
        let before = self.cache.len();
        self.cache.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.cache.len())
    }
}
