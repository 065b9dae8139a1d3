/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/

//! In-process optimization layer between notification producers and the
//! delivery channel: a per-user notification cache, a duplicate tracker, a
//! per-user batch queue and the quiet-hours scheduler that feeds it.
//!
//! All three stores live on one [`NotificationOptimizer`], which the embedding
//! application builds once and shares (usually behind an `Arc`). Nothing here
//! performs I/O or returns an error; every policy degrades to a no-op instead.

pub mod batch;
pub mod cache;
pub mod cleanup;
pub mod duplicate;
pub mod quiet_hours;

use crate::{
    common::{
        clock::{Clock, SystemClock},
        types::*,
    },
    environment::{OptimizerConfig, OptimizerConfigOverride},
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub struct NotificationOptimizer {
    config: OptimizerConfig,
    clock: Arc<dyn Clock>,
    cache: FxDashMap<UserId, CacheEntry>,
    batches: FxDashMap<UserId, BatchedNotification>,
    sent: FxDashMap<String, DateTime<Utc>>,
}

impl NotificationOptimizer {
    pub fn new(overrides: &OptimizerConfigOverride) -> Self {
        Self::with_clock(overrides, Arc::new(SystemClock))
    }

    pub fn with_clock(overrides: &OptimizerConfigOverride, clock: Arc<dyn Clock>) -> Self {
        Self {
            config: overrides.merge_over(&OptimizerConfig::default()),
            clock,
            cache: FxDashMap::default(),
            batches: FxDashMap::default(),
            sent: FxDashMap::default(),
        }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn effective_config(&self, overrides: &OptimizerConfigOverride) -> OptimizerConfig {
        overrides.merge_over(&self.config)
    }
}

impl Default for NotificationOptimizer {
    fn default() -> Self {
        Self::new(&OptimizerConfigOverride::default())
    }
}
