/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/

use crate::{
    common::clock::SystemClock,
    optimizer::NotificationOptimizer,
    outbound::external::{Dispatcher, HttpDispatcher},
    tools::logger::LoggerConfig,
};
use anyhow::Result;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};

pub const DEFAULT_CACHE_EXPIRY_MS: u64 = 5 * 60 * 1000;
pub const DEFAULT_MAX_CACHE_SIZE: usize = 100;
pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const DEFAULT_QUIET_HOURS_BUFFER_MINUTES: u32 = 5;
pub const DEFAULT_DUPLICATE_WINDOW_MS: u64 = 60 * 1000;
pub const DEFAULT_CLEANUP_INTERVAL_MS: u64 = 5 * 60 * 1000;
pub const MIN_DRAIN_INTERVAL_MS: u64 = 100;

#[derive(Debug, Deserialize, Serialize, Clone, Eq, PartialEq)]
pub struct OptimizerConfig {
    pub cache_expiry_ms: u64,
    pub max_cache_size: usize,
    pub batch_size: usize,
    pub quiet_hours_buffer_minutes: u32,
    pub duplicate_window_ms: u64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            cache_expiry_ms: DEFAULT_CACHE_EXPIRY_MS,
            max_cache_size: DEFAULT_MAX_CACHE_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            quiet_hours_buffer_minutes: DEFAULT_QUIET_HOURS_BUFFER_MINUTES,
            duplicate_window_ms: DEFAULT_DUPLICATE_WINDOW_MS,
        }
    }
}

/// Partial configuration. Unset fields fall through to whatever it is merged over.
#[derive(Debug, Deserialize, Serialize, Clone, Default, Eq, PartialEq)]
pub struct OptimizerConfigOverride {
    pub cache_expiry_ms: Option<u64>,
    pub max_cache_size: Option<usize>,
    pub batch_size: Option<usize>,
    pub quiet_hours_buffer_minutes: Option<u32>,
    pub duplicate_window_ms: Option<u64>,
}

impl OptimizerConfigOverride {
    pub fn merge_over(&self, base: &OptimizerConfig) -> OptimizerConfig {
        OptimizerConfig {
            cache_expiry_ms: self.cache_expiry_ms.unwrap_or(base.cache_expiry_ms),
            max_cache_size: self.max_cache_size.unwrap_or(base.max_cache_size),
            batch_size: self.batch_size.unwrap_or(base.batch_size),
            quiet_hours_buffer_minutes: self
                .quiet_hours_buffer_minutes
                .unwrap_or(base.quiet_hours_buffer_minutes),
            duplicate_window_ms: self.duplicate_window_ms.unwrap_or(base.duplicate_window_ms),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub http_server_port: u16,
    pub logger_cfg: LoggerConfig,
    pub optimizer_cfg: OptimizerConfigOverride,
    pub cleanup_interval_ms: u64,
    pub drain_interval_ms: u64,
    pub push_gateway_url: String,
    pub push_gateway_api_key: String,
}

#[derive(Clone)]
pub struct AppState {
    pub optimizer: Arc<NotificationOptimizer>,
    pub dispatcher: Arc<dyn Dispatcher>,
    pub http_server_port: u16,
    pub cleanup_interval: Duration,
    pub drain_interval: Duration,
}

impl AppState {
    pub fn new(app_config: AppConfig) -> Result<AppState> {
        let push_gateway_url = Url::parse(app_config.push_gateway_url.as_str())?;

        Ok(AppState {
            optimizer: Arc::new(NotificationOptimizer::with_clock(
                &app_config.optimizer_cfg,
                Arc::new(SystemClock),
            )),
            dispatcher: Arc::new(HttpDispatcher::new(
                push_gateway_url,
                app_config.push_gateway_api_key,
            )),
            http_server_port: app_config.http_server_port,
            cleanup_interval: Duration::from_millis(app_config.cleanup_interval_ms),
            drain_interval: Duration::from_millis(
                app_config.drain_interval_ms.max(MIN_DRAIN_INTERVAL_MS),
            ),
        })
    }
}
