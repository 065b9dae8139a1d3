/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
#![allow(clippy::expect_used)]

use actix_web_prom::{PrometheusMetrics, PrometheusMetricsBuilder};
use prometheus::{
    opts, register_histogram_vec, register_int_counter, register_int_gauge, HistogramVec,
    IntCounter, IntGauge,
};

pub static MEASURE_DURATION: once_cell::sync::Lazy<HistogramVec> =
    once_cell::sync::Lazy::new(|| {
        register_histogram_vec!(
            opts!("measure_duration_seconds", "Measure Duration").into(),
            &["function"]
        )
        .expect("Failed to register measure duration metrics")
    });

pub static CALL_EXTERNAL_API: once_cell::sync::Lazy<HistogramVec> =
    once_cell::sync::Lazy::new(|| {
        register_histogram_vec!(
            opts!("external_request_duration", "Call external API requests").into(),
            &["method", "host", "service", "status"]
        )
        .expect("Failed to register call external API metrics")
    });

pub static CACHE_HITS: once_cell::sync::Lazy<IntCounter> = once_cell::sync::Lazy::new(|| {
    register_int_counter!("notification_cache_hits", "Notification Cache Hits")
        .expect("Failed to register notification cache hits metrics")
});

pub static CACHE_MISSES: once_cell::sync::Lazy<IntCounter> = once_cell::sync::Lazy::new(|| {
    register_int_counter!("notification_cache_misses", "Notification Cache Misses")
        .expect("Failed to register notification cache misses metrics")
});

pub static DUPLICATES_SUPPRESSED: once_cell::sync::Lazy<IntCounter> =
    once_cell::sync::Lazy::new(|| {
        register_int_counter!("duplicate_notifications", "Suppressed Duplicate Notifications")
            .expect("Failed to register duplicate notifications metrics")
    });

pub static BATCHES_DRAINED: once_cell::sync::Lazy<IntCounter> =
    once_cell::sync::Lazy::new(|| {
        register_int_counter!("drained_batches", "Drained Notification Batches")
            .expect("Failed to register drained batches metrics")
    });

pub static STALE_BATCHES_DROPPED: once_cell::sync::Lazy<IntCounter> =
    once_cell::sync::Lazy::new(|| {
        register_int_counter!("stale_batches_dropped", "Stale Notification Batches Dropped")
            .expect("Failed to register stale batches metrics")
    });

pub static DELIVERED_BATCHES: once_cell::sync::Lazy<IntCounter> =
    once_cell::sync::Lazy::new(|| {
        register_int_counter!("delivered_batches", "Delivered Notification Batches")
            .expect("Failed to register delivered batches metrics")
    });

pub static FAILED_BATCHES: once_cell::sync::Lazy<IntCounter> = once_cell::sync::Lazy::new(|| {
    register_int_counter!("failed_batches", "Failed Notification Batches")
        .expect("Failed to register failed batches metrics")
});

pub static CACHED_USERS: once_cell::sync::Lazy<IntGauge> = once_cell::sync::Lazy::new(|| {
    register_int_gauge!("cached_users", "Users With Cached Notifications")
        .expect("Failed to register cached users metrics")
});

pub static PENDING_BATCHES: once_cell::sync::Lazy<IntGauge> = once_cell::sync::Lazy::new(|| {
    register_int_gauge!("pending_batches", "Pending Notification Batches")
        .expect("Failed to register pending batches metrics")
});

pub static TRACKED_DUPLICATE_KEYS: once_cell::sync::Lazy<IntGauge> =
    once_cell::sync::Lazy::new(|| {
        register_int_gauge!("tracked_duplicate_keys", "Tracked Duplicate Keys")
            .expect("Failed to register tracked duplicate keys metrics")
    });

#[macro_export]
macro_rules! measure_latency_duration {
    ($function:expr, $start:expr) => {
        let duration = $start.elapsed().as_secs_f64();
        $crate::tools::prometheus::MEASURE_DURATION
            .with_label_values(&[$function])
            .observe(duration);
    };
}

#[macro_export]
macro_rules! call_external_api {
    ($method:expr, $host:expr, $path:expr, $status:expr, $start:expr) => {
        let duration = $start.elapsed().as_secs_f64();
        $crate::tools::prometheus::CALL_EXTERNAL_API
            .with_label_values(&[$method, $host, $path, $status])
            .observe(duration);
    };
}

/// Initializes and returns a `PrometheusMetrics` instance configured for the application.
///
/// Registers the optimizer's cache, deduplication and batching metrics and exposes them,
/// along with the HTTP request metrics, on `/metrics`.
///
/// # Panics
///
/// * If there's a failure initializing metrics or registering them to the Prometheus registry.
pub fn prometheus_metrics() -> PrometheusMetrics {
    let prometheus = PrometheusMetricsBuilder::new("api")
        .endpoint("/metrics")
        .buckets(&[
            0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0,
        ])
        .build()
        .expect("Failed to create Prometheus Metrics");

    prometheus
        .registry
        .register(Box::new(MEASURE_DURATION.to_owned()))
        .expect("Failed to register measure duration");

    prometheus
        .registry
        .register(Box::new(CALL_EXTERNAL_API.to_owned()))
        .expect("Failed to register call external API metrics");

    prometheus
        .registry
        .register(Box::new(CACHE_HITS.to_owned()))
        .expect("Failed to register notification cache hits metrics");

    prometheus
        .registry
        .register(Box::new(CACHE_MISSES.to_owned()))
        .expect("Failed to register notification cache misses metrics");

    prometheus
        .registry
        .register(Box::new(DUPLICATES_SUPPRESSED.to_owned()))
        .expect("Failed to register duplicate notifications metrics");

    prometheus
        .registry
        .register(Box::new(BATCHES_DRAINED.to_owned()))
        .expect("Failed to register drained batches metrics");

    prometheus
        .registry
        .register(Box::new(STALE_BATCHES_DROPPED.to_owned()))
        .expect("Failed to register stale batches metrics");

    prometheus
        .registry
        .register(Box::new(DELIVERED_BATCHES.to_owned()))
        .expect("Failed to register delivered batches metrics");

    prometheus
        .registry
        .register(Box::new(FAILED_BATCHES.to_owned()))
        .expect("Failed to register failed batches metrics");

    prometheus
        .registry
        .register(Box::new(CACHED_USERS.to_owned()))
        .expect("Failed to register cached users metrics");

    prometheus
        .registry
        .register(Box::new(PENDING_BATCHES.to_owned()))
        .expect("Failed to register pending batches metrics");

    prometheus
        .registry
        .register(Box::new(TRACKED_DUPLICATE_KEYS.to_owned()))
        .expect("Failed to register tracked duplicate keys metrics");

    prometheus
}
