/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/

use crate::{
    action::dispatch::{dispatch_ready_batches, enqueue_notification, EnqueueOutcome},
    common::types::*,
    environment::{AppConfig, AppState},
    optimizer::{cleanup::start_periodic_cleanup, NotificationOptimizer},
    outbound::external::Dispatcher,
    tools::{error::AppError, logger::setup_tracing, prometheus::prometheus_metrics},
};
use actix_web::{web, App, HttpResponse, HttpServer};
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::{env::var, net::Ipv4Addr, sync::Arc, time::Duration};
use tokio::{
    signal::unix::{signal, SignalKind},
    sync::oneshot,
    time::sleep,
};
use tracing::*;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueRequest {
    pub notification: Notification,
    #[serde(default)]
    pub settings: NotificationSettings,
    pub priority: Option<BatchPriority>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueResponse {
    pub outcome: EnqueueOutcome,
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().body("Notification Optimizer Is Up!")
}

async fn stats(app_state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(app_state.optimizer.get_stats())
}

async fn enqueue(
    app_state: web::Data<AppState>,
    request: web::Json<EnqueueRequest>,
) -> Result<HttpResponse, AppError> {
    let EnqueueRequest {
        notification,
        settings,
        priority,
    } = request.into_inner();

    if notification.user_id.0.trim().is_empty() {
        return Err(AppError::InvalidRequest("userId is empty".to_string()));
    }
    if notification.id.0.trim().is_empty() {
        return Err(AppError::InvalidRequest("id is empty".to_string()));
    }

    let priority = priority.unwrap_or_else(|| notification.priority.into());
    let outcome = enqueue_notification(&app_state.optimizer, notification, &settings, priority);

    Ok(HttpResponse::Accepted().json(EnqueueResponse { outcome }))
}

async fn clear_batch(app_state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let user_id = UserId(path.into_inner());
    if app_state.optimizer.clear_batch(&user_id) {
        info!("[Batch Cleared] : {}", user_id);
    }
    HttpResponse::NoContent().finish()
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/stats", web::get().to(stats))
        .route("/notifications", web::post().to(enqueue))
        .route(
            "/notifications/{user_id}/batch",
            web::delete().to(clear_batch),
        );
}

async fn drain_looper(
    optimizer: Arc<NotificationOptimizer>,
    dispatcher: Arc<dyn Dispatcher>,
    delay: Duration,
) {
    loop {
        let report = dispatch_ready_batches(&optimizer, dispatcher.as_ref()).await;
        if report.delivered + report.failed > 0 {
            info!(
                "[Drain] => delivered : {}, failed : {}",
                report.delivered, report.failed
            );
        }
        sleep(delay).await;
    }
}

pub async fn run_server() -> Result<()> {
    let dhall_config_path = var("DHALL_CONFIG")
        .unwrap_or_else(|_| "./dhall-configs/dev/notification_optimizer.dhall".to_string());
    let app_config = serde_dhall::from_file(dhall_config_path).parse::<AppConfig>()?;

    let _guard = setup_tracing(app_config.logger_cfg.to_owned());

    std::panic::set_hook(Box::new(|panic_info| {
        error!("Panic Occured : {:?}", panic_info);
    }));

    let app_state = AppState::new(app_config)?;

    let (signal_tx, signal_rx) = oneshot::channel::<()>();
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => {
                error!("SIGTERM received: shutting down");
            },
            _ = sigint.recv() => {
                error!("SIGINT received: shutting down");
            }
        }
        let _ = signal_tx.send(());
    });

    let cleanup_handle =
        start_periodic_cleanup(app_state.optimizer.clone(), app_state.cleanup_interval);

    let drain_task = tokio::spawn(drain_looper(
        app_state.optimizer.clone(),
        app_state.dispatcher.clone(),
        app_state.drain_interval,
    ));

    let prometheus = prometheus_metrics();
    let http_server_port = app_state.http_server_port;
    let data = web::Data::new(app_state.clone());
    let http_server = HttpServer::new(move || {
        App::new()
            .wrap(prometheus.clone())
            .app_data(data.clone())
            .configure(configure)
    })
    .bind((Ipv4Addr::UNSPECIFIED, http_server_port))?
    .shutdown_timeout(60)
    .run();

    let result = tokio::select! {
        res = http_server => {
            error!("[HTTP_SERVER_ENDED] : {:?}", res);
            Err(anyhow!("[HTTP_SERVER] : {:?}", res))
        }
        res = drain_task => {
            error!("[DRAIN_TASK_ENDED] : {:?}", res);
            Err(anyhow!("[DRAIN_TASK] : {:?}", res))
        }
        _ = signal_rx => {
            info!("[Graceful Shutting Down] => Dispatching ready batches one last time");
            let report =
                dispatch_ready_batches(&app_state.optimizer, app_state.dispatcher.as_ref()).await;
            info!(
                "[Graceful Shutting Down] => delivered : {}, failed : {}, stats : {:?}",
                report.delivered,
                report.failed,
                app_state.optimizer.get_stats()
            );
            Ok(())
        }
    };

    cleanup_handle.cancel().await;
    result
}
