/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/

use crate::{
    common::types::*,
    optimizer::NotificationOptimizer,
    outbound::{
        external::{NotificationStore, SettingsStore},
        types::FetchOptions,
    },
    tools::error::AppError,
};
use itertools::Itertools;
use std::sync::Arc;
use tokio::{sync::oneshot, task::JoinHandle};
use tracing::*;

/// Keeps a user's cached first page in step with the store's live feed. The
/// store subscription ends on `cancel` or when the handle is dropped.
pub struct WatchHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl WatchHandle {
    pub async fn cancel(mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        if let Err(err) = self.task.await {
            error!("[Notification Watch] Task ended abnormally : {:?}", err);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Cache-aside access to a user's notifications. Every mutation goes to the
/// store first and then drops the user's cached list.
pub struct NotificationService {
    optimizer: Arc<NotificationOptimizer>,
    store: Arc<dyn NotificationStore>,
    settings_store: Arc<dyn SettingsStore>,
}

impl NotificationService {
    pub fn new(
        optimizer: Arc<NotificationOptimizer>,
        store: Arc<dyn NotificationStore>,
        settings_store: Arc<dyn SettingsStore>,
    ) -> Self {
        NotificationService {
            optimizer,
            store,
            settings_store,
        }
    }

    pub async fn fetch_notifications(
        &self,
        user_id: &UserId,
        options: &FetchOptions,
    ) -> Result<Vec<Notification>, AppError> {
        let cacheable = options.is_unfiltered_first_page();

        if cacheable {
            if let Some(cached) = self.optimizer.get_cached(user_id) {
                return Ok(apply_limit(cached, options.limit));
            }
        }

        // A cached list is the user's whole first page, whatever limit asked for it.
        let query = if cacheable {
            FetchOptions::default()
        } else {
            options.to_owned()
        };

        let notifications = match self.store.fetch(user_id, &query).await {
            Ok(notifications) => notifications,
            Err(AppError::IndexNotReady(reason)) => {
                warn!(
                    "[Index Not Ready] : {} => falling back to local filtering, Reason : {}",
                    user_id, reason
                );
                let unfiltered = self.store.fetch(user_id, &FetchOptions::default()).await?;
                filter_locally(unfiltered, options)
            }
            Err(err) => return Err(err),
        };

        if cacheable {
            self.optimizer
                .set_cached(user_id, notifications.to_owned());
            return Ok(apply_limit(notifications, options.limit));
        }

        Ok(notifications)
    }

    /// Subscribes to the user's unfiltered first page. Every pushed page
    /// replaces the cached one; a feed error drops it so the next read goes to
    /// the store.
    pub async fn watch_notifications(&self, user_id: &UserId) -> Result<WatchHandle, AppError> {
        let mut feed = self
            .store
            .subscribe(user_id, &FetchOptions::default())
            .await?;
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let optimizer = self.optimizer.clone();
        let user_id = user_id.to_owned();

        let task = tokio::spawn(async move {
            info!("[Notification Watch] Subscribed : {}", user_id);
            loop {
                tokio::select! {
                    update = feed.recv() => match update {
                        Some(Ok(notifications)) => {
                            optimizer.set_cached(&user_id, notifications);
                        }
                        Some(Err(err)) => {
                            warn!(
                                "[Notification Watch] : {} => dropping cached page, Error : {}",
                                user_id, err
                            );
                            optimizer.invalidate(&user_id);
                        }
                        None => {
                            warn!("[Notification Watch] Feed closed by store : {}", user_id);
                            optimizer.invalidate(&user_id);
                            break;
                        }
                    },
                    _ = &mut shutdown_rx => {
                        info!("[Notification Watch] Unsubscribed : {}", user_id);
                        break;
                    }
                }
            }
        });

        Ok(WatchHandle {
            shutdown_tx: Some(shutdown_tx),
            task,
        })
    }

    pub async fn mark_read(
        &self,
        user_id: &UserId,
        notification_id: &NotificationId,
    ) -> Result<(), AppError> {
        self.store.mark_read(user_id, notification_id).await?;
        self.optimizer.invalidate(user_id);
        Ok(())
    }

    pub async fn mark_all_read(&self, user_id: &UserId) -> Result<(), AppError> {
        self.store.mark_all_read(user_id).await?;
        self.optimizer.invalidate(user_id);
        Ok(())
    }

    pub async fn delete(
        &self,
        user_id: &UserId,
        notification_id: &NotificationId,
    ) -> Result<(), AppError> {
        self.store.delete(user_id, notification_id).await?;
        self.optimizer.invalidate(user_id);
        Ok(())
    }

    pub async fn get_settings(&self, user_id: &UserId) -> Result<NotificationSettings, AppError> {
        Ok(self
            .settings_store
            .get(user_id)
            .await?
            .unwrap_or_default())
    }

    pub async fn update_settings(
        &self,
        user_id: &UserId,
        settings: &NotificationSettings,
    ) -> Result<(), AppError> {
        self.settings_store.put(user_id, settings).await
    }
}

fn apply_limit(mut notifications: Vec<Notification>, limit: Option<usize>) -> Vec<Notification> {
    if let Some(limit) = limit {
        notifications.truncate(limit);
    }
    notifications
}

/// What the store would have answered had the index been ready: filtered,
/// newest first, resumed after the cursor and limited.
pub fn filter_locally(
    notifications: Vec<Notification>,
    options: &FetchOptions,
) -> Vec<Notification> {
    let sorted = notifications
        .into_iter()
        .filter(|notification| {
            options
                .status
                .map_or(true, |status| notification.status == status)
        })
        .filter(|notification| {
            options
                .notification_type
                .map_or(true, |notification_type| {
                    notification.notification_type == notification_type
                })
        })
        .sorted_by(|a, b| b.created_at.cmp(&a.created_at));

    let page: Vec<Notification> = match &options.cursor {
        Some(cursor) => sorted
            .skip_while(|notification| &notification.id != cursor)
            .skip(1)
            .collect(),
        None => sorted.collect(),
    };

    apply_limit(page, options.limit)
}
