/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/

use super::types::*;
use crate::{
    common::types::*,
    tools::{callapi::call_api, error::AppError},
};
use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use tokio::sync::mpsc;

/// Pages pushed by a live subscription, each one the full current answer to
/// the subscribed query. Dropping the receiver unsubscribes; stores notice it
/// through `Sender::closed`.
pub type NotificationFeed = mpsc::Receiver<Result<Vec<Notification>, AppError>>;

/// The document store holding each user's notifications.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Newest first. A filtered query the store cannot serve yet fails with
    /// `AppError::IndexNotReady`.
    async fn fetch(
        &self,
        user_id: &UserId,
        options: &FetchOptions,
    ) -> Result<Vec<Notification>, AppError>;

    async fn subscribe(
        &self,
        user_id: &UserId,
        options: &FetchOptions,
    ) -> Result<NotificationFeed, AppError>;

    async fn mark_read(
        &self,
        user_id: &UserId,
        notification_id: &NotificationId,
    ) -> Result<(), AppError>;

    async fn mark_all_read(&self, user_id: &UserId) -> Result<(), AppError>;

    async fn delete(
        &self,
        user_id: &UserId,
        notification_id: &NotificationId,
    ) -> Result<(), AppError>;
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self, user_id: &UserId) -> Result<Option<NotificationSettings>, AppError>;

    async fn put(&self, user_id: &UserId, settings: &NotificationSettings)
        -> Result<(), AppError>;
}

/// Delivers a drained batch.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(&self, batch: &BatchedNotification) -> Result<(), AppError>;
}

/// Posts each batch as JSON to a push gateway.
pub struct HttpDispatcher {
    client: Client,
    push_gateway_url: Url,
    api_key: String,
}

impl HttpDispatcher {
    pub fn new(push_gateway_url: Url, api_key: String) -> Self {
        Self {
            client: Client::new(),
            push_gateway_url,
            api_key,
        }
    }
}

#[async_trait]
impl Dispatcher for HttpDispatcher {
    async fn dispatch(&self, batch: &BatchedNotification) -> Result<(), AppError> {
        call_api::<ApiSuccess, BatchedNotification>(
            &self.client,
            "push_gateway",
            Method::POST,
            &self.push_gateway_url,
            &[("api-key", self.api_key.as_str())],
            Some(batch),
        )
        .await
        .map(|_| ())
        .map_err(|err| AppError::DispatchFailed(err.to_string()))
    }
}
