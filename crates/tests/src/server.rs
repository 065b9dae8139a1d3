/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/

use crate::common::*;
use actix_web::{http::StatusCode, test as actix_test, web, App};
use async_trait::async_trait;
use notification_optimizer::{
    common::types::*,
    environment::AppState,
    outbound::external::Dispatcher,
    server::configure,
    tools::error::AppError,
};
use serde_json::{json, Value};
use std::{sync::Arc, time::Duration};

struct NoopDispatcher;

#[async_trait]
impl Dispatcher for NoopDispatcher {
    async fn dispatch(&self, _batch: &BatchedNotification) -> Result<(), AppError> {
        Ok(())
    }
}

fn app_state() -> AppState {
    let (_clock, optimizer) = optimizer_at(at(2024, 1, 15, 12, 0), Default::default());
    AppState {
        optimizer: Arc::new(optimizer),
        dispatcher: Arc::new(NoopDispatcher),
        http_server_port: 0,
        cleanup_interval: Duration::from_secs(300),
        drain_interval: Duration::from_secs(15),
    }
}

fn notification_json(user_id: &str) -> Value {
    json!({
        "id": "n-1",
        "userId": user_id,
        "title": "Assigned",
        "message": "Buy milk",
        "type": "task",
        "status": "unread",
        "priority": "high",
        "createdAt": "2024-01-15T11:00:00Z"
    })
}

#[actix_web::test]
async fn enqueue_batches_and_clears() {
    let state = app_state();
    let optimizer = state.optimizer.clone();
    let app = actix_test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure),
    )
    .await;

    let request = actix_test::TestRequest::post()
        .uri("/notifications")
        .set_json(json!({ "notification": notification_json("alice") }))
        .to_request();
    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body, json!({ "outcome": "batched" }));

    let batch = optimizer.batch_for(&user("alice")).expect("batch exists");
    assert_eq!(batch.priority, BatchPriority::High);

    let request = actix_test::TestRequest::get().uri("/stats").to_request();
    let stats: Value = actix_test::call_and_read_body_json(&app, request).await;
    assert_eq!(stats["batches"]["batches"], json!(1));

    let request = actix_test::TestRequest::delete()
        .uri("/notifications/alice/batch")
        .to_request();
    let response = actix_test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(optimizer.batch_for(&user("alice")).is_none());
}

#[actix_web::test]
async fn invalid_enqueue_is_rejected_with_error_code() {
    let state = app_state();
    let optimizer = state.optimizer.clone();
    let app = actix_test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure),
    )
    .await;

    let request = actix_test::TestRequest::post()
        .uri("/notifications")
        .set_json(json!({ "notification": notification_json(" ") }))
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["errorCode"], json!("INVALID_REQUEST"));
    assert_eq!(optimizer.get_stats().batches.batches, 0);
}

#[test]
fn errors_map_to_http_statuses() {
    use actix_web::ResponseError;

    let cases = [
        (AppError::InvalidRequest("x".to_string()), StatusCode::BAD_REQUEST),
        (AppError::NotFound("x".to_string()), StatusCode::NOT_FOUND),
        (AppError::StoreUnavailable("x".to_string()), StatusCode::SERVICE_UNAVAILABLE),
        (AppError::IndexNotReady("x".to_string()), StatusCode::SERVICE_UNAVAILABLE),
        (AppError::DispatchFailed("x".to_string()), StatusCode::BAD_GATEWAY),
    ];
    for (error, status) in cases {
        assert_eq!(error.status_code(), status, "{}", error.code());
    }
}
