/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/

use crate::call_external_api;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Client, Method, StatusCode, Url,
};
use serde::{de::DeserializeOwned, Serialize};
use std::{str::FromStr, time::Instant};
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum CallApiError {
    #[error("Invalid Header `{0}` : {1}")]
    InvalidHeader(String, String),
    #[error("Response Deserialization Failed : {0}")]
    ResponseDeserializationFailed(String),
    #[error("Connection Error : {0}")]
    ConnectionError(String),
    #[error("External API Call Error : {0}")]
    ExternalAPICallError(StatusCode),
}

fn to_header_map(headers: &[(&str, &str)]) -> Result<HeaderMap, CallApiError> {
    headers
        .iter()
        .map(|(key, value)| -> Result<(HeaderName, HeaderValue), CallApiError> {
            let name = HeaderName::from_str(key)
                .map_err(|err| CallApiError::InvalidHeader(key.to_string(), err.to_string()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|err| CallApiError::InvalidHeader(key.to_string(), err.to_string()))?;
            Ok((name, value))
        })
        .collect()
}

/// Sends `body` as JSON and decodes a JSON answer. Every call is timed into
/// `CALL_EXTERNAL_API`, labelled with `service`.
pub async fn call_api<T, U>(
    client: &Client,
    service: &str,
    method: Method,
    url: &Url,
    headers: &[(&str, &str)],
    body: Option<&U>,
) -> Result<T, CallApiError>
where
    T: DeserializeOwned,
    U: Serialize + ?Sized,
{
    let start_time = Instant::now();
    let host = url.host_str().unwrap_or_default();

    let mut request = client
        .request(method.to_owned(), url.to_owned())
        .headers(to_header_map(headers)?);
    if let Some(body) = body {
        request = request.json(body);
    }

    let response = request.send().await.map_err(|err| {
        call_external_api!(method.as_str(), host, service, "UNKNOWN", start_time);
        error!(
            tag = "[OUTGOING API - ERROR]",
            service = %service,
            request_method = %method,
            request_url = %url,
            error = %err
        );
        CallApiError::ConnectionError(err.to_string())
    })?;

    let status = response.status();
    call_external_api!(method.as_str(), host, service, status.as_str(), start_time);

    if !status.is_success() {
        error!(
            tag = "[OUTGOING API - ERROR]",
            service = %service,
            request_method = %method,
            request_url = %url,
            response_status = %status,
            latency = format!("{:?}ms", start_time.elapsed().as_millis())
        );
        return Err(CallApiError::ExternalAPICallError(status));
    }

    info!(
        tag = "[OUTGOING API]",
        service = %service,
        request_method = %method,
        request_url = %url,
        response_status = %status,
        latency = format!("{:?}ms", start_time.elapsed().as_millis())
    );
    response
        .json::<T>()
        .await
        .map_err(|err| CallApiError::ResponseDeserializationFailed(err.to_string()))
}
