// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! HTTP server for luasite sites.
//!
//! Every request goes through one fallback handler. Dispatching runs on
//! `spawn_blocking` because route scripts may sleep, hit the network or
//! wait for an interpreter; a semaphore bounds how many run at once.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{request::Parts, Method, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use luasite::{Dispatcher, ErrorPageResolver, HostResponse, ScriptRequest};
use tokio::sync::Semaphore;
use tracing::{debug, error};

const MAX_BODY_SIZE: usize = 1024 * 1024;

/// Shared application state for the server.
pub struct AppState {
    /// Routes requests to scripts, markup and files.
    pub dispatcher: Arc<Dispatcher>,
    /// Limits the number of dispatches in flight.
    pub permits: Semaphore,
}

/// Builds the axum router serving `dispatcher`.
///
/// At most `workers` requests are dispatched at the same time; the rest
/// wait for a permit.
pub fn build_router(dispatcher: Arc<Dispatcher>, workers: usize) -> Router {
    let state = Arc::new(AppState {
        dispatcher,
        permits: Semaphore::new(workers.max(1)),
    });

    Router::new().fallback(fallback_handler).with_state(state)
}

/// Binds `addr` and serves until the process is stopped.
pub async fn serve(addr: &str, dispatcher: Arc<Dispatcher>, workers: usize) -> anyhow::Result<()> {
    let app = build_router(dispatcher, workers);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Main fallback handler that dispatches every request
async fn fallback_handler(State(state): State<Arc<AppState>>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    let errors = state.dispatcher.errors();

    let body_bytes = if parts.method != Method::GET && parts.method != Method::HEAD {
        match axum::body::to_bytes(body, MAX_BODY_SIZE).await {
            Ok(bytes) if bytes.is_empty() => None,
            Ok(bytes) => Some(bytes.to_vec()),
            Err(e) => {
                debug!(error = %e, path = %parts.uri.path(), "Rejected request body");
                return error_response(errors, 413);
            }
        }
    } else {
        None
    };

    let script_request = to_script_request(&parts, body_bytes);

    let _permit = match state.permits.acquire().await {
        Ok(permit) => permit,
        Err(_) => return error_response(errors, 503),
    };

    let dispatcher = state.dispatcher.clone();
    match tokio::task::spawn_blocking(move || dispatcher.dispatch(script_request)).await {
        Ok(response) => {
            debug!(status = response.status(), path = %parts.uri.path(), "Request handled");
            to_axum_response(response, errors)
        }
        Err(e) => {
            error!(error = %e, path = %parts.uri.path(), "Dispatch task failed");
            error_response(errors, 500)
        }
    }
}

/// Convert the request head and body into a ScriptRequest
fn to_script_request(parts: &Parts, body: Option<Vec<u8>>) -> ScriptRequest {
    let headers: HashMap<String, String> = parts
        .headers
        .iter()
        .filter_map(|(k, v)| {
            v.to_str()
                .ok()
                .map(|v| (canonical_header_name(k.as_str()), v.to_string()))
        })
        .collect();

    let mut request = ScriptRequest::new(parts.uri.path(), parts.method.as_str())
        .with_headers(headers)
        .with_query_string(parts.uri.query().unwrap_or_default());

    if let Some(body) = body {
        request = request.with_body(body);
    }

    request
}

/// `user-agent` -> `User-Agent`
fn canonical_header_name(name: &str) -> String {
    name.split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// The error page for `code` as an axum Response
fn error_response(errors: &ErrorPageResolver, code: u16) -> Response {
    let page = errors.resolve(code);
    let status_code = StatusCode::from_u16(page.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    Response::builder()
        .status(status_code)
        .header("content-type", page.content_type)
        .body(Body::from(page.body))
        .unwrap_or_else(|_| status_code.into_response())
}

/// Convert HostResponse to axum Response
///
/// A `Content-Type` in the script's headers replaces the declared type.
fn to_axum_response(response: HostResponse, errors: &ErrorPageResolver) -> Response {
    match response {
        HostResponse::Content {
            status,
            content_type,
            headers,
            body,
        } => {
            let status_code =
                StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            let mut builder = Response::builder().status(status_code);
            let mut content_type = content_type;

            for (key, value) in headers {
                if key.eq_ignore_ascii_case("content-type") {
                    content_type = value;
                } else {
                    builder = builder.header(key, value);
                }
            }
            builder = builder.header("content-type", content_type);

            builder.body(Body::from(body)).unwrap_or_else(|e| {
                error!(error = %e, "Script produced an invalid response head");
                error_response(errors, 500)
            })
        }
        HostResponse::Redirect { status, location } => {
            let status_code = StatusCode::from_u16(status).unwrap_or(StatusCode::FOUND);
            Response::builder()
                .status(status_code)
                .header("location", location)
                .body(Body::empty())
                .unwrap_or_else(|e| {
                    error!(error = %e, "Script produced an invalid redirect");
                    error_response(errors, 500)
                })
        }
    }
}
