//! # HTTP front end
//!
//! SPEC §6 "URL / path grammar for the easy interface ... `//base/entity
//! [/key[.attribute(args)]]`. The dispatcher reduces this to a Locator plus
//! an optional apply-opcode." This module is that dispatcher's HTTP
//! transport: it owns no block logic of its own, only request parsing and
//! the `StatusCode` → HTTP status mapping (SPEC §7).
//!
//! Grounded on the teacher's `qc-16-api-gateway::router` shape (one axum
//! `Router` built from a shared state, one handler per HTTP verb) without
//! any of its JSON-RPC/WebSocket machinery, which this server does not need.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode as HttpStatus;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use jazz_elements::ports::inbound::{write_mode, GetSelector, WriteMode};
use jazz_types::StatusCode;

use crate::service::Services;

pub fn router(services: Arc<Services>) -> Router {
    Router::new()
        .route(
            "/*path",
            get(get_block)
                .put(put_block)
                .delete(remove_block)
                .head(header_block)
                .post(new_entity),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(services)
}

#[derive(Debug, serde::Deserialize, Default)]
struct GetQuery {
    item: Option<String>,
}

#[derive(Debug, serde::Deserialize, Default)]
struct PutQuery {
    mode: Option<u8>,
}

async fn get_block(
    State(services): State<Arc<Services>>,
    Path(path): Path<String>,
    Query(q): Query<GetQuery>,
) -> Response {
    let container = match services.route(&path) {
        Ok(c) => c,
        Err(e) => return error_response(e),
    };
    let item = q.item;
    let outcome = tokio::task::spawn_blocking(move || {
        let selector = match &item {
            Some(name) => GetSelector::ItemName(name.as_str()),
            None => GetSelector::Whole,
        };
        container.get(&path, selector).map(|txn| txn.block)
    })
    .await
    .unwrap_or_else(|e| Err(StatusCode::MiscServer { reason: e.to_string() }));
    match outcome {
        Ok(Some(block)) => block_response(HttpStatus::OK, &block),
        Ok(None) => error_response(StatusCode::BlockNotFound),
        Err(e) => error_response(e),
    }
}

async fn header_block(State(services): State<Arc<Services>>, Path(path): Path<String>) -> Response {
    let container = match services.route(&path) {
        Ok(c) => c,
        Err(e) => return error_response(e),
    };
    let outcome = tokio::task::spawn_blocking(move || container.header(&path).map(|txn| txn.block))
        .await
        .unwrap_or_else(|e| Err(StatusCode::MiscServer { reason: e.to_string() }));
    match outcome {
        Ok(Some(block)) => block_response(HttpStatus::OK, &block),
        Ok(None) => error_response(StatusCode::BlockNotFound),
        Err(e) => error_response(e),
    }
}

async fn put_block(
    State(services): State<Arc<Services>>,
    Path(path): Path<String>,
    Query(q): Query<PutQuery>,
    body: Bytes,
) -> Response {
    let container = match services.route(&path) {
        Ok(c) => c,
        Err(e) => return error_response(e),
    };
    let mode = WriteMode(q.mode.unwrap_or(write_mode::AS_CONTENT));
    let outcome = tokio::task::spawn_blocking(move || {
        let block = jazz_elements::container::unwrap_received(&body, now());
        container.put(&path, block, mode)
    })
    .await
    .unwrap_or_else(|e| Err(StatusCode::MiscServer { reason: e.to_string() }));
    match outcome {
        Ok(()) => HttpStatus::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

async fn remove_block(State(services): State<Arc<Services>>, Path(path): Path<String>) -> Response {
    let container = match services.route(&path) {
        Ok(c) => c,
        Err(e) => return error_response(e),
    };
    let outcome = tokio::task::spawn_blocking(move || container.remove(&path))
        .await
        .unwrap_or_else(|e| Err(StatusCode::MiscServer { reason: e.to_string() }));
    match outcome {
        Ok(()) => HttpStatus::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

async fn new_entity(State(services): State<Arc<Services>>, Path(path): Path<String>) -> Response {
    let container = match services.route(&path) {
        Ok(c) => c,
        Err(e) => return error_response(e),
    };
    let outcome = tokio::task::spawn_blocking(move || container.new_entity(&path))
        .await
        .unwrap_or_else(|e| Err(StatusCode::MiscServer { reason: e.to_string() }));
    match outcome {
        Ok(()) => HttpStatus::CREATED.into_response(),
        Err(e) => error_response(e),
    }
}

fn now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// The block travels as its in-memory byte image (SPEC §6 "Wire formats:
/// blocks travel as their in-memory byte image including the header hash").
fn block_response(status: HttpStatus, block: &jazz_elements::Block) -> Response {
    (status, [("content-type", "application/octet-stream")], block.to_bytes()).into_response()
}

/// SPEC §7's error table, mapped onto HTTP status the way Channels' own
/// `status_to_error` maps HTTP status onto `StatusCode` in the other
/// direction: "not found" kinds become 404, misuse becomes 400, permission
/// kinds become 403, infrastructure failure becomes 500/501.
fn error_response(status: StatusCode) -> Response {
    let http_status = match &status {
        StatusCode::BlockNotFound => HttpStatus::NOT_FOUND,
        StatusCode::ReadForbidden | StatusCode::WriteForbidden { .. } | StatusCode::BaseForbidden => {
            HttpStatus::FORBIDDEN
        }
        StatusCode::WrongType { .. }
        | StatusCode::WrongName { .. }
        | StatusCode::WrongArguments { .. }
        | StatusCode::NewBlockArgs { .. }
        | StatusCode::ParsingNames { .. } => HttpStatus::BAD_REQUEST,
        StatusCode::BadBlock { .. } => HttpStatus::UNPROCESSABLE_ENTITY,
        StatusCode::NotImplemented | StatusCode::NotApplicable => HttpStatus::NOT_IMPLEMENTED,
        StatusCode::NoMem { .. } => HttpStatus::INSUFFICIENT_STORAGE,
        StatusCode::BadConfig { .. }
        | StatusCode::Starting { .. }
        | StatusCode::WriteFailed { .. }
        | StatusCode::RemoveFailed { .. }
        | StatusCode::CreateFailed { .. }
        | StatusCode::MiscServer { .. } => HttpStatus::INTERNAL_SERVER_ERROR,
    };
    (http_status, status.to_string()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_http_404() {
        let resp = error_response(StatusCode::BlockNotFound);
        assert_eq!(resp.status(), HttpStatus::NOT_FOUND);
    }

    #[test]
    fn wrong_arguments_maps_to_http_400() {
        let resp = error_response(StatusCode::WrongArguments { reason: "x".into() });
        assert_eq!(resp.status(), HttpStatus::BAD_REQUEST);
    }

    #[test]
    fn write_forbidden_maps_to_http_403() {
        let resp = error_response(StatusCode::WriteForbidden { reason: "x".into() });
        assert_eq!(resp.status(), HttpStatus::FORBIDDEN);
    }
}
