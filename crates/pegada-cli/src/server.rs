//! HTTP endpoints for the request-style interface.
//!
//! | route              | body                     | response                      |
//! |--------------------|--------------------------|-------------------------------|
//! | `POST /calcular`   | `{energia, km, tipo, …}` | structured report (JSON)      |
//! | `POST /relatorio`  | same                     | HTML report                   |
//! | `GET /fatores`     |                          | normalized factor table       |
//! | `GET /healthz`     |                          | `ok`                          |
//!
//! Invalid bodies get `400`, an all-zero footprint gets `422`. The factor
//! table is loaded once and shared read-only between connections.

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use pegada_core::{
    compute, handle_calculation, render, CalculationRequest, FactorTable, RenderedReport,
    ReportFormat, RequestError,
};

use crate::ServeArgs;

struct ServerState {
    factors: FactorTable,
}

pub(crate) fn cmd_serve(args: &ServeArgs, factors: FactorTable) -> Result<()> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| anyhow!("failed to initialize tokio runtime: {e}"))?;

    let state = Arc::new(ServerState { factors });
    rt.block_on(serve_async(args.clone(), state))
}

async fn serve_async(args: ServeArgs, state: Arc<ServerState>) -> Result<()> {
    let listener = TcpListener::bind(args.listen)
        .await
        .map_err(|e| anyhow!("serve: failed to bind {}: {e}", args.listen))?;
    let bound = listener
        .local_addr()
        .map_err(|e| anyhow!("serve: failed to read bound addr: {e}"))?;

    eprintln!("serve: listening on http://{bound}");
    info!(addr = %bound, "server listening");
    if let Some(path) = args.ready_file.as_ref() {
        write_ready_file(path, &bound.to_string())?;
    }

    loop {
        let (stream, peer) = listener
            .accept()
            .await
            .map_err(|e| anyhow!("serve: accept failed: {e}"))?;
        debug!(peer = %peer, "connection accepted");
        let io = TokioIo::new(stream);
        let state = state.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req| handle_request(req, state.clone()));
            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                warn!(error = %e, "connection error");
            }
        });
    }
}

/// Written atomically so a watcher never reads a partial file.
fn write_ready_file(path: &Path, addr: &str) -> Result<()> {
    let payload = serde_json::json!({
        "addr": addr,
        "pid": std::process::id(),
    });
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, serde_json::to_vec_pretty(&payload)?)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

async fn handle_request(
    req: Request<Incoming>,
    state: Arc<ServerState>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let body = if method == Method::POST {
        req.into_body().collect().await?.to_bytes()
    } else {
        Bytes::new()
    };

    let resp = route(&method, &path, &body, &state);
    debug!(%method, %path, status = resp.status().as_u16(), "request handled");
    Ok(resp)
}

fn route(method: &Method, path: &str, body: &[u8], state: &ServerState) -> Response<Full<Bytes>> {
    match (method, path) {
        (&Method::GET, "/healthz") => {
            body_response(StatusCode::OK, "text/plain; charset=utf-8", "ok\n")
        }
        (&Method::GET, "/fatores") => json_response(StatusCode::OK, &state.factors),
        (&Method::POST, "/calcular") => match handle_calculation(body, &state.factors) {
            Ok(report) => json_response(StatusCode::OK, &report),
            Err(e) => request_error(&e),
        },
        (&Method::POST, "/relatorio") => match html_report(body, &state.factors) {
            Ok(rendered) => rendered_response(rendered),
            Err(e) => request_error(&e),
        },
        (_, "/healthz" | "/fatores" | "/calcular" | "/relatorio") => {
            json_error(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
        }
        _ => json_error(StatusCode::NOT_FOUND, "not found"),
    }
}

fn html_report(body: &[u8], factors: &FactorTable) -> Result<RenderedReport, RequestError> {
    let answers = CalculationRequest::from_slice(body)?.to_answers()?;
    let report = compute(&answers, factors)?;
    Ok(render(&report, ReportFormat::Html))
}

fn request_error(e: &RequestError) -> Response<Full<Bytes>> {
    let status = match e {
        RequestError::Degenerate(_) => StatusCode::UNPROCESSABLE_ENTITY,
        RequestError::Malformed(_) | RequestError::InvalidValue(_) => StatusCode::BAD_REQUEST,
    };
    json_error(status, &e.to_string())
}

fn rendered_response(rendered: RenderedReport) -> Response<Full<Bytes>> {
    let content_type = rendered.content_type();
    match rendered.into_bytes() {
        Ok(bytes) => body_response(StatusCode::OK, content_type, bytes),
        Err(e) => json_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

fn body_response(
    status: StatusCode,
    content_type: &'static str,
    body: impl Into<Bytes>,
) -> Response<Full<Bytes>> {
    let mut resp = Response::new(Full::new(body.into()));
    *resp.status_mut() = status;
    resp.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    resp
}

fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(value) {
        Ok(body) => body_response(status, "application/json", body),
        Err(e) => body_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "text/plain; charset=utf-8",
            format!("failed to serialize response: {e}"),
        ),
    }
}

fn json_error(status: StatusCode, msg: &str) -> Response<Full<Bytes>> {
    json_response(status, &serde_json::json!({ "error": msg }))
}
