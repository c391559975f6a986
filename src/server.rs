//! Blocking HTTP front end: `/api` for JSON actions, `/image` for raw files.
//!
//! Routing is a pure function of method, URL, and config so it can be tested
//! without binding a socket; `serve` only moves bytes.
use crate::api;
use crate::config::ViewerConfig;
use crate::error::ViewerError;
use crate::paths::check_requested_path;
use anyhow::{anyhow, Result};
use std::collections::BTreeMap;
use std::time::Instant;

const JSON_CONTENT_TYPE: &str = "application/json";
const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";
const MISSING_ROOT_MESSAGE: &str = "Data directory not found.";

/// Status, content type, and body produced for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpReply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl HttpReply {
    fn json(status: u16, body: String) -> Self {
        Self {
            status,
            content_type: JSON_CONTENT_TYPE,
            body: body.into_bytes(),
        }
    }

    fn json_error(status: u16, message: &str) -> Self {
        let body = serde_json::json!({ "error": message });
        Self::json(
            status,
            serde_json::to_string_pretty(&body).unwrap_or_else(|_| "{}".to_string()),
        )
    }

    fn text(status: u16, message: &str) -> Self {
        Self {
            status,
            content_type: TEXT_CONTENT_TYPE,
            body: message.as_bytes().to_vec(),
        }
    }
}

/// Split a request URL into its path and decoded query parameters.
///
/// `+` decodes to a space, as in form-encoded query strings. The last value
/// wins for repeated keys.
pub fn parse_url(url: &str) -> std::result::Result<(String, BTreeMap<String, String>), String> {
    let (path, query) = url.split_once('?').unwrap_or((url, ""));
    let mut params = BTreeMap::new();
    for pair in query.split('&').filter(|pair| !pair.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        params.insert(decode_component(key)?, decode_component(value)?);
    }
    Ok((path.to_string(), params))
}

fn decode_component(raw: &str) -> std::result::Result<String, String> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .map_err(|err| format!("Malformed query string: {err}"))
}

/// Route one request.
pub fn route(method: &str, url: &str, config: &ViewerConfig) -> HttpReply {
    if !method.eq_ignore_ascii_case("GET") {
        return HttpReply::json_error(405, "Method not allowed");
    }
    let (path, params) = match parse_url(url) {
        Ok(parsed) => parsed,
        Err(message) => return HttpReply::json_error(400, &message),
    };
    match path.as_str() {
        "/api" | "/api.php" => {
            let response = api::handle(
                config,
                params.get("action").map(String::as_str),
                &params,
            );
            HttpReply::json(response.status, response.to_pretty_json())
        }
        "/image" | "/image.php" => serve_file(config, params.get("path").map(String::as_str)),
        _ => HttpReply::json_error(404, &format!("No route for {path}")),
    }
}

fn serve_file(config: &ViewerConfig, requested: Option<&str>) -> HttpReply {
    let requested = requested.unwrap_or_default();
    if let Err(err) = check_requested_path(requested) {
        tracing::warn!(requested, "rejected file request");
        return HttpReply::text(err.status_code(), &err.to_string());
    }
    let root = match config.data_root() {
        Ok(root) => root,
        Err(_) => return HttpReply::text(500, MISSING_ROOT_MESSAGE),
    };
    match root.read_file(requested) {
        Ok(file) => HttpReply {
            status: 200,
            content_type: file.content_type,
            body: file.bytes,
        },
        Err(err @ ViewerError::InvalidPath(_)) => {
            tracing::warn!(requested, "rejected file request");
            HttpReply::text(err.status_code(), &err.to_string())
        }
        Err(err) => HttpReply::text(err.status_code(), &err.to_string()),
    }
}

/// Serve requests one at a time until the process is stopped.
pub fn serve(config: &ViewerConfig, addr: &str) -> Result<()> {
    let server = tiny_http::Server::http(addr).map_err(|err| anyhow!("bind {addr}: {err}"))?;
    if let Err(err) = config.data_root() {
        tracing::warn!(error = %err, "data root unavailable; requests will fail until it exists");
    }
    tracing::info!(addr = ?server.server_addr(), "viewer listening");

    for request in server.incoming_requests() {
        let start = Instant::now();
        let method = request.method().to_string();
        let url = request.url().to_string();
        let path = url.split('?').next().unwrap_or_default().to_string();

        let reply = route(&method, &url, config);
        let status = reply.status;
        let header = tiny_http::Header::from_bytes("Content-Type", reply.content_type)
            .map_err(|_| anyhow!("invalid content type {}", reply.content_type))?;
        let response = tiny_http::Response::from_data(reply.body)
            .with_status_code(status)
            .with_header(header);
        if let Err(err) = request.respond(response) {
            tracing::warn!(%method, %path, error = %err, "failed to write response");
        }

        tracing::info!(
            %method,
            %path,
            status,
            elapsed_ms = start.elapsed().as_millis(),
            "request served"
        );
    }
    Ok(())
}
