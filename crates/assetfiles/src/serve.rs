//! Development server.
//!
//! Answers requests below the static URL straight from the static roots,
//! running filters on demand. Nothing is cached between requests.

use percent_encoding::percent_decode_str;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};
use tracing::{debug, info, warn};

use crate::assets::AssetResolver;
use crate::finder::Finder;
use crate::types::AssetfilesError;

const DIRECTORY_INDEX: &str = "Directory indexes are not allowed here.";

/// Common MIME type constants.
pub mod mime {
    pub const HTML: &str = "text/html; charset=utf-8";
    pub const PLAIN: &str = "text/plain; charset=utf-8";
    pub const CSS: &str = "text/css; charset=utf-8";
    pub const JAVASCRIPT: &str = "text/javascript; charset=utf-8";
    pub const JSON: &str = "application/json";
    pub const XML: &str = "application/xml";
    pub const MAP: &str = "application/json";
    pub const SVG: &str = "image/svg+xml";
    pub const PNG: &str = "image/png";
    pub const JPEG: &str = "image/jpeg";
    pub const GIF: &str = "image/gif";
    pub const WEBP: &str = "image/webp";
    pub const ICO: &str = "image/x-icon";
    pub const WOFF: &str = "font/woff";
    pub const WOFF2: &str = "font/woff2";
    pub const TTF: &str = "font/ttf";
    pub const OTF: &str = "font/otf";
    pub const EOT: &str = "application/vnd.ms-fontobject";
    pub const OCTET_STREAM: &str = "application/octet-stream";
}

/// Guess the MIME type from the extension of a path.
pub fn content_type(path: &str) -> &'static str {
    let name = path.rsplit('/').next().unwrap_or(path);
    let ext = name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("html" | "htm") => mime::HTML,
        Some("css") => mime::CSS,
        Some("js" | "mjs") => mime::JAVASCRIPT,
        Some("json") => mime::JSON,
        Some("map") => mime::MAP,
        Some("xml") => mime::XML,
        Some("txt") => mime::PLAIN,
        Some("svg") => mime::SVG,
        Some("png") => mime::PNG,
        Some("jpg" | "jpeg") => mime::JPEG,
        Some("gif") => mime::GIF,
        Some("webp") => mime::WEBP,
        Some("ico") => mime::ICO,
        Some("woff") => mime::WOFF,
        Some("woff2") => mime::WOFF2,
        Some("ttf") => mime::TTF,
        Some("otf") => mime::OTF,
        Some("eot") => mime::EOT,
        _ => mime::OCTET_STREAM,
    }
}

/// Outcome of looking up a request path
#[derive(Debug, PartialEq, Eq)]
pub enum Served {
    /// A real file below one of the roots
    Static { path: PathBuf, content_type: &'static str },
    /// Output of a filter
    Asset { content: Vec<u8>, content_type: &'static str },
    NotFound(&'static str),
}

pub struct DevServer {
    finder: Arc<dyn Finder>,
    resolver: AssetResolver,
    static_url: String,
}

impl DevServer {
    pub fn new(
        finder: Arc<dyn Finder>,
        resolver: AssetResolver,
        static_url: impl Into<String>,
    ) -> Self {
        Self { finder, resolver, static_url: static_url.into() }
    }

    /// Look up a request URL: static files first, then filter outputs.
    pub fn lookup(&self, url: &str) -> Result<Served, AssetfilesError> {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let Some(path) = strip_static_url(path, &self.static_url) else {
            return Ok(Served::NotFound("Not found"));
        };
        let Some(path) = normalize_path(path) else {
            return Ok(Served::NotFound("Not found"));
        };
        if path.is_empty() || path.ends_with('/') {
            return Ok(Served::NotFound(DIRECTORY_INDEX));
        }

        if let Some(file) = self.finder.find(&path)? {
            if file.is_file() {
                debug!(path = %path, file = %file.display(), "serving static file");
                return Ok(Served::Static { path: file, content_type: content_type(&path) });
            }
        }

        match self.resolver.resolve(&path)? {
            Some(resolution) => {
                let input = resolution.input_path.display();
                debug!(path = %path, input = %input, "serving filtered asset");
                let content = resolution.process()?;
                Ok(Served::Asset { content, content_type: content_type(&path) })
            }
            None => Ok(Served::NotFound("Not found")),
        }
    }

    /// Serve requests on `addr` until the process exits
    pub fn run(&self, addr: &str) -> Result<(), AssetfilesError> {
        let server =
            Server::http(addr).map_err(|e| AssetfilesError::Server(format!("{addr}: {e}")))?;
        info!("Serving static files on http://{addr}{}", self.static_url);

        for request in server.incoming_requests() {
            if let Err(e) = self.handle(request) {
                warn!("request error: {e}");
            }
        }
        Ok(())
    }

    fn handle(&self, request: Request) -> std::io::Result<()> {
        if !matches!(request.method(), Method::Get | Method::Head) {
            return send_body(request, 405, mime::PLAIN, b"Method not allowed".to_vec());
        }

        let url = request.url().to_string();
        match self.lookup(&url) {
            Ok(Served::Static { path, content_type }) => match fs::read(&path) {
                Ok(body) => send_body(request, 200, content_type, body),
                Err(e) => send_body(request, 500, mime::PLAIN, e.to_string().into_bytes()),
            },
            Ok(Served::Asset { content, content_type }) => {
                send_body(request, 200, content_type, content)
            }
            Ok(Served::NotFound(message)) => {
                info!("404 {url}");
                send_body(request, 404, mime::PLAIN, message.as_bytes().to_vec())
            }
            Err(e) => {
                warn!("500 {url}: {e}");
                send_body(request, 500, mime::PLAIN, error_body(&e).into_bytes())
            }
        }
    }
}

/// The tool's own diagnostic when a filter failed, the error otherwise
fn error_body(error: &AssetfilesError) -> String {
    match error {
        AssetfilesError::Filter(e) => {
            e.diagnostic().map_or_else(|| e.to_string(), |d| d.message.clone())
        }
        other => other.to_string(),
    }
}

fn send_body(
    request: Request,
    status: u16,
    content_type: &str,
    body: Vec<u8>,
) -> std::io::Result<()> {
    let mut response = Response::from_data(body).with_status_code(StatusCode(status));
    if let Ok(header) = Header::from_bytes("Content-Type", content_type) {
        response.add_header(header);
    }
    request.respond(response)
}

fn strip_static_url<'a>(path: &'a str, static_url: &str) -> Option<&'a str> {
    let prefix = static_url.trim_end_matches('/');
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() || rest.starts_with('/') { Some(rest) } else { None }
}

/// Decode and clean a request path.
///
/// Leading slashes and `.` segments are dropped and a trailing slash is
/// kept. Returns `None` for paths containing `..` or invalid UTF-8.
pub fn normalize_path(path: &str) -> Option<String> {
    let decoded = percent_decode_str(path).decode_utf8().ok()?;
    let trailing = decoded.ends_with('/');

    let mut segments = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return None,
            segment => segments.push(segment),
        }
    }

    let mut normalized = segments.join("/");
    if trailing && !normalized.is_empty() {
        normalized.push('/');
    }
    Some(normalized)
}
