use std::{
    net::SocketAddr,
    path::PathBuf,
    sync::Arc,
};

use andrew_core::{
    DirFs, Error, ErrorKind, SiteFiles, config::SiteConfig, feed, page::INDEX_PAGE,
    render_page_bytes,
};
use anyhow::{Context, Result};
use axum::{
    Router,
    body::Body,
    extract::State,
    http::{StatusCode, Uri, header},
    response::{IntoResponse, Response},
    routing::get,
};
use axum_server::tls_rustls::RustlsConfig;
use percent_encoding::percent_decode_str;
use tower_http::catch_panic::CatchPanicLayer;

mod metrics;

pub use metrics::{CountingMetrics, LogMetrics, MetricsSink, Outcome};

/// Configuration for the content server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Directory served as the site root
    pub content_root: PathBuf,
    /// `host:port`, or `:port` for every interface
    pub address: String,
    /// Feed metadata, including the public base URL
    pub site: SiteConfig,
    /// PEM certificate and private key; both or neither
    pub tls: Option<TlsConfig>,
}

#[derive(Debug, Clone)]
pub struct TlsConfig {
    pub cert: PathBuf,
    pub private_key: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            content_root: PathBuf::from("."),
            address: ":8080".to_string(),
            site: SiteConfig::default(),
            tls: None,
        }
    }
}

/// Serves a site tree, expanding table of contents placeholders in html
/// pages as they are requested.
pub struct AndrewServer {
    config: ServerConfig,
    files: Arc<dyn SiteFiles>,
    metrics: Arc<dyn MetricsSink>,
}

impl AndrewServer {
    /// Create a server for `config.content_root` on disk
    pub fn new(config: ServerConfig) -> Self {
        let files = Arc::new(DirFs::new(&config.content_root));
        Self::with_files(config, files)
    }

    /// Create a server over any site tree
    pub fn with_files(config: ServerConfig, files: Arc<dyn SiteFiles>) -> Self {
        Self {
            config,
            files,
            metrics: Arc::new(LogMetrics),
        }
    }

    pub fn metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn router(&self) -> Router {
        let state = AppState {
            files: self.files.clone(),
            metrics: self.metrics.clone(),
            site: Arc::new(self.config.site.clone()),
        };

        Router::new()
            .route("/sitemap.xml", get(sitemap_handler))
            .route("/rss.xml", get(rss_handler))
            .fallback(page_handler)
            .with_state(state)
            .layer(CatchPanicLayer::new())
    }

    /// Run the server until it fails
    pub async fn run(self) -> Result<()> {
        if !self.config.content_root.is_dir() {
            return Err(anyhow::anyhow!(
                "Content root is not a directory: {}",
                self.config.content_root.display()
            ));
        }

        let addr = resolve_address(&self.config.address).await?;
        let app = self.router();

        log::info!("Serving {} at {}", self.config.content_root.display(), addr);

        match &self.config.tls {
            Some(tls) => {
                let rustls = RustlsConfig::from_pem_file(&tls.cert, &tls.private_key)
                    .await
                    .with_context(|| {
                        format!(
                            "loading certificate {} and key {}",
                            tls.cert.display(),
                            tls.private_key.display()
                        )
                    })?;

                log::info!("TLS enabled with {}", tls.cert.display());
                axum_server::bind_rustls(addr, rustls)
                    .serve(app.into_make_service())
                    .await?;
            }
            None => {
                let listener = tokio::net::TcpListener::bind(addr).await?;
                axum::serve(listener, app).await?;
            }
        }

        Ok(())
    }
}

/// Turn an address such as `:8080` or `localhost:8080` into a socket
/// address. A missing host binds every interface.
pub async fn resolve_address(address: &str) -> Result<SocketAddr> {
    let address = match address.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{port}"),
        None => address.to_string(),
    };

    tokio::net::lookup_host(&address)
        .await
        .with_context(|| format!("invalid address {address}"))?
        .next()
        .ok_or_else(|| anyhow::anyhow!("address {address} did not resolve"))
}

#[derive(Clone)]
struct AppState {
    files: Arc<dyn SiteFiles>,
    metrics: Arc<dyn MetricsSink>,
    site: Arc<SiteConfig>,
}

async fn page_handler(State(state): State<AppState>, uri: Uri) -> Response {
    let Some(path) = clean_path(uri.path()) else {
        return error_response(StatusCode::BAD_REQUEST, "400 bad request");
    };

    let files = state.files.clone();
    let lookup = path.clone();
    let result = tokio::task::spawn_blocking(move || serve_file(files.as_ref(), &lookup)).await;

    match result {
        Ok(Ok((resolved, body))) => {
            state.metrics.record(&resolved, Outcome::Ok);
            content_response(content_type(&resolved), body)
        }
        Ok(Err(err)) => {
            log::debug!("{err}");
            state.metrics.record(&path, Outcome::from_error(&err));
            status_for(&err)
        }
        Err(join_err) => {
            log::error!("GET /{path}: {join_err}");
            state.metrics.record(&path, Outcome::Unknown);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "500 something went wrong")
        }
    }
}

async fn sitemap_handler(State(state): State<AppState>) -> Response {
    let files = state.files.clone();
    let base_url = state.site.base_url.clone();
    let result = tokio::task::spawn_blocking(move || feed::sitemap(files.as_ref(), &base_url)).await;

    feed_response(&state, "sitemap.xml", result)
}

async fn rss_handler(State(state): State<AppState>) -> Response {
    let files = state.files.clone();
    let site = state.site.clone();
    let result = tokio::task::spawn_blocking(move || feed::rss(files.as_ref(), &site)).await;

    feed_response(&state, "rss.xml", result)
}

fn feed_response(
    state: &AppState,
    name: &str,
    result: std::result::Result<andrew_core::Result<String>, tokio::task::JoinError>,
) -> Response {
    match result {
        Ok(Ok(xml)) => {
            state.metrics.record(name, Outcome::Ok);
            content_response("text/xml; charset=utf-8".to_string(), xml.into_bytes())
        }
        Ok(Err(err)) => {
            log::debug!("{err}");
            state.metrics.record(name, Outcome::from_error(&err));
            status_for(&err)
        }
        Err(join_err) => {
            log::error!("GET /{name}: {join_err}");
            state.metrics.record(name, Outcome::Unknown);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "500 something went wrong")
        }
    }
}

/// Read the file a cleaned request path names. Directories resolve to their
/// index page and html pages go through the table of contents engine.
fn serve_file(files: &dyn SiteFiles, path: &str) -> andrew_core::Result<(String, Vec<u8>)> {
    let resolved = if path.is_empty() || path.ends_with('/') {
        format!("{path}{INDEX_PAGE}")
    } else if files.is_dir(path) {
        format!("{path}/{INDEX_PAGE}")
    } else {
        path.to_string()
    };

    if resolved.ends_with(".html") {
        let body = render_page_bytes(files, &resolved)?;
        return Ok((resolved, body));
    }

    let body = files.read(&resolved)?;
    Ok((resolved, body))
}

/// Percent-decode a request path and resolve `.` and `..` segments against
/// the site root. The result has no leading `/` and keeps a trailing one.
/// `None` when the path does not decode to utf-8.
pub fn clean_path(raw: &str) -> Option<String> {
    let decoded = percent_decode_str(raw).decode_utf8().ok()?;

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    let mut cleaned = segments.join("/");
    if !cleaned.is_empty() && (decoded.ends_with('/') || decoded.ends_with("/.")) {
        cleaned.push('/');
    }
    Some(cleaned)
}

/// Guessed from the extension. Text types are declared utf-8.
pub fn content_type(path: &str) -> String {
    let mime = mime_guess::from_path(path).first_or_octet_stream();

    let is_text = mime.type_() == mime_guess::mime::TEXT
        || mime.essence_str() == "application/javascript";
    if is_text {
        format!("{}; charset=utf-8", mime.essence_str())
    } else {
        mime.essence_str().to_string()
    }
}

fn content_response(content_type: String, body: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, content_type)], Body::from(body)).into_response()
}

fn status_for(err: &Error) -> Response {
    match err.kind() {
        ErrorKind::NotFound => error_response(StatusCode::NOT_FOUND, "404 not found"),
        ErrorKind::PermissionDenied => error_response(StatusCode::FORBIDDEN, "403 Forbidden"),
        _ => error_response(StatusCode::INTERNAL_SERVER_ERROR, "500 something went wrong"),
    }
}

fn error_response(status: StatusCode, message: &'static str) -> Response {
    (status, message).into_response()
}
