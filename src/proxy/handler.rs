use std::sync::Arc;

use reqwest::Url;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, warn};

use super::ProxyState;
use super::response;
use super::upstream::{self, Forward};
use crate::dlp::TracingObserver;
use crate::dlp::inspect;
use crate::error::{DlpGateError, Result};
use crate::form::{self, FormBody};
use crate::policy::config::Action;
use crate::policy::evaluator::{self, DENY_LIST_REASON};

const MAX_HEADERS: usize = 64;
const READ_CHUNK: usize = 4096;

/// A fully read inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundRequest {
    pub method: String,
    /// Raw request target, e.g. `/http://example.com/page`.
    pub path: String,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl InboundRequest {
    /// The destination URL embedded in the path, without the leading `/`.
    pub fn target(&self) -> &str {
        self.path.strip_prefix('/').unwrap_or(&self.path)
    }
}

/// Main accept loop: accept incoming connections and handle them.
pub async fn accept_loop(listener: TcpListener, state: Arc<ProxyState>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer_addr)) => {
                info!("New connection from {}", peer_addr);
                let state = state.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, &state).await {
                        error!("Error handling connection from {}: {}", peer_addr, e);
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}

/// Handle a single client connection carrying one request.
async fn handle_connection(mut client: TcpStream, state: &ProxyState) -> Result<()> {
    let read = tokio::time::timeout(
        state.config.client_timeout(),
        read_request(&mut client, state.config.max_header_bytes, state.config.max_body_bytes),
    )
    .await;

    let request = match read {
        Err(_) => {
            warn!("Timed out waiting for the client request");
            response::write_response(&mut client, 408, "Request Timeout", &[], b"").await?;
            return Ok(());
        }
        Ok(Ok(None)) => return Ok(()),
        Ok(Ok(Some(request))) => request,
        Ok(Err(DlpGateError::Io(e))) => return Err(DlpGateError::Io(e)),
        Ok(Err(e)) => {
            warn!("Rejected request: {}", e);
            response::write_error(&mut client, &e).await?;
            return Ok(());
        }
    };

    match handle_request(&mut client, &request, state).await {
        Ok(()) => Ok(()),
        Err(DlpGateError::Io(e)) => Err(DlpGateError::Io(e)),
        Err(e) => {
            warn!("{} {} failed: {}", request.method, request.target(), e);
            response::write_error(&mut client, &e).await?;
            Ok(())
        }
    }
}

/// Read the request head and, when declared, the body.
///
/// Returns `Ok(None)` if the client closed the connection without sending
/// anything. A missing `Content-Length` means an empty body.
pub async fn read_request<R>(
    reader: &mut R,
    max_header_bytes: usize,
    max_body_bytes: usize,
) -> Result<Option<InboundRequest>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::with_capacity(READ_CHUNK);
    let mut chunk = [0u8; READ_CHUNK];

    let (mut request, head_len, content_length) = loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            if buf.is_empty() {
                return Ok(None);
            }
            return Err(DlpGateError::BadRequest("incomplete request head".to_string()));
        }
        buf.extend_from_slice(&chunk[..n]);

        if let Some(parsed) = parse_head(&buf)? {
            break parsed;
        }
        if buf.len() > max_header_bytes {
            return Err(DlpGateError::BadRequest(format!(
                "request head exceeds {} bytes",
                max_header_bytes
            )));
        }
    };

    let declared = content_length.unwrap_or(0);
    if declared > max_body_bytes {
        return Err(DlpGateError::BodyTooLarge {
            limit: max_body_bytes,
            declared,
        });
    }

    let mut body = buf.split_off(head_len);
    body.truncate(declared);
    if body.len() < declared {
        let already = body.len();
        body.resize(declared, 0);
        reader.read_exact(&mut body[already..]).await?;
    }
    request.body = body;
    Ok(Some(request))
}

/// Parse a request head. `Ok(None)` means more bytes are needed.
fn parse_head(buf: &[u8]) -> Result<Option<(InboundRequest, usize, Option<usize>)>> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut req = httparse::Request::new(&mut headers);
    let head_len = match req.parse(buf) {
        Ok(httparse::Status::Complete(len)) => len,
        Ok(httparse::Status::Partial) => return Ok(None),
        Err(e) => return Err(DlpGateError::BadRequest(e.to_string())),
    };

    let method = req.method.unwrap_or_default().to_string();
    let path = req.path.unwrap_or_default().to_string();
    let mut content_type = None;
    let mut content_length = None;

    for header in req.headers.iter() {
        if header.name.eq_ignore_ascii_case("content-type") {
            content_type = Some(String::from_utf8_lossy(header.value).trim().to_string());
        } else if header.name.eq_ignore_ascii_case("content-length") {
            let value = String::from_utf8_lossy(header.value);
            let len = value.trim().parse::<usize>().map_err(|_| {
                DlpGateError::BadRequest(format!("invalid Content-Length '{}'", value))
            })?;
            content_length = Some(len);
        }
    }

    Ok(Some((
        InboundRequest {
            method,
            path,
            content_type,
            body: Vec::new(),
        },
        head_len,
        content_length,
    )))
}

/// Parse the destination URL out of the request path.
pub fn target_url(request: &InboundRequest) -> Result<Url> {
    let target = request.target();
    let url = Url::parse(target)
        .map_err(|e| DlpGateError::BadRequest(format!("invalid target URL '{}': {}", target, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(DlpGateError::BadRequest(format!(
            "unsupported target scheme '{}'",
            other
        ))),
    }
}

/// Apply policy to one request and write the response.
pub async fn handle_request<W>(
    client: &mut W,
    request: &InboundRequest,
    state: &ProxyState,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    match request.method.as_str() {
        "GET" => handle_get(client, request, state).await,
        "POST" => handle_post(client, request, state).await,
        other => {
            warn!("Unsupported method {} for {}", other, request.target());
            response::write_response(client, 501, "Not Implemented", &[], b"").await?;
            Ok(())
        }
    }
}

async fn handle_get<W>(client: &mut W, request: &InboundRequest, state: &ProxyState) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let result = evaluator::evaluate_url(request.target(), &state.policy);
    match result.action {
        Action::Deny => {
            warn!(
                "BLOCKED GET {} - deny-list entry '{}'",
                request.target(),
                result.matched_entry.as_deref().unwrap_or_default()
            );
            response::write_violation(client, "deny-list", &response::escape_html(DENY_LIST_REASON))
                .await?;
            Ok(())
        }
        Action::Allow => {
            let url = target_url(request)?;
            info!("ALLOWED GET {}", request.target());
            upstream::fetch_and_relay(client, &state.client, Forward::get(url)).await?;
            Ok(())
        }
    }
}

async fn handle_post<W>(client: &mut W, request: &InboundRequest, state: &ProxyState) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let url = target_url(request)?;
    let forward = || Forward::post(url.clone(), request.content_type.clone(), request.body.clone());

    match form::decode_request_body(request.content_type.as_deref(), &request.body) {
        FormBody::Undecodable(why) => match state.policy.undecodable_post {
            Action::Deny => {
                warn!("BLOCKED POST {} - {}", request.target(), why);
                let reason = format!("The request body cannot be inspected: {}.", why);
                response::write_violation(client, "undecodable-body", &response::escape_html(&reason))
                    .await?;
                Ok(())
            }
            Action::Allow => {
                info!("ALLOWED POST {} - uninspected ({})", request.target(), why);
                upstream::fetch_and_relay(client, &state.client, forward()).await?;
                Ok(())
            }
        },
        FormBody::Fields(fields) => {
            info!(
                "POST {} carries {} inspectable field(s)",
                request.target(),
                fields.len()
            );
            let verdict = inspect::inspect(&fields, &state.rules, &TracingObserver);
            if verdict.clean {
                info!("ALLOWED POST {}", request.target());
                upstream::fetch_and_relay(client, &state.client, forward()).await?;
            } else {
                warn!(
                    "BLOCKED POST {} - {} field(s) violate policy",
                    request.target(),
                    verdict.reports.len()
                );
                response::write_violation(client, "dlp-violation", &response::render_verdict(&verdict))
                    .await?;
            }
            Ok(())
        }
    }
}
