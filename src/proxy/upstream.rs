//! Fetch an allowed request from its destination and relay the body.

use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, Url};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{info, warn};

use super::response;
use crate::error::{DlpGateError, Result};

/// An allowed request to be sent upstream.
#[derive(Debug, Clone)]
pub struct Forward {
    pub method: Method,
    pub url: Url,
    pub content_type: Option<String>,
    pub body: Option<Vec<u8>>,
}

impl Forward {
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            content_type: None,
            body: None,
        }
    }

    pub fn post(url: Url, content_type: Option<String>, body: Vec<u8>) -> Self {
        Self {
            method: Method::POST,
            url,
            content_type,
            body: Some(body),
        }
    }
}

/// Build the shared upstream client.
///
/// System proxy settings are ignored so the proxy never loops through itself.
pub fn build_client(timeout: std::time::Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(timeout)
        .build()
        .map_err(|e| DlpGateError::Proxy(e.to_string()))
}

/// Send `forward` upstream and stream the response body to `client`.
///
/// Errors are only returned before anything has been written to `client`;
/// failures during the body stream are logged and end the response early.
pub async fn fetch_and_relay<W>(
    client: &mut W,
    http: &reqwest::Client,
    forward: Forward,
) -> Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let url = forward.url.clone();
    let mut request = http.request(forward.method, forward.url);
    if let Some(ct) = forward.content_type {
        request = request.header(CONTENT_TYPE, ct);
    }
    if let Some(body) = forward.body {
        request = request.body(body);
    }

    let mut upstream = request.send().await.map_err(map_reqwest_error)?;
    let status = upstream.status();
    if status.is_client_error() || status.is_server_error() {
        return Err(DlpGateError::Upstream(format!("{} returned {}", url, status)));
    }

    let content_type = upstream
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    response::write_relay_head(client, content_type.as_deref()).await?;

    let mut relayed: u64 = 0;
    loop {
        match upstream.chunk().await {
            Ok(Some(chunk)) => {
                client.write_all(&chunk).await?;
                relayed += chunk.len() as u64;
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Error streaming response from {}: {}", url, e);
                break;
            }
        }
    }
    client.flush().await?;
    info!("Relayed {} bytes from {}", relayed, url);
    Ok(relayed)
}

fn map_reqwest_error(err: reqwest::Error) -> DlpGateError {
    if err.is_timeout() {
        DlpGateError::UpstreamTimeout
    } else {
        DlpGateError::Upstream(err.to_string())
    }
}
