//! Response writing and violation page rendering.
//!
//! The inspection core hands over structured [`Highlight`]s; markup is built
//! only here, and every piece of request-derived text is HTML-escaped before
//! it is embedded.

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::dlp::{Highlight, InspectionVerdict, Span};
use crate::error::DlpGateError;

/// Fixed banner at the top of every violation page.
pub const BANNER: &str = "<b>DLP Policy Violation</b><br>";

/// Header carrying the class of a denial (never matched content).
pub const REASON_HEADER: &str = "X-Dlpgate-Reason";

/// Escape text for inclusion in HTML element content or quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render a highlight with flagged spans in red.
pub fn render_highlight(highlight: &Highlight) -> String {
    let mut out = String::new();
    for span in highlight.spans() {
        match span {
            Span::Plain(t) => out.push_str(&escape_html(t)),
            Span::Flagged(t) => {
                out.push_str("<font color=red>");
                out.push_str(&escape_html(t));
                out.push_str("</font>");
            }
        }
    }
    out
}

/// Render the per-field report of a non-clean verdict.
pub fn render_verdict(verdict: &InspectionVerdict) -> String {
    let mut out = String::new();
    for report in &verdict.reports {
        out.push_str(&format!(
            "<hr>HTTP POST Field = '{}'",
            escape_html(&report.field_name)
        ));
        for hit in &report.violations {
            out.push_str(&format!(
                "<br>Pattern = '{}'<br>Matches:<br>{}<br>",
                escape_html(&hit.rule_id),
                render_highlight(&hit.highlight)
            ));
        }
    }
    out
}

/// Full violation page body. `reason_html` must already be escaped.
pub fn violation_page(reason_html: &str) -> String {
    format!("{}{}", BANNER, reason_html)
}

/// Write a complete response with a fixed-length body and close semantics.
pub async fn write_response<W>(
    writer: &mut W,
    status: u16,
    reason: &str,
    headers: &[(&str, &str)],
    body: &[u8],
) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut head = format!("HTTP/1.1 {} {}\r\n", status, reason);
    for (name, value) in headers {
        head.push_str(&format!("{}: {}\r\n", name, value));
    }
    head.push_str(&format!(
        "Content-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    ));
    writer.write_all(head.as_bytes()).await?;
    writer.write_all(body).await?;
    writer.flush().await
}

/// Write a `403 Forbidden` violation page.
pub async fn write_violation<W>(
    writer: &mut W,
    reason_class: &str,
    reason_html: &str,
) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let body = violation_page(reason_html);
    write_response(
        writer,
        403,
        "Forbidden",
        &[
            ("Content-Type", "text/html; charset=utf-8"),
            (REASON_HEADER, reason_class),
        ],
        body.as_bytes(),
    )
    .await
}

/// Status line for an error that ends request handling.
pub fn error_status(err: &DlpGateError) -> (u16, &'static str) {
    match err {
        DlpGateError::BadRequest(_) => (400, "Bad Request"),
        DlpGateError::BodyTooLarge { .. } => (413, "Payload Too Large"),
        DlpGateError::Upstream(_) => (502, "Bad Gateway"),
        DlpGateError::UpstreamTimeout => (504, "Gateway Timeout"),
        _ => (500, "Internal Server Error"),
    }
}

/// Write a plain-text error response for `err`.
pub async fn write_error<W>(writer: &mut W, err: &DlpGateError) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let (status, reason) = error_status(err);
    let body = format!("{} {}: {}\n", status, reason, err);
    write_response(
        writer,
        status,
        reason,
        &[("Content-Type", "text/plain; charset=utf-8")],
        body.as_bytes(),
    )
    .await
}

/// Head of a relayed upstream response. The body follows until close.
pub async fn write_relay_head<W>(writer: &mut W, content_type: Option<&str>) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut head = String::from("HTTP/1.1 200 OK\r\n");
    if let Some(ct) = content_type {
        head.push_str(&format!("Content-Type: {}\r\n", ct));
    }
    head.push_str("Connection: close\r\n\r\n");
    writer.write_all(head.as_bytes()).await
}
