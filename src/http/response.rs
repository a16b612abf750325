//! Response synthesis.
//!
//! # Responsibilities
//! - Render the diagnostic page returned when the upstream is unreachable
//! - Map it to a 502 Bad Gateway response
//!
//! # Design Decisions
//! - Successful upstream responses are never touched here; they stream through
//! - Every interpolated value is HTML-escaped

use std::net::IpAddr;

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, SecondsFormat, Utc};

/// Snapshot of a failed forwarding attempt, rendered for operators.
#[derive(Debug, Clone)]
pub struct DiagnosticPage {
    pub reason: String,
    pub target: String,
    pub port: u16,
    pub timestamp: DateTime<Utc>,
    pub region: Option<String>,
    pub client_ip: Option<IpAddr>,
}

impl DiagnosticPage {
    /// Render the HTML body.
    pub fn render(&self) -> String {
        let reason = escape_html(&self.reason);
        let target = escape_html(&self.target);
        let region = escape_html(self.region.as_deref().unwrap_or("unknown"));
        let client_ip = self
            .client_ip
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let timestamp = self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true);
        let port = self.port;

        format!(
            r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>Proxy Error</title>
  <style>
    body {{ font-family: Arial, sans-serif; padding: 20px; }}
    .error {{ color: #d32f2f; background: #ffebee; padding: 15px; border-radius: 5px; }}
    .info {{ background: #e3f2fd; padding: 15px; border-radius: 5px; margin-top: 20px; }}
    code {{ background: #f5f5f5; padding: 2px 4px; border-radius: 3px; }}
  </style>
</head>
<body>
  <h1>Upstream connection failed</h1>
  <div class="error">
    <h3>Error: {reason}</h3>
    <p>Unable to reach the upstream server: <code>{target}</code></p>
  </div>

  <div class="info">
    <h3>Troubleshooting:</h3>
    <ol>
      <li>Check the upstream service is running: <code>systemctl status your-service</code></li>
      <li>Check the port is listening: <code>netstat -tlnp | grep :{port}</code></li>
      <li>Check the firewall: <code>sudo ufw status</code></li>
      <li>Test from the upstream host itself: <code>curl -v http://localhost:{port}</code></li>
      <li>Test from outside: <code>curl -v {target}</code></li>
    </ol>

    <h3>Debug information:</h3>
    <ul>
      <li>Request time: {timestamp}</li>
      <li>Edge region: {region}</li>
      <li>Client IP: {client_ip}</li>
    </ul>
  </div>
</body>
</html>
"#
        )
    }
}

impl IntoResponse for DiagnosticPage {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.render()));
        *response.status_mut() = StatusCode::BAD_GATEWAY;
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html"));
        response
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
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
