//! Redirect following.
//!
//! Follows upstream 3xx responses the way a browser `fetch` with
//! `redirect: "follow"` does. Locations are never rewritten.
//!
//! # Rules
//! - 301/302 after POST, and 303 after anything but GET/HEAD, continue as
//!   GET without a body
//! - 307/308 repeat the method and body; a streamed body cannot be
//!   replayed, so such a redirect is returned to the client instead
//! - A redirect to https is returned to the client; the transport only
//!   speaks plain http
//! - Authorization is dropped when the redirect leaves the origin
//! - Host follows the redirect target

use std::future::Future;

use axum::body::{Body, HttpBody};
use axum::http::{header, HeaderMap, HeaderValue, Method, Request, Response, StatusCode, Uri};
use url::Url;

use crate::config::UpstreamConfig;
use crate::proxy::transport::TransportError;

/// Headers describing a request body, removed when the body is dropped.
const BODY_HEADERS: [header::HeaderName; 5] = [
    header::CONTENT_LENGTH,
    header::CONTENT_TYPE,
    header::CONTENT_ENCODING,
    header::CONTENT_LANGUAGE,
    header::CONTENT_LOCATION,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedirectPolicy {
    pub follow: bool,
    pub max_redirects: usize,
}

impl Default for RedirectPolicy {
    fn default() -> Self {
        Self {
            follow: true,
            max_redirects: 20,
        }
    }
}

impl From<&UpstreamConfig> for RedirectPolicy {
    fn from(config: &UpstreamConfig) -> Self {
        Self {
            follow: config.follow_redirects,
            max_redirects: config.max_redirects,
        }
    }
}

/// Send `request` through `send`, following redirects per `policy`.
pub async fn follow<F, Fut>(
    request: Request<Body>,
    policy: RedirectPolicy,
    mut send: F,
) -> Result<Response<Body>, TransportError>
where
    F: FnMut(Request<Body>) -> Fut,
    Fut: Future<Output = Result<Response<Body>, TransportError>>,
{
    if !policy.follow {
        return send(request).await;
    }

    let (parts, body) = request.into_parts();
    let mut method = parts.method;
    let mut uri = parts.uri;
    let mut headers = parts.headers;
    let mut replayable = body.size_hint().exact() == Some(0);
    let mut body = Some(body);
    let mut redirects = 0;

    loop {
        let mut request = Request::new(body.take().unwrap_or_else(Body::empty));
        *request.method_mut() = method.clone();
        *request.uri_mut() = uri.clone();
        *request.headers_mut() = headers.clone();

        let response = send(request).await?;
        let Some(location) = redirect_location(&response) else {
            return Ok(response);
        };

        let to_get = match response.status() {
            StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND => method == Method::POST,
            StatusCode::SEE_OTHER => method != Method::GET && method != Method::HEAD,
            _ => false,
        };
        if !to_get && !replayable {
            tracing::debug!(status = %response.status(), "Redirect needs the request body again, returning it");
            return Ok(response);
        }

        if redirects == policy.max_redirects {
            return Err(TransportError::TooManyRedirects(policy.max_redirects));
        }

        let current = to_url(&uri).ok_or_else(|| TransportError::InvalidRedirect(uri.to_string()))?;
        let next = resolve(&current, location)?;
        if next.scheme() != "http" {
            tracing::debug!(location = %next, "Redirect leaves plain http, returning it");
            return Ok(response);
        }
        redirects += 1;

        if to_get {
            method = Method::GET;
            replayable = true;
            for name in &BODY_HEADERS {
                headers.remove(name);
            }
        }
        if current.origin() != next.origin() {
            headers.remove(header::AUTHORIZATION);
        }
        set_host(&mut headers, &next);

        tracing::debug!(
            status = %response.status(),
            location = %next,
            hop = redirects,
            "Following upstream redirect"
        );
        uri = Uri::try_from(next.as_str())
            .map_err(|_| TransportError::InvalidRedirect(next.to_string()))?;
    }
}

fn redirect_location(response: &Response<Body>) -> Option<&HeaderValue> {
    match response.status() {
        StatusCode::MOVED_PERMANENTLY
        | StatusCode::FOUND
        | StatusCode::SEE_OTHER
        | StatusCode::TEMPORARY_REDIRECT
        | StatusCode::PERMANENT_REDIRECT => response.headers().get(header::LOCATION),
        _ => None,
    }
}

fn to_url(uri: &Uri) -> Option<Url> {
    Url::parse(&uri.to_string()).ok()
}

fn resolve(current: &Url, location: &HeaderValue) -> Result<Url, TransportError> {
    let raw = String::from_utf8_lossy(location.as_bytes());
    let invalid = || TransportError::InvalidRedirect(raw.to_string());

    let location = location.to_str().map_err(|_| invalid())?;
    let next = current.join(location).map_err(|_| invalid())?;
    match next.scheme() {
        "http" | "https" => Ok(next),
        _ => Err(invalid()),
    }
}

fn set_host(headers: &mut HeaderMap, url: &Url) {
    if let Some(value) = url.host_str().and_then(|h| HeaderValue::from_str(h).ok()) {
        headers.insert(header::HOST, value);
    }
}
