//! Minimal HTTP/1 client for the registration call.

use std::time::Duration;

use bytes::Bytes;
use http::{Method, Request, StatusCode, Uri};
use http_body_util::Full;
use tracing::debug;

use crate::error::RegisterError;

/// Path of the simulator's registration endpoint.
pub const REGISTRATION_PATH: &str = "/api/register/task";

/// Build the registration endpoint from the simulator's base URL.
///
/// Trailing slashes on the base are dropped so `http://sim:3000/` and
/// `http://sim:3000` resolve to the same endpoint.
pub fn registration_uri(simulator_url: &str) -> Result<Uri, RegisterError> {
    let base = simulator_url.trim().trim_end_matches('/');
    let uri: Uri = format!("{base}{REGISTRATION_PATH}")
        .parse()
        .map_err(|e: http::uri::InvalidUri| RegisterError::InvalidUrl {
            url: simulator_url.to_string(),
            reason: e.to_string(),
        })?;

    match uri.scheme_str() {
        Some("http") => {}
        Some(_) => return Err(RegisterError::UnsupportedScheme(simulator_url.to_string())),
        None => {
            return Err(RegisterError::InvalidUrl {
                url: simulator_url.to_string(),
                reason: "missing scheme".to_string(),
            });
        }
    }
    if uri.host().is_none() {
        return Err(RegisterError::InvalidUrl {
            url: simulator_url.to_string(),
            reason: "missing host".to_string(),
        });
    }
    Ok(uri)
}

/// POST a JSON body and return the response status.
///
/// The whole exchange (connect, handshake, response head) is bounded by
/// `timeout`.
pub async fn post_json(uri: &Uri, body: Bytes, timeout: Duration) -> Result<StatusCode, RegisterError> {
    let host = uri.host().ok_or_else(|| RegisterError::InvalidUrl {
        url: uri.to_string(),
        reason: "missing host".to_string(),
    })?;
    let port = uri.port_u16().unwrap_or(80);
    let addr = format!("{host}:{port}");
    let path = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");

    let exchange = async {
        let stream = tokio::net::TcpStream::connect(&addr)
            .await
            .map_err(|source| RegisterError::Connect {
                addr: addr.clone(),
                source,
            })?;

        let io = hyper_util::rt::TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io).await?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!(error = %e, "registration connection closed with error");
            }
        });

        let req = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header("host", &addr)
            .header("content-type", "application/json")
            .header("user-agent", "tapgrid-register/0.1")
            .body(Full::new(body))?;

        let resp = sender.send_request(req).await?;
        Ok::<_, RegisterError>(resp.status())
    };

    match tokio::time::timeout(timeout, exchange).await {
        Ok(result) => result,
        Err(_) => Err(RegisterError::Timeout(timeout)),
    }
}
