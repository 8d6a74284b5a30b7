#![cfg_attr(doc, doc = include_str!("../README.md"))]

pub mod auth;
pub mod error;
pub mod p2p;

use reqwest::header::HeaderMap;
use reqwest::{Client as ReqwestClient, Request};
use serde_json::Value;

use crate::error::Error;
use crate::p2p::Response;

pub type Result<T> = std::result::Result<T, Error>;

/// Milliseconds since the Unix epoch, as sent in `X-BAPI-TIMESTAMP`.
pub type Timestamp = i64;

pub const MAINNET_SUBDOMAIN: &str = "api";
pub const TESTNET_SUBDOMAIN: &str = "api-testnet";
pub const DEFAULT_DOMAIN: &str = "bybit";
pub const DEFAULT_TLD: &str = "com";

/// Default `X-BAPI-RECV-WINDOW`, in milliseconds.
pub const DEFAULT_RECV_WINDOW: u64 = 20_000;

/// Sends `request` and interprets the Bybit response envelope.
///
/// A non-success HTTP status becomes [`error::Kind::Status`] with the raw body, or an empty
/// message when the body cannot be read. A success
/// status whose envelope carries a non-zero return code becomes [`error::Kind::Api`].
pub(crate) async fn request(
    client: &ReqwestClient,
    mut request: Request,
    headers: Option<HeaderMap>,
) -> Result<Response> {
    let method = request.method().clone();
    let path = request.url().path().to_owned();

    if let Some(h) = headers {
        *request.headers_mut() = h;
    }

    let response = client.execute(request).await?;
    let status_code = response.status();

    if !status_code.is_success() {
        let message = match response.text().await {
            Ok(text) => text,
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    status = %status_code,
                    path = %path,
                    error = %_e,
                    "unable to read error response body"
                );
                String::new()
            }
        };

        #[cfg(feature = "tracing")]
        tracing::warn!(
            status = %status_code,
            method = %method,
            path = %path,
            body = %message,
            "API request failed"
        );

        return Err(Error::status(status_code, method, path, message));
    }

    let body = response.bytes().await?;
    let envelope: Response = serde_json::from_slice(&body).inspect_err(|_e| {
        #[cfg(feature = "tracing")]
        tracing::warn!(
            path = %path,
            body = %String::from_utf8_lossy(&body),
            error = %_e,
            "unable to decode response envelope"
        );
    })?;

    if envelope.ret_code != 0 {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            path = %path,
            ret_code = envelope.ret_code,
            ret_msg = %envelope.ret_msg,
            "API returned non-zero code"
        );

        return Err(Error::api(envelope.ret_code, envelope.ret_msg));
    }

    Ok(envelope)
}

/// Decodes a JSON value into `T`, reporting the failing path when `tracing` is enabled.
pub(crate) fn from_value<T: serde::de::DeserializeOwned>(value: Value) -> Result<T> {
    #[cfg(feature = "tracing")]
    let decoded = serde_path_to_error::deserialize(value)?;
    #[cfg(not(feature = "tracing"))]
    let decoded = serde_json::from_value(value)?;

    Ok(decoded)
}
