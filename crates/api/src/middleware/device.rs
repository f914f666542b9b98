//! Device binding extractor.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::header::{AsHeaderName, USER_AGENT};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use usermgmt_core::device::DeviceInfo;

/// Header carrying the client-chosen device identifier.
pub const DEVICE_ID_HEADER: &str = "x-device-id";

/// Header set by reverse proxies; the first entry is the originating client.
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// The requesting device, read from headers.
///
/// Values are taken verbatim; missing headers become empty strings. Whether
/// an empty device is acceptable is decided by the session manager.
#[derive(Debug, Clone)]
pub struct Device(pub DeviceInfo);

impl<S> FromRequestParts<S> for Device
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header_value(&parts.headers, DEVICE_ID_HEADER);
        let user_agent = header_value(&parts.headers, USER_AGENT);
        let ip = forwarded_ip(&parts.headers)
            .or_else(|| {
                parts
                    .extensions
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip().to_string())
            })
            .unwrap_or_default();

        Ok(Device(DeviceInfo::new(id, user_agent, ip)))
    }
}

fn header_value(headers: &HeaderMap, name: impl AsHeaderName) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_default()
}

fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get(FORWARDED_FOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
