//! Extractors shared by handlers.

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use crate::domain::click_event::RequestMetadata;
use crate::domain::entities::Account;
use crate::error::AppError;
use crate::state::{AppState, RequestContext};

/// Longest header value copied into a click event.
const MAX_HEADER_LEN: usize = 1024;

/// Raw client metadata for click recording.
///
/// Never rejects: anything missing or unreadable is left as `None`.
#[derive(Debug, Clone)]
pub struct ClientMetadata(pub RequestMetadata);

impl FromRequestParts<AppState> for ClientMetadata {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        Ok(Self(request_metadata(
            &parts.headers,
            peer,
            &state.request_context,
        )))
    }
}

/// Builds [`RequestMetadata`] from headers and the socket peer address.
pub fn request_metadata(
    headers: &HeaderMap,
    peer: Option<IpAddr>,
    context: &RequestContext,
) -> RequestMetadata {
    let ip = if context.behind_proxy {
        forwarded_ip(headers).or(peer)
    } else {
        peer
    };

    RequestMetadata {
        ip,
        user_agent: header_string(headers, header::USER_AGENT.as_str()),
        referer: header_string(headers, header::REFERER.as_str()),
        country_hint: context
            .country_header
            .as_ref()
            .and_then(|name| header_string(headers, name.as_str())),
    }
}

/// First address of `X-Forwarded-For`, falling back to `X-Real-IP`.
fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|v| v.trim().parse().ok())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok())
        })
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    let value = headers.get(name)?.to_str().ok()?.trim();
    if value.is_empty() {
        return None;
    }
    Some(value.chars().take(MAX_HEADER_LEN).collect())
}

/// The authenticated account, placed in request extensions by
/// [`crate::api::middleware::auth::layer`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Account);

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Account>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| {
                AppError::unauthorized(
                    "Unauthorized",
                    serde_json::json!({ "reason": "Authentication required" }),
                )
            })
    }
}
