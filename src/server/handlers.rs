//! HTTP handlers.

use super::extract::{client_ip, needs_echo};
use super::types::{
    DnssecResponse, ErrorResponse, FingerprintResponse, HealthResponse, IpResponse,
};
use super::AppState;
use crate::dns::{DnssecAlgorithm, DnssecCondition};
use crate::error::Error;
use crate::net::IpVersion;
use axum::extract::{ConnectInfo, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};

/// Error converted into a JSON response.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        let status = if e.is_input() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("Request failed: {}", self.message);
        }
        let body = ErrorResponse {
            success: false,
            error: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

/// `/api/ip` query parameters.
#[derive(Debug, Deserialize)]
pub struct IpParams {
    pub version: Option<String>,
    pub ip: Option<String>,
}

/// `/api/dnssec` query parameters.
#[derive(Debug, Deserialize)]
pub struct DnssecParams {
    pub algorithm: Option<String>,
    pub test: Option<String>,
}

/// Resolve the subject address and report everything known about it.
pub async fn ip_handler(
    State(state): State<AppState>,
    Query(params): Query<IpParams>,
    headers: HeaderMap,
    connect: Option<ConnectInfo<SocketAddr>>,
) -> Result<Json<IpResponse>, ApiError> {
    let requested = params
        .version
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .map(str::parse::<IpVersion>)
        .transpose()?;

    let explicit = params
        .ip
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| {
            v.parse::<IpAddr>()
                .map_err(|_| ApiError::bad_request(format!("Invalid IP address: {v}")))
        })
        .transpose()?;

    let subject = match explicit {
        Some(ip) => ip,
        None => {
            let detected = client_ip(&headers, connect.map(|c| c.0.ip())).map(|s| s.ip());
            let family = requested
                .or_else(|| detected.as_ref().map(IpVersion::of))
                .unwrap_or(IpVersion::V4);

            match detected {
                Some(ip) if family.matches(&ip) && !needs_echo(&ip) => ip,
                _ => match state.echo.public_ip(family).await {
                    Ok(ip) => ip,
                    Err(e) => {
                        tracing::info!("No {family} address available: {e}");
                        return Ok(Json(IpResponse::failure(family.no_connectivity_message())));
                    }
                },
            }
        }
    };

    let record = state.lookup.lookup(subject).await;
    tracing::info!(ip = %record.ip, hostname = ?record.hostname, "IP lookup");
    Ok(Json(IpResponse::found(record)))
}

/// Run one DNSSEC probe.
pub async fn dnssec_handler(
    State(state): State<AppState>,
    Query(params): Query<DnssecParams>,
) -> Result<Json<DnssecResponse>, ApiError> {
    let algorithm: DnssecAlgorithm = params
        .algorithm
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("Missing algorithm parameter"))?
        .parse()?;
    let condition: DnssecCondition = params
        .test
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("Missing test parameter"))?
        .parse()?;

    let result = state.prober.probe(algorithm, condition).await;
    Ok(Json(DnssecResponse::from(result)))
}

/// Report header-derived browser fingerprint fields.
pub async fn fingerprint_handler(headers: HeaderMap) -> Json<FingerprintResponse> {
    let get = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    };

    Json(FingerprintResponse {
        user_agent: get("user-agent"),
        accept_language: get("accept-language"),
        accept_encoding: get("accept-encoding"),
        do_not_track: get("dnt"),
        sec_ch_ua: get("sec-ch-ua"),
        sec_ch_ua_platform: get("sec-ch-ua-platform"),
        sec_ch_ua_mobile: get("sec-ch-ua-mobile"),
    })
}

/// Liveness check.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
