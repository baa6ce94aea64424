//! HTTP API server.
//!
//! Provides four endpoints:
//! - `/api/ip` - caller (or explicit) address with PTR and geolocation
//! - `/api/dnssec` - one DNSSEC validation probe
//! - `/api/fingerprint` - header-derived browser fingerprint
//! - `/api/health` - liveness

pub mod echo;
pub mod extract;
pub mod handlers;
pub mod types;

use crate::config::Settings;
use crate::dns::{DnssecProber, DohClient, ReverseDnsClient};
use crate::error::{Error, Result};
use crate::geo::GeoClient;
use crate::lookup::AddressLookup;
use axum::routing::get;
use axum::Router;
use echo::EchoClient;
use std::net::SocketAddr;
use std::sync::Arc;

/// Shared state for the handlers.
#[derive(Clone)]
pub struct AppState {
    pub lookup: Arc<AddressLookup>,
    pub prober: Arc<DnssecProber>,
    pub echo: Arc<EchoClient>,
}

impl AppState {
    /// Wire up every upstream client from settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let http = settings.http_client()?;

        let lookup = AddressLookup::new(
            GeoClient::new(http.clone(), settings.geo.clone()),
            ReverseDnsClient::new(DohClient::new(http.clone(), &settings.doh.ptr_url)),
        );
        let prober = DnssecProber::new(
            DohClient::new(http.clone(), &settings.doh.dnssec_url),
            settings.dnssec_catalog(),
        );
        let echo = EchoClient::new(http, settings.echo.clone());

        Ok(Self {
            lookup: Arc::new(lookup),
            prober: Arc::new(prober),
            echo: Arc::new(echo),
        })
    }
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/ip", get(handlers::ip_handler))
        .route("/api/dnssec", get(handlers::dnssec_handler))
        .route("/api/fingerprint", get(handlers::fingerprint_handler))
        .route("/api/health", get(handlers::health_handler))
        .with_state(state)
}

/// Bind `listen` and serve until the process is stopped.
///
/// # Errors
///
/// Returns an error if the address is invalid, cannot be bound, or the
/// server fails.
pub async fn serve(settings: &Settings) -> Result<()> {
    let addr: SocketAddr = settings
        .listen
        .parse()
        .map_err(|_| Error::config(format!("Invalid listen address: {}", settings.listen)))?;
    let app = router(AppState::from_settings(settings)?);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::network(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!("Listening on http://{addr}/");
    tracing::info!("  - IP lookup: http://{addr}/api/ip?version=4");
    tracing::info!("  - DNSSEC:    http://{addr}/api/dnssec?algorithm=ed25519&test=valid");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::{DohSettings, EchoSettings, GeoSettings};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Settings pointing every upstream at one mock server.
    fn mock_settings(upstream: &MockServer) -> Settings {
        let base = upstream.uri();
        Settings {
            geo: GeoSettings {
                primary_url: format!("{base}/ipinfo"),
                primary_token: None,
                secondary_url: format!("{base}/ipapi"),
            },
            doh: DohSettings {
                ptr_url: format!("{base}/ptr"),
                dnssec_url: format!("{base}/dnssec"),
            },
            echo: EchoSettings {
                ipv4_url: format!("{base}/echo4"),
                ipv6_url: format!("{base}/echo6"),
            },
            dnssec_test_zone: Some("zone.test".to_string()),
            ..Settings::default()
        }
    }

    async fn mount_metadata(upstream: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/ipinfo/203.0.113.9/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "city": "Paris", "region": "Ile-de-France", "country": "FR",
                "org": "AS64500 Example", "timezone": "Europe/Paris"
            })))
            .mount(upstream)
            .await;
        Mock::given(method("GET"))
            .and(path("/ptr"))
            .and(query_param("name", "9.113.0.203.in-addr.arpa"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Status": 0,
                "Answer": [{"name": "x", "type": 12, "TTL": 60, "data": "host.example."}]
            })))
            .mount(upstream)
            .await;
    }

    async fn get_json(app: Router, uri: &str, headers: &[(&str, &str)]) -> (StatusCode, Value) {
        let mut builder = Request::builder().uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let response = app
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_ip_from_cf_header() {
        let upstream = MockServer::start().await;
        mount_metadata(&upstream).await;
        let app = router(AppState::from_settings(&mock_settings(&upstream)).unwrap());

        let (status, body) = get_json(
            app,
            "/api/ip",
            &[
                ("x-forwarded-for", "198.51.100.1"),
                ("x-real-ip", "198.51.100.2"),
                ("cf-connecting-ip", "203.0.113.9"),
            ],
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "success": true, "ip": "203.0.113.9", "version": 4,
                "hostname": "host.example", "city": "Paris", "region": "Ile-de-France",
                "country": "FR", "org": "AS64500 Example", "timezone": "Europe/Paris"
            })
        );
    }

    #[tokio::test]
    async fn test_ip_explicit_parameter() {
        let upstream = MockServer::start().await;
        mount_metadata(&upstream).await;
        let app = router(AppState::from_settings(&mock_settings(&upstream)).unwrap());

        let (status, body) = get_json(app, "/api/ip?ip=203.0.113.9", &[]).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["hostname"], "host.example");
    }

    #[tokio::test]
    async fn test_ip_invalid_parameters() {
        let upstream = MockServer::start().await;
        let state = AppState::from_settings(&mock_settings(&upstream)).unwrap();

        let (status, body) = get_json(router(state.clone()), "/api/ip?ip=999.1.1.1", &[]).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let (status, _) = get_json(router(state), "/api/ip?version=5", &[]).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_ip_loopback_uses_echo() {
        let upstream = MockServer::start().await;
        mount_metadata(&upstream).await;
        Mock::given(method("GET"))
            .and(path("/echo4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ip": "203.0.113.9"})))
            .mount(&upstream)
            .await;
        let app = router(AppState::from_settings(&mock_settings(&upstream)).unwrap());

        let (status, body) = get_json(app, "/api/ip", &[("x-real-ip", "127.0.0.1")]).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ip"], "203.0.113.9");
    }

    #[tokio::test]
    async fn test_ip_forwarded_for_used_directly() {
        let upstream = MockServer::start().await;
        mount_metadata(&upstream).await;
        Mock::given(method("GET"))
            .and(path("/echo4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ip": "198.51.100.7"})))
            .expect(0)
            .mount(&upstream)
            .await;
        let app = router(AppState::from_settings(&mock_settings(&upstream)).unwrap());

        let (status, body) = get_json(
            app,
            "/api/ip?version=4",
            &[("x-forwarded-for", "203.0.113.9, 10.0.0.1")],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["ip"], "203.0.113.9");
        assert_eq!(body["version"], 4);
        assert_eq!(body["hostname"], "host.example");
    }

    #[tokio::test]
    async fn test_ip_other_family_requeried_through_echo() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/echo6"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ip": "2001:db8::9"})))
            .expect(1)
            .mount(&upstream)
            .await;
        Mock::given(method("GET"))
            .and(path("/ipinfo/2001:db8::9/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "city": "Berlin", "country": "DE", "org": "AS64501 Example"
            })))
            .mount(&upstream)
            .await;
        Mock::given(method("GET"))
            .and(path("/ptr"))
            .and(query_param(
                "name",
                "9.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.8.b.d.0.1.0.0.2.ip6.arpa",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Status": 0,
                "Answer": [{"name": "x", "type": 12, "TTL": 60, "data": "v6.example."}]
            })))
            .mount(&upstream)
            .await;
        let app = router(AppState::from_settings(&mock_settings(&upstream)).unwrap());

        let (status, body) = get_json(
            app,
            "/api/ip?version=6",
            &[("cf-connecting-ip", "203.0.113.9")],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "success": true, "ip": "2001:db8::9", "version": 6,
                "hostname": "v6.example", "city": "Berlin", "country": "DE",
                "org": "AS64501 Example"
            })
        );
    }

    #[tokio::test]
    async fn test_ip_missing_ipv6_is_not_fatal() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/echo6"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&upstream)
            .await;
        let app = router(AppState::from_settings(&mock_settings(&upstream)).unwrap());

        let (status, body) = get_json(
            app,
            "/api/ip?version=6",
            &[("cf-connecting-ip", "203.0.113.9")],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"success": false, "error": "No IPv6 connectivity"})
        );
    }

    #[tokio::test]
    async fn test_dnssec_missing_passes_either_ad_state() {
        for ad in [true, false] {
            let upstream = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/dnssec"))
                .and(query_param("name", "missing.alg15.zone.test"))
                .and(query_param("do", "1"))
                .respond_with(
                    ResponseTemplate::new(200).set_body_json(json!({"Status": 0, "AD": ad})),
                )
                .mount(&upstream)
                .await;
            let app = router(AppState::from_settings(&mock_settings(&upstream)).unwrap());

            let (status, body) =
                get_json(app, "/api/dnssec?algorithm=ed25519&test=missing", &[]).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["passed"], true, "AD={ad}");
            assert_eq!(body["testType"], "missing");
            assert_eq!(body["algorithm"], "ed25519");
        }
    }

    #[tokio::test]
    async fn test_dnssec_rejects_unknown_enums() {
        let upstream = MockServer::start().await;
        let state = AppState::from_settings(&mock_settings(&upstream)).unwrap();

        let (status, body) =
            get_json(router(state.clone()), "/api/dnssec?algorithm=rsa&test=valid", &[]).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let (status, _) =
            get_json(router(state.clone()), "/api/dnssec?algorithm=ecdsa256&test=bogus", &[]).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = get_json(router(state), "/api/dnssec?test=valid", &[]).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_fingerprint_and_health() {
        let upstream = MockServer::start().await;
        let state = AppState::from_settings(&mock_settings(&upstream)).unwrap();

        let (_, body) = get_json(
            router(state.clone()),
            "/api/fingerprint",
            &[("user-agent", "Mozilla/5.0 test"), ("dnt", "1")],
        )
        .await;
        assert_eq!(body["userAgent"], "Mozilla/5.0 test");
        assert_eq!(body["doNotTrack"], "1");
        assert!(body.get("acceptLanguage").is_none());

        let (status, body) = get_json(router(state), "/api/health", &[]).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }
}
