//! HTTP transport tests.
//!
//! These tests use mock servers to verify transport behavior without
//! requiring a real remote player.

use cadence_remote::{
    ConnectionState, HttpTransport, HttpTransportConfig, RemoteError, RemoteSession,
    RemoteTransport,
};
use futures_util::StreamExt;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transport_for(server: &MockServer) -> HttpTransport {
    let config = HttpTransportConfig::new(format!("{}/v1", server.uri()))
        .with_access_token("test-token")
        .with_poll_interval(Duration::from_millis(20));
    HttpTransport::new(config).unwrap()
}

async fn mount_player_check(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v1/me/player"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "is_playing": false })))
        .mount(server)
        .await;
}

// =============================================================================
// Commands
// =============================================================================

mod commands {
    use super::*;

    #[tokio::test]
    async fn test_open_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/me/player"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        transport_for(&server).open().await.unwrap();
    }

    #[tokio::test]
    async fn test_play_sends_uri_list() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/me/player/play"))
            .and(body_json(json!({ "uris": ["remote:track:abc"] })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        transport_for(&server).play("remote:track:abc").await.unwrap();
    }

    #[tokio::test]
    async fn test_pause_and_resume() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/me/player/pause"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/v1/me/player/play"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let transport = transport_for(&server);
        transport.pause().await.unwrap();
        transport.resume().await.unwrap();
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_auth_failed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/me/player"))
            .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
            .mount(&server)
            .await;

        match transport_for(&server).open().await {
            Err(RemoteError::AuthFailed(msg)) => assert!(msg.contains("expired")),
            other => panic!("Expected AuthFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rate_limit_reads_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/me/player/pause"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
            .mount(&server)
            .await;

        match transport_for(&server).pause().await {
            Err(RemoteError::RateLimited { retry_after_secs }) => assert_eq!(retry_after_secs, 7),
            other => panic!("Expected RateLimited, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_server_error_keeps_status() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/me/player/play"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no active device"))
            .mount(&server)
            .await;

        match transport_for(&server).play("remote:track:x").await {
            Err(RemoteError::Server { status, message }) => {
                assert_eq!(status, 404);
                assert_eq!(message, "no active device");
            }
            other => panic!("Expected Server error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_token_fails_before_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let transport =
            HttpTransport::new(HttpTransportConfig::new(format!("{}/v1", server.uri()))).unwrap();
        assert!(matches!(
            transport.open().await,
            Err(RemoteError::AuthFailed(_))
        ));
    }
}

// =============================================================================
// Polling subscription
// =============================================================================

mod polling {
    use super::*;

    #[tokio::test]
    async fn test_fetch_state_handles_no_content() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/me/player/currently-playing"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        assert!(transport_for(&server).fetch_state().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_session_reads_current_state_once() {
        let server = MockServer::start().await;
        mount_player_check(&server).await;
        Mock::given(method("GET"))
            .and(path("/v1/me/player/currently-playing"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "is_playing": true,
                "progress_ms": 42000,
                "item": { "id": "track-7", "duration_ms": 180000 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = RemoteSession::new(transport_for(&server));
        session.connect().await.unwrap();

        let state = session.current_state().await.unwrap().unwrap();
        assert_eq!(state.track_id.as_str(), "track-7");
        assert_eq!(state.position_ms, 42_000);
        assert_eq!(state.duration_ms, 180_000);
    }

    #[tokio::test]
    async fn test_stream_emits_polled_state() {
        let server = MockServer::start().await;
        mount_player_check(&server).await;
        Mock::given(method("GET"))
            .and(path("/v1/me/player/currently-playing"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "is_playing": true,
                "progress_ms": 5000,
                "item": {
                    "id": "track-1",
                    "duration_ms": 200000,
                    "artists": [{ "name": "Artist" }],
                    "album": { "name": "Album" }
                }
            })))
            .mount(&server)
            .await;

        let session = RemoteSession::new(transport_for(&server));
        session.connect().await.unwrap();

        let mut stream = session.player_state_stream().await.unwrap();
        let state = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .expect("timed out waiting for state")
            .expect("stream ended")
            .unwrap();

        assert_eq!(state.track_id.as_str(), "track-1");
        assert_eq!(state.position_ms, 5000);
        assert_eq!(state.duration_ms, 200_000);
        assert_eq!(state.artist, "Artist");
    }

    #[tokio::test]
    async fn test_poll_failure_ends_stream_and_disconnects() {
        let server = MockServer::start().await;
        mount_player_check(&server).await;
        Mock::given(method("GET"))
            .and(path("/v1/me/player/currently-playing"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let session = RemoteSession::new(transport_for(&server));
        session.connect().await.unwrap();

        let mut stream = session.player_state_stream().await.unwrap();
        let first = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .expect("timed out waiting for error");

        assert!(matches!(first, Some(Err(RemoteError::Server { status: 503, .. }))));
        assert!(stream.next().await.is_none());
        assert_eq!(session.state(), ConnectionState::Disconnected);
    }
}
