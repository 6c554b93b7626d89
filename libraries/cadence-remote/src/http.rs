//! HTTP polling transport
//!
//! Talks to a Web-API-style player:
//! - `GET  /me/player` checks the session
//! - `PUT  /me/player/play` with `{"uris": [..]}` starts a track
//! - `PUT  /me/player/play` with no body resumes
//! - `PUT  /me/player/pause` pauses
//! - `GET  /me/player/currently-playing` is polled for state updates

use crate::error::{RemoteError, Result};
use crate::transport::{RemoteTransport, Subscription};
use async_trait::async_trait;
use cadence_core::{PlayerState, TrackId};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};
use url::Url;

/// Settings for [`HttpTransport`]
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// API root, e.g. `https://api.example.com/v1`
    pub base_url: String,
    pub access_token: Option<String>,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
}

impl HttpTransportConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            access_token: None,
            poll_interval: Duration::from_secs(3),
            request_timeout: Duration::from_secs(15),
        }
    }

    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

#[derive(Debug, Deserialize)]
struct CurrentlyPlaying {
    #[serde(default)]
    is_playing: bool,
    #[serde(default)]
    progress_ms: Option<u64>,
    #[serde(default)]
    item: Option<PlayingItem>,
}

#[derive(Debug, Deserialize)]
struct PlayingItem {
    id: Option<String>,
    #[serde(default)]
    duration_ms: u64,
    #[serde(default)]
    artists: Vec<NamedRef>,
    #[serde(default)]
    album: Option<NamedRef>,
}

#[derive(Debug, Deserialize)]
struct NamedRef {
    #[serde(default)]
    name: String,
}

impl CurrentlyPlaying {
    fn into_state(self) -> Option<PlayerState> {
        let item = self.item?;
        let id = item.id?;

        let mut state = PlayerState::new(
            TrackId::new(id),
            self.is_playing,
            self.progress_ms.unwrap_or(0),
            item.duration_ms,
        );
        state.artist = item
            .artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        state.album = item.album.map(|a| a.name).unwrap_or_default();
        Some(state)
    }
}

/// HTTP transport that polls for player state
#[derive(Clone)]
pub struct HttpTransport {
    http: Client,
    base_url: String,
    access_token: Arc<RwLock<Option<String>>>,
    poll_interval: Duration,
}

impl HttpTransport {
    pub fn new(config: HttpTransportConfig) -> Result<Self> {
        if config.base_url.is_empty() {
            return Err(RemoteError::InvalidUrl("URL cannot be empty".into()));
        }

        let parsed =
            Url::parse(&config.base_url).map_err(|e| RemoteError::InvalidUrl(e.to_string()))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(RemoteError::InvalidUrl(
                "URL must start with http:// or https://".into(),
            ));
        }

        let http = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(format!("Cadence/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: Arc::new(RwLock::new(config.access_token)),
            poll_interval: config.poll_interval,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Replace the bearer token (token refresh happens elsewhere)
    pub async fn set_access_token(&self, token: Option<String>) {
        *self.access_token.write().await = token;
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        match self.access_token.read().await.as_deref() {
            Some(token) => Ok(request.bearer_auth(token)),
            None => Err(RemoteError::AuthFailed("no access token configured".into())),
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self
            .authorized(request)
            .await?
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    RemoteError::Unreachable(e.to_string())
                } else {
                    RemoteError::Request(e)
                }
            })?;

        check_status(response).await
    }

    async fn put_player(&self, path: &str, body: Option<serde_json::Value>) -> Result<()> {
        let mut request = self.http.put(self.endpoint(path));
        request = match body {
            Some(json) => request.json(&json),
            None => request.header(reqwest::header::CONTENT_LENGTH, 0),
        };
        self.send(request).await?;
        Ok(())
    }

    /// Fetch the current player state; `None` when nothing is playing
    pub async fn fetch_state(&self) -> Result<Option<PlayerState>> {
        let response = self
            .send(self.http.get(self.endpoint("/me/player/currently-playing")))
            .await?;

        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(None);
        }

        let playing: CurrentlyPlaying = serde_json::from_str(&body)
            .map_err(|e| RemoteError::Parse(format!("Failed to parse player state: {}", e)))?;

        Ok(playing.into_state())
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::UNAUTHORIZED => {
            let message = response.text().await.unwrap_or_default();
            Err(RemoteError::AuthFailed(message))
        }
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(1);
            Err(RemoteError::RateLimited { retry_after_secs })
        }
        _ => {
            let message = response.text().await.unwrap_or_default();
            Err(RemoteError::Server {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[async_trait]
impl RemoteTransport for HttpTransport {
    async fn open(&self) -> Result<()> {
        debug!(url = %self.base_url, "Checking remote player");
        self.send(self.http.get(self.endpoint("/me/player"))).await?;
        info!(url = %self.base_url, "Remote player reachable");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        // Stateless over HTTP; pollers stop via their subscription tokens
        Ok(())
    }

    async fn play(&self, uri: &str) -> Result<()> {
        self.put_player("/me/player/play", Some(serde_json::json!({ "uris": [uri] })))
            .await
    }

    async fn pause(&self) -> Result<()> {
        self.put_player("/me/player/pause", None).await
    }

    async fn resume(&self) -> Result<()> {
        self.put_player("/me/player/play", None).await
    }

    async fn current_state(&self) -> Result<Option<PlayerState>> {
        self.fetch_state().await
    }

    async fn subscribe(&self) -> Result<Subscription> {
        let (sender, subscription) = Subscription::channel(16);
        let transport = self.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(transport.poll_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    () = sender.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                match transport.fetch_state().await {
                    Ok(Some(state)) => {
                        if !sender.send(Ok(state)).await {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        sender.send(Err(e)).await;
                        break;
                    }
                }
            }

            debug!("Player state poller stopped");
        });

        Ok(subscription)
    }
}
