//! Cadence Remote
//!
//! Session manager for an external remote-control playback endpoint.
//!
//! # Features
//!
//! - **Connection lifecycle**: `Disconnected → Connecting → Connected`, observable
//!   through a watch channel
//! - **Retry**: exponential backoff for the connect step only, cancellable
//! - **Commands**: `play`, `pause`, `resume`, dispatched at most once
//! - **State**: one-shot `current_state` reads and a cancellable stream of
//!   [`PlayerState`] updates
//! - **HTTP transport**: polling client for Web-API-style player endpoints
//!
//! # Example
//!
//! ```ignore
//! use cadence_remote::{HttpTransport, HttpTransportConfig, RemoteSession, RetryPolicy};
//! use futures_util::StreamExt;
//! use tokio_util::sync::CancellationToken;
//!
//! let transport = HttpTransport::new(HttpTransportConfig::new("https://api.example.com/v1"))?;
//! let session = RemoteSession::new(transport);
//!
//! session
//!     .connect_with_retry(&RetryPolicy::default(), &CancellationToken::new())
//!     .await?;
//! session.play("remote:track:4uLU6hMCjMI75M1A2tKUQC").await?;
//!
//! let mut states = session.player_state_stream().await?;
//! while let Some(state) = states.next().await {
//!     println!("{:?}", state?);
//! }
//! ```
//!
//! [`PlayerState`]: cadence_core::PlayerState

mod error;
mod http;
mod session;
mod stream;
mod transport;

pub use error::{RemoteError, Result};
pub use http::{HttpTransport, HttpTransportConfig};
pub use session::{ConnectionState, RemoteSession, RetryPolicy};
pub use stream::PlayerStateStream;
pub use transport::{RemoteTransport, StateSender, Subscription};
