//! Twitter v1.1 integration.
//!
//! `auth` turns configured secrets into a signed [`AuthContext`]; `client`
//! pages through REST endpoints; `listener` and `streamer` run the filtered
//! stream into an append-only file.
pub mod auth;
pub mod client;
pub mod listener;
pub mod streamer;
pub mod types;

pub use auth::{AuthContext, AuthError, Authenticator};
pub use client::{Endpoint, FetchError, PageStream, Subject, TwitterClient, collect};
pub use listener::{CloseReason, ListenerState, StreamListener, StreamWriteError};
pub use streamer::{StreamError, StreamOutcome, StreamSummary, Streamer};
pub use types::{Post, User};
