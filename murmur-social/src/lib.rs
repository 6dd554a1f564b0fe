//! Social platform clients for murmur.
//!
//! Only the Twitter v1.1 surface is implemented: credential verification,
//! paginated REST fetches, and the filtered live stream.
pub mod twitter;

pub use twitter::{
    AuthContext, AuthError, Authenticator, FetchError, Post, StreamError, StreamListener,
    StreamOutcome, StreamSummary, Streamer, TwitterClient, User,
};
