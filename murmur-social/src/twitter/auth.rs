//! Credential-to-context exchange.
//!
//! [`Authenticator::authenticate`] checks the four secrets locally and, unless
//! disabled in [`ApiConfig`], makes one signed call to
//! `account/verify_credentials` so rejected keys fail at startup instead of on
//! the first fetch. There is exactly one attempt per call.
use crate::twitter::types::User;
use murmur_config::{ApiConfig, Credentials};
use murmur_http::{Auth, HttpClient, HttpError, OAuth1Keys, OAuth1Signer, RequestOpts};
use std::borrow::Cow;
use std::time::Duration;
use thiserror::Error;

const VERIFY_PATH: &str = "1.1/account/verify_credentials.json";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("credential `{field}` is malformed: {reason}")]
    Malformed {
        field: &'static str,
        reason: &'static str,
    },
    #[error("credentials rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("could not reach the platform to verify credentials: {0}")]
    Transport(#[source] HttpError),
}

/// Signed request context shared by the client and the streamer.
#[derive(Debug, Clone)]
pub struct AuthContext {
    signer: OAuth1Signer,
    user: Option<User>,
}

impl AuthContext {
    pub fn signer(&self) -> &OAuth1Signer {
        &self.signer
    }

    /// The account behind the credentials, when verification ran.
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub(crate) fn request_auth(&self) -> Auth<'_> {
        Auth::OAuth1(&self.signer)
    }
}

pub struct Authenticator {
    credentials: Credentials,
    api: ApiConfig,
}

impl Authenticator {
    pub fn new(credentials: Credentials, api: ApiConfig) -> Self {
        Self { credentials, api }
    }

    pub async fn authenticate(&self) -> Result<AuthContext, AuthError> {
        let keys = OAuth1Keys {
            consumer_key: sanitize_credential("consumer_key", &self.credentials.consumer_key)?,
            consumer_secret: sanitize_credential(
                "consumer_secret",
                &self.credentials.consumer_secret,
            )?,
            token: sanitize_credential("access_token", &self.credentials.access_token)?,
            token_secret: sanitize_credential(
                "access_token_secret",
                &self.credentials.access_token_secret,
            )?,
        };
        let signer = OAuth1Signer::new(keys);

        if !self.api.verify_credentials {
            tracing::debug!("auth.verify.skipped");
            return Ok(AuthContext { signer, user: None });
        }

        let http = HttpClient::new(&self.api.rest_base)
            .map_err(AuthError::Transport)?
            .with_timeout(Duration::from_secs(self.api.timeout_secs));

        let user: User = http
            .get_json(
                VERIFY_PATH,
                RequestOpts {
                    auth: Some(Auth::OAuth1(&signer)),
                    query: Some(vec![("skip_status", Cow::Borrowed("true"))]),
                    ..Default::default()
                },
            )
            .await
            .map_err(|err| match err {
                HttpError::Api {
                    status, message, ..
                } if status.is_client_error() => AuthError::Rejected {
                    status: status.as_u16(),
                    message,
                },
                other => AuthError::Transport(other),
            })?;

        tracing::info!(screen_name=%user.screen_name, user_id=user.id, "auth.verified");
        Ok(AuthContext {
            signer,
            user: Some(user),
        })
    }
}

fn sanitize_credential(field: &'static str, raw: &str) -> Result<String, AuthError> {
    let malformed = |reason| AuthError::Malformed { field, reason };

    let s = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string();

    if s.is_empty() {
        return Err(malformed("empty"));
    }
    if !s.is_ascii() {
        return Err(malformed("contains non-ASCII bytes"));
    }
    if s.bytes().any(|b| b < 0x20 || b == 0x7F) {
        return Err(malformed("contains control characters"));
    }
    if s.bytes().any(|b| b.is_ascii_whitespace()) {
        return Err(malformed("contains whitespace"));
    }
    if s.contains("${") {
        return Err(malformed("unexpanded environment placeholder"));
    }
    Ok(s)
}
