//! OAuth 1.0a request signing (HMAC-SHA1), as required by the v1.1 REST and
//! streaming endpoints.
//!
//! The signer owns the four user-context secrets and produces the value of the
//! `Authorization` header for one concrete request. Query parameters already
//! present on the URL and form-encoded body parameters both take part in the
//! signature base string.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::{Method, Url};
use sha1::Sha1;
use std::fmt;

type HmacSha1 = Hmac<Sha1>;

/// RFC 3986 unreserved characters stay literal; everything else is encoded.
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encode a value the way OAuth 1.0a expects.
///
/// ```
/// assert_eq!(
///     murmur_http::oauth::percent_encode("Ladies + Gentlemen"),
///     "Ladies%20%2B%20Gentlemen"
/// );
/// ```
pub fn percent_encode(raw: &str) -> String {
    utf8_percent_encode(raw, OAUTH_ENCODE_SET).to_string()
}

/// The four user-context secrets.
#[derive(Clone)]
pub struct OAuth1Keys {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub token: String,
    pub token_secret: String,
}

impl fmt::Debug for OAuth1Keys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth1Keys")
            .field("consumer_key", &"<redacted>")
            .field("consumer_secret", &"<redacted>")
            .field("token", &"<redacted>")
            .field("token_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct OAuth1Signer {
    keys: OAuth1Keys,
}

impl OAuth1Signer {
    pub fn new(keys: OAuth1Keys) -> Self {
        Self { keys }
    }

    /// Build the `Authorization` header value with a fresh nonce and timestamp.
    pub fn authorization(&self, method: &Method, url: &Url, params: &[(&str, &str)]) -> String {
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        let timestamp = chrono::Utc::now().timestamp().max(0) as u64;
        self.authorization_with(method, url, params, &nonce, timestamp)
    }

    pub(crate) fn authorization_with(
        &self,
        method: &Method,
        url: &Url,
        params: &[(&str, &str)],
        nonce: &str,
        timestamp: u64,
    ) -> String {
        let timestamp = timestamp.to_string();
        let oauth_params: [(&str, &str); 6] = [
            ("oauth_consumer_key", self.keys.consumer_key.as_str()),
            ("oauth_nonce", nonce),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", timestamp.as_str()),
            ("oauth_token", self.keys.token.as_str()),
            ("oauth_version", "1.0"),
        ];

        let signature = self.sign(method, url, params, &oauth_params);

        let mut header: Vec<(&str, String)> = oauth_params
            .iter()
            .map(|(k, v)| (*k, percent_encode(v)))
            .collect();
        header.push(("oauth_signature", percent_encode(&signature)));
        header.sort_by(|a, b| a.0.cmp(b.0));

        let rendered = header
            .iter()
            .map(|(k, v)| format!("{k}=\"{v}\""))
            .collect::<Vec<_>>()
            .join(", ");
        format!("OAuth {rendered}")
    }

    fn sign(
        &self,
        method: &Method,
        url: &Url,
        params: &[(&str, &str)],
        oauth_params: &[(&str, &str)],
    ) -> String {
        let base = signature_base_string(method, url, params, oauth_params);
        let key = format!(
            "{}&{}",
            percent_encode(&self.keys.consumer_secret),
            percent_encode(&self.keys.token_secret)
        );
        let mut mac =
            HmacSha1::new_from_slice(key.as_bytes()).expect("HMAC can take key of any size");
        mac.update(base.as_bytes());
        STANDARD.encode(mac.finalize().into_bytes())
    }
}

fn signature_base_string(
    method: &Method,
    url: &Url,
    params: &[(&str, &str)],
    oauth_params: &[(&str, &str)],
) -> String {
    let mut encoded: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (percent_encode(&k), percent_encode(&v)))
        .chain(
            params
                .iter()
                .chain(oauth_params.iter())
                .map(|(k, v)| (percent_encode(k), percent_encode(v))),
        )
        .collect();
    encoded.sort();

    let param_string = encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut base_url = url.clone();
    base_url.set_query(None);
    base_url.set_fragment(None);

    format!(
        "{}&{}&{}",
        method.as_str().to_ascii_uppercase(),
        percent_encode(base_url.as_str()),
        percent_encode(&param_string)
    )
}
