#![allow(dead_code)]

use std::sync::OnceLock;

use murmur_common::observability::{LogConfig, LogFormat};
use murmur_config::{ApiConfig, Credentials};
use murmur_social::{AuthContext, Authenticator};

static INIT_PATH: OnceLock<std::path::PathBuf> = OnceLock::new();

pub fn init_test_tracing() {
    let _ = INIT_PATH.get_or_init(|| {
        let log_dir = std::env::temp_dir().join("murmur-tests");
        let config = LogConfig {
            app_name: "murmur-tests",
            log_dir: Some(log_dir),
            emit_stderr: false,
            format: LogFormat::Text,
            default_filter: "debug".to_string(),
        };
        murmur_common::observability::init_logging(config).unwrap_or_default()
    });
}

pub fn api(rest_base: &str, stream_base: &str) -> ApiConfig {
    ApiConfig {
        rest_base: rest_base.to_string(),
        stream_base: stream_base.to_string(),
        verify_credentials: false,
        ..ApiConfig::default()
    }
}

pub async fn offline_auth() -> AuthContext {
    let creds = Credentials {
        consumer_key: "xvz1evFS4wEEPTGEFPHBog".into(),
        consumer_secret: "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw".into(),
        access_token: "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb".into(),
        access_token_secret: "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE".into(),
    };
    Authenticator::new(creds, api("http://127.0.0.1:9", "http://127.0.0.1:9"))
        .authenticate()
        .await
        .expect("offline auth never touches the network")
}

/// A timeline status with a descending-friendly id.
pub fn status(id: u64) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "text": format!("post {id}"),
        "created_at": "Wed Oct 10 20:19:24 +0000 2018",
        "favorite_count": id % 7,
        "retweet_count": id % 3,
    })
}
