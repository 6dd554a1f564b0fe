use murmur_config::MurmurConfigLoader;
use serial_test::serial;
use std::{fs, path::PathBuf};
use tempfile::TempDir;

/// Helper to write a YAML file in a temp dir and return its path.
fn write_yaml(tmp: &TempDir, name: &str, yaml: &str) -> PathBuf {
    let p = tmp.path().join(name);
    fs::write(&p, yaml).expect("write yaml");
    p
}

const FILE_YAML: &str = r#"
credentials:
  consumer_key: "${TWITTER_CONSUMER_KEY}"
  consumer_secret: "${TWITTER_CONSUMER_SECRET}"
  access_token: "${TWITTER_ACCESS_TOKEN}"
  access_token_secret: "${TWITTER_ACCESS_TOKEN_SECRET}"
batch:
  screen_name: "rustlang"
  count: 50
stream:
  output_file: "/tmp/murmur-stream.json"
  track: ["rust", "ferris"]
  echo: true
logging:
  format: json
"#;

#[test]
#[serial]
fn test_config_load() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(&tmp, "murmur.yaml", FILE_YAML);

    temp_env::with_vars(
        [
            ("TWITTER_CONSUMER_KEY", Some("ck")),
            ("TWITTER_CONSUMER_SECRET", Some("cs")),
            ("TWITTER_ACCESS_TOKEN", Some("at")),
            ("TWITTER_ACCESS_TOKEN_SECRET", Some("ats")),
        ],
        || {
            let config = MurmurConfigLoader::new()
                .with_file(&p)
                .load()
                .expect("load murmur config");

            assert_eq!(config.credentials.consumer_key, "ck");
            assert_eq!(config.credentials.access_token_secret, "ats");
            assert_eq!(config.batch.screen_name, "rustlang");
            assert_eq!(config.batch.count, 50);
            assert_eq!(config.batch.head, 10);
            assert_eq!(config.stream.track, vec!["rust", "ferris"]);
            assert_eq!(config.stream.channel_capacity, 256);
            assert!(config.stream.echo);
            assert_eq!(config.logging.format, "json");
            assert!(config.api.verify_credentials);
        },
    );
}

#[test]
#[serial]
fn env_overrides_file_values() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(&tmp, "murmur.yaml", FILE_YAML);

    temp_env::with_vars(
        [
            ("TWITTER_CONSUMER_KEY", Some("ck")),
            ("TWITTER_CONSUMER_SECRET", Some("cs")),
            ("TWITTER_ACCESS_TOKEN", Some("at")),
            ("TWITTER_ACCESS_TOKEN_SECRET", Some("ats")),
            ("MURMUR__BATCH__COUNT", Some("7")),
            ("MURMUR__API__VERIFY_CREDENTIALS", Some("false")),
        ],
        || {
            let config = MurmurConfigLoader::new()
                .with_file(&p)
                .load()
                .expect("load murmur config");

            assert_eq!(config.batch.count, 7);
            assert!(!config.api.verify_credentials);
            assert_eq!(config.batch.screen_name, "rustlang");
        },
    );
}

#[test]
#[serial]
fn missing_file_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let result = MurmurConfigLoader::new()
        .with_file(tmp.path().join("absent.yaml"))
        .load();
    assert!(result.is_err());
}
