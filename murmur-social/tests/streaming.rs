mod common;

use murmur_config::StreamConfig;
use murmur_social::twitter::{CloseReason, StreamListener};
use murmur_social::{StreamError, StreamOutcome, Streamer};
use wiremock::matchers::{body_string_contains, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FILTER: &str = "/1.1/statuses/filter.json";

async fn streamer(server: &MockServer) -> Streamer {
    common::init_test_tracing();
    let auth = common::offline_auth().await;
    Streamer::new(auth, &common::api(&server.uri(), &server.uri()))
        .unwrap()
        .configure(&StreamConfig {
            channel_capacity: 2,
            ..StreamConfig::default()
        })
}

fn terms(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|t| t.to_string()).collect()
}

#[tokio::test]
async fn records_are_appended_verbatim_in_order() {
    let server = MockServer::start().await;
    let body = "{\"id\":1,\"text\":\"rust\"}\r\n\r\n{\"id\":2,\"text\":\"tokio\"}\r\n{\"id\":3,\"text\":\"both\"}\r\n";
    Mock::given(method("POST"))
        .and(path(FILTER))
        .and(header_exists("authorization"))
        .and(body_string_contains("track=rust%2Ctokio"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(&server)
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("tweets.json");
    let summary = streamer(&server)
        .await
        .stream_filtered_by(&out, &terms(&["rust", " tokio "]))
        .await
        .unwrap();

    assert_eq!(summary.outcome, StreamOutcome::Ended);
    assert_eq!(summary.records_written, 3);
    assert_eq!(
        std::fs::read_to_string(&out).unwrap(),
        "{\"id\":1,\"text\":\"rust\"}\r\n{\"id\":2,\"text\":\"tokio\"}\r\n{\"id\":3,\"text\":\"both\"}\r\n"
    );
}

#[tokio::test]
async fn invalid_utf8_reaches_the_file_unchanged() {
    let server = MockServer::start().await;
    let body: &[u8] = b"{\"id\":1,\"text\":\"\xff\xfe\"}\r\n{\"id\":2}\r\n";
    Mock::given(method("POST"))
        .and(path(FILTER))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(&server)
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("tweets.json");
    let summary = streamer(&server)
        .await
        .stream_filtered_by(&out, &terms(&["rust"]))
        .await
        .unwrap();

    assert_eq!(summary.records_written, 2);
    assert_eq!(std::fs::read(&out).unwrap(), body.to_vec());
}

#[tokio::test]
async fn rate_limit_closes_without_writing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(FILTER))
        .respond_with(ResponseTemplate::new(420).set_body_string("Enhance Your Calm"))
        .mount(&server)
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("tweets.json");
    let summary = streamer(&server)
        .await
        .stream_filtered_by(&out, &terms(&["rust"]))
        .await
        .unwrap();

    assert_eq!(summary.outcome, StreamOutcome::Closed(CloseReason::RateLimited));
    assert_eq!(summary.records_written, 0);
    assert!(!out.exists());
}

#[tokio::test]
async fn other_rejections_are_reported_with_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(FILTER))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&server)
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let mut listener = StreamListener::new(tmp.path().join("tweets.json"));
    let summary = streamer(&server)
        .await
        .stream_with_listener(&mut listener, &terms(&["rust"]))
        .await
        .unwrap();

    assert_eq!(summary.outcome, StreamOutcome::Rejected { status: 401 });
    assert_eq!(listener.state(), murmur_social::twitter::ListenerState::Open);
}

#[tokio::test]
async fn unusable_output_closes_the_stream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(FILTER))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"id\":1}\n{\"id\":2}\n"))
        .mount(&server)
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("missing").join("tweets.json");
    let summary = streamer(&server)
        .await
        .stream_filtered_by(&out, &terms(&["rust"]))
        .await
        .unwrap();

    assert_eq!(summary.outcome, StreamOutcome::Closed(CloseReason::WriteFailed));
    assert_eq!(summary.records_written, 0);
    assert_eq!(summary.write_failures, 1);
}

#[tokio::test]
async fn blank_track_is_refused_before_connecting() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = streamer(&server)
        .await
        .stream_filtered_by("unused.json", &terms(&["", "  "]))
        .await
        .unwrap_err();
    assert!(matches!(err, StreamError::EmptyTrack));
}
