//! Wiring from configuration to the two run modes.
use anyhow::{Context, Result};
use murmur_analysis::{Metric, PolarityScorer, PostTable, VaderScorer, to_table};
use murmur_config::MurmurConfig;
use murmur_social::twitter::StreamOutcome;
use murmur_social::{AuthContext, Authenticator, Streamer, TwitterClient};
use std::fmt::Write as _;

const SERIES_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

async fn authenticate(cfg: &MurmurConfig) -> Result<AuthContext> {
    Authenticator::new(cfg.credentials.clone(), cfg.api.clone())
        .authenticate()
        .await
        .context("authenticating")
}

/// authenticate, fetch one page, tabulate, annotate, print.
pub async fn run_batch(cfg: &MurmurConfig, json: bool) -> Result<()> {
    let auth = authenticate(cfg).await?;
    let table = fetch_table(cfg, auth, &VaderScorer::new()).await?;

    if json {
        println!("{}", table.to_json()?);
    } else {
        print!("{}", render_report(&table, cfg.batch.head));
    }
    Ok(())
}

pub(crate) async fn fetch_table(
    cfg: &MurmurConfig,
    auth: AuthContext,
    scorer: &dyn PolarityScorer,
) -> Result<PostTable> {
    let client = TwitterClient::new(auth, &cfg.api)?;
    let posts = client
        .user_timeline_page(&cfg.batch.screen_name, cfg.batch.count as usize)
        .await
        .with_context(|| format!("fetching @{} timeline", cfg.batch.screen_name))?;
    tracing::info!(screen_name = %cfg.batch.screen_name, posts = posts.len(), "batch.fetched");

    let mut table = to_table(&posts);
    table.annotate_sentiment(scorer);
    Ok(table)
}

pub(crate) fn render_report(table: &PostTable, head: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}\n", table.head(head));
    let _ = writeln!(out, "{}\n", table.summary());
    for metric in [Metric::Likes, Metric::Retweets] {
        let _ = writeln!(out, "{}", metric.label());
        for (date, value) in table.series(metric) {
            let _ = writeln!(out, "  {}  {value}", date.format(SERIES_DATE_FORMAT));
        }
    }
    out
}

/// Stream until the listener closes or the platform ends the connection.
pub async fn run_stream(cfg: &MurmurConfig) -> Result<()> {
    let auth = authenticate(cfg).await?;
    let streamer = Streamer::new(auth, &cfg.api)?.configure(&cfg.stream);

    let summary = streamer
        .stream_filtered_by(&cfg.stream.output_file, &cfg.stream.track)
        .await
        .context("streaming")?;

    eprintln!(
        "{} records written to {} ({} write failures)",
        summary.records_written,
        cfg.stream.output_file.display(),
        summary.write_failures
    );
    outcome_result(summary.outcome)
}

/// Rejections and dropped connections fail the run; closing or ending does not.
fn outcome_result(outcome: StreamOutcome) -> Result<()> {
    match outcome {
        StreamOutcome::Rejected { status } => {
            anyhow::bail!("stream connection refused with status {status}")
        }
        StreamOutcome::Disconnected(reason) => anyhow::bail!("stream dropped: {reason}"),
        StreamOutcome::Closed(reason) => {
            tracing::info!(?reason, "stream.closed");
            Ok(())
        }
        StreamOutcome::Ended => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use murmur_config::MurmurConfigLoader;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base: &str, count: u32) -> MurmurConfig {
        config_with(base, count, "")
    }

    fn config_with(base: &str, count: u32, extra: &str) -> MurmurConfig {
        MurmurConfigLoader::new()
            .with_yaml_str(&format!(
                r#"
credentials:
  consumer_key: "ck"
  consumer_secret: "cs"
  access_token: "at"
  access_token_secret: "ats"
api:
  rest_base: "{base}"
  stream_base: "{base}"
  verify_credentials: false
batch:
  screen_name: "dota2"
  count: {count}
  head: 1
{extra}
"#
            ))
            .load()
            .unwrap()
    }

    #[tokio::test]
    async fn batch_table_is_annotated_in_fetch_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/1.1/statuses/user_timeline.json"))
            .and(query_param("screen_name", "dota2"))
            .and(query_param("count", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {
                    "id": 2, "text": "Great win @team http://x.co",
                    "created_at": "Wed Oct 10 20:19:24 +0000 2018",
                    "favorite_count": 10, "retweet_count": 4
                },
                {
                    "id": 1, "text": "patch day",
                    "created_at": "Tue Oct 09 08:00:00 +0000 2018",
                    "favorite_count": 3, "retweet_count": 9
                }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let cfg = config(&server.uri(), 2);
        let auth = authenticate(&cfg).await.unwrap();
        let scorer = |text: &str| if text == "Great win" { 0.8 } else { 0.0 };
        let table = fetch_table(&cfg, auth, &scorer).await.unwrap();

        assert_eq!(table.len(), 2);
        let report = render_report(&table, cfg.batch.head);
        assert!(report.contains("Positive"));
        assert!(report.contains("max likes:    10"));
        assert!(report.contains("max retweets: 9"));
        assert!(report.contains("  2018-10-09 08:00:00  9"));
    }

    #[tokio::test]
    async fn zero_count_prints_an_empty_table() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let cfg = config(&server.uri(), 0);
        let auth = authenticate(&cfg).await.unwrap();
        let table = fetch_table(&cfg, auth, &VaderScorer::new()).await.unwrap();

        assert!(table.is_empty());
        let report = render_report(&table, 10);
        assert!(report.contains("[0 rows x 8 columns]"));
        assert!(report.contains("mean length:  -"));
    }

    async fn stream_against(response: ResponseTemplate) -> (Result<()>, tempfile::TempDir) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/1.1/statuses/filter.json"))
            .respond_with(response)
            .expect(1)
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("tweets.json");
        let extra = format!(
            "stream:\n  output_file: \"{}\"\n  track: [\"rust\"]",
            out.display()
        );
        let cfg = config_with(&server.uri(), 0, &extra);
        (run_stream(&cfg).await, tmp)
    }

    #[tokio::test]
    async fn stream_that_ends_normally_succeeds() {
        let (result, tmp) =
            stream_against(ResponseTemplate::new(200).set_body_string("{\"id\":1}\r\n")).await;
        result.unwrap();
        let written = std::fs::read_to_string(tmp.path().join("tweets.json")).unwrap();
        assert_eq!(written, "{\"id\":1}\r\n");
    }

    #[tokio::test]
    async fn rate_limited_stream_closes_cleanly() {
        let (result, _tmp) = stream_against(ResponseTemplate::new(420)).await;
        result.unwrap();
    }

    #[tokio::test]
    async fn refused_stream_fails_the_run() {
        let (result, _tmp) = stream_against(ResponseTemplate::new(401)).await;
        let err = result.unwrap_err();
        assert!(err.to_string().contains("401"), "got {err:#}");
    }

    #[test]
    fn dropped_connection_fails_the_run() {
        let err = outcome_result(StreamOutcome::Disconnected("reset by peer".into())).unwrap_err();
        assert!(err.to_string().contains("reset by peer"));
        assert!(outcome_result(StreamOutcome::Ended).is_ok());
        assert!(
            outcome_result(StreamOutcome::Closed(
                murmur_social::twitter::CloseReason::WriteFailed
            ))
            .is_ok()
        );
    }
}
