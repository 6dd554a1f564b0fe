//! Column projection of fetched posts, in fetch order.
use crate::sentiment::{PolarityScorer, Sentiment, classify_sentiment};
use chrono::{DateTime, Utc};
use murmur_social::Post;
use serde::Serialize;
use std::fmt;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const TWEET_WIDTH: usize = 40;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostRow {
    pub tweets: String,
    pub id: u64,
    /// Length of `tweets` in characters.
    pub len: usize,
    pub date: DateTime<Utc>,
    pub source: String,
    pub likes: u64,
    pub retweets: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
}

impl PostRow {
    fn from_post(post: &Post) -> Self {
        Self {
            tweets: post.text.clone(),
            id: post.id,
            len: post.text.chars().count(),
            date: post.created_at,
            source: client_name(&post.source).to_string(),
            likes: post.favorite_count,
            retweets: post.retweet_count,
            sentiment: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Likes,
    Retweets,
}

impl Metric {
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Likes => "likes",
            Metric::Retweets => "retweets",
        }
    }

    fn of(&self, row: &PostRow) -> u64 {
        match self {
            Metric::Likes => row.likes,
            Metric::Retweets => row.retweets,
        }
    }
}

/// Aggregate figures; every statistic is `None` for an empty table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub rows: usize,
    pub mean_len: Option<f64>,
    pub max_likes: Option<u64>,
    pub max_retweets: Option<u64>,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn or_dash<T: fmt::Display>(v: Option<T>) -> String {
            v.map(|v| v.to_string()).unwrap_or_else(|| "-".into())
        }
        writeln!(f, "rows:         {}", self.rows)?;
        writeln!(
            f,
            "mean length:  {}",
            or_dash(self.mean_len.map(|m| format!("{m:.2}")))
        )?;
        writeln!(f, "max likes:    {}", or_dash(self.max_likes))?;
        write!(f, "max retweets: {}", or_dash(self.max_retweets))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PostTable {
    rows: Vec<PostRow>,
    /// Set once the sentiment column exists, even with zero rows.
    #[serde(skip)]
    annotated: bool,
}

/// One row per post, same order, no filtering.
pub fn to_table(posts: &[Post]) -> PostTable {
    PostTable {
        rows: posts.iter().map(PostRow::from_post).collect(),
        annotated: false,
    }
}

impl PostTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[PostRow] {
        &self.rows
    }

    pub fn has_sentiment(&self) -> bool {
        self.annotated
    }

    /// Fill the `sentiment` column from each row's own text.
    pub fn annotate_sentiment(&mut self, scorer: &dyn PolarityScorer) {
        for row in &mut self.rows {
            row.sentiment = Some(classify_sentiment(&row.tweets, scorer));
        }
        self.annotated = true;
        tracing::debug!(target: "murmur.analysis", rows = self.rows.len(), "table.annotated");
    }

    /// The first `n` rows as their own table.
    pub fn head(&self, n: usize) -> PostTable {
        PostTable {
            rows: self.rows.iter().take(n).cloned().collect(),
            annotated: self.annotated,
        }
    }

    pub fn summary(&self) -> Summary {
        let mean_len = (!self.rows.is_empty()).then(|| {
            self.rows.iter().map(|r| r.len as f64).sum::<f64>() / self.rows.len() as f64
        });
        Summary {
            rows: self.rows.len(),
            mean_len,
            max_likes: self.rows.iter().map(|r| r.likes).max(),
            max_retweets: self.rows.iter().map(|r| r.retweets).max(),
        }
    }

    /// `(date, value)` pairs in row order.
    pub fn series(&self, metric: Metric) -> Vec<(DateTime<Utc>, u64)> {
        self.rows.iter().map(|r| (r.date, metric.of(r))).collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for PostTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut header = vec![
            "", "tweets", "id", "len", "date", "source", "likes", "retweets",
        ];
        let with_sentiment = self.has_sentiment();
        if with_sentiment {
            header.push("sentiment");
        }

        let body: Vec<Vec<String>> = self
            .rows
            .iter()
            .enumerate()
            .map(|(idx, r)| {
                let mut cells = vec![
                    idx.to_string(),
                    truncate(&r.tweets, TWEET_WIDTH),
                    r.id.to_string(),
                    r.len.to_string(),
                    r.date.format(DATE_FORMAT).to_string(),
                    r.source.clone(),
                    r.likes.to_string(),
                    r.retweets.to_string(),
                ];
                if with_sentiment {
                    cells.push(r.sentiment.map(|s| s.to_string()).unwrap_or_default());
                }
                cells
            })
            .collect();

        let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
        for cells in &body {
            for (w, cell) in widths.iter_mut().zip(cells) {
                *w = (*w).max(cell.chars().count());
            }
        }

        let line = |f: &mut fmt::Formatter<'_>, cells: &[&str]| -> fmt::Result {
            let padded: Vec<String> = cells
                .iter()
                .zip(&widths)
                .enumerate()
                .map(|(col, (cell, &w))| {
                    // text columns left-aligned, numbers right-aligned
                    if col == 1 || col == 5 || col == 8 {
                        format!("{cell:<w$}")
                    } else {
                        format!("{cell:>w$}")
                    }
                })
                .collect();
            writeln!(f, "{}", padded.join("  ").trim_end())
        };

        line(f, &header[..])?;
        for cells in &body {
            let refs: Vec<&str> = cells.iter().map(String::as_str).collect();
            line(f, &refs[..])?;
        }
        write!(f, "[{} rows x {} columns]", self.rows.len(), header.len() - 1)
    }
}

/// Anchor text of an HTML `source` attribute, or the value as-is.
fn client_name(source: &str) -> &str {
    if !source.starts_with('<') {
        return source;
    }
    source
        .split_once('>')
        .and_then(|(_, rest)| rest.split_once('<'))
        .map(|(name, _)| name)
        .unwrap_or(source)
}

fn truncate(text: &str, width: usize) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .collect();
    if flat.chars().count() <= width {
        return flat;
    }
    let mut cut: String = flat.chars().take(width.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}
