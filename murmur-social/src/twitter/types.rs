use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A v1.1 status as returned by the timeline endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: u64,
    pub text: String,
    #[serde(with = "platform_date")]
    pub created_at: DateTime<Utc>,
    /// HTML anchor naming the posting client, kept as delivered.
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub favorite_count: u64,
    #[serde(default)]
    pub retweet_count: u64,
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub screen_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub followers_count: u64,
    #[serde(default)]
    pub friends_count: u64,
    #[serde(default)]
    pub statuses_count: u64,
}

/// Cursor-paginated envelope used by the friends endpoints.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CursorPage {
    #[serde(default)]
    pub users: Vec<serde_json::Value>,
    #[serde(default)]
    pub next_cursor: i64,
}

/// `created_at` uses the platform's own layout, e.g. `Wed Oct 10 20:19:24 +0000 2018`.
pub mod platform_date {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

    pub fn parse(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        DateTime::parse_from_str(raw, FORMAT).map(|dt| dt.with_timezone(&Utc))
    }

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&dt.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }
}
