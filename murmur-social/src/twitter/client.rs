//! Thin wrapper around the v1.1 REST endpoints with paginated fetches.
//!
//! Timelines paginate backwards with `max_id`; the friends list uses opaque
//! `cursor` tokens. Both are surfaced as the same lazy stream: items are
//! yielded as pages arrive, the stream ends once `count` items were produced
//! or the source runs dry, and it cannot be restarted. Nothing is retried here.
use crate::twitter::auth::AuthContext;
use crate::twitter::types::{CursorPage, Post, User};
use futures::{Stream, TryStreamExt};
use murmur_config::ApiConfig;
use murmur_http::{HttpClient, HttpError, RequestOpts};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::borrow::Cow;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] HttpError),
    #[error("could not decode {endpoint} item: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Lazy, finite, non-restartable sequence of fetched items.
pub type PageStream<T> = Pin<Box<dyn Stream<Item = Result<T, FetchError>> + Send>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    UserTimeline,
    HomeTimeline,
    Friends,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pagination {
    MaxId,
    Cursor,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::UserTimeline => "1.1/statuses/user_timeline.json",
            Endpoint::HomeTimeline => "1.1/statuses/home_timeline.json",
            Endpoint::Friends => "1.1/friends/list.json",
        }
    }

    /// Largest `count` the endpoint honours per request.
    pub fn page_size(&self) -> usize {
        200
    }

    fn pagination(&self) -> Pagination {
        match self {
            Endpoint::UserTimeline | Endpoint::HomeTimeline => Pagination::MaxId,
            Endpoint::Friends => Pagination::Cursor,
        }
    }

    fn takes_subject(&self) -> bool {
        !matches!(self, Endpoint::HomeTimeline)
    }

    fn name(&self) -> &'static str {
        match self {
            Endpoint::UserTimeline => "user_timeline",
            Endpoint::HomeTimeline => "home_timeline",
            Endpoint::Friends => "friends",
        }
    }
}

/// Whose data to fetch; `None` at call sites means the authenticated account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    ScreenName(String),
    UserId(u64),
}

impl Subject {
    fn as_param(&self) -> (&'static str, Cow<'_, str>) {
        match self {
            Subject::ScreenName(name) => ("screen_name", Cow::Borrowed(name.as_str())),
            Subject::UserId(id) => ("user_id", Cow::Owned(id.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PageCursor {
    Start,
    MaxId(u64),
    Token(i64),
}

struct Page {
    items: Vec<Value>,
    next: Option<PageCursor>,
}

#[derive(Clone)]
pub struct TwitterClient {
    http: HttpClient,
    auth: Arc<AuthContext>,
    subject: Option<Subject>,
}

impl TwitterClient {
    pub fn new(auth: AuthContext, api: &ApiConfig) -> Result<Self, FetchError> {
        let http = HttpClient::new(&api.rest_base)?
            .with_timeout(Duration::from_secs(api.timeout_secs));
        Ok(Self {
            http,
            auth: Arc::new(auth),
            subject: None,
        })
    }

    /// Default subject for the typed helpers.
    pub fn with_subject(mut self, subject: Subject) -> Self {
        self.subject = Some(subject);
        self
    }

    pub fn user_timeline(&self, count: usize) -> PageStream<Post> {
        self.fetch_paged(Endpoint::UserTimeline, self.subject.as_ref(), count)
    }

    pub fn home_timeline(&self, count: usize) -> PageStream<Post> {
        self.fetch_paged(Endpoint::HomeTimeline, None, count)
    }

    pub fn friend_list(&self, count: usize) -> PageStream<User> {
        self.fetch_paged(Endpoint::Friends, self.subject.as_ref(), count)
    }

    /// One request, no pagination: the newest `count` posts of `screen_name`.
    pub async fn user_timeline_page(
        &self,
        screen_name: &str,
        count: usize,
    ) -> Result<Vec<Post>, FetchError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let subject = Subject::ScreenName(screen_name.to_string());
        let page = self
            .fetch_page(
                Endpoint::UserTimeline,
                Some(&subject),
                count.min(Endpoint::UserTimeline.page_size()),
                &PageCursor::Start,
            )
            .await?;
        page.items
            .into_iter()
            .take(count)
            .map(|raw| decode(Endpoint::UserTimeline, raw))
            .collect()
    }

    /// Request pages from `endpoint` until `count` items were yielded or the
    /// source is exhausted. The first error ends the stream.
    pub fn fetch_paged<T>(
        &self,
        endpoint: Endpoint,
        subject: Option<&Subject>,
        count: usize,
    ) -> PageStream<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let client = self.clone();
        let subject = subject.cloned();

        Box::pin(async_stream::try_stream! {
            let mut remaining = count;
            let mut cursor = PageCursor::Start;
            let mut page_idx = 0u32;

            while remaining > 0 {
                let page_size = remaining.min(endpoint.page_size());
                let page = client
                    .fetch_page(endpoint, subject.as_ref(), page_size, &cursor)
                    .await?;

                tracing::debug!(
                    target: "murmur.fetch",
                    endpoint = endpoint.name(),
                    page = page_idx,
                    items = page.items.len(),
                    remaining,
                    "fetch.page"
                );

                if page.items.is_empty() {
                    break;
                }
                for raw in page.items {
                    if remaining == 0 {
                        break;
                    }
                    let item: T = decode(endpoint, raw)?;
                    remaining -= 1;
                    yield item;
                }

                match page.next {
                    Some(next) => cursor = next,
                    None => break,
                }
                page_idx += 1;
            }
        })
    }

    async fn fetch_page(
        &self,
        endpoint: Endpoint,
        subject: Option<&Subject>,
        page_size: usize,
        cursor: &PageCursor,
    ) -> Result<Page, FetchError> {
        let mut query: Vec<(&str, Cow<'_, str>)> = vec![("count", page_size.to_string().into())];
        if endpoint.takes_subject() {
            if let Some(subject) = subject {
                query.push(subject.as_param());
            }
        }
        match (endpoint.pagination(), cursor) {
            (Pagination::MaxId, PageCursor::MaxId(max_id)) => {
                query.push(("max_id", max_id.to_string().into()));
            }
            (Pagination::Cursor, PageCursor::Token(token)) => {
                query.push(("cursor", token.to_string().into()));
            }
            (Pagination::Cursor, PageCursor::Start) => {
                query.push(("cursor", "-1".into()));
            }
            _ => {}
        }

        let opts = RequestOpts {
            auth: Some(self.auth.request_auth()),
            query: Some(query),
            ..Default::default()
        };

        match endpoint.pagination() {
            Pagination::MaxId => {
                let items: Vec<Value> = self.http.get_json(endpoint.path(), opts).await?;
                // Timelines are newest-first; continue strictly below the oldest id seen.
                let next = items
                    .iter()
                    .filter_map(|v| v.get("id").and_then(Value::as_u64))
                    .min()
                    .and_then(|oldest| oldest.checked_sub(1))
                    .map(PageCursor::MaxId);
                Ok(Page { items, next })
            }
            Pagination::Cursor => {
                let page: CursorPage = self.http.get_json(endpoint.path(), opts).await?;
                let next = (page.next_cursor != 0).then_some(PageCursor::Token(page.next_cursor));
                Ok(Page {
                    items: page.users,
                    next,
                })
            }
        }
    }
}

fn decode<T: DeserializeOwned>(endpoint: Endpoint, raw: Value) -> Result<T, FetchError> {
    serde_json::from_value(raw).map_err(|source| FetchError::Decode {
        endpoint: endpoint.name(),
        source,
    })
}

/// Drain a [`PageStream`] into memory, stopping at the first error.
pub async fn collect<T>(stream: PageStream<T>) -> Result<Vec<T>, FetchError> {
    stream.try_collect().await
}
