//! Feed lifecycle orchestration: subscribe and refresh.
//!
//! `create_feed` and `refresh_feed` are the only write paths for a feed row.
//! Each drives one feed through fetch → conditional short-circuit → parse →
//! merge, with the error counter and cache validators updated along the way.

use thiserror::Error;

use crate::fetch::{FeedFetcher, FetchError, FetchRequest, FetchedBody};
use crate::model::{Feed, SchedulingPolicy};
use crate::reader::parser::{self, ParseError};
use crate::reader::{icon, processor};
use crate::storage::Database;

#[derive(Debug, Error)]
pub enum FeedHandlerError {
    /// Subscribing into a category the user does not own; rejected before
    /// any network I/O.
    #[error("Category not found for this user")]
    CategoryNotFound,
    /// The user already subscribes to this feed (detected on the effective
    /// post-redirect URL, not the request URL).
    #[error("This feed already exists ({0})")]
    Duplicate(String),
    #[error("Feed {0} not found")]
    NotFound(i64),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// A subscription request: where to fetch and the per-feed options to stamp
/// onto the created feed.
#[derive(Debug, Clone, Default)]
pub struct FeedCreationRequest {
    pub category_id: i64,
    pub feed_url: String,
    pub username: String,
    pub password: String,
    pub user_agent: String,
    pub cookie: String,
    pub crawler: bool,
    pub disabled: bool,
    pub ignore_http_cache: bool,
    pub fetch_via_proxy: bool,
    pub allow_self_signed_certificates: bool,
    pub blocklist_rules: String,
    pub keeplist_rules: String,
    pub rewrite_rules: String,
}

/// Fetch, parse, and store a new feed.
pub async fn create_feed(
    db: &Database,
    fetcher: &FeedFetcher,
    user_id: i64,
    request: &FeedCreationRequest,
) -> Result<Feed, FeedHandlerError> {
    if !db.category_exists(user_id, request.category_id).await? {
        return Err(FeedHandlerError::CategoryNotFound);
    }

    let fetch_request = FetchRequest {
        url: request.feed_url.clone(),
        username: request.username.clone(),
        password: request.password.clone(),
        user_agent: request.user_agent.clone(),
        cookie: request.cookie.clone(),
        fetch_via_proxy: request.fetch_via_proxy,
        allow_self_signed_certificates: request.allow_self_signed_certificates,
        ..Default::default()
    };
    let response = fetcher.fetch(&fetch_request).await?;

    // Duplicate detection happens post-redirect.
    if db.feed_url_exists(user_id, &response.effective_url).await? {
        return Err(FeedHandlerError::Duplicate(response.effective_url));
    }

    let mut feed = parser::parse_feed(&response.effective_url, &response.body)?;
    feed.user_id = user_id;
    feed.category_id = request.category_id;
    feed.username = request.username.clone();
    feed.password = request.password.clone();
    feed.user_agent = request.user_agent.clone();
    feed.cookie = request.cookie.clone();
    feed.crawler = request.crawler;
    feed.disabled = request.disabled;
    feed.ignore_http_cache = request.ignore_http_cache;
    feed.fetch_via_proxy = request.fetch_via_proxy;
    feed.allow_self_signed_certificates = request.allow_self_signed_certificates;
    feed.blocklist_rules = request.blocklist_rules.clone();
    feed.keeplist_rules = request.keeplist_rules.clone();
    feed.rewrite_rules = request.rewrite_rules.clone();
    apply_client_response(&mut feed, &response);
    feed.checked_now();

    processor::filter_feed_entries(&mut feed);

    db.create_feed(&mut feed).await?;
    tracing::debug!(feed_id = feed.id, feed_url = %feed.feed_url, "Feed created");

    // A missing icon never fails subscription.
    icon::refresh_feed_icon(db, fetcher, &feed).await;

    Ok(feed)
}

/// Refresh a stored feed: conditional fetch, parse when modified, merge.
pub async fn refresh_feed(
    db: &Database,
    fetcher: &FeedFetcher,
    policy: &SchedulingPolicy,
    user_id: i64,
    feed_id: i64,
) -> Result<(), FeedHandlerError> {
    let mut feed = db
        .feed_by_id(user_id, feed_id)
        .await?
        .ok_or(FeedHandlerError::NotFound(feed_id))?;

    let weekly_entry_count = match policy {
        SchedulingPolicy::EntryFrequency { .. } => {
            db.weekly_entry_count(user_id, feed_id).await?
        }
        SchedulingPolicy::Fixed { .. } => 0,
    };

    feed.checked_now();
    feed.schedule_next_check(policy, weekly_entry_count);

    let mut request = FetchRequest::from_feed(&feed);
    if !feed.ignore_http_cache {
        request = request.with_cache_validators(&feed.etag_header, &feed.last_modified_header);
    }

    let response = match fetcher.fetch(&request).await {
        Ok(response) => response,
        Err(err) => {
            feed.with_error(&err.to_string());
            db.update_feed_error(&feed).await?;
            return Err(err.into());
        }
    };

    // A redirect onto a URL another subscription already uses must not merge
    // entries into the wrong feed.
    if db
        .another_feed_url_exists(user_id, feed.id, &response.effective_url)
        .await?
    {
        let err = FeedHandlerError::Duplicate(response.effective_url);
        feed.with_error(&err.to_string());
        db.update_feed_error(&feed).await?;
        return Err(err);
    }

    if feed.ignore_http_cache
        || response.is_modified(&feed.etag_header, &feed.last_modified_header)
    {
        tracing::debug!(feed_id = feed_id, "Feed modified");

        let parsed = match parser::parse_feed(&response.effective_url, &response.body) {
            Ok(parsed) => parsed,
            Err(err) => {
                feed.with_error(&err.to_string());
                db.update_feed_error(&feed).await?;
                return Err(err.into());
            }
        };

        feed.entries = parsed.entries;
        processor::filter_feed_entries(&mut feed);

        // Crawler mode never overwrites existing entries: their stored
        // content is a full-page extraction richer than the feed summary.
        let update_existing = !feed.crawler;
        if let Err(err) = db
            .refresh_feed_entries(user_id, feed.id, &feed.entries, update_existing)
            .await
        {
            feed.with_error(&err.to_string());
            db.update_feed_error(&feed).await?;
            return Err(err.into());
        }

        // Validators are refreshed only when the body changed; some servers
        // return different headers alongside a 304.
        apply_client_response(&mut feed, &response);
        icon::refresh_feed_icon(db, fetcher, &feed).await;
    } else {
        tracing::debug!(feed_id = feed_id, "Feed not modified");
    }

    feed.reset_error_counter();

    if let Err(err) = db.update_feed(&feed).await {
        feed.with_error(&err.to_string());
        db.update_feed_error(&feed).await?;
        return Err(err.into());
    }

    Ok(())
}

/// Copies response metadata onto the feed: cache validators and the
/// effective URL (so the stored feed follows permanent redirects).
fn apply_client_response(feed: &mut Feed, response: &FetchedBody) {
    feed.with_caching_headers(&response.etag, &response.last_modified);
    feed.feed_url = response.effective_url.clone();
}
