//! Best-effort feed icon discovery.
//!
//! Tries the feed's own icon/logo URL first, then scans the site's HTML
//! `<link rel="icon">` tags, then falls back to `/favicon.ico`. Failure at
//! any step is logged and swallowed; icons never fail feed creation or
//! refresh.

use regex::Regex;

use crate::fetch::{FeedFetcher, FetchRequest};
use crate::model::Feed;
use crate::reader::urls;
use crate::storage::Database;

/// Discover and store an icon for the feed if none is stored yet.
pub async fn refresh_feed_icon(db: &Database, fetcher: &FeedFetcher, feed: &Feed) {
    match db.has_icon(feed.id).await {
        Ok(true) => return,
        Ok(false) => {}
        Err(err) => {
            tracing::debug!(feed_id = feed.id, error = %err, "Icon lookup failed");
            return;
        }
    }

    let Some((mime_type, data)) = find_icon(fetcher, feed).await else {
        tracing::debug!(feed_id = feed.id, site_url = %feed.site_url, "No icon found");
        return;
    };

    if let Err(err) = db.create_feed_icon(feed.id, &mime_type, &data).await {
        tracing::debug!(feed_id = feed.id, error = %err, "Unable to store feed icon");
    }
}

async fn find_icon(fetcher: &FeedFetcher, feed: &Feed) -> Option<(String, Vec<u8>)> {
    for candidate in icon_candidates(fetcher, feed).await {
        if let Some(icon) = download_icon(fetcher, feed, &candidate).await {
            return Some(icon);
        }
    }
    None
}

async fn icon_candidates(fetcher: &FeedFetcher, feed: &Feed) -> Vec<String> {
    let mut candidates = Vec::new();

    if !feed.icon_url.is_empty() {
        if let Ok(absolute) = urls::absolute_url(&feed.site_url, &feed.icon_url) {
            candidates.push(absolute);
        }
    }

    // Scan the home page markup for rel="icon"-style links.
    if !feed.site_url.is_empty() {
        let mut request = FetchRequest::from_feed(feed);
        request.url = feed.site_url.clone();
        if let Ok(page) = fetcher.fetch(&request).await {
            let html = String::from_utf8_lossy(&page.body);
            if let Some(href) = extract_icon_href(&html) {
                if let Ok(absolute) = urls::absolute_url(&feed.site_url, &href) {
                    candidates.push(absolute);
                }
            }
        }

        if let Ok(fallback) = urls::absolute_url(&feed.site_url, "/favicon.ico") {
            candidates.push(fallback);
        }
    }

    candidates
}

async fn download_icon(
    fetcher: &FeedFetcher,
    feed: &Feed,
    icon_url: &str,
) -> Option<(String, Vec<u8>)> {
    let mut request = FetchRequest::from_feed(feed);
    request.url = icon_url.to_string();

    match fetcher.fetch(&request).await {
        Ok(response) if !response.body.is_empty() => {
            let mime_type = if response.content_type.is_empty() {
                "image/x-icon".to_string()
            } else {
                response.content_type
            };
            Some((mime_type, response.body))
        }
        Ok(_) => None,
        Err(err) => {
            tracing::debug!(icon_url = %icon_url, error = %err, "Icon download failed");
            None
        }
    }
}

/// First `<link rel="...icon...">` href in the page head, if any.
fn extract_icon_href(html: &str) -> Option<String> {
    let link_tag = Regex::new(r#"(?is)<link\s[^>]*rel\s*=\s*["'][^"']*icon[^"']*["'][^>]*>"#).ok()?;
    let href_attr = Regex::new(r#"(?is)href\s*=\s*["']([^"']+)["']"#).ok()?;

    let tag = link_tag.find(html)?;
    let href = href_attr.captures(tag.as_str())?;
    Some(href[1].to_string())
}
