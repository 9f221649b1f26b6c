//! Per-feed entry filtering, applied between parse and merge.
//!
//! A feed can carry a blocklist rule (drop matching entries) and a keeplist
//! rule (drop everything else). Rules are regular expressions matched
//! against an entry's title, URL, author, and tags. An invalid pattern is
//! logged and ignored rather than failing the refresh.

use regex::Regex;

use crate::model::{Entry, Feed};

/// Applies the feed's blocklist/keeplist rules to its parsed entries.
pub fn filter_feed_entries(feed: &mut Feed) {
    let blocklist = compile_rule(&feed.blocklist_rules, "blocklist");
    let keeplist = compile_rule(&feed.keeplist_rules, "keeplist");

    if blocklist.is_none() && keeplist.is_none() {
        return;
    }

    let before = feed.entries.len();
    feed.entries.retain(|entry| {
        if let Some(rule) = &blocklist {
            if entry_matches(rule, entry) {
                return false;
            }
        }
        if let Some(rule) = &keeplist {
            return entry_matches(rule, entry);
        }
        true
    });

    let dropped = before - feed.entries.len();
    if dropped > 0 {
        tracing::debug!(
            feed_url = %feed.feed_url,
            dropped = dropped,
            "Entries dropped by filter rules"
        );
    }
}

fn compile_rule(pattern: &str, kind: &str) -> Option<Regex> {
    if pattern.is_empty() {
        return None;
    }
    match Regex::new(pattern) {
        Ok(rule) => Some(rule),
        Err(err) => {
            tracing::warn!(pattern = %pattern, kind = %kind, error = %err, "Ignoring invalid filter rule");
            None
        }
    }
}

fn entry_matches(rule: &Regex, entry: &Entry) -> bool {
    rule.is_match(&entry.title)
        || rule.is_match(&entry.url)
        || rule.is_match(&entry.author)
        || entry.tags.iter().any(|tag| rule.is_match(tag))
}
