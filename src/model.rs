//! Canonical domain types shared by the parsers, the feed handler, and storage.
//!
//! Every wire format (RSS, Atom, JSON Feed, RDF) is normalized into a
//! [`Feed`] holding a list of [`Entry`] values. The `(feed_id, hash)` pair is
//! the identity key for an entry; see [`Entry::hash`].

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Minutes in one week, used by the adaptive scheduling policy.
const MINUTES_PER_WEEK: i64 = 7 * 24 * 60;

// ============================================================================
// Feed
// ============================================================================

/// A subscribed feed and its polling state.
///
/// Mutated on every refresh: cache validators, error bookkeeping, and the
/// next-check schedule all live here and are persisted by the storage layer.
#[derive(Debug, Clone, Default)]
pub struct Feed {
    pub id: i64,
    pub user_id: i64,
    pub category_id: i64,
    pub feed_url: String,
    pub site_url: String,
    pub title: String,
    pub icon_url: String,
    /// RSS `<ttl>` hint in minutes, 0 when absent.
    pub ttl: i64,
    pub etag_header: String,
    pub last_modified_header: String,
    pub checked_at: Option<DateTime<Utc>>,
    pub next_check_at: Option<DateTime<Utc>>,
    pub parsing_error_count: i64,
    pub parsing_error_message: String,
    pub disabled: bool,
    /// Skip conditional-fetch validators and always re-download the body.
    pub ignore_http_cache: bool,
    /// Full-page extraction mode; existing entries are never overwritten.
    pub crawler: bool,
    pub fetch_via_proxy: bool,
    pub allow_self_signed_certificates: bool,
    pub username: String,
    pub password: String,
    pub user_agent: String,
    pub cookie: String,
    pub blocklist_rules: String,
    pub keeplist_rules: String,
    pub rewrite_rules: String,
    pub entries: Vec<Entry>,
}

impl Feed {
    /// Stamps the feed as checked right now.
    pub fn checked_now(&mut self) {
        self.checked_at = Some(Utc::now());
    }

    /// Records a fetch or parse failure and bumps the error counter.
    pub fn with_error(&mut self, message: &str) {
        self.parsing_error_count += 1;
        self.parsing_error_message = message.to_string();
    }

    /// Clears the error state after a successful refresh.
    pub fn reset_error_counter(&mut self) {
        self.parsing_error_count = 0;
        self.parsing_error_message.clear();
    }

    /// Copies the response cache validators onto the feed.
    ///
    /// Only called when the body actually changed; some servers return
    /// different headers on a 304 and those must not clobber stored values.
    pub fn with_caching_headers(&mut self, etag: &str, last_modified: &str) {
        self.etag_header = etag.to_string();
        self.last_modified_header = last_modified.to_string();
    }

    /// Computes `next_check_at` from the configured policy.
    ///
    /// `weekly_entry_count` is only consulted by the entry-frequency policy.
    pub fn schedule_next_check(&mut self, policy: &SchedulingPolicy, weekly_entry_count: i64) {
        let minutes = policy.interval_minutes(weekly_entry_count);
        self.next_check_at = Some(Utc::now() + Duration::minutes(minutes));
    }
}

// ============================================================================
// Scheduling policy
// ============================================================================

/// Next-check interval policy, evaluated per feed during refresh.
///
/// The adaptive curve is a tunable: feeds that published more entries in the
/// last week are polled more often, clamped to the configured bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulingPolicy {
    /// The same interval for every feed.
    Fixed { interval_minutes: i64 },
    /// Interval derived from the feed's recent publication frequency.
    EntryFrequency {
        min_interval_minutes: i64,
        max_interval_minutes: i64,
    },
}

impl SchedulingPolicy {
    pub fn interval_minutes(&self, weekly_entry_count: i64) -> i64 {
        match *self {
            SchedulingPolicy::Fixed { interval_minutes } => interval_minutes,
            SchedulingPolicy::EntryFrequency {
                min_interval_minutes,
                max_interval_minutes,
            } => {
                if weekly_entry_count <= 0 {
                    return max_interval_minutes;
                }
                let mut minutes = MINUTES_PER_WEEK / weekly_entry_count;
                if minutes < min_interval_minutes {
                    minutes = min_interval_minutes;
                }
                if minutes > max_interval_minutes {
                    minutes = max_interval_minutes;
                }
                minutes
            }
        }
    }
}

// ============================================================================
// Entry
// ============================================================================

/// Read status of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Unread,
    Read,
    Removed,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Unread => "unread",
            EntryStatus::Read => "read",
            EntryStatus::Removed => "removed",
        }
    }
}

/// One item inside a feed.
///
/// `hash` is the deduplication key: derived from the most stable available
/// identifier (GUID/id, else URL, else title+description), so a republished
/// entry with a rewritten URL keeps its identity as long as it carries a GUID.
#[derive(Debug, Clone)]
pub struct Entry {
    pub id: i64,
    pub feed_id: i64,
    pub title: String,
    pub url: String,
    pub comments_url: String,
    pub author: String,
    pub content: String,
    pub hash: String,
    pub date: DateTime<Utc>,
    pub status: EntryStatus,
    pub starred: bool,
    pub tags: Vec<String>,
    pub enclosures: Vec<Enclosure>,
}

impl Entry {
    /// A fresh unread entry dated "now"; adapters overwrite the fields they
    /// can populate and leave the rest at these defaults.
    pub fn new() -> Self {
        Entry {
            id: 0,
            feed_id: 0,
            title: String::new(),
            url: String::new(),
            comments_url: String::new(),
            author: String::new(),
            content: String::new(),
            hash: String::new(),
            date: Utc::now(),
            status: EntryStatus::Unread,
            starred: false,
            tags: Vec::new(),
            enclosures: Vec::new(),
        }
    }
}

impl Default for Entry {
    fn default() -> Self {
        Entry::new()
    }
}

// ============================================================================
// Enclosure
// ============================================================================

/// A media attachment of an entry, deduplicated by URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enclosure {
    pub url: String,
    pub mime_type: String,
    pub size: i64,
    /// Playback position in seconds, written by media players; adapters
    /// always produce zero.
    pub media_progression: i64,
}

// ============================================================================
// Job
// ============================================================================

/// One scheduled unit of "refresh this feed for this user" work.
///
/// Created by the batch scheduler, consumed exactly once by a worker,
/// never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Job {
    pub user_id: i64,
    pub feed_id: i64,
}
